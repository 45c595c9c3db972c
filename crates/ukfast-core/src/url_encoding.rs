//! Percent-encoding for caller-supplied values placed in request paths.
//!
//! An id or hash interpolated raw into a path can add segments (`a/b`),
//! start a query or fragment (`?`, `#`), or climb out of the collection
//! (`..`). Every such value goes through [`path_segment`] first.

use crate::{Error, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Bytes encoded in a single path segment: the RFC 3986 delimiters plus
/// characters that are unsafe in URLs.
pub const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'^')
    .add(b'%')
    .add(b'/')
    .add(b'?')
    .add(b'#')
    .add(b'+')
    .add(b';')
    .add(b'[')
    .add(b']');

/// Percent-encode `segment` so it stays one path segment.
///
/// ```
/// use ukfast_core::url_encoding::encode_path_segment;
///
/// assert_eq!(encode_path_segment("a/b#c"), "a%2Fb%23c");
/// ```
#[must_use]
pub fn encode_path_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT_ENCODE_SET).to_string()
}

/// Encode `value` as one path segment, rejecting values that cannot be one.
///
/// # Errors
///
/// Returns [`Error::Validation`] naming `field` if `value` is empty, `.` or
/// `..`. URL resolution would drop or climb over such a segment.
pub fn path_segment(value: &str, field: &str) -> Result<String> {
    match value {
        "" | "." | ".." => Err(Error::validation(format!(
            "`{value}` is not a valid {field}"
        ))),
        _ => Ok(encode_path_segment(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_plain_values_unchanged() {
        assert_eq!(encode_path_segment("c41e7b02-93fd"), "c41e7b02-93fd");
        assert_eq!(encode_path_segment("my_domain.example"), "my_domain.example");
        assert_eq!(encode_path_segment("Zm9vYmFy="), "Zm9vYmFy=");
    }

    #[test]
    fn test_delimiters_encoded() {
        assert_eq!(encode_path_segment("../../v2/frontends/1"), "..%2F..%2Fv2%2Ffrontends%2F1");
        assert_eq!(encode_path_segment("abc#z1"), "abc%23z1");
        assert_eq!(encode_path_segment("abc?x=1"), "abc%3Fx=1");
        assert_eq!(encode_path_segment("a+b c"), "a%2Bb%20c");
    }

    #[test]
    fn test_percent_is_not_decoded_twice() {
        assert_eq!(encode_path_segment("100%2F"), "100%252F");
    }

    #[test]
    fn test_non_ascii_as_utf8() {
        assert_eq!(encode_path_segment("caf\u{e9}"), "caf%C3%A9");
    }

    #[test]
    fn test_dot_segments_rejected() {
        for value in ["", ".", ".."] {
            let err = path_segment(value, "domain id").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert_eq!(path_segment("...", "domain id").unwrap(), "...");
    }
}
