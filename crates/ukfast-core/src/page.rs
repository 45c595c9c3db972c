//! Paginated listings.
//!
//! A listing call fetches exactly one page. Items stay as raw wire JSON
//! until a [`Serializer`] is attached and the caller actually reads them,
//! so one generic fetch serves every resource. Following pages are fetched
//! on demand from the parameters the page remembers; nothing is cached
//! between calls.

use crate::client::{ServiceClient, TransportRequest};
use crate::entity::{kind_of, Serializer};
use crate::mapper::Attributes;
use crate::query::QueryParams;
use crate::{Error, Result};
use reqwest::Method;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// First page number.
pub const DEFAULT_PAGE: u32 = 1;

/// Page size used when the caller does not choose one.
pub const DEFAULT_PER_PAGE: u32 = 15;

/// Caller-facing listing parameters. Filter keys use friendly names.
#[derive(Debug, Clone, PartialEq)]
pub struct ListParams {
    /// Page number, starting at 1
    pub page: u32,
    /// Items per page
    pub per_page: u32,
    /// Filters keyed by friendly field name
    pub filters: Attributes,
}

impl ListParams {
    /// First page with the default page size and no filters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
            filters: Attributes::new(),
        }
    }

    /// Select a page.
    #[must_use]
    pub const fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Set the page size.
    #[must_use]
    pub const fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    /// Add a filter.
    #[must_use]
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }
}

impl Default for ListParams {
    fn default() -> Self {
        Self::new()
    }
}

/// Wire-level listing request: filters already translated to query pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Collection path relative to the service base path
    pub path: String,
    /// Page number
    pub page: u32,
    /// Items per page
    pub per_page: u32,
    /// Translated filter pairs, sent after `page` and `per_page`
    pub filters: Vec<(String, String)>,
}

impl PageRequest {
    /// First page of `path` with the default page size.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
            filters: Vec::new(),
        }
    }

    /// Take page number and size from caller parameters.
    #[must_use]
    pub fn with_params(mut self, params: &ListParams) -> Self {
        self.page = params.page;
        self.per_page = params.per_page;
        self
    }

    /// Select a page.
    #[must_use]
    pub const fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Set the page size.
    #[must_use]
    pub const fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    /// Set the translated filter pairs.
    #[must_use]
    pub fn with_filters(mut self, filters: Vec<(String, String)>) -> Self {
        self.filters = filters;
        self
    }

    /// Check page bounds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the page or page size is zero.
    pub fn validate(&self) -> Result<()> {
        if self.page == 0 {
            return Err(Error::validation("page must be at least 1"));
        }
        if self.per_page == 0 {
            return Err(Error::validation("per_page must be at least 1"));
        }
        Ok(())
    }

    fn query(&self) -> QueryParams {
        let mut query = QueryParams::new();
        query.push("page", self.page);
        query.push("per_page", self.per_page);
        query.extend(self.filters.iter().cloned());
        query
    }
}

/// Pagination metadata. Values the server did not report are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMeta {
    /// Current page number
    pub current_page: u32,
    /// Effective page size
    pub per_page: u32,
    /// Items on this page as reported by the server
    pub count: Option<u64>,
    /// Total items across all pages
    pub total: Option<u64>,
    /// Total number of pages
    pub total_pages: Option<u32>,
    /// Link to the next page
    pub next_link: Option<String>,
}

impl PageMeta {
    fn parse(body: &Value, request: &PageRequest) -> Self {
        let Some(pagination) = body.pointer("/meta/pagination") else {
            warn!(path = %request.path, "Listing response carries no pagination metadata");
            return Self {
                current_page: request.page,
                per_page: request.per_page,
                ..Self::default()
            };
        };

        let as_u32 = |key: &str| {
            pagination
                .get(key)
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
        };

        Self {
            current_page: as_u32("current_page")
                .filter(|n| *n > 0)
                .unwrap_or(request.page),
            per_page: as_u32("per_page")
                .filter(|n| *n > 0)
                .unwrap_or(request.per_page),
            count: pagination.get("count").and_then(Value::as_u64),
            total: pagination.get("total").and_then(Value::as_u64),
            total_pages: as_u32("total_pages"),
            next_link: pagination
                .pointer("/links/next")
                .and_then(Value::as_str)
                .filter(|link| !link.is_empty())
                .map(str::to_string),
        }
    }
}

/// One fetched page of a collection.
///
/// Items are held as raw wire JSON and turned into `T` by the attached
/// serializer each time they are read.
pub struct Page<T = Value> {
    request: PageRequest,
    meta: PageMeta,
    raw: Vec<Value>,
    serializer: Serializer<T>,
}

impl Page<Value> {
    fn raw(request: PageRequest, meta: PageMeta, raw: Vec<Value>) -> Self {
        Self {
            request,
            meta,
            raw,
            serializer: Arc::new(|item: &Value| -> Result<Value> { Ok(item.clone()) }),
        }
    }
}

impl<T> Page<T> {
    /// Replace the deserialization strategy. No item is deserialized here.
    #[must_use]
    pub fn with_serializer<U>(self, serializer: Serializer<U>) -> Page<U> {
        Page {
            request: self.request,
            meta: self.meta,
            raw: self.raw,
            serializer,
        }
    }

    /// Attach a deserialization function. No item is deserialized here.
    #[must_use]
    pub fn serialize_with<U, F>(self, f: F) -> Page<U>
    where
        F: Fn(&Value) -> Result<U> + Send + Sync + 'static,
    {
        self.with_serializer(Arc::new(f))
    }

    /// The undeserialized wire items.
    #[must_use]
    pub fn raw_items(&self) -> &[Value] {
        &self.raw
    }

    /// Number of items on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// True when the page holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Deserialize the item at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Result<T>> {
        self.raw.get(index).map(|item| (self.serializer)(item))
    }

    /// Lazily deserialize items in order.
    pub fn iter(&self) -> impl Iterator<Item = Result<T>> + '_ {
        self.raw.iter().map(|item| (self.serializer)(item))
    }

    /// Deserialize every item.
    ///
    /// # Errors
    ///
    /// Returns the first deserialization error.
    pub fn items(&self) -> Result<Vec<T>> {
        self.iter().collect()
    }

    /// Pagination metadata.
    #[must_use]
    pub const fn meta(&self) -> &PageMeta {
        &self.meta
    }

    /// The request that produced this page.
    #[must_use]
    pub const fn request(&self) -> &PageRequest {
        &self.request
    }

    /// The serializer in use.
    #[must_use]
    pub fn serializer(&self) -> Serializer<T> {
        Arc::clone(&self.serializer)
    }

    /// Current page number.
    #[must_use]
    pub const fn page_number(&self) -> u32 {
        self.meta.current_page
    }

    /// Effective page size.
    #[must_use]
    pub const fn per_page(&self) -> u32 {
        self.meta.per_page
    }

    /// Total items across all pages, if reported.
    #[must_use]
    pub const fn total_items(&self) -> Option<u64> {
        self.meta.total
    }

    /// Total number of pages, if reported.
    #[must_use]
    pub const fn total_pages(&self) -> Option<u32> {
        self.meta.total_pages
    }

    /// Whether a following page exists.
    #[must_use]
    pub fn has_next_page(&self) -> bool {
        match self.meta.total_pages {
            Some(total_pages) => self.meta.current_page < total_pages,
            None => self.meta.next_link.is_some(),
        }
    }

    /// Request for the following page, if there is one.
    #[must_use]
    pub fn next_request(&self) -> Option<PageRequest> {
        self.has_next_page().then(|| {
            self.request
                .clone()
                .with_page(self.meta.current_page.saturating_add(1))
        })
    }
}

impl<T> fmt::Debug for Page<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("request", &self.request)
            .field("meta", &self.meta)
            .field("items", &self.raw.len())
            .finish_non_exhaustive()
    }
}

/// Issues listing requests through a [`ServiceClient`].
#[derive(Debug, Clone)]
pub struct PaginationEngine {
    service: ServiceClient,
}

impl PaginationEngine {
    /// Engine bound to a service client.
    #[must_use]
    pub const fn new(service: ServiceClient) -> Self {
        Self { service }
    }

    /// Fetch one page. Every call issues exactly one request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a zero page or page size (no request
    /// is made), [`Error::Decode`] for a malformed envelope, and propagates
    /// transport and status errors.
    pub async fn fetch(&self, request: PageRequest) -> Result<Page> {
        request.validate()?;

        let transport_request =
            TransportRequest::new(Method::GET, request.path.clone()).with_query(request.query());
        let body = self.service.json(transport_request).await?;

        let raw = match body.get("data") {
            Some(Value::Array(items)) => items.clone(),
            Some(other) => {
                return Err(Error::Decode(format!(
                    "listing `{}` returned {} for `data`, expected an array",
                    request.path,
                    kind_of(other)
                )))
            }
            None => {
                return Err(Error::Decode(format!(
                    "listing `{}` returned no `data` member",
                    request.path
                )))
            }
        };

        let meta = PageMeta::parse(&body, &request);
        if raw.len() > meta.per_page as usize {
            return Err(Error::Decode(format!(
                "listing `{}` returned {} items for a page size of {}",
                request.path,
                raw.len(),
                meta.per_page
            )));
        }

        debug!(
            path = %request.path,
            page = meta.current_page,
            per_page = meta.per_page,
            items = raw.len(),
            total_pages = ?meta.total_pages,
            "Fetched page"
        );

        Ok(Page::raw(request, meta, raw))
    }

    /// Fetch the page after `page` with the same filters and serializer.
    ///
    /// # Errors
    ///
    /// See [`PaginationEngine::fetch`].
    pub async fn next_page<T>(&self, page: &Page<T>) -> Result<Option<Page<T>>> {
        match page.next_request() {
            Some(request) => {
                let next = self.fetch(request).await?;
                Ok(Some(next.with_serializer(page.serializer())))
            }
            None => Ok(None),
        }
    }
}
