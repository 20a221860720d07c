//! Page-number pagination for list endpoints
//!
//! Lists are returned as `{count, next, previous, results}`; the links
//! repeat the request path and query with only `page` replaced.

use crate::errors::{AppError, Result};
use axum::http::Uri;
use serde::{Deserialize, Serialize};

/// `?page=N` query parameter (1-based)
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u64>,
}

/// A validated page position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub size: u64,
}

impl PageRequest {
    pub fn new(params: PageParams, size: u64) -> Result<Self> {
        let page = params.page.unwrap_or(1);
        if page == 0 {
            return Err(AppError::invalid_field("page", "page numbers start at 1"));
        }
        Ok(Self {
            page,
            size: size.max(1),
        })
    }

    /// Zero-based page index, as the database paginator counts
    pub fn index(&self) -> u64 {
        self.page - 1
    }
}

/// One page of rows plus the total row count
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Listing<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Listing<U> {
        Listing {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

/// Serialized page envelope
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Wrap a listing, rejecting pages past the end (page 1 always exists)
    pub fn new(listing: Listing<T>, request: PageRequest, uri: &Uri) -> Result<Self> {
        let last_page = listing.total.div_ceil(request.size).max(1);
        if request.page > last_page {
            return Err(AppError::not_found("page", request.page));
        }

        let next = (request.page < last_page).then(|| page_link(uri, request.page + 1));
        let previous = (request.page > 1).then(|| page_link(uri, request.page - 1));

        Ok(Self {
            count: listing.total,
            next,
            previous,
            results: listing.items,
        })
    }
}

fn page_link(uri: &Uri, page: u64) -> String {
    let mut pairs: Vec<&str> = uri
        .query()
        .unwrap_or("")
        .split('&')
        .filter(|pair| !pair.is_empty() && !pair.starts_with("page="))
        .collect();
    let page_pair = format!("page={}", page);
    pairs.push(&page_pair);
    format!("{}?{}", uri.path(), pairs.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(total: u64) -> Listing<u64> {
        Listing { items: vec![], total }
    }

    #[test]
    fn test_page_zero_is_rejected() {
        assert!(PageRequest::new(PageParams { page: Some(0) }, 10).is_err());
        let request = PageRequest::new(PageParams::default(), 10).unwrap();
        assert_eq!(request.page, 1);
        assert_eq!(request.index(), 0);
    }

    #[test]
    fn test_links_replace_page_and_keep_filters() {
        let uri: Uri = "/v1/titles/?genre=drama&page=2&year=1999".parse().unwrap();
        let request = PageRequest { page: 2, size: 10 };
        let page = Page::new(listing(35), request, &uri).unwrap();

        assert_eq!(page.count, 35);
        assert_eq!(page.next.as_deref(), Some("/v1/titles/?genre=drama&year=1999&page=3"));
        assert_eq!(page.previous.as_deref(), Some("/v1/titles/?genre=drama&year=1999&page=1"));
    }

    #[test]
    fn test_single_page_has_no_links() {
        let uri: Uri = "/v1/genres/".parse().unwrap();
        let page = Page::new(listing(0), PageRequest { page: 1, size: 10 }, &uri).unwrap();
        assert!(page.next.is_none());
        assert!(page.previous.is_none());
    }

    #[test]
    fn test_page_past_the_end_is_not_found() {
        let uri: Uri = "/v1/genres/?page=3".parse().unwrap();
        let err = Page::new(listing(15), PageRequest { page: 3, size: 10 }, &uri).unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }
}
