use serde::Serialize;
use thiserror::Error;

use unsplash_gallery_api_structs::{Photo, SearchResponse};

pub mod unsplash;

pub use unsplash::UnsplashClient;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("could not encode query string: {0}")]
    Encode(String),
    #[error("invalid request url")]
    InvalidUrl(#[from] url::ParseError),
}

/// Which endpoint a page sequence comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum EndpointKind {
    List,
    Search,
}

/// One batch of results from either paginated endpoint.
#[derive(Clone, Debug, PartialEq)]
pub enum Page {
    List(Vec<Photo>),
    Search(SearchResponse),
}

impl Page {
    pub fn kind(&self) -> EndpointKind {
        match self {
            Page::List(_) => EndpointKind::List,
            Page::Search(_) => EndpointKind::Search,
        }
    }

    pub fn photos(&self) -> &[Photo] {
        match self {
            Page::List(photos) => photos,
            Page::Search(response) => &response.results,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.photos().is_empty()
    }

    /// Only search pages know how many pages exist.
    pub fn total_pages(&self) -> Option<u32> {
        match self {
            Page::List(_) => None,
            Page::Search(response) => Some(response.total_pages),
        }
    }

    pub fn total(&self) -> Option<u64> {
        match self {
            Page::List(_) => None,
            Page::Search(response) => Some(response.total),
        }
    }
}

/// Returns the search term to query with, or `None` for list mode.
pub fn normalize_term(term: Option<&str>) -> Option<&str> {
    term.map(str::trim).filter(|t| !t.is_empty())
}

#[async_trait::async_trait]
pub trait PhotoSource: Send + Sync {
    /// Fetches page `page` (1-based) of the list endpoint, or of the search
    /// endpoint when `query` holds a non-blank term.
    async fn fetch_page(&self, page: u32, query: Option<&str>) -> Result<Page, ApiError>;

    /// Fetches the single-photo representation, including downloads and location.
    async fn fetch_photo(&self, id: &str) -> Result<Photo, ApiError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_terms_are_list_mode() {
        assert_eq!(normalize_term(None), None);
        assert_eq!(normalize_term(Some("")), None);
        assert_eq!(normalize_term(Some("   ")), None);
        assert_eq!(normalize_term(Some(" cats ")), Some("cats"));
    }

    #[test]
    fn page_metadata() {
        let list = fake::list_page("l", 1, 3);
        assert_eq!(list.kind(), EndpointKind::List);
        assert_eq!(list.total_pages(), None);
        assert_eq!(list.photos().len(), 3);

        let search = fake::search_page("cats", 1, 4, 2);
        assert_eq!(search.kind(), EndpointKind::Search);
        assert_eq!(search.total_pages(), Some(4));
        assert_eq!(search.total(), Some(8));
        assert!(!search.is_empty());
    }
}
