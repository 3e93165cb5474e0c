//! Infinite-scroll page cache for one (endpoint, search term) key.
//!
//! Pages are appended in arrival order. A fetch is split into
//! [`InfiniteQuery::begin_fetch`], which hands out the next [`PageRequest`],
//! and [`InfiniteQuery::complete`], which only accepts the result if the
//! request still matches the current key. Requests issued before the search
//! term changed are therefore dropped instead of cancelled.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use unsplash_gallery_api_structs::Photo;

use crate::api::{normalize_term, ApiError, EndpointKind, Page};

/// Photos per page requested from the API unless configured otherwise.
pub const DEFAULT_PER_PAGE: u8 = 20;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct QueryKey {
    pub kind: EndpointKind,
    pub term: Option<String>,
}

impl QueryKey {
    pub fn new(term: Option<&str>) -> Self {
        match normalize_term(term) {
            Some(term) => QueryKey {
                kind: EndpointKind::Search,
                term: Some(term.to_string()),
            },
            None => QueryKey {
                kind: EndpointKind::List,
                term: None,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub key: QueryKey,
    pub page: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum QueryStatus {
    Pending,
    Success,
    Error(String),
}

#[derive(Debug)]
struct FetchedPage {
    param: u32,
    page: Page,
}

#[derive(Debug)]
pub struct InfiniteQuery {
    key: QueryKey,
    pages: Vec<FetchedPage>,
    status: QueryStatus,
    in_flight: Option<u32>,
    per_page: usize,
}

impl InfiniteQuery {
    pub fn new(term: Option<&str>) -> Self {
        InfiniteQuery {
            key: QueryKey::new(term),
            pages: Vec::new(),
            status: QueryStatus::Pending,
            in_flight: None,
            per_page: usize::from(DEFAULT_PER_PAGE),
        }
    }

    /// Sets the page size the source was asked for. A list page shorter than
    /// this ends the sequence.
    pub fn with_page_size(mut self, per_page: u8) -> Self {
        self.per_page = usize::from(per_page);
        self
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn status(&self) -> &QueryStatus {
        &self.status
    }

    /// Switches to the key for `term`, dropping every accumulated page.
    ///
    /// Returns `false` and keeps the current pages if the key is unchanged.
    pub fn set_search_term(&mut self, term: Option<&str>) -> bool {
        let key = QueryKey::new(term);
        if key == self.key {
            return false;
        }

        info!(from = ?self.key.term, to = ?key.term, "Search term changed, restarting pagination");
        self.key = key;
        self.pages.clear();
        self.status = QueryStatus::Pending;
        self.in_flight = None;
        true
    }

    /// The 1-based page to fetch next, or `None` once the sequence is exhausted.
    pub fn next_page_param(&self) -> Option<u32> {
        let last = match self.pages.last() {
            Some(last) => last,
            None => return Some(1),
        };

        match self.key.kind {
            EndpointKind::Search => match last.page.total_pages() {
                Some(total_pages) if last.param < total_pages => Some(last.param + 1),
                _ => None,
            },
            EndpointKind::List
                if last.page.is_empty() || last.page.photos().len() < self.per_page =>
            {
                None
            },
            EndpointKind::List => Some(last.param + 1),
        }
    }

    pub fn has_more(&self) -> bool {
        self.next_page_param().is_some()
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Like `isFetchingNextPage`: a fetch is running and earlier pages exist.
    pub fn is_fetching_next_page(&self) -> bool {
        self.is_fetching() && !self.pages.is_empty()
    }

    /// Marks the next page as in flight and returns the request for it.
    ///
    /// Only one request per key is handed out at a time.
    pub fn begin_fetch(&mut self) -> Option<PageRequest> {
        if let Some(page) = self.in_flight {
            debug!(page, "Page fetch already in flight");
            return None;
        }

        let page = self.next_page_param()?;
        self.in_flight = Some(page);
        Some(PageRequest {
            key: self.key.clone(),
            page,
        })
    }

    /// Applies the result of `request`.
    ///
    /// Returns `false` if the request was superseded, either by a different
    /// key or by a reset of the same key, in which case nothing changes.
    pub fn complete(&mut self, request: &PageRequest, result: Result<Page, ApiError>) -> bool {
        if request.key != self.key || self.in_flight != Some(request.page) {
            debug!(
                term = ?request.key.term,
                page = request.page,
                "Dropping stale page result"
            );
            return false;
        }
        self.in_flight = None;

        match result {
            Ok(page) => {
                debug!(
                    page = request.page,
                    photos = page.photos().len(),
                    total_pages = ?page.total_pages(),
                    "Page loaded"
                );
                self.pages.push(FetchedPage {
                    param: request.page,
                    page,
                });
                self.status = QueryStatus::Success;
            },
            Err(err) => {
                warn!(page = request.page, error = %err, "Page fetch failed");
                self.status = QueryStatus::Error(err.to_string());
            },
        }
        true
    }

    /// Accumulated photos in arrival order, without repeated ids.
    pub fn photos(&self) -> Vec<&Photo> {
        let mut seen = HashSet::new();
        self.pages
            .iter()
            .flat_map(|fetched| fetched.page.photos())
            .filter(|photo| seen.insert(photo.id.as_str()))
            .collect()
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages.len()
    }

    /// Total number of search results, as reported by the latest search page.
    pub fn total(&self) -> Option<u64> {
        self.pages.last().and_then(|fetched| fetched.page.total())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::api::fake::{list_page, photo, search_page};

    fn fetch(query: &mut InfiniteQuery, page: Page) -> PageRequest {
        let request = query.begin_fetch().expect("expected a page to fetch");
        assert!(query.complete(&request, Ok(page)));
        request
    }

    #[test]
    fn starts_at_page_one() {
        let mut query = InfiniteQuery::new(None);
        assert_eq!(query.status(), &QueryStatus::Pending);
        assert!(query.has_more());

        let request = query.begin_fetch().unwrap();
        assert_eq!(request.page, 1);
        assert_eq!(request.key.kind, EndpointKind::List);
        assert!(query.is_fetching());
        assert!(!query.is_fetching_next_page());
    }

    #[test]
    fn one_fetch_in_flight_per_key() {
        let mut query = InfiniteQuery::new(Some("cats"));
        let first = query.begin_fetch().unwrap();
        assert_eq!(query.begin_fetch(), None);

        assert!(query.complete(&first, Ok(search_page("cats", 1, 3, 2))));
        assert_eq!(query.begin_fetch().map(|r| r.page), Some(2));
        assert!(query.is_fetching_next_page());
    }

    #[test]
    fn consecutive_pages_have_no_duplicate_ids() {
        let mut query = InfiniteQuery::new(Some("cats"));
        for page in 1..=3 {
            fetch(&mut query, search_page("cats", page, 5, 4));
        }

        let photos = query.photos();
        let ids: HashSet<_> = photos.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(photos.len(), 12);
        assert_eq!(ids.len(), 12);
    }

    #[test]
    fn repeated_ids_across_pages_are_skipped() {
        let mut query = InfiniteQuery::new(None).with_page_size(2);
        fetch(&mut query, Page::List(vec![photo("a"), photo("b")]));
        fetch(&mut query, Page::List(vec![photo("b"), photo("c")]));

        let ids: Vec<_> = query.photos().iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn changing_term_resets_to_page_one() {
        let mut query = InfiniteQuery::new(Some("cats"));
        fetch(&mut query, search_page("cats", 1, 5, 3));
        fetch(&mut query, search_page("cats", 2, 5, 3));
        assert_eq!(query.next_page_param(), Some(3));

        assert!(query.set_search_term(Some("dogs")));
        assert_eq!(query.status(), &QueryStatus::Pending);
        assert!(query.photos().is_empty());
        assert_eq!(query.next_page_param(), Some(1));
        assert_eq!(query.key(), &QueryKey::new(Some("dogs")));
    }

    #[test]
    fn same_term_keeps_pages() {
        let mut query = InfiniteQuery::new(Some("cats"));
        fetch(&mut query, search_page("cats", 1, 5, 3));

        assert!(!query.set_search_term(Some(" cats ")));
        assert_eq!(query.pages_fetched(), 1);
    }

    #[test]
    fn clearing_term_switches_to_list_mode() {
        let mut query = InfiniteQuery::new(Some("cats"));
        assert!(query.set_search_term(Some("")));
        assert_eq!(query.key().kind, EndpointKind::List);
        assert_eq!(query.key().term, None);
    }

    #[test]
    fn search_stops_at_total_pages() {
        let mut query = InfiniteQuery::new(Some("cats"));
        fetch(&mut query, search_page("cats", 1, 2, 3));
        assert!(query.has_more());

        fetch(&mut query, search_page("cats", 2, 2, 3));
        assert!(!query.has_more());
        assert_eq!(query.begin_fetch(), None);
        assert_eq!(query.total(), Some(6));
    }

    #[test]
    fn search_without_results_has_no_more() {
        let mut query = InfiniteQuery::new(Some("zzzz"));
        fetch(&mut query, search_page("zzzz", 1, 0, 0));
        assert!(!query.has_more());
        assert_eq!(query.status(), &QueryStatus::Success);
    }

    #[test]
    fn list_stops_at_empty_page() {
        let mut query = InfiniteQuery::new(None);
        fetch(&mut query, list_page("l", 1, 20));
        fetch(&mut query, list_page("l", 2, 20));
        assert_eq!(query.next_page_param(), Some(3));

        fetch(&mut query, list_page("l", 3, 0));
        assert!(!query.has_more());
        assert_eq!(query.photos().len(), 40);
    }

    #[test]
    fn list_stops_at_short_page() {
        let mut query = InfiniteQuery::new(None);
        fetch(&mut query, list_page("l", 1, 20));
        fetch(&mut query, list_page("l", 2, 5));

        assert!(!query.has_more());
        assert_eq!(query.next_page_param(), None);
        assert_eq!(query.begin_fetch(), None);
        assert_eq!(query.photos().len(), 25);
    }

    #[test]
    fn short_page_follows_configured_page_size() {
        let mut query = InfiniteQuery::new(None).with_page_size(5);
        fetch(&mut query, list_page("l", 1, 5));
        assert_eq!(query.next_page_param(), Some(2));

        fetch(&mut query, list_page("l", 2, 4));
        assert!(!query.has_more());
    }

    #[test]
    fn stale_key_result_is_dropped() {
        let mut query = InfiniteQuery::new(Some("cat"));
        let stale = query.begin_fetch().unwrap();

        query.set_search_term(Some("cats"));
        let current = query.begin_fetch().unwrap();

        assert!(!query.complete(&stale, Ok(search_page("cat", 1, 9, 5))));
        assert!(query.photos().is_empty());
        assert!(query.is_fetching());

        assert!(query.complete(&current, Ok(search_page("cats", 1, 9, 5))));
        assert_eq!(query.photos().len(), 5);
        assert!(query.photos().iter().all(|p| p.id.starts_with("cats-")));
    }

    #[test]
    fn result_for_reset_key_is_dropped() {
        let mut query = InfiniteQuery::new(Some("cats"));
        let first = query.begin_fetch().unwrap();
        query.set_search_term(None);
        query.set_search_term(Some("cats"));

        assert!(!query.complete(&first, Ok(search_page("cats", 1, 9, 5))));
        assert_eq!(query.status(), &QueryStatus::Pending);
    }

    #[test]
    fn error_keeps_pages_and_allows_retry() {
        let mut query = InfiniteQuery::new(None);
        fetch(&mut query, list_page("l", 1, 20));

        let request = query.begin_fetch().unwrap();
        let error = ApiError::Status {
            status: 403,
            message: "Rate Limit Exceeded".to_string(),
        };
        assert!(query.complete(&request, Err(error.clone())));

        assert_eq!(query.status(), &QueryStatus::Error(error.to_string()));
        assert_eq!(query.photos().len(), 20);
        assert_eq!(query.begin_fetch().map(|r| r.page), Some(2));
    }
}
