use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};
use url::Url;

use unsplash_gallery_api_structs::{ErrorResponse, Photo, SearchResponse};

use super::{normalize_term, ApiError, Page, PhotoSource};

pub const DEFAULT_BASE_URL: &str = "https://api.unsplash.com";

const PHOTO_ID: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

#[derive(Serialize)]
struct ListParams {
    page: u32,
    per_page: u8,
}

#[derive(Serialize)]
struct SearchParams<'a> {
    query: &'a str,
    page: u32,
    per_page: u8,
}

/// Unsplash REST client authenticating with a static `Client-ID` access key.
#[derive(Clone)]
pub struct UnsplashClient {
    http: surf::Client,
    base_url: Url,
    access_key: Option<String>,
    per_page: u8,
    timeout: Duration,
}

impl UnsplashClient {
    pub fn new(
        mut base_url: Url,
        access_key: Option<String>,
        per_page: u8,
        timeout: Duration,
    ) -> Self {
        // Url::join replaces the last path segment unless it ends in a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        UnsplashClient {
            http: surf::Client::new(),
            base_url,
            access_key: access_key.filter(|key| !key.is_empty()),
            per_page,
            timeout,
        }
    }

    pub fn page_url(&self, page: u32, query: Option<&str>) -> Result<Url, ApiError> {
        let (path, query_string) = match normalize_term(query) {
            Some(term) => (
                "search/photos",
                serde_qs::to_string(&SearchParams {
                    query: term,
                    page,
                    per_page: self.per_page,
                }),
            ),
            None => (
                "photos",
                serde_qs::to_string(&ListParams {
                    page,
                    per_page: self.per_page,
                }),
            ),
        };
        let query_string = query_string.map_err(|err| ApiError::Encode(err.to_string()))?;

        let mut url = self.base_url.join(path)?;
        url.set_query(Some(&query_string));
        Ok(url)
    }

    pub fn photo_url(&self, id: &str) -> Result<Url, ApiError> {
        let path = format!("photos/{}", utf8_percent_encode(id, PHOTO_ID));
        Ok(self.base_url.join(&path)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let mut request = self.http.get(url.as_str()).header("Accept-Version", "v1");
        if let Some(access_key) = &self.access_key {
            request = request.header("Authorization", format!("Client-ID {}", access_key));
        }

        let mut res = async_std::future::timeout(self.timeout, request)
            .await
            .map_err(|_| {
                ApiError::Transport(format!("no response within {}s", self.timeout.as_secs()))
            })?
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        let status = res.status();
        let body = res
            .body_string()
            .await
            .map_err(|err| ApiError::Transport(err.to_string()))?;
        debug!(%status, bytes = body.len(), "Unsplash API response");

        if !status.is_success() {
            let message =
                error_message(&body).unwrap_or_else(|| status.canonical_reason().to_string());
            warn!(%status, %message, "Unsplash API returned an error");
            return Err(ApiError::Status {
                status: status.into(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))
    }
}

fn error_message(body: &str) -> Option<String> {
    let response: ErrorResponse = serde_json::from_str(body).ok()?;
    if response.errors.is_empty() {
        None
    } else {
        Some(response.errors.join(", "))
    }
}

#[async_trait::async_trait]
impl PhotoSource for UnsplashClient {
    #[instrument(skip(self))]
    async fn fetch_page(&self, page: u32, query: Option<&str>) -> Result<Page, ApiError> {
        let url = self.page_url(page, query)?;
        match normalize_term(query) {
            Some(_) => Ok(Page::Search(self.get_json::<SearchResponse>(url).await?)),
            None => Ok(Page::List(self.get_json::<Vec<Photo>>(url).await?)),
        }
    }

    #[instrument(skip(self))]
    async fn fetch_photo(&self, id: &str) -> Result<Photo, ApiError> {
        let url = self.photo_url(id)?;
        self.get_json(url).await
    }
}
