use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

use unsplash_gallery_api_structs::Photo;

use crate::query::{InfiniteQuery, QueryStatus};
use crate::selection::DetailState;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CardView {
    /// 1-based position, as accepted by `:open`.
    pub index: usize,
    pub id: String,
    pub alt: String,
    pub author: String,
    pub image_url: String,
}

impl CardView {
    fn new(index: usize, photo: &Photo) -> Self {
        CardView {
            index,
            id: photo.id.clone(),
            alt: alt_text(photo),
            author: photo.user.name.clone(),
            image_url: photo.urls.small.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GalleryView {
    pub term: Option<String>,
    pub total: Option<u64>,
    pub status: QueryStatus,
    pub cards: Vec<CardView>,
    pub has_more: bool,
    pub fetching_next_page: bool,
}

impl From<&InfiniteQuery> for GalleryView {
    fn from(query: &InfiniteQuery) -> Self {
        GalleryView {
            term: query.key().term.clone(),
            total: query.total(),
            status: query.status().clone(),
            cards: query
                .photos()
                .into_iter()
                .enumerate()
                .map(|(i, photo)| CardView::new(i + 1, photo))
                .collect(),
            has_more: query.has_more(),
            fetching_next_page: query.is_fetching_next_page(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PhotoDetailView {
    pub id: String,
    pub alt: String,
    pub image_url: String,
    pub width: u32,
    pub height: u32,
    pub author: String,
    pub username: String,
    pub avatar_url: String,
    pub profile_url: Option<String>,
    pub created: String,
    pub description: Option<String>,
    pub downloads: Option<u64>,
    pub location: Option<String>,
    pub html_url: String,
}

impl From<&Photo> for PhotoDetailView {
    fn from(photo: &Photo) -> Self {
        PhotoDetailView {
            id: photo.id.clone(),
            alt: alt_text(photo),
            image_url: photo.urls.regular.clone(),
            width: photo.width,
            height: photo.height,
            author: photo.user.name.clone(),
            username: photo.user.username.clone(),
            avatar_url: photo.user.profile_image.medium.clone(),
            profile_url: photo.user.links.as_ref().map(|l| l.html.clone()),
            created: created_date(&photo.created_at),
            description: photo.description.clone().filter(|d| !d.is_empty()),
            downloads: photo.downloads,
            location: photo.location_name().map(str::to_string),
            html_url: photo.links.html.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PhotoView {
    Idle,
    Loading,
    Loaded { photo: PhotoDetailView },
    Error { message: String },
}

impl From<DetailState<'_>> for PhotoView {
    fn from(state: DetailState<'_>) -> Self {
        match state {
            DetailState::Idle => PhotoView::Idle,
            DetailState::Loading => PhotoView::Loading,
            DetailState::Loaded(photo) => PhotoView::Loaded {
                photo: photo.into(),
            },
            DetailState::Error(message) => PhotoView::Error {
                message: message.to_string(),
            },
        }
    }
}

fn alt_text(photo: &Photo) -> String {
    photo
        .alt_description
        .as_deref()
        .filter(|alt| !alt.is_empty())
        .unwrap_or("Photo")
        .to_string()
}

/// Shortens an RFC 3339 timestamp to its date, keeping unparsable input as is.
fn created_date(created_at: &str) -> String {
    OffsetDateTime::parse(created_at, &Rfc3339)
        .ok()
        .and_then(|date| date.format(format_description!("[year]-[month]-[day]")).ok())
        .unwrap_or_else(|| created_at.to_string())
}
