#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ProfileImage {
    pub medium: String,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Links {
    pub html: String,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct User {
    pub name: String,
    pub username: String,
    pub profile_image: ProfileImage,
    #[serde(default)]
    pub links: Option<Links>,
}

/// Image URL variants, ordered from largest to smallest.
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Urls {
    pub raw: String,
    pub full: String,
    pub regular: String,
    pub small: String,
    pub thumb: String,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Location {
    #[serde(default)]
    pub name: Option<String>,
}

pub type PhotoId = String;

/// A photo as returned by the list, search and single-photo endpoints.
///
/// `downloads` and `location` are only present on the single-photo endpoint.
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Photo {
    pub id: PhotoId,
    pub created_at: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub alt_description: Option<String>,
    pub urls: Urls,
    pub links: Links,
    pub user: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Photo {
    pub fn location_name(&self) -> Option<&str> {
        self.location.as_ref().and_then(|l| l.name.as_deref())
    }
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SearchResponse {
    pub total: u64,
    pub total_pages: u32,
    pub results: Vec<Photo>,
}

/// Body of a non-2xx response.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub errors: Vec<String>,
}
