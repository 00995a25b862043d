use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub url: String,
}

/// One downloadable rendition of a pin's media.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct MediaLink {
    pub label: String,
    pub url: String,
    pub ext: String,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Image,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub title: String,
    pub thumbnail: String,
    pub media_type: MediaType,
    pub links: Vec<MediaLink>,
}
