//! Serde shapes for the slice of the Spotify Web API the sync pipeline uses.
//!
//! Batch endpoints return `null` entries for IDs the API could not resolve,
//! hence the `Vec<Option<..>>` item lists.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    pub height: Option<u32>,
    pub width: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalUrls {
    pub spotify: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Followers {
    pub total: Option<i32>,
}

/// Artist as embedded in tracks and albums: identity and link only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistSummary {
    pub id: String,
    pub name: String,
    pub external_urls: ExternalUrls,
}

/// Artist with the full metadata block from the batch artists endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistFull {
    pub id: String,
    pub name: String,
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub followers: Option<Followers>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub popularity: Option<i32>,
}

/// Album as returned by the artist-albums listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub album_type: Option<String>,
    #[serde(default)]
    pub total_tracks: Option<i32>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub release_date_precision: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistSummary>,
    pub duration_ms: i32,
    #[serde(default)]
    pub explicit: bool,
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub track_number: Option<i32>,
    #[serde(default)]
    pub disc_number: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumTracks {
    #[serde(default)]
    pub items: Vec<Option<TrackSummary>>,
}

/// Album with its track listing, from the batch albums endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumFull {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub release_date_precision: Option<String>,
    #[serde(default)]
    pub tracks: AlbumTracks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackFull {
    pub id: String,
    #[serde(default)]
    pub popularity: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistAlbumsPage {
    #[serde(default)]
    pub items: Vec<AlbumSummary>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumsBatch {
    pub albums: Vec<Option<AlbumFull>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TracksBatch {
    pub tracks: Vec<Option<TrackFull>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistsBatch {
    pub artists: Vec<Option<ArtistFull>>,
}
