use std::collections::HashMap;

use color_eyre::eyre::Result;

use crate::spotify::types::{AlbumFull, AlbumSummary, ArtistFull};

/// Port trait wrapping the catalog API capabilities the sync workflow uses.
///
/// The production implementation lives in `spotify` (auth client plus fetch
/// client); tests use the generated mock. The token acquired through
/// `access_token` is passed back into the fetch operations so that the
/// workflow can checkpoint it as a step result of its own.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogApi: Send + Sync {
    async fn access_token(&self) -> Result<String>;

    async fn artist_albums(&self, token: &str, artist_id: &str) -> Result<Vec<AlbumSummary>>;

    async fn albums_details(&self, token: &str, album_ids: &[String]) -> Result<Vec<AlbumFull>>;

    async fn tracks_popularity(
        &self,
        token: &str,
        track_ids: &[String],
    ) -> Result<HashMap<String, i32>>;

    async fn artists_metadata(&self, token: &str, artist_ids: &[String])
    -> Result<Vec<ArtistFull>>;
}
