pub mod auth;
pub mod client;
pub mod transform;
pub mod types;

use std::collections::HashMap;

use color_eyre::eyre::Result;

use crate::ports::catalog::CatalogApi;
use crate::spotify::auth::AuthClient;
use crate::spotify::client::CatalogClient;
use crate::spotify::types::{AlbumFull, AlbumSummary, ArtistFull};

/// Production catalog adapter: client-credentials auth plus the retrying
/// fetch client, behind the [`CatalogApi`] port.
pub struct SpotifyCatalog {
    auth: AuthClient,
    client: CatalogClient,
}

impl SpotifyCatalog {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            auth: AuthClient::new(client_id, client_secret),
            client: CatalogClient::new(),
        }
    }
}

#[async_trait::async_trait]
impl CatalogApi for SpotifyCatalog {
    async fn access_token(&self) -> Result<String> {
        Ok(self.auth.access_token().await?)
    }

    async fn artist_albums(&self, token: &str, artist_id: &str) -> Result<Vec<AlbumSummary>> {
        Ok(self.client.artist_albums(token, artist_id).await?)
    }

    async fn albums_details(&self, token: &str, album_ids: &[String]) -> Result<Vec<AlbumFull>> {
        Ok(self.client.albums_details(token, album_ids).await?)
    }

    async fn tracks_popularity(
        &self,
        token: &str,
        track_ids: &[String],
    ) -> Result<HashMap<String, i32>> {
        Ok(self.client.tracks_popularity(token, track_ids).await?)
    }

    async fn artists_metadata(
        &self,
        token: &str,
        artist_ids: &[String],
    ) -> Result<Vec<ArtistFull>> {
        Ok(self.client.artists_metadata(token, artist_ids).await?)
    }
}
