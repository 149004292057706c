use std::collections::HashMap;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{self, HeaderValue};
use serde::de::DeserializeOwned;
use tokio::time::sleep;

use crate::spotify::types::{
    AlbumFull, AlbumSummary, AlbumsBatch, ArtistAlbumsPage, ArtistFull, ArtistsBatch, TracksBatch,
};

const API_BASE: &str = "https://api.spotify.com/v1";
const MARKET: &str = "IN";

/// Fixed delay between pages and between batches.
const RATE_LIMIT_DELAY: Duration = Duration::from_millis(2500);
/// Additional attempts after the first failed request.
const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(5);
/// Wait applied to a 429 response carrying no Retry-After header.
const RETRY_AFTER_DEFAULT: Duration = Duration::from_secs(60);

const ALBUMS_PAGE_SIZE: usize = 50;
const ALBUMS_BATCH_SIZE: usize = 20;
const TRACKS_BATCH_SIZE: usize = 50;
const ARTISTS_BATCH_SIZE: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("failed to send http request: {0}")]
    FailedToSendRequest(#[source] reqwest::Error),
    #[error("failed to parse response: {0}")]
    FailedToParseResponse(#[source] reqwest::Error),
    #[error("request failed after {attempts} retries: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<FetchError>,
    },
}

/// Read-side catalog client.
///
/// Every request goes through one retry primitive: 429 responses sleep for
/// the server-directed interval and retry without consuming the attempt
/// budget; any other failure retries up to [`RETRY_ATTEMPTS`] times with a
/// linearly growing delay before giving up.
pub struct CatalogClient {
    http: reqwest::Client,
}

impl CatalogClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Page through every album the artist appears on, all album groups.
    pub async fn artist_albums(
        &self,
        token: &str,
        artist_id: &str,
    ) -> Result<Vec<AlbumSummary>, FetchError> {
        let mut albums = Vec::new();
        let mut offset = 0usize;

        loop {
            let url = format!(
                "{API_BASE}/artists/{artist_id}/albums?market={MARKET}&limit={ALBUMS_PAGE_SIZE}&offset={offset}&include_groups=album,single,compilation,appears_on"
            );
            let page: ArtistAlbumsPage = self.get_json(token, &url).await?;

            let done = last_page(&page);
            let fetched = page.items.len();
            albums.extend(page.items);

            if done {
                break;
            }

            offset += fetched;
            sleep(RATE_LIMIT_DELAY).await;
        }

        Ok(albums)
    }

    /// Full album details, including track listings, in batches of 20.
    /// IDs the API cannot resolve come back as nulls and are dropped.
    pub async fn albums_details(
        &self,
        token: &str,
        album_ids: &[String],
    ) -> Result<Vec<AlbumFull>, FetchError> {
        let mut details = Vec::new();

        for (batch_index, batch) in album_ids.chunks(ALBUMS_BATCH_SIZE).enumerate() {
            if batch_index > 0 {
                sleep(RATE_LIMIT_DELAY).await;
            }

            let url = format!(
                "{API_BASE}/albums?market={MARKET}&ids={}",
                batch.join(",")
            );
            let data: AlbumsBatch = self.get_json(token, &url).await?;
            details.extend(data.albums.into_iter().flatten());
        }

        Ok(details)
    }

    /// Popularity score per track ID, in batches of 50. Every requested ID
    /// gets an entry; tracks the API omits or reports without a score map
    /// to 0.
    pub async fn tracks_popularity(
        &self,
        token: &str,
        track_ids: &[String],
    ) -> Result<HashMap<String, i32>, FetchError> {
        let mut popularity = HashMap::new();

        for (batch_index, batch) in track_ids.chunks(TRACKS_BATCH_SIZE).enumerate() {
            if batch_index > 0 {
                sleep(RATE_LIMIT_DELAY).await;
            }

            let url = format!(
                "{API_BASE}/tracks?market={MARKET}&ids={}",
                batch.join(",")
            );
            let data: TracksBatch = self.get_json(token, &url).await?;

            for track in data.tracks.into_iter().flatten() {
                popularity.insert(track.id, track.popularity.unwrap_or(0));
            }
            for id in batch {
                popularity.entry(id.clone()).or_insert(0);
            }
        }

        Ok(popularity)
    }

    /// Full artist metadata in batches of 50, nulls dropped.
    pub async fn artists_metadata(
        &self,
        token: &str,
        artist_ids: &[String],
    ) -> Result<Vec<ArtistFull>, FetchError> {
        let mut artists = Vec::new();

        for (batch_index, batch) in artist_ids.chunks(ARTISTS_BATCH_SIZE).enumerate() {
            if batch_index > 0 {
                sleep(RATE_LIMIT_DELAY).await;
            }

            let url = format!("{API_BASE}/artists?ids={}", batch.join(","));
            let data: ArtistsBatch = self.get_json(token, &url).await?;
            artists.extend(data.artists.into_iter().flatten());
        }

        Ok(artists)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        token: &str,
        url: &str,
    ) -> Result<T, FetchError> {
        let mut attempt = 0u32;

        loop {
            let failure = match self.http.get(url).bearer_auth(token).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        // Server-directed wait; does not consume the budget.
                        let wait = retry_after(response.headers().get(header::RETRY_AFTER));
                        tracing::warn!(url, wait_secs = wait.as_secs(), "rate limited, waiting");
                        sleep(wait).await;
                        continue;
                    }
                    if !status.is_success() {
                        let body = response
                            .text()
                            .await
                            .unwrap_or("Failed to get error text".to_string());
                        FetchError::Status { status, body }
                    } else {
                        match response.json::<T>().await {
                            Ok(value) => return Ok(value),
                            Err(error) => FetchError::FailedToParseResponse(error),
                        }
                    }
                }
                Err(error) => FetchError::FailedToSendRequest(error),
            };

            attempt += 1;
            if attempt > RETRY_ATTEMPTS {
                return Err(FetchError::RetriesExhausted {
                    attempts: RETRY_ATTEMPTS,
                    source: Box::new(failure),
                });
            }

            let delay = retry_delay(attempt);
            tracing::warn!(
                url,
                attempt,
                delay_secs = delay.as_secs(),
                error = %failure,
                "request failed, retrying"
            );
            sleep(delay).await;
        }
    }
}

impl Default for CatalogClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Pagination stops on a missing next link or a short page.
fn last_page(page: &ArtistAlbumsPage) -> bool {
    page.next.is_none() || page.items.len() < ALBUMS_PAGE_SIZE
}

/// Linear back-off: 5s after the first failure, 10s after the second, 15s
/// after the third.
fn retry_delay(attempt: u32) -> Duration {
    RETRY_BASE_DELAY * attempt
}

fn retry_after(value: Option<&HeaderValue>) -> Duration {
    value
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(RETRY_AFTER_DEFAULT)
}
