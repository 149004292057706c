//! Read endpoints consumed by the front-end: paginated artist/song listings
//! and the single-artist detail with its song sub-lists.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::database::{ArtistSongKind, ArtistSort, SongSort, SortOrder};
use crate::http_server::error::Report;
use crate::http_server::state::AppState;

const DEFAULT_PAGE: u64 = 1;
const DEFAULT_LIMIT: u64 = 20;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/artists", get(list_artists))
        .route("/songs", get(list_songs))
        .route("/artists/{id}", get(get_artist))
        .route("/artists/{id}/songs", get(artist_songs))
}

#[derive(Debug, Deserialize)]
struct ArtistListQuery {
    page: Option<u64>,
    limit: Option<u64>,
    #[serde(default, rename = "sortBy")]
    sort_by: ArtistSort,
    #[serde(default)]
    order: SortOrder,
}

async fn list_artists(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ArtistListQuery>,
) -> Result<Response, Report> {
    let result = state
        .db
        .list_artists(
            query.page.unwrap_or(DEFAULT_PAGE),
            query.limit.unwrap_or(DEFAULT_LIMIT),
            query.sort_by,
            query.order,
        )
        .await?;

    Ok(Json(result).into_response())
}

#[derive(Debug, Deserialize)]
struct SongListQuery {
    page: Option<u64>,
    limit: Option<u64>,
    #[serde(default, rename = "sortBy")]
    sort_by: SongSort,
    #[serde(default)]
    order: SortOrder,
}

async fn list_songs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SongListQuery>,
) -> Result<Response, Report> {
    let result = state
        .db
        .list_songs(
            query.page.unwrap_or(DEFAULT_PAGE),
            query.limit.unwrap_or(DEFAULT_LIMIT),
            query.sort_by,
            query.order,
        )
        .await?;

    Ok(Json(result).into_response())
}

async fn get_artist(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, Report> {
    match state.db.get_artist(&id).await? {
        Some(artist) => Ok(Json(artist).into_response()),
        None => Ok((StatusCode::NOT_FOUND, "Artist not found").into_response()),
    }
}

#[derive(Debug, Deserialize)]
struct ArtistSongsQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
    page: Option<u64>,
    limit: Option<u64>,
}

async fn artist_songs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ArtistSongsQuery>,
) -> Result<Response, Report> {
    let kind = match query.kind.as_deref().unwrap_or("popular") {
        "popular" => ArtistSongKind::Popular,
        "recent" => ArtistSongKind::Recent,
        _ => {
            return Ok((
                StatusCode::BAD_REQUEST,
                "Invalid type parameter. Must be 'popular' or 'recent'",
            )
                .into_response());
        }
    };

    if state.db.get_artist(&id).await?.is_none() {
        return Ok((StatusCode::NOT_FOUND, "Artist not found").into_response());
    }

    let result = state
        .db
        .artist_songs(
            &id,
            kind,
            query.page.unwrap_or(DEFAULT_PAGE),
            query.limit.unwrap_or(DEFAULT_LIMIT),
        )
        .await?;

    Ok(Json(result).into_response())
}
