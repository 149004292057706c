//! Admin endpoints: trigger artist syncs, poll workflow status, maintenance.

use std::sync::{Arc, LazyLock};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::http_server::error::Report;
use crate::http_server::state::AppState;
use crate::services::sync::{self, SyncArtistResult};

static ARTIST_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"spotify\.com/artist/([a-zA-Z0-9]+)(?:\?|$)").expect("artist URL pattern is valid")
});
static ARTIST_URI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^spotify:artist:([a-zA-Z0-9]+)$").expect("artist URI pattern is valid")
});
static ARTIST_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]{15,}$").expect("artist ID pattern is valid"));

/// Extract the artist ID from any of the accepted forms:
/// a share URL (with or without a query suffix), a `spotify:artist:` URI, or
/// a bare alphanumeric ID of at least 15 characters.
pub fn extract_artist_id(input: &str) -> Option<String> {
    let input = input.trim();

    if let Some(captures) = ARTIST_URL_RE.captures(input) {
        return Some(captures[1].to_string());
    }
    if let Some(captures) = ARTIST_URI_RE.captures(input) {
        return Some(captures[1].to_string());
    }
    if ARTIST_ID_RE.is_match(input) {
        return Some(input.to_string());
    }

    None
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sync-artist", post(sync_artist))
        .route("/workflows/{id}/status", get(workflow_status))
        .route("/artists/recent", get(recent_artists))
        .route("/songs/recent", get(recent_songs))
        .route("/artists/{id}", delete(delete_artist))
        .route("/songs/{id}", delete(delete_song))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncArtistRequest {
    artist_url: Option<String>,
}

async fn sync_artist(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SyncArtistRequest>,
) -> Result<Response, Report> {
    let Some(artist_url) = body.artist_url else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": "Missing artistUrl in request body",
            })),
        )
            .into_response());
    };

    let Some(artist_id) = extract_artist_id(&artist_url) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": "Invalid Spotify artist URL or ID",
            })),
        )
            .into_response());
    };

    let run = sync::start_sync_run(state.db.clone(), state.catalog.clone(), &artist_id).await?;

    Ok(Json(json!({
        "success": true,
        "workflowId": run.id,
        "artistId": artist_id,
    }))
    .into_response())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WorkflowStatusResponse {
    workflow_id: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<SyncArtistResult>,
}

async fn workflow_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, Report> {
    match sync::run_summary(&state.db, &id).await? {
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({
                "success": false,
                "error": "Workflow not found",
            })),
        )
            .into_response()),
        Some(summary) => Ok(Json(WorkflowStatusResponse {
            workflow_id: id,
            status: summary.status,
            output: summary.output,
        })
        .into_response()),
    }
}

async fn delete_artist(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, Report> {
    state.db.delete_artist(&id).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Artist {id} deleted successfully"),
    })))
}

async fn delete_song(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, Report> {
    state.db.delete_song(&id).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Song {id} deleted successfully"),
    })))
}

#[derive(Debug, Deserialize)]
struct RecentQuery {
    limit: Option<u64>,
}

async fn recent_artists(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<serde_json::Value>, Report> {
    let artists = state.db.recent_artists(query.limit.unwrap_or(10)).await?;

    Ok(Json(json!({ "success": true, "artists": artists })))
}

async fn recent_songs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<serde_json::Value>, Report> {
    let songs = state.db.recent_songs(query.limit.unwrap_or(10)).await?;

    Ok(Json(json!({ "success": true, "songs": songs })))
}
