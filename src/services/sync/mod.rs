//! Artist sync workflow: run lifecycle, durable step checkpoints, and the
//! fetch-transform-persist step sequence.

pub mod checkpoint;
pub mod workflow;

use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr};
use sea_orm::{ActiveModelBehavior, ActiveValue::Set, EntityTrait};
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::entities;
use crate::ports::catalog::CatalogApi;

/// Lifecycle of one sync run. The fetch/transform/persist phases are
/// entered in order; `Complete` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Pending,
    FetchingAlbums,
    FetchingDetails,
    Transforming,
    FetchingMetadata,
    Persisting,
    Complete,
    Error,
}

impl RunPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            RunPhase::Pending => "pending",
            RunPhase::FetchingAlbums => "fetching_albums",
            RunPhase::FetchingDetails => "fetching_details",
            RunPhase::Transforming => "transforming",
            RunPhase::FetchingMetadata => "fetching_metadata",
            RunPhase::Persisting => "persisting",
            RunPhase::Complete => "complete",
            RunPhase::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(RunPhase::Pending),
            "fetching_albums" => Some(RunPhase::FetchingAlbums),
            "fetching_details" => Some(RunPhase::FetchingDetails),
            "transforming" => Some(RunPhase::Transforming),
            "fetching_metadata" => Some(RunPhase::FetchingMetadata),
            "persisting" => Some(RunPhase::Persisting),
            "complete" => Some(RunPhase::Complete),
            "error" => Some(RunPhase::Error),
            _ => None,
        }
    }

    /// Status vocabulary the workflow status endpoint exposes.
    pub fn api_status(self) -> &'static str {
        match self {
            RunPhase::Pending => "queued",
            RunPhase::Complete => "complete",
            RunPhase::Error => "error",
            _ => "running",
        }
    }
}

/// Final summary of one sync run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncArtistResult {
    pub success: bool,
    pub artist_id: String,
    pub artist_name: String,
    pub songs_added: usize,
    pub albums_processed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Insert a fresh `pending` run row for the artist.
pub async fn create_run(db: &Database, artist_id: &str) -> Result<entities::sync_run::Model> {
    let model = entities::sync_run::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        artist_id: Set(artist_id.to_string()),
        ..entities::sync_run::ActiveModel::new()
    };

    entities::sync_run::Entity::insert(model)
        .exec_with_returning(&db.conn)
        .await
        .wrap_err("Failed to create sync run")
}

/// Create a run and execute its workflow on a background task, returning the
/// run row immediately so the caller gets the run ID.
pub async fn start_sync_run(
    db: Arc<Database>,
    api: Arc<dyn CatalogApi>,
    artist_id: &str,
) -> Result<entities::sync_run::Model> {
    let run = create_run(&db, artist_id).await?;

    let spawned = run.clone();
    tokio::spawn(async move {
        tracing::info!(
            run_id = %spawned.id,
            artist_id = %spawned.artist_id,
            "starting artist sync run"
        );

        let result = workflow::execute(&db, api.as_ref(), &spawned).await;
        if result.success {
            tracing::info!(
                run_id = %spawned.id,
                songs = result.songs_added,
                albums = result.albums_processed,
                "artist sync run finished"
            );
        } else {
            tracing::error!(
                run_id = %spawned.id,
                error = ?result.error,
                "artist sync run failed"
            );
        }
    });

    Ok(run)
}

/// State of a run as reported by the status endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub status: &'static str,
    pub output: Option<SyncArtistResult>,
}

/// Look up a run and map its stored phase onto the endpoint's status
/// vocabulary. The structured output is only exposed once the run completed.
pub async fn run_summary(db: &Database, run_id: &str) -> Result<Option<RunSummary>> {
    let Some(run) = entities::sync_run::Entity::find_by_id(run_id.to_string())
        .one(&db.conn)
        .await
        .wrap_err("Failed to fetch sync run")?
    else {
        return Ok(None);
    };

    let phase = RunPhase::parse(&run.status);
    let status = phase.map(RunPhase::api_status).unwrap_or("unknown");

    let output = if phase == Some(RunPhase::Complete) {
        run.result
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .wrap_err("Failed to parse stored sync run result")?
    } else {
        None
    };

    Ok(Some(RunSummary { status, output }))
}
