use std::collections::{HashMap, HashSet};

use color_eyre::eyre::{Result, WrapErr};
use sea_orm::{ActiveValue::Set, EntityTrait};
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::entities;
use crate::ports::catalog::CatalogApi;
use crate::services::sync::checkpoint::checkpoint;
use crate::services::sync::{RunPhase, SyncArtistResult};
use crate::spotify::transform::{self, ArtistRecord, SongRecord};
use crate::spotify::types::{AlbumFull, AlbumSummary, ArtistFull};

/// Result of the persist step, recorded as its checkpoint value.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistSummary {
    artist_name: String,
    songs_count: usize,
    albums_count: usize,
}

/// Execute the sync workflow for one run and record its outcome.
///
/// Always returns a structured result: any error escaping the step sequence
/// is converted into a failure summary and the run is marked `error` rather
/// than propagating.
pub async fn execute(
    db: &Database,
    api: &dyn CatalogApi,
    run: &entities::sync_run::Model,
) -> SyncArtistResult {
    match run_steps(db, api, run).await {
        Ok(result) => {
            if let Err(error) = record_outcome(db, run, RunPhase::Complete, &result).await {
                tracing::error!(run_id = %run.id, ?error, "failed to record sync run completion");
            }
            result
        }
        Err(error) => {
            tracing::error!(run_id = %run.id, ?error, "sync run aborted");
            let result = SyncArtistResult {
                success: false,
                artist_id: run.artist_id.clone(),
                artist_name: "Unknown".to_string(),
                songs_added: 0,
                albums_processed: 0,
                error: Some(error.to_string()),
            };
            // The failure itself is already logged above.
            if let Err(update_error) = record_outcome(db, run, RunPhase::Error, &result).await {
                tracing::error!(run_id = %run.id, ?update_error, "failed to record sync run failure");
            }
            result
        }
    }
}

async fn run_steps(
    db: &Database,
    api: &dyn CatalogApi,
    run: &entities::sync_run::Model,
) -> Result<SyncArtistResult> {
    let artist_id = run.artist_id.clone();

    // Step 1: acquire a bearer token. Checkpointed like every other step, so
    // a resumed run reuses the token it already obtained.
    let token: String = checkpoint(db, &run.id, "get-access-token", || async {
        api.access_token().await
    })
    .await?;

    // Step 2: all albums the artist appears on.
    set_phase(db, run, RunPhase::FetchingAlbums).await?;
    let albums: Vec<AlbumSummary> = checkpoint(db, &run.id, "fetch-artist-albums", || async {
        api.artist_albums(&token, &artist_id).await
    })
    .await?;

    if albums.is_empty() {
        // Benign empty result, not an error.
        return Ok(SyncArtistResult {
            success: true,
            artist_id,
            artist_name: "Unknown".to_string(),
            songs_added: 0,
            albums_processed: 0,
            error: Some("No albums found for artist".to_string()),
        });
    }

    // Step 3: full details, including track listings.
    set_phase(db, run, RunPhase::FetchingDetails).await?;
    let details: Vec<AlbumFull> = checkpoint(db, &run.id, "fetch-album-details", || async {
        let album_ids: Vec<String> = albums.iter().map(|album| album.id.clone()).collect();
        api.albums_details(&token, &album_ids).await
    })
    .await?;

    // Steps 4-6: deduplicate, score, and transform.
    set_phase(db, run, RunPhase::Transforming).await?;
    let track_ids: Vec<String> = checkpoint(db, &run.id, "collect-track-ids", || async {
        Ok(collect_track_ids(&details))
    })
    .await?;

    let popularity: HashMap<String, i32> =
        checkpoint(db, &run.id, "fetch-track-popularity", || async {
            api.tracks_popularity(&token, &track_ids).await
        })
        .await?;

    let songs: Vec<SongRecord> = checkpoint(db, &run.id, "transform-songs", || async {
        Ok(transform::collect_songs(&details, &popularity))
    })
    .await?;

    // Step 7: full artist metadata, with the documented fallback. A failure
    // here is logged and recovered, never propagated.
    set_phase(db, run, RunPhase::FetchingMetadata).await?;
    let metadata: Option<Vec<ArtistFull>> =
        checkpoint(db, &run.id, "fetch-artist-metadata", || async {
            let artist_ids = transform::unique_artist_ids(&songs);
            match api.artists_metadata(&token, &artist_ids).await {
                Ok(artists) => Ok(Some(artists)),
                Err(error) => {
                    tracing::warn!(
                        run_id = %run.id,
                        ?error,
                        "artist metadata fetch failed, falling back to embedded song data"
                    );
                    Ok(None)
                }
            }
        })
        .await?;

    // Step 8: persist artists, songs, and junction rows.
    set_phase(db, run, RunPhase::Persisting).await?;
    let persisted: PersistSummary = checkpoint(db, &run.id, "persist", || async {
        let artists: Vec<ArtistRecord> = match metadata.as_deref() {
            Some(metadata) if !metadata.is_empty() => {
                metadata.iter().map(transform::artist_record).collect()
            }
            _ => transform::basic_artists_from_songs(&songs),
        };

        for artist in &artists {
            db.upsert_artist(artist).await?;
        }
        for song in &songs {
            db.upsert_song(song).await?;
        }
        for song in &songs {
            let artist_ids: Vec<String> =
                song.artists.iter().map(|artist| artist.id.clone()).collect();
            db.replace_song_artists(&song.id, &artist_ids).await?;
        }

        Ok(PersistSummary {
            artist_name: resolve_artist_name(&artist_id, metadata.as_deref(), &songs),
            songs_count: songs.len(),
            albums_count: details.len(),
        })
    })
    .await?;

    Ok(SyncArtistResult {
        success: true,
        artist_id,
        artist_name: persisted.artist_name,
        songs_added: persisted.songs_count,
        albums_processed: persisted.albums_count,
        error: None,
    })
}

/// Union of track IDs across the album listings, first appearance order.
fn collect_track_ids(albums: &[AlbumFull]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for album in albums {
        for track in album.tracks.items.iter().flatten() {
            if !track.id.is_empty() && seen.insert(track.id.clone()) {
                ids.push(track.id.clone());
            }
        }
    }

    ids
}

/// Display name for the requested artist: from fetched metadata when we have
/// it, otherwise from the first song's embedded credit list.
fn resolve_artist_name(
    artist_id: &str,
    metadata: Option<&[ArtistFull]>,
    songs: &[SongRecord],
) -> String {
    match metadata.filter(|metadata| !metadata.is_empty()) {
        Some(metadata) => {
            if let Some(artist) = metadata.iter().find(|artist| artist.id == artist_id) {
                return artist.name.clone();
            }
        }
        None => {
            if let Some(first) = songs.first()
                && let Some(artist) = first.artists.iter().find(|artist| artist.id == artist_id)
            {
                return artist.name.clone();
            }
        }
    }

    "Unknown".to_string()
}

async fn set_phase(
    db: &Database,
    run: &entities::sync_run::Model,
    phase: RunPhase,
) -> Result<()> {
    let mut model: entities::sync_run::ActiveModel = run.clone().into();
    model.status = Set(phase.as_str().to_string());
    entities::sync_run::Entity::update(model)
        .exec(&db.conn)
        .await
        .wrap_err("Failed to update sync run status")?;
    Ok(())
}

async fn record_outcome(
    db: &Database,
    run: &entities::sync_run::Model,
    phase: RunPhase,
    result: &SyncArtistResult,
) -> Result<()> {
    let mut model: entities::sync_run::ActiveModel = run.clone().into();
    model.status = Set(phase.as_str().to_string());
    model.result = Set(Some(
        serde_json::to_string(result).wrap_err("Failed to serialize sync run result")?,
    ));
    model.error = Set(result.error.clone().filter(|_| !result.success));
    entities::sync_run::Entity::update(model)
        .exec(&db.conn)
        .await
        .wrap_err("Failed to record sync run outcome")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::song::ArtistRef;
    use crate::ports::catalog::MockCatalogApi;
    use crate::services::sync::create_run;
    use crate::spotify::types::{
        AlbumTracks, ArtistSummary, ExternalUrls, Followers, Image, TrackSummary,
    };
    use crate::test_utils::test_db;
    use color_eyre::eyre::eyre;
    use sea_orm::ActiveModelBehavior;

    const MAIN_ARTIST: &str = "abc123def456ghi789";

    fn artist_summary(id: &str, name: &str) -> ArtistSummary {
        ArtistSummary {
            id: id.to_string(),
            name: name.to_string(),
            external_urls: ExternalUrls {
                spotify: format!("https://open.spotify.com/artist/{id}"),
            },
        }
    }

    fn track(id: &str, title: &str, artists: Vec<ArtistSummary>) -> TrackSummary {
        TrackSummary {
            id: id.to_string(),
            name: title.to_string(),
            artists,
            duration_ms: 200_000,
            explicit: false,
            external_urls: ExternalUrls {
                spotify: format!("https://open.spotify.com/track/{id}"),
            },
            track_number: Some(1),
            disc_number: Some(1),
        }
    }

    fn album_summary(id: &str) -> AlbumSummary {
        AlbumSummary {
            id: id.to_string(),
            name: format!("Album {id}"),
            album_type: Some("album".to_string()),
            total_tracks: Some(2),
            release_date: Some("2024-02-01".to_string()),
            release_date_precision: Some("day".to_string()),
        }
    }

    fn album_full(id: &str, tracks: Vec<TrackSummary>) -> AlbumFull {
        AlbumFull {
            id: id.to_string(),
            name: format!("Album {id}"),
            images: vec![Image {
                url: format!("https://i.scdn.co/image/{id}"),
                height: Some(640),
                width: Some(640),
            }],
            release_date: Some("2024-02-01".to_string()),
            release_date_precision: Some("day".to_string()),
            tracks: AlbumTracks {
                items: tracks.into_iter().map(Some).collect(),
            },
        }
    }

    fn artist_full(id: &str, name: &str) -> ArtistFull {
        ArtistFull {
            id: id.to_string(),
            name: name.to_string(),
            external_urls: ExternalUrls {
                spotify: format!("https://open.spotify.com/artist/{id}"),
            },
            followers: Some(Followers { total: Some(5000) }),
            genres: vec!["pop".to_string()],
            images: vec![Image {
                url: format!("https://i.scdn.co/image/{id}"),
                height: Some(640),
                width: Some(640),
            }],
            popularity: Some(70),
        }
    }

    /// Two albums sharing one track, plus a featured second artist.
    fn fixture_details() -> Vec<AlbumFull> {
        let main = artist_summary(MAIN_ARTIST, "Main Artist");
        let featured = artist_summary("feat456feat456feat", "Featured Artist");
        vec![
            album_full(
                "al1",
                vec![
                    track("t1", "Song One", vec![main.clone()]),
                    track("t2", "Song Two", vec![main.clone(), featured.clone()]),
                ],
            ),
            // Compilation repeating t1; dedup must drop it.
            album_full("al2", vec![track("t1", "Song One", vec![main])]),
        ]
    }

    fn mock_happy_path(details: Vec<AlbumFull>, metadata: Vec<ArtistFull>) -> MockCatalogApi {
        let mut api = MockCatalogApi::new();
        api.expect_access_token()
            .returning(|| Ok("token".to_string()));
        api.expect_artist_albums()
            .returning(|_, _| Ok(vec![album_summary("al1"), album_summary("al2")]));
        api.expect_albums_details()
            .returning(move |_, _| Ok(details.clone()));
        api.expect_tracks_popularity().returning(|_, ids| {
            let mut scores = HashMap::new();
            for id in ids {
                scores.insert(id.clone(), 55);
            }
            Ok(scores)
        });
        api.expect_artists_metadata()
            .returning(move |_, _| Ok(metadata.clone()));
        api
    }

    #[tokio::test]
    async fn test_zero_albums_short_circuits_with_benign_result() {
        let db = test_db().await;
        let mut api = MockCatalogApi::new();
        api.expect_access_token()
            .returning(|| Ok("token".to_string()));
        api.expect_artist_albums().returning(|_, _| Ok(vec![]));

        let run = create_run(&db, MAIN_ARTIST).await.unwrap();
        let result = execute(&db, &api, &run).await;

        assert!(result.success);
        assert_eq!(result.songs_added, 0);
        assert_eq!(result.albums_processed, 0);
        assert_eq!(result.error.as_deref(), Some("No albums found for artist"));

        let stored = entities::sync_run::Entity::find_by_id(run.id.clone())
            .one(&db.conn)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, "complete");
        assert!(stored.error.is_none());
    }

    #[tokio::test]
    async fn test_full_sync_persists_artists_songs_and_junctions() {
        let db = test_db().await;
        let api = mock_happy_path(
            fixture_details(),
            vec![
                artist_full(MAIN_ARTIST, "Main Artist"),
                artist_full("feat456feat456feat", "Featured Artist"),
            ],
        );

        let run = create_run(&db, MAIN_ARTIST).await.unwrap();
        let result = execute(&db, &api, &run).await;

        assert!(result.success);
        assert_eq!(result.artist_name, "Main Artist");
        assert_eq!(result.songs_added, 2);
        assert_eq!(result.albums_processed, 2);
        assert!(result.error.is_none());

        let artists = entities::artist::Entity::find().all(&db.conn).await.unwrap();
        assert_eq!(artists.len(), 2);

        let songs = entities::song::Entity::find().all(&db.conn).await.unwrap();
        assert_eq!(songs.len(), 2);
        // Dedup kept the first occurrence of t1, from album al1.
        let t1 = songs.iter().find(|song| song.id == "t1").unwrap();
        assert_eq!(t1.album_id.as_deref(), Some("al1"));
        assert_eq!(t1.popularity, 55);

        let junctions = entities::song_artist::Entity::find()
            .all(&db.conn)
            .await
            .unwrap();
        assert_eq!(junctions.len(), 3);

        let stored = entities::sync_run::Entity::find_by_id(run.id.clone())
            .one(&db.conn)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, "complete");
        let output: SyncArtistResult = serde_json::from_str(stored.result.as_deref().unwrap()).unwrap();
        assert_eq!(output, result);
    }

    #[tokio::test]
    async fn test_popularity_step_receives_deduplicated_track_ids() {
        let db = test_db().await;
        let mut api = MockCatalogApi::new();
        api.expect_access_token()
            .returning(|| Ok("token".to_string()));
        api.expect_artist_albums()
            .returning(|_, _| Ok(vec![album_summary("al1"), album_summary("al2")]));
        api.expect_albums_details()
            .returning(|_, _| Ok(fixture_details()));
        api.expect_tracks_popularity()
            .withf(|_, ids| *ids == ["t1", "t2"])
            .returning(|_, _| Ok(HashMap::new()));
        api.expect_artists_metadata()
            .returning(|_, _| Ok(vec![artist_full(MAIN_ARTIST, "Main Artist")]));

        let run = create_run(&db, MAIN_ARTIST).await.unwrap();
        let result = execute(&db, &api, &run).await;

        assert!(result.success);
        // Scores were absent from the map, so both songs default to 0.
        let songs = entities::song::Entity::find().all(&db.conn).await.unwrap();
        assert!(songs.iter().all(|song| song.popularity == 0));
    }

    #[tokio::test]
    async fn test_metadata_failure_falls_back_to_embedded_artists() {
        let db = test_db().await;
        let mut api = MockCatalogApi::new();
        api.expect_access_token()
            .returning(|| Ok("token".to_string()));
        api.expect_artist_albums()
            .returning(|_, _| Ok(vec![album_summary("al1"), album_summary("al2")]));
        api.expect_albums_details()
            .returning(|_, _| Ok(fixture_details()));
        api.expect_tracks_popularity()
            .returning(|_, _| Ok(HashMap::new()));
        api.expect_artists_metadata()
            .returning(|_, _| Err(eyre!("metadata endpoint exploded")));

        let run = create_run(&db, MAIN_ARTIST).await.unwrap();
        let result = execute(&db, &api, &run).await;

        // The failure is recovered; the run still succeeds, and the name
        // comes from the first song's embedded credit list.
        assert!(result.success);
        assert_eq!(result.artist_name, "Main Artist");

        let artists = entities::artist::Entity::find().all(&db.conn).await.unwrap();
        assert_eq!(artists.len(), 2);
        assert!(artists.iter().all(|artist| artist.popularity == 0
            && artist.followers == 0
            && artist.photo_url.is_empty()
            && artist.genres.is_none()));
    }

    #[tokio::test]
    async fn test_fetch_failure_marks_run_error() {
        let db = test_db().await;
        let mut api = MockCatalogApi::new();
        api.expect_access_token()
            .returning(|| Ok("token".to_string()));
        api.expect_artist_albums()
            .returning(|_, _| Err(eyre!("request failed after 3 retries")));

        let run = create_run(&db, MAIN_ARTIST).await.unwrap();
        let result = execute(&db, &api, &run).await;

        assert!(!result.success);
        assert_eq!(result.songs_added, 0);
        assert_eq!(result.albums_processed, 0);
        assert_eq!(result.artist_name, "Unknown");
        assert!(result.error.as_deref().unwrap().contains("retries"));

        let stored = entities::sync_run::Entity::find_by_id(run.id.clone())
            .one(&db.conn)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, "error");
        assert!(stored.error.is_some());
    }

    #[tokio::test]
    async fn test_running_twice_is_idempotent() {
        let db = test_db().await;
        let metadata = vec![
            artist_full(MAIN_ARTIST, "Main Artist"),
            artist_full("feat456feat456feat", "Featured Artist"),
        ];

        for _ in 0..2 {
            let api = mock_happy_path(fixture_details(), metadata.clone());
            let run = create_run(&db, MAIN_ARTIST).await.unwrap();
            let result = execute(&db, &api, &run).await;
            assert!(result.success);
        }

        let artists = entities::artist::Entity::find().all(&db.conn).await.unwrap();
        assert_eq!(artists.len(), 2);
        let songs = entities::song::Entity::find().all(&db.conn).await.unwrap();
        assert_eq!(songs.len(), 2);
        let junctions = entities::song_artist::Entity::find()
            .all(&db.conn)
            .await
            .unwrap();
        assert_eq!(junctions.len(), 3);
    }

    #[tokio::test]
    async fn test_resync_shrinks_junction_rows_with_shorter_credit_list() {
        let db = test_db().await;
        let main = artist_summary(MAIN_ARTIST, "Main Artist");
        let featured = artist_summary("feat456feat456feat", "Featured Artist");

        let both = vec![album_full(
            "al1",
            vec![track("t1", "Song One", vec![main.clone(), featured])],
        )];
        let solo = vec![album_full("al1", vec![track("t1", "Song One", vec![main])])];
        let metadata = vec![
            artist_full(MAIN_ARTIST, "Main Artist"),
            artist_full("feat456feat456feat", "Featured Artist"),
        ];

        let api = mock_happy_path(both, metadata.clone());
        let run = create_run(&db, MAIN_ARTIST).await.unwrap();
        assert!(execute(&db, &api, &run).await.success);

        let junctions = entities::song_artist::Entity::find()
            .all(&db.conn)
            .await
            .unwrap();
        assert_eq!(junctions.len(), 2);

        let api = mock_happy_path(solo, metadata);
        let run = create_run(&db, MAIN_ARTIST).await.unwrap();
        assert!(execute(&db, &api, &run).await.success);

        let junctions = entities::song_artist::Entity::find()
            .all(&db.conn)
            .await
            .unwrap();
        assert_eq!(junctions.len(), 1);
        assert_eq!(junctions[0].artist_id, MAIN_ARTIST);
    }

    #[tokio::test]
    async fn test_recorded_steps_are_not_re_executed() {
        let db = test_db().await;
        let run = create_run(&db, MAIN_ARTIST).await.unwrap();

        // Pre-record the first two steps, as if the process restarted after
        // they completed. The mock has no expectations for them, so any call
        // would panic the test.
        for (name, output) in [
            (
                "get-access-token",
                serde_json::to_string("recorded-token").unwrap(),
            ),
            (
                "fetch-artist-albums",
                serde_json::to_string(&vec![album_summary("al1"), album_summary("al2")]).unwrap(),
            ),
        ] {
            let model = entities::sync_run_step::ActiveModel {
                run_id: Set(run.id.clone()),
                name: Set(name.to_string()),
                output: Set(output),
                ..entities::sync_run_step::ActiveModel::new()
            };
            entities::sync_run_step::Entity::insert(model)
                .exec(&db.conn)
                .await
                .unwrap();
        }

        let mut api = MockCatalogApi::new();
        api.expect_albums_details()
            .withf(|token, _| token == "recorded-token")
            .returning(|_, _| Ok(fixture_details()));
        api.expect_tracks_popularity()
            .returning(|_, _| Ok(HashMap::new()));
        api.expect_artists_metadata()
            .returning(|_, _| Ok(vec![artist_full(MAIN_ARTIST, "Main Artist")]));

        let result = execute(&db, &api, &run).await;

        assert!(result.success);
        assert_eq!(result.albums_processed, 2);
    }

    #[test]
    fn test_resolve_artist_name_prefers_metadata() {
        let metadata = vec![artist_full(MAIN_ARTIST, "From Metadata")];
        let songs = vec![SongRecord {
            id: "t1".to_string(),
            title: "Song".to_string(),
            artists: vec![ArtistRef {
                id: MAIN_ARTIST.to_string(),
                name: "From Song".to_string(),
                spotify_url: String::new(),
            }],
            duration_ms: 1,
            explicit: false,
            image_url: String::new(),
            album_id: "al1".to_string(),
            album_name: "Album".to_string(),
            track_number: None,
            disc_number: None,
            release_date: None,
            release_date_precision: None,
            popularity: 0,
            spotify_url: String::new(),
        }];

        assert_eq!(
            resolve_artist_name(MAIN_ARTIST, Some(metadata.as_slice()), &songs),
            "From Metadata"
        );
        assert_eq!(
            resolve_artist_name(MAIN_ARTIST, None, &songs),
            "From Song"
        );
        assert_eq!(resolve_artist_name("someone-else", None, &songs), "Unknown");
    }

    #[test]
    fn test_collect_track_ids_deduplicates_across_albums() {
        let ids = collect_track_ids(&fixture_details());
        assert_eq!(ids, vec!["t1".to_string(), "t2".to_string()]);
    }
}
