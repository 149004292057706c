use std::path::Path;
use std::time::Duration;

use color_eyre::eyre::{Result, WrapErr};
use migration::MigratorTrait;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectOptions, ConnectionTrait, Database as SeaDatabase,
    DatabaseConnection, EntityTrait, Order, QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};

use crate::entities;
use crate::entities::song::ArtistRefVec;
use crate::spotify::transform::{ArtistRecord, SongRecord};

pub struct Database {
    pub conn: DatabaseConnection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArtistSort {
    #[default]
    Popularity,
    Followers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SongSort {
    #[default]
    Popularity,
    ReleaseDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn into_order(self) -> Order {
        match self {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

/// Sub-list kinds on the single-artist page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtistSongKind {
    Popular,
    Recent,
}

/// One page of results. `has_next_page` is computed by fetching one row past
/// the requested limit, so no separate count query is needed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub page: u64,
    pub has_next_page: bool,
}

fn paginate<T>(mut rows: Vec<T>, page: u64, limit: u64) -> Paginated<T> {
    let has_next_page = rows.len() as u64 > limit;
    rows.truncate(limit as usize);
    Paginated {
        data: rows,
        page,
        has_next_page,
    }
}

fn page_offset(page: u64, limit: u64) -> u64 {
    page.saturating_sub(1) * limit
}

impl Database {
    /// Open or create a database at the given path and bring the schema up
    /// to date.
    pub async fn open(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "opening database");

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).wrap_err_with(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }

        let url = format!("sqlite://{}?mode=rwc", path.display());

        let mut opt = ConnectOptions::new(url);
        opt.max_connections(100)
            .min_connections(5)
            .connect_timeout(Duration::from_secs(8))
            .acquire_timeout(Duration::from_secs(8))
            .idle_timeout(Duration::from_secs(8))
            .sqlx_logging(false);

        let conn = SeaDatabase::connect(opt)
            .await
            .wrap_err_with(|| format!("Failed to open database: {}", path.display()))?;

        // Junction cleanup on delete relies on cascading foreign keys.
        conn.execute_unprepared("PRAGMA foreign_keys = ON")
            .await
            .wrap_err("Failed to enable foreign keys")?;

        tracing::debug!("running database migrations");
        migration::Migrator::up(&conn, None)
            .await
            .wrap_err("Failed to run database migrations")?;

        tracing::info!(path = %path.display(), "database ready");
        Ok(Database { conn })
    }

    // ========== Persistence Stage ==========

    /// Insert the artist, or overwrite its mutable fields if a row with the
    /// same catalog ID already exists. `bio` and `monthly_listeners` are
    /// admin-managed and never touched by a sync.
    pub async fn upsert_artist(&self, artist: &ArtistRecord) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        let existing = entities::artist::Entity::find()
            .filter(entities::artist::Column::SpotifyId.eq(&artist.id))
            .one(&self.conn)
            .await
            .wrap_err("Failed to query artist by catalog ID")?;

        match existing {
            Some(existing) => {
                let mut model: entities::artist::ActiveModel = existing.into();
                model.name = Set(artist.name.clone());
                model.photo_url = Set(artist.photo_url.clone());
                model.popularity = Set(artist.popularity);
                model.followers = Set(artist.followers);
                model.spotify_url = Set(Some(artist.spotify_url.clone()));
                model.genres = Set(artist.genres.clone());
                model.updated_at = Set(now);
                entities::artist::Entity::update(model)
                    .exec(&self.conn)
                    .await
                    .wrap_err("Failed to update artist")?;
            }
            None => {
                let model = entities::artist::ActiveModel {
                    id: Set(artist.id.clone()),
                    name: Set(artist.name.clone()),
                    photo_url: Set(artist.photo_url.clone()),
                    popularity: Set(artist.popularity),
                    followers: Set(artist.followers),
                    monthly_listeners: Set(None),
                    spotify_url: Set(Some(artist.spotify_url.clone())),
                    spotify_id: Set(Some(artist.id.clone())),
                    genres: Set(artist.genres.clone()),
                    bio: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                entities::artist::Entity::insert(model)
                    .exec(&self.conn)
                    .await
                    .wrap_err("Failed to insert artist")?;
            }
        }

        Ok(())
    }

    /// Insert the song, or overwrite all mutable fields (including the
    /// embedded artist list) if a row with the same track ID exists.
    pub async fn upsert_song(&self, song: &SongRecord) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        let existing = entities::song::Entity::find()
            .filter(entities::song::Column::SpotifyId.eq(&song.id))
            .one(&self.conn)
            .await
            .wrap_err("Failed to query song by catalog ID")?;

        match existing {
            Some(existing) => {
                let mut model: entities::song::ActiveModel = existing.into();
                model.title = Set(song.title.clone());
                model.artists = Set(ArtistRefVec(song.artists.clone()));
                model.duration_ms = Set(song.duration_ms);
                model.explicit = Set(song.explicit);
                model.image_url = Set(song.image_url.clone());
                model.album_id = Set(Some(song.album_id.clone()));
                model.album_name = Set(Some(song.album_name.clone()));
                model.track_number = Set(song.track_number);
                model.disc_number = Set(song.disc_number);
                model.release_date = Set(song.release_date.clone());
                model.release_date_precision = Set(song.release_date_precision.clone());
                model.popularity = Set(song.popularity);
                model.spotify_url = Set(Some(song.spotify_url.clone()));
                model.updated_at = Set(now);
                entities::song::Entity::update(model)
                    .exec(&self.conn)
                    .await
                    .wrap_err("Failed to update song")?;
            }
            None => {
                let model = entities::song::ActiveModel {
                    id: Set(song.id.clone()),
                    title: Set(song.title.clone()),
                    artists: Set(ArtistRefVec(song.artists.clone())),
                    duration_ms: Set(song.duration_ms),
                    explicit: Set(song.explicit),
                    image_url: Set(song.image_url.clone()),
                    album_id: Set(Some(song.album_id.clone())),
                    album_name: Set(Some(song.album_name.clone())),
                    track_number: Set(song.track_number),
                    disc_number: Set(song.disc_number),
                    release_date: Set(song.release_date.clone()),
                    release_date_precision: Set(song.release_date_precision.clone()),
                    popularity: Set(song.popularity),
                    spotify_url: Set(Some(song.spotify_url.clone())),
                    spotify_id: Set(Some(song.id.clone())),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                entities::song::Entity::insert(model)
                    .exec(&self.conn)
                    .await
                    .wrap_err("Failed to insert song")?;
            }
        }

        Ok(())
    }

    /// Replace the song's junction rows wholesale: delete everything for the
    /// song, then insert one row per credited artist with its list position
    /// as the display order. A destructive replace, not a diff.
    pub async fn replace_song_artists(&self, song_id: &str, artist_ids: &[String]) -> Result<()> {
        entities::song_artist::Entity::delete_many()
            .filter(entities::song_artist::Column::SongId.eq(song_id))
            .exec(&self.conn)
            .await
            .wrap_err("Failed to delete song artists")?;

        let now = chrono::Utc::now().timestamp();
        for (position, artist_id) in artist_ids.iter().enumerate() {
            let model = entities::song_artist::ActiveModel {
                song_id: Set(song_id.to_string()),
                artist_id: Set(artist_id.clone()),
                display_order: Set(position as i32),
                created_at: Set(now),
            };
            entities::song_artist::Entity::insert(model)
                .exec(&self.conn)
                .await
                .wrap_err("Failed to insert song artist")?;
        }

        Ok(())
    }

    // ========== Admin Maintenance ==========

    /// Delete an artist; junction rows go with it via FK cascade.
    pub async fn delete_artist(&self, artist_id: &str) -> Result<()> {
        entities::artist::Entity::delete_by_id(artist_id.to_string())
            .exec(&self.conn)
            .await
            .wrap_err("Failed to delete artist")?;
        Ok(())
    }

    /// Delete a song; junction rows go with it via FK cascade.
    pub async fn delete_song(&self, song_id: &str) -> Result<()> {
        entities::song::Entity::delete_by_id(song_id.to_string())
            .exec(&self.conn)
            .await
            .wrap_err("Failed to delete song")?;
        Ok(())
    }

    /// Most recently touched artists, last-updated-then-created descending.
    pub async fn recent_artists(&self, limit: u64) -> Result<Vec<entities::artist::Model>> {
        entities::artist::Entity::find()
            .order_by_desc(entities::artist::Column::UpdatedAt)
            .order_by_desc(entities::artist::Column::CreatedAt)
            .limit(limit)
            .all(&self.conn)
            .await
            .wrap_err("Failed to query recent artists")
    }

    pub async fn recent_songs(&self, limit: u64) -> Result<Vec<entities::song::Model>> {
        entities::song::Entity::find()
            .order_by_desc(entities::song::Column::UpdatedAt)
            .order_by_desc(entities::song::Column::CreatedAt)
            .limit(limit)
            .all(&self.conn)
            .await
            .wrap_err("Failed to query recent songs")
    }

    // ========== Read Endpoints ==========

    pub async fn get_artist(&self, artist_id: &str) -> Result<Option<entities::artist::Model>> {
        entities::artist::Entity::find_by_id(artist_id.to_string())
            .one(&self.conn)
            .await
            .wrap_err("Failed to get artist")
    }

    pub async fn list_artists(
        &self,
        page: u64,
        limit: u64,
        sort: ArtistSort,
        order: SortOrder,
    ) -> Result<Paginated<entities::artist::Model>> {
        let query = entities::artist::Entity::find();
        let query = match sort {
            ArtistSort::Popularity => {
                query.order_by(entities::artist::Column::Popularity, order.into_order())
            }
            ArtistSort::Followers => {
                query.order_by(entities::artist::Column::Followers, order.into_order())
            }
        };

        let rows = query
            .order_by_asc(entities::artist::Column::Id)
            .limit(limit + 1)
            .offset(page_offset(page, limit))
            .all(&self.conn)
            .await
            .wrap_err("Failed to list artists")?;

        Ok(paginate(rows, page, limit))
    }

    pub async fn list_songs(
        &self,
        page: u64,
        limit: u64,
        sort: SongSort,
        order: SortOrder,
    ) -> Result<Paginated<entities::song::Model>> {
        let query = entities::song::Entity::find();
        let query = match sort {
            SongSort::Popularity => {
                query.order_by(entities::song::Column::Popularity, order.into_order())
            }
            SongSort::ReleaseDate => {
                query.order_by(entities::song::Column::ReleaseDate, order.into_order())
            }
        };

        let rows = query
            .order_by_asc(entities::song::Column::Id)
            .limit(limit + 1)
            .offset(page_offset(page, limit))
            .all(&self.conn)
            .await
            .wrap_err("Failed to list songs")?;

        Ok(paginate(rows, page, limit))
    }

    /// Paginated "popular" or "recent" sub-list for one artist, resolved
    /// through the junction table.
    pub async fn artist_songs(
        &self,
        artist_id: &str,
        kind: ArtistSongKind,
        page: u64,
        limit: u64,
    ) -> Result<Paginated<entities::song::Model>> {
        let junction = entities::song_artist::Entity::find()
            .filter(entities::song_artist::Column::ArtistId.eq(artist_id))
            .all(&self.conn)
            .await
            .wrap_err("Failed to query song artists")?;
        let song_ids: Vec<String> = junction.into_iter().map(|row| row.song_id).collect();

        let query = entities::song::Entity::find()
            .filter(entities::song::Column::Id.is_in(song_ids));
        let query = match kind {
            ArtistSongKind::Popular => query.order_by_desc(entities::song::Column::Popularity),
            ArtistSongKind::Recent => query.order_by_desc(entities::song::Column::ReleaseDate),
        };

        let rows = query
            .order_by_asc(entities::song::Column::Id)
            .limit(limit + 1)
            .offset(page_offset(page, limit))
            .all(&self.conn)
            .await
            .wrap_err("Failed to query artist songs")?;

        Ok(paginate(rows, page, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::song::ArtistRef;
    use crate::test_utils::test_db;

    fn artist_record(id: &str, name: &str, popularity: i32, followers: i32) -> ArtistRecord {
        ArtistRecord {
            id: id.to_string(),
            name: name.to_string(),
            photo_url: format!("https://i.scdn.co/image/{id}"),
            popularity,
            followers,
            spotify_url: format!("https://open.spotify.com/artist/{id}"),
            genres: None,
        }
    }

    fn song_record(id: &str, title: &str, artist_ids: &[&str]) -> SongRecord {
        SongRecord {
            id: id.to_string(),
            title: title.to_string(),
            artists: artist_ids
                .iter()
                .map(|artist_id| ArtistRef {
                    id: artist_id.to_string(),
                    name: format!("Artist {artist_id}"),
                    spotify_url: format!("https://open.spotify.com/artist/{artist_id}"),
                })
                .collect(),
            duration_ms: 180_000,
            explicit: false,
            image_url: String::new(),
            album_id: "al1".to_string(),
            album_name: "Album".to_string(),
            track_number: Some(1),
            disc_number: Some(1),
            release_date: Some("2024-01-01".to_string()),
            release_date_precision: Some("day".to_string()),
            popularity: 50,
            spotify_url: format!("https://open.spotify.com/track/{id}"),
        }
    }

    #[tokio::test]
    async fn test_upsert_artist_insert_then_update() {
        let db = test_db().await;

        db.upsert_artist(&artist_record("ar1", "Old Name", 10, 100))
            .await
            .unwrap();
        db.upsert_artist(&artist_record("ar1", "New Name", 90, 900))
            .await
            .unwrap();

        let rows = entities::artist::Entity::find().all(&db.conn).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "New Name");
        assert_eq!(rows[0].popularity, 90);
        assert_eq!(rows[0].followers, 900);
    }

    #[tokio::test]
    async fn test_upsert_song_is_idempotent() {
        let db = test_db().await;
        db.upsert_artist(&artist_record("ar1", "Artist", 10, 100))
            .await
            .unwrap();

        let song = song_record("t1", "Song", &["ar1"]);
        db.upsert_song(&song).await.unwrap();
        db.upsert_song(&song).await.unwrap();

        let rows = entities::song::Entity::find().all(&db.conn).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Song");
    }

    #[tokio::test]
    async fn test_upsert_song_overwrites_embedded_artists() {
        let db = test_db().await;

        db.upsert_song(&song_record("t1", "Song", &["ar1", "ar2"]))
            .await
            .unwrap();
        db.upsert_song(&song_record("t1", "Song", &["ar2"]))
            .await
            .unwrap();

        let row = entities::song::Entity::find_by_id("t1".to_string())
            .one(&db.conn)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.artists.0.len(), 1);
        assert_eq!(row.artists.0[0].id, "ar2");
    }

    #[tokio::test]
    async fn test_replace_song_artists_sets_display_order() {
        let db = test_db().await;
        for id in ["ar1", "ar2", "ar3"] {
            db.upsert_artist(&artist_record(id, id, 0, 0)).await.unwrap();
        }
        db.upsert_song(&song_record("t1", "Song", &["ar2", "ar3", "ar1"]))
            .await
            .unwrap();

        db.replace_song_artists(
            "t1",
            &["ar2".to_string(), "ar3".to_string(), "ar1".to_string()],
        )
        .await
        .unwrap();

        let mut rows = entities::song_artist::Entity::find()
            .all(&db.conn)
            .await
            .unwrap();
        rows.sort_by_key(|row| row.display_order);
        let ordered: Vec<(&str, i32)> = rows
            .iter()
            .map(|row| (row.artist_id.as_str(), row.display_order))
            .collect();
        assert_eq!(ordered, vec![("ar2", 0), ("ar3", 1), ("ar1", 2)]);
    }

    #[tokio::test]
    async fn test_replace_song_artists_is_destructive() {
        let db = test_db().await;
        for id in ["ar1", "ar2", "ar3"] {
            db.upsert_artist(&artist_record(id, id, 0, 0)).await.unwrap();
        }
        db.upsert_song(&song_record("t1", "Song", &["ar1", "ar2", "ar3"]))
            .await
            .unwrap();

        db.replace_song_artists(
            "t1",
            &["ar1".to_string(), "ar2".to_string(), "ar3".to_string()],
        )
        .await
        .unwrap();
        db.replace_song_artists("t1", &["ar2".to_string()])
            .await
            .unwrap();

        let rows = entities::song_artist::Entity::find()
            .all(&db.conn)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].artist_id, "ar2");
        assert_eq!(rows[0].display_order, 0);
    }

    #[tokio::test]
    async fn test_delete_song_cascades_to_junction_rows() {
        let db = test_db().await;
        db.upsert_artist(&artist_record("ar1", "Artist", 0, 0))
            .await
            .unwrap();
        db.upsert_song(&song_record("t1", "Song", &["ar1"]))
            .await
            .unwrap();
        db.replace_song_artists("t1", &["ar1".to_string()])
            .await
            .unwrap();

        db.delete_song("t1").await.unwrap();

        let junctions = entities::song_artist::Entity::find()
            .all(&db.conn)
            .await
            .unwrap();
        assert!(junctions.is_empty());
        // The artist itself stays.
        assert!(db.get_artist("ar1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_artist_cascades_to_junction_rows() {
        let db = test_db().await;
        db.upsert_artist(&artist_record("ar1", "Artist", 0, 0))
            .await
            .unwrap();
        db.upsert_song(&song_record("t1", "Song", &["ar1"]))
            .await
            .unwrap();
        db.replace_song_artists("t1", &["ar1".to_string()])
            .await
            .unwrap();

        db.delete_artist("ar1").await.unwrap();

        let junctions = entities::song_artist::Entity::find()
            .all(&db.conn)
            .await
            .unwrap();
        assert!(junctions.is_empty());
    }

    #[tokio::test]
    async fn test_list_artists_paginates_with_extra_row_probe() {
        let db = test_db().await;
        db.upsert_artist(&artist_record("ar1", "One", 30, 0)).await.unwrap();
        db.upsert_artist(&artist_record("ar2", "Two", 20, 0)).await.unwrap();
        db.upsert_artist(&artist_record("ar3", "Three", 10, 0)).await.unwrap();

        let first = db
            .list_artists(1, 2, ArtistSort::Popularity, SortOrder::Desc)
            .await
            .unwrap();
        assert_eq!(first.data.len(), 2);
        assert!(first.has_next_page);
        assert_eq!(first.data[0].id, "ar1");

        let second = db
            .list_artists(2, 2, ArtistSort::Popularity, SortOrder::Desc)
            .await
            .unwrap();
        assert_eq!(second.data.len(), 1);
        assert!(!second.has_next_page);
        assert_eq!(second.data[0].id, "ar3");
    }

    #[tokio::test]
    async fn test_list_artists_sorts_by_followers_ascending() {
        let db = test_db().await;
        db.upsert_artist(&artist_record("ar1", "One", 0, 500)).await.unwrap();
        db.upsert_artist(&artist_record("ar2", "Two", 0, 100)).await.unwrap();

        let result = db
            .list_artists(1, 20, ArtistSort::Followers, SortOrder::Asc)
            .await
            .unwrap();
        assert_eq!(result.data[0].id, "ar2");
        assert_eq!(result.data[1].id, "ar1");
    }

    #[tokio::test]
    async fn test_list_songs_sorts_by_release_date() {
        let db = test_db().await;
        let mut older = song_record("t1", "Older", &["ar1"]);
        older.release_date = Some("2020-05-01".to_string());
        let mut newer = song_record("t2", "Newer", &["ar1"]);
        newer.release_date = Some("2024-05-01".to_string());
        db.upsert_song(&older).await.unwrap();
        db.upsert_song(&newer).await.unwrap();

        let result = db
            .list_songs(1, 20, SongSort::ReleaseDate, SortOrder::Desc)
            .await
            .unwrap();
        assert_eq!(result.data[0].id, "t2");
        assert_eq!(result.data[1].id, "t1");
    }

    #[tokio::test]
    async fn test_recent_artists_orders_by_updated_then_created() {
        let db = test_db().await;
        db.upsert_artist(&artist_record("ar1", "One", 0, 0)).await.unwrap();
        db.upsert_artist(&artist_record("ar2", "Two", 0, 0)).await.unwrap();

        // Force distinct timestamps; upserts within one second tie otherwise.
        for (id, stamp) in [("ar1", 100_i64), ("ar2", 200_i64)] {
            let row = db.get_artist(id).await.unwrap().unwrap();
            let mut model: entities::artist::ActiveModel = row.into();
            model.updated_at = Set(stamp);
            entities::artist::Entity::update(model)
                .exec(&db.conn)
                .await
                .unwrap();
        }

        let recent = db.recent_artists(10).await.unwrap();
        assert_eq!(recent[0].id, "ar2");
        assert_eq!(recent[1].id, "ar1");
    }

    #[tokio::test]
    async fn test_artist_songs_popular_and_recent_kinds() {
        let db = test_db().await;
        db.upsert_artist(&artist_record("ar1", "Artist", 0, 0))
            .await
            .unwrap();
        db.upsert_artist(&artist_record("ar2", "Other", 0, 0))
            .await
            .unwrap();

        let mut hit = song_record("t1", "Hit", &["ar1"]);
        hit.popularity = 90;
        hit.release_date = Some("2019-01-01".to_string());
        let mut fresh = song_record("t2", "Fresh", &["ar1"]);
        fresh.popularity = 10;
        fresh.release_date = Some("2025-01-01".to_string());
        let unrelated = song_record("t3", "Unrelated", &["ar2"]);

        for song in [&hit, &fresh, &unrelated] {
            db.upsert_song(song).await.unwrap();
            let ids: Vec<String> = song.artists.iter().map(|a| a.id.clone()).collect();
            db.replace_song_artists(&song.id, &ids).await.unwrap();
        }

        let popular = db
            .artist_songs("ar1", ArtistSongKind::Popular, 1, 20)
            .await
            .unwrap();
        assert_eq!(popular.data.len(), 2);
        assert_eq!(popular.data[0].id, "t1");

        let recent = db
            .artist_songs("ar1", ArtistSongKind::Recent, 1, 20)
            .await
            .unwrap();
        assert_eq!(recent.data[0].id, "t2");
    }
}
