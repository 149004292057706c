//! Mapping from catalog API shapes to the storage schema.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::entities::song::ArtistRef;
use crate::spotify::types::{AlbumFull, ArtistFull, TrackSummary};

/// A song row as produced by the transform stage, before persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongRecord {
    pub id: String,
    pub title: String,
    pub artists: Vec<ArtistRef>,
    pub duration_ms: i32,
    pub explicit: bool,
    pub image_url: String,
    pub album_id: String,
    pub album_name: String,
    pub track_number: Option<i32>,
    pub disc_number: Option<i32>,
    pub release_date: Option<String>,
    pub release_date_precision: Option<String>,
    pub popularity: i32,
    pub spotify_url: String,
}

/// An artist row as produced by the transform stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistRecord {
    pub id: String,
    pub name: String,
    pub photo_url: String,
    pub popularity: i32,
    pub followers: i32,
    pub spotify_url: String,
    pub genres: Option<String>,
}

/// Map one track to a song record, taking album-level fields from the album
/// the track was first seen on.
pub fn song_from_track(track: &TrackSummary, album: &AlbumFull, popularity: i32) -> SongRecord {
    let artists = track
        .artists
        .iter()
        .map(|artist| ArtistRef {
            id: artist.id.clone(),
            name: artist.name.clone(),
            spotify_url: artist.external_urls.spotify.clone(),
        })
        .collect();

    // The first image is the highest-resolution one.
    let image_url = album
        .images
        .first()
        .map(|image| image.url.clone())
        .unwrap_or_default();

    SongRecord {
        id: track.id.clone(),
        title: track.name.clone(),
        artists,
        duration_ms: track.duration_ms,
        explicit: track.explicit,
        image_url,
        album_id: album.id.clone(),
        album_name: album.name.clone(),
        track_number: track.track_number,
        disc_number: track.disc_number,
        release_date: album.release_date.clone(),
        release_date_precision: album.release_date_precision.clone(),
        popularity,
        spotify_url: track.external_urls.spotify.clone(),
    }
}

/// Collect every track across the albums, keeping only the first occurrence
/// of each track ID, and map them to song records. A track that reappears on
/// a later album (a compilation, say) is dropped silently.
pub fn collect_songs(albums: &[AlbumFull], popularity: &HashMap<String, i32>) -> Vec<SongRecord> {
    let mut seen = HashSet::new();
    let mut songs = Vec::new();

    for album in albums {
        for track in album.tracks.items.iter().flatten() {
            if track.id.is_empty() || !seen.insert(track.id.clone()) {
                continue;
            }
            let score = popularity.get(&track.id).copied().unwrap_or(0);
            songs.push(song_from_track(track, album, score));
        }
    }

    songs
}

/// Map full artist metadata to an artist record.
pub fn artist_record(artist: &ArtistFull) -> ArtistRecord {
    let photo_url = artist
        .images
        .first()
        .map(|image| image.url.clone())
        .unwrap_or_default();

    let genres = if artist.genres.is_empty() {
        None
    } else {
        serde_json::to_string(&artist.genres).ok()
    };

    ArtistRecord {
        id: artist.id.clone(),
        name: artist.name.clone(),
        photo_url,
        popularity: artist.popularity.unwrap_or(0),
        followers: artist.followers.as_ref().and_then(|f| f.total).unwrap_or(0),
        spotify_url: artist.external_urls.spotify.clone(),
        genres,
    }
}

/// Union of artist IDs referenced across the songs, in order of first
/// appearance.
pub fn unique_artist_ids(songs: &[SongRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for song in songs {
        for artist in &song.artists {
            if seen.insert(artist.id.clone()) {
                ids.push(artist.id.clone());
            }
        }
    }

    ids
}

/// Minimal artist records synthesized from the songs' embedded artist lists.
/// Used when the full metadata fetch is unavailable; first occurrence wins
/// for name and URL, and there is no photo, score, or genre data to carry.
pub fn basic_artists_from_songs(songs: &[SongRecord]) -> Vec<ArtistRecord> {
    let mut seen = HashSet::new();
    let mut artists = Vec::new();

    for song in songs {
        for artist in &song.artists {
            if !seen.insert(artist.id.clone()) {
                continue;
            }
            artists.push(ArtistRecord {
                id: artist.id.clone(),
                name: artist.name.clone(),
                photo_url: String::new(),
                popularity: 0,
                followers: 0,
                spotify_url: artist.spotify_url.clone(),
                genres: None,
            });
        }
    }

    artists
}
