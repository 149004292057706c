use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One credited artist as embedded in a song row, denormalized for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct ArtistRef {
    pub id: String,
    pub name: String,
    pub spotify_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct ArtistRefVec(pub Vec<ArtistRef>);

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "songs")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Catalog-assigned track ID.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    pub artists: ArtistRefVec,
    pub duration_ms: i32,
    pub explicit: bool,
    pub image_url: String,
    pub album_id: Option<String>,
    pub album_name: Option<String>,
    pub track_number: Option<i32>,
    pub disc_number: Option<i32>,
    pub release_date: Option<String>,
    pub release_date_precision: Option<String>,
    pub popularity: i32,
    pub spotify_url: Option<String>,
    pub spotify_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::song_artist::Entity")]
    SongArtist,
}

impl Related<super::song_artist::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SongArtist.def()
    }
}

impl Related<super::artist::Entity> for Entity {
    fn to() -> RelationDef {
        super::song_artist::Relation::Artist.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::song_artist::Relation::Song.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
