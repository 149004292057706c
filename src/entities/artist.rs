use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "artists")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Catalog-assigned artist ID.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub photo_url: String,
    pub popularity: i32,
    pub followers: i32,
    pub monthly_listeners: Option<i32>,
    pub spotify_url: Option<String>,
    pub spotify_id: Option<String>,
    /// JSON-encoded list of genre names, unset when the catalog reports none.
    pub genres: Option<String>,
    pub bio: Option<String>,
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

impl Related<super::song::Entity> for Entity {
    fn to() -> RelationDef {
        super::song_artist::Relation::Song.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::song_artist::Relation::Artist.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
