use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Artists synced from the catalog API. The primary key is the
        // catalog-assigned ID; spotify_id mirrors it and carries the unique
        // constraint the upserts key on.
        manager
            .create_table(
                Table::create()
                    .table("artists")
                    .if_not_exists()
                    .col(ColumnDef::new("id").string().not_null().primary_key())
                    .col(ColumnDef::new("name").string().not_null())
                    .col(ColumnDef::new("photo_url").string().not_null())
                    .col(
                        ColumnDef::new("popularity")
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new("followers").integer().not_null().default(0))
                    .col(ColumnDef::new("monthly_listeners").integer())
                    .col(ColumnDef::new("spotify_url").string())
                    .col(ColumnDef::new("spotify_id").string().unique_key())
                    .col(ColumnDef::new("genres").text())
                    .col(ColumnDef::new("bio").text())
                    .col(ColumnDef::new("created_at").big_integer().not_null())
                    .col(ColumnDef::new("updated_at").big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        // Songs keyed by catalog track ID. The artists column holds the
        // denormalized credited-artist list as JSON for display.
        manager
            .create_table(
                Table::create()
                    .table("songs")
                    .if_not_exists()
                    .col(ColumnDef::new("id").string().not_null().primary_key())
                    .col(ColumnDef::new("title").string().not_null())
                    .col(ColumnDef::new("artists").text().not_null())
                    .col(ColumnDef::new("duration_ms").integer().not_null())
                    .col(
                        ColumnDef::new("explicit")
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new("image_url").string().not_null())
                    .col(ColumnDef::new("album_id").string())
                    .col(ColumnDef::new("album_name").string())
                    .col(ColumnDef::new("track_number").integer())
                    .col(ColumnDef::new("disc_number").integer())
                    .col(ColumnDef::new("release_date").string())
                    .col(ColumnDef::new("release_date_precision").string())
                    .col(
                        ColumnDef::new("popularity")
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new("spotify_url").string())
                    .col(ColumnDef::new("spotify_id").string().unique_key())
                    .col(ColumnDef::new("created_at").big_integer().not_null())
                    .col(ColumnDef::new("updated_at").big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        // song_artists junction with the credited-artist display order.
        manager
            .create_table(
                Table::create()
                    .table("song_artists")
                    .if_not_exists()
                    .col(ColumnDef::new("song_id").string().not_null())
                    .col(ColumnDef::new("artist_id").string().not_null())
                    .col(
                        ColumnDef::new("display_order")
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new("created_at").big_integer().not_null())
                    .primary_key(Index::create().col("song_id").col("artist_id"))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_song_artists_song_id")
                            .from("song_artists", "song_id")
                            .to("songs", "id")
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_song_artists_artist_id")
                            .from("song_artists", "artist_id")
                            .to("artists", "id")
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("song_artists_artist_id_idx")
                    .table("song_artists")
                    .col("artist_id")
                    .to_owned(),
            )
            .await?;

        // One row per sync workflow run.
        manager
            .create_table(
                Table::create()
                    .table("sync_runs")
                    .if_not_exists()
                    .col(ColumnDef::new("id").string().not_null().primary_key())
                    .col(ColumnDef::new("artist_id").string().not_null())
                    .col(ColumnDef::new("status").string().not_null())
                    .col(ColumnDef::new("result").text())
                    .col(ColumnDef::new("error").text())
                    .col(ColumnDef::new("created_at").big_integer().not_null())
                    .col(ColumnDef::new("updated_at").big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        // Durable per-step results; a restarted run resumes at the first
        // step that has no recorded row here.
        manager
            .create_table(
                Table::create()
                    .table("sync_run_steps")
                    .if_not_exists()
                    .col(ColumnDef::new("run_id").string().not_null())
                    .col(ColumnDef::new("name").string().not_null())
                    .col(ColumnDef::new("output").text().not_null())
                    .col(ColumnDef::new("created_at").big_integer().not_null())
                    .primary_key(Index::create().col("run_id").col("name"))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sync_run_steps_run_id")
                            .from("sync_run_steps", "run_id")
                            .to("sync_runs", "id")
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table("sync_run_steps").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table("sync_runs").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table("song_artists").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table("songs").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table("artists").to_owned())
            .await?;

        Ok(())
    }
}
