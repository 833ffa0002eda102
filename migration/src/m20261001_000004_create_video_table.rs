use sea_orm_migration::prelude::*;

/// Creates the `video` table. Each video belongs to exactly one series.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Video {
    Table,
    Id,
    SeriesId,
    Title,
    Slug,
    Description,
    Visibility,
    Status,
    Duration,
    EpisodeNumber,
    SortOrder,
    Views,
    Rating,
    RatingCount,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Series {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Video::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Video::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Video::SeriesId).uuid().not_null())
                    .col(ColumnDef::new(Video::Title).string_len(200).not_null())
                    .col(ColumnDef::new(Video::Slug).string_len(220).not_null())
                    .col(ColumnDef::new(Video::Description).text().null())
                    .col(
                        ColumnDef::new(Video::Visibility)
                            .string_len(20)
                            .not_null()
                            .default("freemium"),
                    )
                    .col(
                        ColumnDef::new(Video::Status)
                            .string_len(20)
                            .not_null()
                            .default("draft"),
                    )
                    .col(
                        ColumnDef::new(Video::Duration)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Video::EpisodeNumber)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Video::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Video::Views)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Video::Rating)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Video::RatingCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Video::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Video::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_video_series_id")
                            .from(Video::Table, Video::SeriesId)
                            .to(Series::Table, Series::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_video_series_id_slug")
                    .table(Video::Table)
                    .col(Video::SeriesId)
                    .col(Video::Slug)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Video::Table).to_owned())
            .await
    }
}
