use sea_orm_migration::prelude::*;

/// Creates the `series_progress` table: one derived rollup row per
/// (user, series) pair.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum SeriesProgress {
    Table,
    Id,
    UserId,
    SeriesId,
    VideosCompleted,
    TotalVideos,
    SeriesProgress,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum User {
    Table,
    Id,
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
                    .table(SeriesProgress::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SeriesProgress::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SeriesProgress::UserId).uuid().not_null())
                    .col(ColumnDef::new(SeriesProgress::SeriesId).uuid().not_null())
                    .col(
                        ColumnDef::new(SeriesProgress::VideosCompleted)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SeriesProgress::TotalVideos)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SeriesProgress::SeriesProgress)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(SeriesProgress::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SeriesProgress::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_series_progress_user_id")
                            .from(SeriesProgress::Table, SeriesProgress::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_series_progress_series_id")
                            .from(SeriesProgress::Table, SeriesProgress::SeriesId)
                            .to(Series::Table, Series::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_series_progress_user_id_series_id")
                    .table(SeriesProgress::Table)
                    .col(SeriesProgress::UserId)
                    .col(SeriesProgress::SeriesId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SeriesProgress::Table).to_owned())
            .await
    }
}
