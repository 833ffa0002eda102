use std::collections::HashSet;

use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Alias, Expr, Func, OnConflict, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use crate::clock::Clock;
use crate::entities::{series_progress, user, video, video_progress, ContentStatus};
use crate::error::AppError;
use crate::services::catalog_service::round2;
use crate::services::CatalogService;

/// A video counts as completed once this share of it has been watched.
pub const COMPLETION_THRESHOLD: i32 = 90;

/// A client watch report for one video.
#[derive(Debug, Clone, Copy)]
pub struct WatchReport {
    /// Seconds watched; also stored as the resume position.
    pub time_watched: i64,
    /// Length of the video as seen by the player. Falls back to the stored
    /// `video.duration` when absent.
    pub video_duration: Option<i64>,
}

/// Learning statistics for one user, always computed from the progress tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub videos_watched: u64,
    pub videos_completed: u64,
    pub series_started: u64,
    pub series_completed: u64,
    pub total_watch_time: i64,
}

/// `min(100, round(watched / duration * 100))`, or 0 for a non-positive duration.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
#[must_use]
pub fn progress_percentage(time_watched: i64, video_duration: i64) -> i32 {
    if video_duration <= 0 || time_watched <= 0 {
        return 0;
    }
    let percentage = (time_watched as f64 / video_duration as f64 * 100.0).round();
    percentage.min(100.0) as i32
}

/// Series completion percentage with two-decimal precision.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn series_percentage(videos_completed: u64, total_videos: u64) -> f64 {
    if total_videos == 0 {
        return 0.0;
    }
    round2(videos_completed as f64 / total_videos as f64 * 100.0)
}

/// Sole writer of `video_progress` and `series_progress`.
pub struct ProgressService;

impl ProgressService {
    /// Record a watch report and refresh the user's rollup for the video's series.
    ///
    /// The counters (`watch_count`, `total_watch_time`) are incremented inside the
    /// upsert statement itself, so concurrent reports for the same (user, video)
    /// never lose an increment. Completion is sticky: a later, shorter report
    /// leaves `is_completed` and `completed_at` untouched.
    pub async fn record_watch(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        user_id: Uuid,
        video_id: Uuid,
        report: WatchReport,
    ) -> Result<video_progress::Model, AppError> {
        if report.time_watched < 0 {
            return Err(AppError::BadRequest(
                "timeWatched cannot be negative".to_string(),
            ));
        }
        if report.video_duration.is_some_and(|d| d < 0) {
            return Err(AppError::BadRequest(
                "videoDuration cannot be negative".to_string(),
            ));
        }

        let txn = db.begin().await?;

        ensure_user(&txn, user_id).await?;
        let video = CatalogService::find_video(&txn, video_id).await?;

        let duration = report.video_duration.unwrap_or(video.duration);
        let percentage = progress_percentage(report.time_watched, duration);
        let completed = percentage >= COMPLETION_THRESHOLD;
        let now: DateTimeWithTimeZone = clock.now().into();

        let row = video_progress::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            video_id: Set(video_id),
            series_id: Set(video.series_id),
            progress_percentage: Set(percentage),
            time_watched: Set(report.time_watched),
            last_position: Set(report.time_watched),
            video_duration: Set(duration),
            is_completed: Set(completed),
            completed_at: Set(completed.then_some(now)),
            watch_count: Set(1),
            total_watch_time: Set(report.time_watched),
            rating: Set(None),
            is_favorite: Set(false),
            first_watched_at: Set(Some(now)),
            last_watched_at: Set(Some(now)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let mut on_conflict =
            OnConflict::columns([video_progress::Column::UserId, video_progress::Column::VideoId]);
        on_conflict
            .update_columns([
                video_progress::Column::SeriesId,
                video_progress::Column::ProgressPercentage,
                video_progress::Column::TimeWatched,
                video_progress::Column::LastPosition,
                video_progress::Column::VideoDuration,
                video_progress::Column::UpdatedAt,
            ])
            .value(
                video_progress::Column::WatchCount,
                stored(video_progress::Column::WatchCount).add(1),
            )
            .value(
                video_progress::Column::TotalWatchTime,
                stored(video_progress::Column::TotalWatchTime).add(report.time_watched),
            )
            .value(
                video_progress::Column::FirstWatchedAt,
                Func::coalesce([
                    SimpleExpr::from(stored(video_progress::Column::FirstWatchedAt)),
                    Expr::val(now).into(),
                ]),
            )
            .value(video_progress::Column::LastWatchedAt, Expr::val(now));
        if completed {
            on_conflict
                .update_column(video_progress::Column::IsCompleted)
                .value(
                    video_progress::Column::CompletedAt,
                    Func::coalesce([
                        SimpleExpr::from(stored(video_progress::Column::CompletedAt)),
                        Expr::val(now).into(),
                    ]),
                );
        }

        video_progress::Entity::insert(row)
            .on_conflict(on_conflict)
            .exec_without_returning(&txn)
            .await?;

        Self::rollup(&txn, clock, user_id, video.series_id).await?;

        let progress = find_video_progress(&txn, user_id, video_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Progress row missing after upsert"))?;
        txn.commit().await?;

        tracing::info!(
            %user_id,
            %video_id,
            series_id = %video.series_id,
            progress_percentage = progress.progress_percentage,
            is_completed = progress.is_completed,
            watch_count = progress.watch_count,
            "Watch progress recorded"
        );
        Ok(progress)
    }

    /// Recompute the (user, series) rollup. Idempotent.
    pub async fn recompute_series_progress(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        user_id: Uuid,
        series_id: Uuid,
    ) -> Result<series_progress::Model, AppError> {
        let txn = db.begin().await?;

        ensure_user(&txn, user_id).await?;
        CatalogService::find_series(&txn, series_id).await?;

        let progress = Self::rollup(&txn, clock, user_id, series_id).await?;
        txn.commit().await?;

        Ok(progress)
    }

    /// Fresh learning statistics for a user.
    ///
    /// Rows created only by rating or favouriting (never played) do not count
    /// as watched.
    pub async fn user_stats(db: &DatabaseConnection, user_id: Uuid) -> Result<UserStats, AppError> {
        ensure_user(db, user_id).await?;

        let watched = video_progress::Entity::find()
            .filter(video_progress::Column::UserId.eq(user_id))
            .filter(video_progress::Column::WatchCount.gt(0));

        let videos_watched = watched.clone().count(db).await?;

        let videos_completed = watched
            .clone()
            .filter(video_progress::Column::IsCompleted.eq(true))
            .count(db)
            .await?;

        let series_ids: HashSet<Uuid> = watched
            .clone()
            .select_only()
            .column(video_progress::Column::SeriesId)
            .into_tuple::<Uuid>()
            .all(db)
            .await?
            .into_iter()
            .collect();

        // Summed by the database, which errors on overflow instead of wrapping.
        let total_watch_time: i64 = video_progress::Entity::find()
            .filter(video_progress::Column::UserId.eq(user_id))
            .select_only()
            .column_as(total_watch_time_sum(), "total_watch_time")
            .into_tuple::<i64>()
            .one(db)
            .await?
            .unwrap_or(0);

        let series_completed = series_progress::Entity::find()
            .filter(series_progress::Column::UserId.eq(user_id))
            .filter(series_progress::Column::SeriesProgress.gte(100.0))
            .count(db)
            .await?;

        Ok(UserStats {
            videos_watched,
            videos_completed,
            series_started: series_ids.len() as u64,
            series_completed,
            total_watch_time,
        })
    }

    /// The user's progress on one video, if they have started it.
    pub async fn video_progress(
        db: &DatabaseConnection,
        user_id: Uuid,
        video_id: Uuid,
    ) -> Result<Option<video_progress::Model>, AppError> {
        CatalogService::find_video(db, video_id).await?;
        Ok(find_video_progress(db, user_id, video_id).await?)
    }

    /// The user's rollup for one series, if one has been computed.
    pub async fn series_progress(
        db: &DatabaseConnection,
        user_id: Uuid,
        series_id: Uuid,
    ) -> Result<Option<series_progress::Model>, AppError> {
        CatalogService::find_series(db, series_id).await?;
        Ok(series_progress::Entity::find()
            .filter(series_progress::Column::UserId.eq(user_id))
            .filter(series_progress::Column::SeriesId.eq(series_id))
            .one(db)
            .await?)
    }

    /// Rate a video 1–5 and refresh the video's and series' rating aggregates.
    pub async fn rate_video(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        user_id: Uuid,
        video_id: Uuid,
        rating: i16,
    ) -> Result<video_progress::Model, AppError> {
        if !(1..=5).contains(&rating) {
            return Err(AppError::BadRequest(
                "Rating must be between 1 and 5".to_string(),
            ));
        }

        let txn = db.begin().await?;

        ensure_user(&txn, user_id).await?;
        let video = CatalogService::find_video(&txn, video_id).await?;
        let now: DateTimeWithTimeZone = clock.now().into();

        let mut row = untouched_row(user_id, &video, now);
        row.rating = Set(Some(rating));

        video_progress::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([
                    video_progress::Column::UserId,
                    video_progress::Column::VideoId,
                ])
                .update_columns([video_progress::Column::Rating, video_progress::Column::UpdatedAt])
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        let ratings: Vec<i16> = video_progress::Entity::find()
            .filter(video_progress::Column::VideoId.eq(video_id))
            .filter(video_progress::Column::Rating.is_not_null())
            .select_only()
            .column(video_progress::Column::Rating)
            .into_tuple::<i16>()
            .all(&txn)
            .await?;

        let (average, count) = average_rating(&ratings);
        let series_id = video.series_id;
        let mut active: video::ActiveModel = video.into();
        active.rating = Set(average);
        active.rating_count = Set(count);
        active.updated_at = Set(now);
        active.update(&txn).await?;

        CatalogService::recompute_series_stats(&txn, clock, series_id).await?;

        let progress = find_video_progress(&txn, user_id, video_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Progress row missing after rating"))?;
        txn.commit().await?;

        tracing::info!(%user_id, %video_id, rating, "Video rated");
        Ok(progress)
    }

    /// Flip the favourite flag on the user's progress record for a video.
    pub async fn toggle_favorite(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        user_id: Uuid,
        video_id: Uuid,
    ) -> Result<video_progress::Model, AppError> {
        let txn = db.begin().await?;

        ensure_user(&txn, user_id).await?;
        let video = CatalogService::find_video(&txn, video_id).await?;
        let now: DateTimeWithTimeZone = clock.now().into();

        let mut row = untouched_row(user_id, &video, now);
        row.is_favorite = Set(true);

        video_progress::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([
                    video_progress::Column::UserId,
                    video_progress::Column::VideoId,
                ])
                .update_column(video_progress::Column::UpdatedAt)
                .value(
                    video_progress::Column::IsFavorite,
                    stored(video_progress::Column::IsFavorite).not(),
                )
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        let progress = find_video_progress(&txn, user_id, video_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Progress row missing after favourite toggle"))?;
        txn.commit().await?;

        Ok(progress)
    }

    /// Videos the user has marked as favourite, by title.
    pub async fn favorites(
        db: &DatabaseConnection,
        user_id: Uuid,
    ) -> Result<Vec<video::Model>, AppError> {
        ensure_user(db, user_id).await?;

        Ok(video::Entity::find()
            .join(JoinType::InnerJoin, video::Relation::VideoProgress.def())
            .filter(video_progress::Column::UserId.eq(user_id))
            .filter(video_progress::Column::IsFavorite.eq(true))
            .order_by_asc(video::Column::Title)
            .all(db)
            .await?)
    }

    /// Recompute the rollup of every user who has one for `series_id`.
    ///
    /// Called by the catalog when the set of published videos changes.
    pub(crate) async fn refresh_series_rollups<C: ConnectionTrait>(
        db: &C,
        clock: &dyn Clock,
        series_id: Uuid,
    ) -> Result<(), AppError> {
        let user_ids: Vec<Uuid> = series_progress::Entity::find()
            .filter(series_progress::Column::SeriesId.eq(series_id))
            .select_only()
            .column(series_progress::Column::UserId)
            .into_tuple::<Uuid>()
            .all(db)
            .await?;

        for user_id in user_ids {
            Self::rollup(db, clock, user_id, series_id).await?;
        }
        Ok(())
    }

    /// Roll up `series_id` for everyone who has watched `video_id`.
    ///
    /// Used when a video moves series: its learners may not have a rollup
    /// for the new series yet.
    pub(crate) async fn refresh_video_learners<C: ConnectionTrait>(
        db: &C,
        clock: &dyn Clock,
        video_id: Uuid,
        series_id: Uuid,
    ) -> Result<(), AppError> {
        let user_ids: Vec<Uuid> = video_progress::Entity::find()
            .filter(video_progress::Column::VideoId.eq(video_id))
            .filter(video_progress::Column::WatchCount.gt(0))
            .select_only()
            .column(video_progress::Column::UserId)
            .into_tuple::<Uuid>()
            .all(db)
            .await?;

        for user_id in user_ids {
            Self::rollup(db, clock, user_id, series_id).await?;
        }
        Ok(())
    }

    /// Point a video's progress rows at its new series.
    pub(crate) async fn reassign_video_series<C: ConnectionTrait>(
        db: &C,
        video_id: Uuid,
        series_id: Uuid,
    ) -> Result<(), AppError> {
        video_progress::Entity::update_many()
            .col_expr(video_progress::Column::SeriesId, Expr::value(series_id))
            .filter(video_progress::Column::VideoId.eq(video_id))
            .exec(db)
            .await?;
        Ok(())
    }

    /// Drop every progress row of a video that is about to be deleted.
    pub(crate) async fn forget_video<C: ConnectionTrait>(
        db: &C,
        video_id: Uuid,
    ) -> Result<(), AppError> {
        video_progress::Entity::delete_many()
            .filter(video_progress::Column::VideoId.eq(video_id))
            .exec(db)
            .await?;
        Ok(())
    }

    /// Compute and upsert the (user, series) rollup from completed progress rows
    /// of the series' published videos.
    async fn rollup<C: ConnectionTrait>(
        db: &C,
        clock: &dyn Clock,
        user_id: Uuid,
        series_id: Uuid,
    ) -> Result<series_progress::Model, AppError> {
        let published = ContentStatus::Published.as_str();

        let total_videos = video::Entity::find()
            .filter(video::Column::SeriesId.eq(series_id))
            .filter(video::Column::Status.eq(published))
            .count(db)
            .await?;

        let videos_completed = video_progress::Entity::find()
            .join(JoinType::InnerJoin, video_progress::Relation::Video.def())
            .filter(video_progress::Column::UserId.eq(user_id))
            .filter(video_progress::Column::SeriesId.eq(series_id))
            .filter(video_progress::Column::IsCompleted.eq(true))
            .filter(video::Column::SeriesId.eq(series_id))
            .filter(video::Column::Status.eq(published))
            .count(db)
            .await?;

        let percentage = series_percentage(videos_completed, total_videos);
        let now: DateTimeWithTimeZone = clock.now().into();

        let row = series_progress::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            series_id: Set(series_id),
            videos_completed: Set(i32::try_from(videos_completed).unwrap_or(i32::MAX)),
            total_videos: Set(i32::try_from(total_videos).unwrap_or(i32::MAX)),
            series_progress: Set(percentage),
            created_at: Set(now),
            updated_at: Set(now),
        };

        series_progress::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([
                    series_progress::Column::UserId,
                    series_progress::Column::SeriesId,
                ])
                .update_columns([
                    series_progress::Column::VideosCompleted,
                    series_progress::Column::TotalVideos,
                    series_progress::Column::SeriesProgress,
                    series_progress::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(db)
            .await?;

        tracing::debug!(
            %user_id,
            %series_id,
            videos_completed,
            total_videos,
            series_progress = percentage,
            "Series progress recomputed"
        );

        series_progress::Entity::find()
            .filter(series_progress::Column::UserId.eq(user_id))
            .filter(series_progress::Column::SeriesId.eq(series_id))
            .one(db)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Series progress row missing after upsert").into())
    }
}

/// The value currently stored in the conflicting row.
fn stored(column: video_progress::Column) -> Expr {
    Expr::col((video_progress::Entity, column))
}

/// `CAST(COALESCE(SUM(total_watch_time), 0) AS BIGINT)`; Postgres sums
/// BIGINT into NUMERIC.
fn total_watch_time_sum() -> SimpleExpr {
    Func::cast_as(
        Func::coalesce([
            Func::sum(Expr::col(video_progress::Column::TotalWatchTime)).into(),
            Expr::val(0_i64).into(),
        ]),
        Alias::new("BIGINT"),
    )
    .into()
}

/// Insert shape for rows created by rating or favouriting before any playback.
fn untouched_row(
    user_id: Uuid,
    video: &video::Model,
    now: DateTimeWithTimeZone,
) -> video_progress::ActiveModel {
    video_progress::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        video_id: Set(video.id),
        series_id: Set(video.series_id),
        progress_percentage: Set(0),
        time_watched: Set(0),
        last_position: Set(0),
        video_duration: Set(video.duration),
        is_completed: Set(false),
        completed_at: Set(None),
        watch_count: Set(0),
        total_watch_time: Set(0),
        rating: Set(None),
        is_favorite: Set(false),
        first_watched_at: Set(None),
        last_watched_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

/// Mean rating rounded to two decimals, and the number of ratings.
fn average_rating(ratings: &[i16]) -> (f64, i32) {
    if ratings.is_empty() {
        return (0.0, 0);
    }
    let sum: f64 = ratings.iter().map(|r| f64::from(*r)).sum();
    let count = i32::try_from(ratings.len()).unwrap_or(i32::MAX);
    (round2(sum / f64::from(count)), count)
}

async fn ensure_user<C: ConnectionTrait>(db: &C, user_id: Uuid) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))
}

async fn find_video_progress<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    video_id: Uuid,
) -> Result<Option<video_progress::Model>, sea_orm::DbErr> {
    video_progress::Entity::find()
        .filter(video_progress::Column::UserId.eq(user_id))
        .filter(video_progress::Column::VideoId.eq(video_id))
        .one(db)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_at_threshold() {
        assert_eq!(progress_percentage(540, 600), 90);
        assert!(progress_percentage(540, 600) >= COMPLETION_THRESHOLD);
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        // 1/8 = 12.5%
        assert_eq!(progress_percentage(1, 8), 13);
        // 89.4% stays below the threshold
        assert_eq!(progress_percentage(894, 1000), 89);
    }

    #[test]
    fn test_percentage_is_capped() {
        assert_eq!(progress_percentage(900, 600), 100);
    }

    #[test]
    fn test_percentage_zero_duration() {
        assert_eq!(progress_percentage(120, 0), 0);
        assert_eq!(progress_percentage(120, -5), 0);
    }

    #[test]
    fn test_series_percentage() {
        assert!((series_percentage(3, 4) - 75.0).abs() < 1e-9);
        assert!((series_percentage(2, 3) - 66.67).abs() < 1e-9);
        assert!((series_percentage(4, 4) - 100.0).abs() < 1e-9);
        assert!(series_percentage(0, 0).abs() < f64::EPSILON);
        assert!(series_percentage(5, 0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_average_rating() {
        assert_eq!(average_rating(&[]), (0.0, 0));
        let (avg, count) = average_rating(&[5, 4, 4]);
        assert!((avg - 4.33).abs() < 1e-9);
        assert_eq!(count, 3);
    }
}
