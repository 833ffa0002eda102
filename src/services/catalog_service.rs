use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::access::Tier;
use crate::clock::Clock;
use crate::entities::{category, series, user, video, ContentStatus};
use crate::error::AppError;
use crate::services::ProgressService;
use crate::utils::slug_or_title;

/// Input for [`CatalogService::create_series`].
#[derive(Debug, Clone)]
pub struct NewSeries {
    pub category_id: Uuid,
    pub instructor_id: Uuid,
    pub title: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub visibility: String,
    pub status: ContentStatus,
}

/// Input for [`CatalogService::create_video`].
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub series_id: Uuid,
    pub title: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub visibility: String,
    pub status: ContentStatus,
    pub duration: i64,
    pub episode_number: i32,
    pub sort_order: i32,
}

/// Partial update for [`CatalogService::update_video`]. `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct VideoChanges {
    pub series_id: Option<Uuid>,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<String>,
    pub status: Option<ContentStatus>,
    pub duration: Option<i64>,
    pub episode_number: Option<i32>,
    pub sort_order: Option<i32>,
}

pub struct CatalogService;

impl CatalogService {
    /// Create a category
    pub async fn create_category(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        name: &str,
        description: Option<String>,
    ) -> Result<category::Model, AppError> {
        let slug = slug_or_title(None, name);
        if slug.is_empty() {
            return Err(AppError::BadRequest(
                "Category name must contain letters or digits".to_string(),
            ));
        }

        let existing = category::Entity::find()
            .filter(category::Column::Slug.eq(&slug))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(format!("Category '{slug}' already exists")));
        }

        let model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.trim().to_string()),
            slug: Set(slug),
            description: Set(description),
            created_at: Set(clock.now().into()),
        };

        Ok(model.insert(db).await?)
    }

    /// Create a series with zeroed aggregate stats
    pub async fn create_series(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        new: NewSeries,
    ) -> Result<series::Model, AppError> {
        validate_visibility(&new.visibility)?;
        let slug = slug_or_title(new.slug.as_deref(), &new.title);
        if slug.is_empty() {
            return Err(AppError::BadRequest(
                "Title must contain letters or digits".to_string(),
            ));
        }

        category::Entity::find_by_id(new.category_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", new.category_id)))?;
        user::Entity::find_by_id(new.instructor_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", new.instructor_id)))?;

        let existing = series::Entity::find()
            .filter(series::Column::Slug.eq(&slug))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(format!("Series '{slug}' already exists")));
        }

        let now = clock.now();
        let model = series::ActiveModel {
            id: Set(Uuid::new_v4()),
            category_id: Set(new.category_id),
            instructor_id: Set(new.instructor_id),
            title: Set(new.title.trim().to_string()),
            slug: Set(slug),
            description: Set(new.description),
            visibility: Set(new.visibility.to_lowercase()),
            status: Set(new.status.as_str().to_string()),
            video_count: Set(0),
            total_duration: Set(0),
            total_views: Set(0),
            rating: Set(0.0),
            rating_count: Set(0),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        Ok(model.insert(db).await?)
    }

    /// Look up a series by ID
    pub async fn find_series<C: ConnectionTrait>(
        db: &C,
        series_id: Uuid,
    ) -> Result<series::Model, AppError> {
        series::Entity::find_by_id(series_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Series {series_id} not found")))
    }

    /// Look up a video by ID
    pub async fn find_video<C: ConnectionTrait>(
        db: &C,
        video_id: Uuid,
    ) -> Result<video::Model, AppError> {
        video::Entity::find_by_id(video_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Video {video_id} not found")))
    }

    /// All videos of a series in playback order
    pub async fn list_series_videos(
        db: &DatabaseConnection,
        series_id: Uuid,
    ) -> Result<Vec<video::Model>, AppError> {
        Self::find_series(db, series_id).await?;

        Ok(video::Entity::find()
            .filter(video::Column::SeriesId.eq(series_id))
            .order_by_asc(video::Column::SortOrder)
            .order_by_asc(video::Column::EpisodeNumber)
            .all(db)
            .await?)
    }

    /// Create a video and refresh its series' aggregates in the same transaction
    pub async fn create_video(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        new: NewVideo,
    ) -> Result<video::Model, AppError> {
        validate_visibility(&new.visibility)?;
        validate_duration(new.duration)?;
        let slug = slug_or_title(new.slug.as_deref(), &new.title);
        if slug.is_empty() {
            return Err(AppError::BadRequest(
                "Title must contain letters or digits".to_string(),
            ));
        }

        let txn = db.begin().await?;

        Self::find_series(&txn, new.series_id).await?;
        ensure_slug_free(&txn, new.series_id, &slug, None).await?;

        let now = clock.now();
        let model = video::ActiveModel {
            id: Set(Uuid::new_v4()),
            series_id: Set(new.series_id),
            title: Set(new.title.trim().to_string()),
            slug: Set(slug),
            description: Set(new.description),
            visibility: Set(new.visibility.to_lowercase()),
            status: Set(new.status.as_str().to_string()),
            duration: Set(new.duration),
            episode_number: Set(new.episode_number),
            sort_order: Set(new.sort_order),
            views: Set(0),
            rating: Set(0.0),
            rating_count: Set(0),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        let video = model.insert(&txn).await?;

        Self::refresh_series(&txn, clock, video.series_id).await?;
        txn.commit().await?;

        tracing::info!(video_id = %video.id, series_id = %video.series_id, "Video created");
        Ok(video)
    }

    /// Update a video. Moving it to another series refreshes both series and
    /// gives the video's learners a rollup for the new one.
    pub async fn update_video(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        video_id: Uuid,
        changes: VideoChanges,
    ) -> Result<video::Model, AppError> {
        if let Some(visibility) = &changes.visibility {
            validate_visibility(visibility)?;
        }
        if let Some(duration) = changes.duration {
            validate_duration(duration)?;
        }

        let txn = db.begin().await?;

        let existing = Self::find_video(&txn, video_id).await?;
        let old_series_id = existing.series_id;
        let new_series_id = changes.series_id.unwrap_or(old_series_id);

        if new_series_id != old_series_id {
            Self::find_series(&txn, new_series_id).await?;
        }

        let title = changes.title.clone().unwrap_or_else(|| existing.title.clone());
        let slug = match (&changes.slug, &changes.title) {
            (Some(slug), _) => Some(slug_or_title(Some(slug), &title)),
            (None, Some(title)) => Some(slug_or_title(None, title)),
            (None, None) if new_series_id != old_series_id => Some(existing.slug.clone()),
            (None, None) => None,
        };
        if let Some(slug) = &slug {
            if slug.is_empty() {
                return Err(AppError::BadRequest(
                    "Title must contain letters or digits".to_string(),
                ));
            }
            ensure_slug_free(&txn, new_series_id, slug, Some(video_id)).await?;
        }

        let mut active: video::ActiveModel = existing.into();
        active.updated_at = Set(clock.now().into());
        active.series_id = Set(new_series_id);
        if let Some(title) = changes.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(slug) = slug {
            active.slug = Set(slug);
        }
        if let Some(description) = changes.description {
            active.description = Set(Some(description));
        }
        if let Some(visibility) = changes.visibility {
            active.visibility = Set(visibility.to_lowercase());
        }
        if let Some(status) = changes.status {
            active.status = Set(status.as_str().to_string());
        }
        if let Some(duration) = changes.duration {
            active.duration = Set(duration);
        }
        if let Some(episode_number) = changes.episode_number {
            active.episode_number = Set(episode_number);
        }
        if let Some(sort_order) = changes.sort_order {
            active.sort_order = Set(sort_order);
        }

        let video = active.update(&txn).await?;

        if new_series_id != old_series_id {
            ProgressService::reassign_video_series(&txn, video_id, new_series_id).await?;
            Self::refresh_series(&txn, clock, old_series_id).await?;
        }
        Self::refresh_series(&txn, clock, new_series_id).await?;
        if new_series_id != old_series_id {
            ProgressService::refresh_video_learners(&txn, clock, video_id, new_series_id).await?;
        }
        txn.commit().await?;

        tracing::info!(video_id = %video.id, series_id = %video.series_id, "Video updated");
        Ok(video)
    }

    /// Delete a video along with its progress records, then refresh its series
    pub async fn delete_video(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        video_id: Uuid,
    ) -> Result<series::Model, AppError> {
        let txn = db.begin().await?;

        let existing = Self::find_video(&txn, video_id).await?;
        let series_id = existing.series_id;

        ProgressService::forget_video(&txn, video_id).await?;
        video::Entity::delete_by_id(video_id).exec(&txn).await?;

        let series = Self::refresh_series(&txn, clock, series_id).await?;
        txn.commit().await?;

        tracing::info!(%video_id, %series_id, "Video deleted");
        Ok(series)
    }

    /// Count one playback of a video and roll it into the series' view total
    pub async fn record_view(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        video_id: Uuid,
    ) -> Result<video::Model, AppError> {
        let txn = db.begin().await?;

        let result = video::Entity::update_many()
            .col_expr(video::Column::Views, Expr::col(video::Column::Views).add(1))
            .filter(video::Column::Id.eq(video_id))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Video {video_id} not found")));
        }

        let video = Self::find_video(&txn, video_id).await?;
        Self::recompute_series_stats(&txn, clock, video.series_id).await?;
        txn.commit().await?;

        Ok(video)
    }

    /// Recompute a series' derived stats from its published videos.
    ///
    /// `rating` is the mean of the published videos' ratings weighted by their
    /// rating counts, rounded to two decimals.
    pub async fn recompute_series_stats<C: ConnectionTrait>(
        db: &C,
        clock: &dyn Clock,
        series_id: Uuid,
    ) -> Result<series::Model, AppError> {
        let series = Self::find_series(db, series_id).await?;

        let videos = video::Entity::find()
            .filter(video::Column::SeriesId.eq(series_id))
            .filter(video::Column::Status.eq(ContentStatus::Published.as_str()))
            .all(db)
            .await?;

        let stats = SeriesStats::from_videos(&videos);

        let mut active: series::ActiveModel = series.into();
        active.video_count = Set(stats.video_count);
        active.total_duration = Set(stats.total_duration);
        active.total_views = Set(stats.total_views);
        active.rating = Set(stats.rating);
        active.rating_count = Set(stats.rating_count);
        active.updated_at = Set(clock.now().into());

        let series = active.update(db).await?;

        tracing::debug!(
            %series_id,
            video_count = series.video_count,
            total_duration = series.total_duration,
            "Series stats recomputed"
        );
        Ok(series)
    }

    /// Stats cascade plus every learner's rollup for the series
    async fn refresh_series<C: ConnectionTrait>(
        db: &C,
        clock: &dyn Clock,
        series_id: Uuid,
    ) -> Result<series::Model, AppError> {
        let series = Self::recompute_series_stats(db, clock, series_id).await?;
        ProgressService::refresh_series_rollups(db, clock, series_id).await?;
        Ok(series)
    }
}

/// Aggregates of a set of published videos.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStats {
    pub video_count: i32,
    pub total_duration: i64,
    pub total_views: i64,
    pub rating: f64,
    pub rating_count: i32,
}

impl SeriesStats {
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_videos(videos: &[video::Model]) -> Self {
        let total_duration = videos.iter().map(|v| v.duration).sum();
        let total_views = videos.iter().map(|v| v.views).sum();
        let rating_count: i64 = videos.iter().map(|v| i64::from(v.rating_count)).sum();
        let weighted: f64 = videos
            .iter()
            .map(|v| v.rating * f64::from(v.rating_count))
            .sum();

        let rating = if rating_count > 0 {
            round2(weighted / rating_count as f64)
        } else {
            0.0
        };

        Self {
            video_count: i32::try_from(videos.len()).unwrap_or(i32::MAX),
            total_duration,
            total_views,
            rating,
            rating_count: i32::try_from(rating_count).unwrap_or(i32::MAX),
        }
    }
}

/// Round to two decimal places.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn validate_visibility(visibility: &str) -> Result<Tier, AppError> {
    Tier::from_visibility(visibility).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Invalid visibility '{visibility}': expected freemium, basic or premium"
        ))
    })
}

fn validate_duration(duration: i64) -> Result<(), AppError> {
    if duration < 0 {
        return Err(AppError::BadRequest(
            "Duration cannot be negative".to_string(),
        ));
    }
    Ok(())
}

async fn ensure_slug_free<C: ConnectionTrait>(
    db: &C,
    series_id: Uuid,
    slug: &str,
    except: Option<Uuid>,
) -> Result<(), AppError> {
    let mut query = video::Entity::find()
        .filter(video::Column::SeriesId.eq(series_id))
        .filter(video::Column::Slug.eq(slug));
    if let Some(video_id) = except {
        query = query.filter(video::Column::Id.ne(video_id));
    }

    if query.one(db).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "A video with slug '{slug}' already exists in this series"
        )));
    }
    Ok(())
}
