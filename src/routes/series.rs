use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use uuid::Uuid;

use crate::access::{can_view, is_admin};
use crate::auth::middleware::{AuthUser, OptionalAuth};
use crate::entities::{series, user, video, ContentStatus};
use crate::error::AppError;
use crate::services::{CatalogService, ProgressService};
use crate::state::AppState;

/// Series router: `/series/...`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(get_series))
        .route("/{id}/videos", get(list_videos))
        .route("/{id}/progress", get(get_series_progress))
}

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SeriesResponse {
    id: Uuid,
    category_id: Uuid,
    instructor_id: Uuid,
    title: String,
    slug: String,
    description: Option<String>,
    visibility: String,
    status: String,
    video_count: i32,
    total_duration: i64,
    total_views: i64,
    rating: f64,
    rating_count: i32,
    accessible: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoSummaryResponse {
    id: Uuid,
    title: String,
    slug: String,
    visibility: String,
    duration: i64,
    episode_number: i32,
    sort_order: i32,
    views: i64,
    rating: f64,
    accessible: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SeriesProgressResponse {
    series_id: Uuid,
    videos_completed: i32,
    total_videos: i32,
    series_progress: f64,
    updated_at: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /series/:id` — Series details plus whether the caller may view it.
async fn get_series(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let series = find_listed_series(&state, viewer.as_ref(), id).await?;
    let accessible = can_view(viewer.as_ref(), &series, state.clock.now());

    Ok(Json(SeriesResponse {
        id: series.id,
        category_id: series.category_id,
        instructor_id: series.instructor_id,
        title: series.title,
        slug: series.slug,
        description: series.description,
        visibility: series.visibility,
        status: series.status,
        video_count: series.video_count,
        total_duration: series.total_duration,
        total_views: series.total_views,
        rating: series.rating,
        rating_count: series.rating_count,
        accessible,
    }))
}

/// `GET /series/:id/videos` — Episodes in playback order, each with its own access flag.
async fn list_videos(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    find_listed_series(&state, viewer.as_ref(), id).await?;

    let now = state.clock.now();
    let show_drafts = viewer.as_ref().is_some_and(is_admin);

    let videos: Vec<VideoSummaryResponse> = CatalogService::list_series_videos(&state.db, id)
        .await?
        .into_iter()
        .filter(|v| show_drafts || is_published(&v.status))
        .map(|v| {
            let accessible = can_view(viewer.as_ref(), &v, now);
            to_video_summary(v, accessible)
        })
        .collect();

    Ok(Json(videos))
}

/// `GET /series/:id/progress` — The caller's rollup for this series.
async fn get_series_progress(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let progress = ProgressService::series_progress(&state.db, user.id, id).await?;

    let response = match progress {
        Some(p) => SeriesProgressResponse {
            series_id: p.series_id,
            videos_completed: p.videos_completed,
            total_videos: p.total_videos,
            series_progress: p.series_progress,
            updated_at: Some(p.updated_at.to_rfc3339()),
        },
        None => {
            let series = CatalogService::find_series(&state.db, id).await?;
            SeriesProgressResponse {
                series_id: series.id,
                videos_completed: 0,
                total_videos: series.video_count,
                series_progress: 0.0,
                updated_at: None,
            }
        }
    };

    Ok(Json(response))
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Unpublished series are hidden (404) from everyone but admins.
async fn find_listed_series(
    state: &AppState,
    viewer: Option<&user::Model>,
    id: Uuid,
) -> Result<series::Model, AppError> {
    let series = CatalogService::find_series(&state.db, id).await?;
    if !is_published(&series.status) && !viewer.is_some_and(is_admin) {
        return Err(AppError::NotFound(format!("Series {id} not found")));
    }
    Ok(series)
}

pub(super) fn is_published(status: &str) -> bool {
    ContentStatus::from_str(status).is_some_and(|s| s.is_published())
}

fn to_video_summary(video: video::Model, accessible: bool) -> VideoSummaryResponse {
    VideoSummaryResponse {
        id: video.id,
        title: video.title,
        slug: video.slug,
        visibility: video.visibility,
        duration: video.duration,
        episode_number: video.episode_number,
        sort_order: video.sort_order,
        views: video.views,
        rating: video.rating,
        accessible,
    }
}
