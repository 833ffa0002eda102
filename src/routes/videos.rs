use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::{can_view, is_admin};
use crate::auth::middleware::{AuthUser, OptionalAuth};
use crate::entities::{user, video, video_progress};
use crate::error::AppError;
use crate::services::{CatalogService, ProgressService, WatchReport};
use crate::state::AppState;

use super::series::is_published;

/// Video router: `/videos/...`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/access", get(check_access))
        .route("/{id}/play", post(start_playback))
        .route("/{id}/progress", post(report_progress).get(get_progress))
        .route("/{id}/rating", put(rate_video))
        .route("/{id}/favorite", post(toggle_favorite))
}

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WatchReportRequest {
    time_watched: i64,
    video_duration: Option<i64>,
}

#[derive(Deserialize)]
struct RateRequest {
    rating: i16,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AccessResponse {
    video_id: Uuid,
    visibility: String,
    accessible: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaybackResponse {
    video_id: Uuid,
    duration: i64,
    resume_position: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgressResponse {
    video_id: Uuid,
    series_id: Uuid,
    progress_percentage: i32,
    time_watched: i64,
    last_position: i64,
    video_duration: i64,
    is_completed: bool,
    completed_at: Option<String>,
    watch_count: i32,
    total_watch_time: i64,
    rating: Option<i16>,
    is_favorite: bool,
    first_watched_at: Option<String>,
    last_watched_at: Option<String>,
}

impl From<video_progress::Model> for ProgressResponse {
    fn from(p: video_progress::Model) -> Self {
        Self {
            video_id: p.video_id,
            series_id: p.series_id,
            progress_percentage: p.progress_percentage,
            time_watched: p.time_watched,
            last_position: p.last_position,
            video_duration: p.video_duration,
            is_completed: p.is_completed,
            completed_at: p.completed_at.map(|t| t.to_rfc3339()),
            watch_count: p.watch_count,
            total_watch_time: p.total_watch_time,
            rating: p.rating,
            is_favorite: p.is_favorite,
            first_watched_at: p.first_watched_at.map(|t| t.to_rfc3339()),
            last_watched_at: p.last_watched_at.map(|t| t.to_rfc3339()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /videos/:id/access` — Entitlement decision for the caller (or an anonymous visitor).
async fn check_access(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let video = find_released_video(&state, viewer.as_ref(), id).await?;
    let accessible = can_view(viewer.as_ref(), &video, state.clock.now());

    Ok(Json(AccessResponse {
        video_id: video.id,
        visibility: video.visibility,
        accessible,
    }))
}

/// `POST /videos/:id/play` — Authorize playback, count a view and return the resume point.
async fn start_playback(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let video = find_released_video(&state, Some(&user), id).await?;
    if !can_view(Some(&user), &video, state.clock.now()) {
        return Err(AppError::Forbidden(format!(
            "A {} subscription is required to watch this video",
            video.visibility
        )));
    }

    let video = CatalogService::record_view(&state.db, state.clock.as_ref(), id).await?;
    let resume_position = ProgressService::video_progress(&state.db, user.id, id)
        .await?
        .map_or(0, |p| p.last_position);

    Ok(Json(PlaybackResponse {
        video_id: video.id,
        duration: video.duration,
        resume_position,
    }))
}

/// `POST /videos/:id/progress` — Record a watch report.
async fn report_progress(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<WatchReportRequest>,
) -> Result<impl IntoResponse, AppError> {
    let progress = ProgressService::record_watch(
        &state.db,
        state.clock.as_ref(),
        user.id,
        id,
        WatchReport {
            time_watched: req.time_watched,
            video_duration: req.video_duration,
        },
    )
    .await?;

    Ok(Json(ProgressResponse::from(progress)))
}

/// `GET /videos/:id/progress` — The caller's progress, or `null` if not started.
async fn get_progress(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let progress = ProgressService::video_progress(&state.db, user.id, id).await?;
    Ok(Json(progress.map(ProgressResponse::from)))
}

/// `PUT /videos/:id/rating` — Rate a video from 1 to 5.
async fn rate_video(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<RateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let progress =
        ProgressService::rate_video(&state.db, state.clock.as_ref(), user.id, id, req.rating)
            .await?;
    Ok(Json(ProgressResponse::from(progress)))
}

/// `POST /videos/:id/favorite` — Toggle the favourite flag.
async fn toggle_favorite(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let progress =
        ProgressService::toggle_favorite(&state.db, state.clock.as_ref(), user.id, id).await?;
    Ok(Json(ProgressResponse::from(progress)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// A video is only offered to non-admins once it and its series are published;
/// anything else answers 404, as series lookups do.
async fn find_released_video(
    state: &AppState,
    viewer: Option<&user::Model>,
    id: Uuid,
) -> Result<video::Model, AppError> {
    let video = CatalogService::find_video(&state.db, id).await?;
    if viewer.is_some_and(is_admin) {
        return Ok(video);
    }

    let series = CatalogService::find_series(&state.db, video.series_id).await?;
    if !is_published(&video.status) || !is_published(&series.status) {
        return Err(AppError::NotFound(format!("Video {id} not found")));
    }
    Ok(video)
}
