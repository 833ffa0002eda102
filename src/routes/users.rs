use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::effective_tier;
use crate::auth::middleware::AuthUser;
use crate::entities::subscription;
use crate::error::AppError;
use crate::services::{ProgressService, SubscriptionService};
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Build the user route group: `/users/...`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me/stats", get(get_stats))
        .route("/me/favorites", get(list_favorites))
        .route(
            "/me/subscription",
            get(get_subscription)
                .post(subscribe)
                .delete(cancel_subscription),
        )
}

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FavoriteResponse {
    id: Uuid,
    series_id: Uuid,
    title: String,
    duration: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscribeRequest {
    plan_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionResponse {
    effective_tier: String,
    subscription: Option<SubscriptionInfo>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionInfo {
    id: Uuid,
    plan_id: Uuid,
    status: String,
    starts_at: String,
    expires_at: Option<String>,
    cancelled_at: Option<String>,
}

impl From<subscription::Model> for SubscriptionInfo {
    fn from(s: subscription::Model) -> Self {
        Self {
            id: s.id,
            plan_id: s.plan_id,
            status: s.status,
            starts_at: s.starts_at.to_rfc3339(),
            expires_at: s.expires_at.map(|t| t.to_rfc3339()),
            cancelled_at: s.cancelled_at.map(|t| t.to_rfc3339()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /users/me/stats` — Learning statistics, computed fresh.
async fn get_stats(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let stats = ProgressService::user_stats(&state.db, user.id).await?;
    Ok(Json(stats))
}

/// `GET /users/me/favorites` — Favourite videos.
async fn list_favorites(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let favorites: Vec<FavoriteResponse> = ProgressService::favorites(&state.db, user.id)
        .await?
        .into_iter()
        .map(|v| FavoriteResponse {
            id: v.id,
            series_id: v.series_id,
            title: v.title,
            duration: v.duration,
        })
        .collect();
    Ok(Json(favorites))
}

/// `GET /users/me/subscription` — Effective tier and the active subscription, if any.
async fn get_subscription(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let now = state.clock.now();
    let active =
        SubscriptionService::active_subscription(&state.db, state.clock.as_ref(), user.id).await?;

    Ok(Json(SubscriptionResponse {
        effective_tier: effective_tier(&user, now).to_string(),
        subscription: active.map(SubscriptionInfo::from),
    }))
}

/// `POST /users/me/subscription` — Subscribe to a plan.
async fn subscribe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<SubscribeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let created =
        SubscriptionService::subscribe(&state.db, state.clock.as_ref(), user.id, req.plan_id)
            .await?;
    Ok((StatusCode::CREATED, Json(SubscriptionInfo::from(created))))
}

/// `DELETE /users/me/subscription` — Cancel the active subscription.
async fn cancel_subscription(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let active = SubscriptionService::active_subscription(&state.db, state.clock.as_ref(), user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("No active subscription".to_string()))?;

    let cancelled = SubscriptionService::cancel(&state.db, state.clock.as_ref(), active.id).await?;
    Ok(Json(SubscriptionInfo::from(cancelled)))
}
