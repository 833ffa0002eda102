mod health;
mod series;
mod users;
mod videos;

use axum::Router;

use crate::state::AppState;

/// Build the complete application router.
///
/// Structure:
/// - `GET /health` — lightweight liveness check
/// - `/api/v1/health` — health check with database connectivity
/// - `/api/v1/series/...` — series details, episode listing, series progress
/// - `/api/v1/videos/...` — access checks, watch reports, ratings, favourites
/// - `/api/v1/users/...` — learning statistics and favourites
pub fn router() -> Router<AppState> {
    let api_v1 = Router::new()
        .merge(health::api_router())
        .nest("/series", series::router())
        .nest("/videos", videos::router())
        .nest("/users", users::router());

    Router::new()
        .merge(health::root_router())
        .nest("/api/v1", api_v1)
}
