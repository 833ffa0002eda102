//! Shared harness: in-memory SQLite, a fixed clock and seed helpers.

#![allow(dead_code, clippy::expect_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Duration, TimeZone, Utc};
use http_body_util::BodyExt;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tower::ServiceExt;
use uuid::Uuid;

use learnstream_api::clock::FixedClock;
use learnstream_api::config::{Config, Environment};
use learnstream_api::entities::{category, series, user, video, ContentStatus};
use learnstream_api::services::{CatalogService, NewSeries, NewVideo};
use learnstream_api::state::AppState;

pub const JWT_SECRET: &str = "test-secret-key-for-testing-only-32chars";

pub struct TestContext {
    pub db: DatabaseConnection,
    pub clock: FixedClock,
}

impl TestContext {
    /// Fresh migrated database with the clock set to 2026-01-15 12:00 UTC.
    pub async fn new() -> Self {
        let db = learnstream_api::db::connect("sqlite::memory:")
            .await
            .expect("connect to in-memory sqlite");
        Migrator::up(&db, None).await.expect("run migrations");

        Self {
            db,
            clock: FixedClock::new(start_time()),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        use learnstream_api::clock::Clock;
        self.clock.now()
    }

    pub fn state(&self) -> AppState {
        AppState {
            db: self.db.clone(),
            config: test_config(),
            clock: Arc::new(self.clock.clone()),
        }
    }

    pub fn app(&self) -> Router {
        learnstream_api::routes::router().with_state(self.state())
    }

    /// Insert a user with the given subscription type and optional expiry offset from now.
    pub async fn user(&self, name: &str, tier: &str, expires_in: Option<Duration>) -> user::Model {
        let now = self.now();
        user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(format!("{name}@example.com")),
            username: Set(name.to_string()),
            display_name: Set(None),
            role: Set("user".to_string()),
            subscription_type: Set(tier.to_string()),
            subscription_expires_at: Set(expires_in.map(|d| (now + d).into())),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&self.db)
        .await
        .expect("insert user")
    }

    pub async fn admin(&self, name: &str) -> user::Model {
        let mut active: user::ActiveModel = self.user(name, "freemium", None).await.into();
        active.role = Set("admin".to_string());
        active.update(&self.db).await.expect("promote admin")
    }

    pub async fn category(&self, name: &str) -> category::Model {
        CatalogService::create_category(&self.db, &self.clock, name, None)
            .await
            .expect("create category")
    }

    /// A published series in a fresh category, taught by a fresh instructor.
    pub async fn series(&self, title: &str, visibility: &str) -> series::Model {
        self.series_with_status(title, visibility, ContentStatus::Published)
            .await
    }

    pub async fn series_with_status(
        &self,
        title: &str,
        visibility: &str,
        status: ContentStatus,
    ) -> series::Model {
        let category = self.category(&format!("{title} category")).await;
        let instructor = self
            .user(&format!("{}-instructor", learnstream_api::utils::slugify(title)), "freemium", None)
            .await;

        CatalogService::create_series(
            &self.db,
            &self.clock,
            NewSeries {
                category_id: category.id,
                instructor_id: instructor.id,
                title: title.to_string(),
                slug: None,
                description: None,
                visibility: visibility.to_string(),
                status,
            },
        )
        .await
        .expect("create series")
    }

    /// A published video appended to `series_id`.
    pub async fn video(&self, series_id: Uuid, title: &str, duration: i64) -> video::Model {
        self.video_with(series_id, title, duration, "freemium", ContentStatus::Published)
            .await
    }

    pub async fn video_with(
        &self,
        series_id: Uuid,
        title: &str,
        duration: i64,
        visibility: &str,
        status: ContentStatus,
    ) -> video::Model {
        CatalogService::create_video(
            &self.db,
            &self.clock,
            NewVideo {
                series_id,
                title: title.to_string(),
                slug: None,
                description: None,
                visibility: visibility.to_string(),
                status,
                duration,
                episode_number: 1,
                sort_order: 0,
            },
        )
        .await
        .expect("create video")
    }

    /// Bearer token for `user`, minted against wall-clock time so it validates.
    pub fn token(&self, user: &user::Model) -> String {
        learnstream_api::auth::jwt::create_access_token(
            user.id,
            &user.role,
            &test_config(),
            Utc::now(),
        )
        .expect("mint token")
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub fn test_config() -> Config {
    Config {
        database_url: String::new(),
        server_host: std::net::IpAddr::from([127, 0, 0, 1]),
        server_port: 0,
        environment: Environment::Development,
        log_level: "warn".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_access_expiration_secs: 900,
        frontend_url: "http://localhost:3001".to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP helpers
// ─────────────────────────────────────────────────────────────────────────────

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap_or_default();

    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .unwrap_or_default();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);

    (status, json)
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<&serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap_or_default(),
        None => builder.body(Body::empty()).unwrap_or_default(),
    }
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, request("GET", uri, None, None)).await
}

pub async fn get_with_auth(app: &Router, uri: &str, token: &str) -> (StatusCode, serde_json::Value) {
    send(app, request("GET", uri, Some(token), None)).await
}

pub async fn post_with_auth(app: &Router, uri: &str, token: &str) -> (StatusCode, serde_json::Value) {
    send(app, request("POST", uri, Some(token), None)).await
}

pub async fn post_json_with_auth(
    app: &Router,
    uri: &str,
    token: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, request("POST", uri, Some(token), Some(body))).await
}

pub async fn post_json(app: &Router, uri: &str, body: &serde_json::Value) -> (StatusCode, serde_json::Value) {
    send(app, request("POST", uri, None, Some(body))).await
}

pub async fn put_json_with_auth(
    app: &Router,
    uri: &str,
    token: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, request("PUT", uri, Some(token), Some(body))).await
}

pub async fn delete_with_auth(app: &Router, uri: &str, token: &str) -> (StatusCode, serde_json::Value) {
    send(app, request("DELETE", uri, Some(token), None)).await
}
