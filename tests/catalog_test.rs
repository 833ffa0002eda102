//! Series aggregates and the cascade from video edits into learner rollups.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use learnstream_api::entities::ContentStatus;
use learnstream_api::error::AppError;
use learnstream_api::services::{CatalogService, NewVideo, ProgressService, VideoChanges, WatchReport};

use common::TestContext;

fn watched(seconds: i64) -> WatchReport {
    WatchReport {
        time_watched: seconds,
        video_duration: None,
    }
}

#[tokio::test]
async fn new_series_starts_with_zeroed_stats() {
    let ctx = TestContext::new().await;
    let series = ctx.series("Pattern Matching", "basic").await;

    assert_eq!(series.slug, "pattern-matching");
    assert_eq!(series.visibility, "basic");
    assert_eq!(series.video_count, 0);
    assert_eq!(series.total_duration, 0);
    assert!(series.rating.abs() < f64::EPSILON);
}

#[tokio::test]
async fn creating_videos_refreshes_series_stats() {
    let ctx = TestContext::new().await;
    let series = ctx.series("Lifetimes", "freemium").await;

    ctx.video(series.id, "Elision", 600).await;
    ctx.video(series.id, "Variance", 300).await;
    ctx.video_with(series.id, "Draft Notes", 900, "freemium", ContentStatus::Draft)
        .await;

    let series = CatalogService::find_series(&ctx.db, series.id).await.unwrap();
    assert_eq!(series.video_count, 2);
    assert_eq!(series.total_duration, 900);
}

#[tokio::test]
async fn deleting_the_last_video_zeroes_everything() {
    let ctx = TestContext::new().await;
    let learner = ctx.user("pat", "freemium", None).await;
    let series = ctx.series("Smart Pointers", "freemium").await;
    let video = ctx.video(series.id, "Box", 600).await;

    ProgressService::record_watch(&ctx.db, &ctx.clock, learner.id, video.id, watched(600))
        .await
        .unwrap();
    CatalogService::record_view(&ctx.db, &ctx.clock, video.id)
        .await
        .unwrap();

    let series = CatalogService::delete_video(&ctx.db, &ctx.clock, video.id)
        .await
        .unwrap();
    assert_eq!(series.video_count, 0);
    assert_eq!(series.total_duration, 0);
    assert_eq!(series.total_views, 0);
    assert!(series.rating.abs() < f64::EPSILON);

    let rollup = ProgressService::series_progress(&ctx.db, learner.id, series.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rollup.videos_completed, 0);
    assert_eq!(rollup.total_videos, 0);
    assert!(rollup.series_progress.abs() < f64::EPSILON);

    let missing = CatalogService::find_video(&ctx.db, video.id).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn publishing_a_video_lowers_existing_rollups() {
    let ctx = TestContext::new().await;
    let learner = ctx.user("quinn", "freemium", None).await;
    let series = ctx.series("Concurrency", "freemium").await;
    let threads = ctx.video(series.id, "Threads", 300).await;
    let channels = ctx
        .video_with(series.id, "Channels", 300, "freemium", ContentStatus::Draft)
        .await;

    ProgressService::record_watch(&ctx.db, &ctx.clock, learner.id, threads.id, watched(300))
        .await
        .unwrap();
    let before = ProgressService::series_progress(&ctx.db, learner.id, series.id)
        .await
        .unwrap()
        .unwrap();
    assert!((before.series_progress - 100.0).abs() < 1e-9);

    CatalogService::update_video(
        &ctx.db,
        &ctx.clock,
        channels.id,
        VideoChanges {
            status: Some(ContentStatus::Published),
            ..VideoChanges::default()
        },
    )
    .await
    .unwrap();

    let after = ProgressService::series_progress(&ctx.db, learner.id, series.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.total_videos, 2);
    assert!((after.series_progress - 50.0).abs() < 1e-9);

    let series = CatalogService::find_series(&ctx.db, series.id).await.unwrap();
    assert_eq!(series.video_count, 2);
    assert_eq!(series.total_duration, 600);
}

#[tokio::test]
async fn moving_a_video_refreshes_both_series() {
    let ctx = TestContext::new().await;
    let learner = ctx.user("rae", "freemium", None).await;
    let from = ctx.series("Modules", "freemium").await;
    let to = ctx.series("Crates", "freemium").await;
    let video = ctx.video(from.id, "Visibility", 400).await;
    ctx.video(to.id, "Publishing", 200).await;

    ProgressService::record_watch(&ctx.db, &ctx.clock, learner.id, video.id, watched(400))
        .await
        .unwrap();

    let moved = CatalogService::update_video(
        &ctx.db,
        &ctx.clock,
        video.id,
        VideoChanges {
            series_id: Some(to.id),
            ..VideoChanges::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(moved.series_id, to.id);

    let from = CatalogService::find_series(&ctx.db, from.id).await.unwrap();
    let to = CatalogService::find_series(&ctx.db, to.id).await.unwrap();
    assert_eq!(from.video_count, 0);
    assert_eq!(to.video_count, 2);
    assert_eq!(to.total_duration, 600);

    let progress = ProgressService::video_progress(&ctx.db, learner.id, video.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(progress.series_id, to.id);

    let old_rollup = ProgressService::series_progress(&ctx.db, learner.id, from.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(old_rollup.videos_completed, 0);
    assert_eq!(old_rollup.total_videos, 0);

    let rollup = ProgressService::series_progress(&ctx.db, learner.id, to.id)
        .await
        .unwrap()
        .expect("moving a watched video creates a rollup in the new series");
    assert_eq!(rollup.videos_completed, 1);
    assert_eq!(rollup.total_videos, 2);
    assert!((rollup.series_progress - 50.0).abs() < 1e-9);
}

#[tokio::test]
async fn moving_a_completed_video_into_an_empty_series_completes_it() {
    let ctx = TestContext::new().await;
    let learner = ctx.user("rory", "freemium", None).await;
    let from = ctx.series("Old Home", "freemium").await;
    let to = ctx.series("New Home", "freemium").await;
    let video = ctx.video(from.id, "Wanderer", 300).await;

    ProgressService::record_watch(&ctx.db, &ctx.clock, learner.id, video.id, watched(300))
        .await
        .unwrap();

    CatalogService::update_video(
        &ctx.db,
        &ctx.clock,
        video.id,
        VideoChanges {
            series_id: Some(to.id),
            ..VideoChanges::default()
        },
    )
    .await
    .unwrap();

    let rollup = ProgressService::series_progress(&ctx.db, learner.id, to.id)
        .await
        .unwrap()
        .expect("rollup for the new series");
    assert_eq!(rollup.videos_completed, 1);
    assert_eq!(rollup.total_videos, 1);
    assert!((rollup.series_progress - 100.0).abs() < 1e-9);

    let stats = ProgressService::user_stats(&ctx.db, learner.id).await.unwrap();
    assert_eq!(stats.videos_completed, 1);
    assert_eq!(stats.series_started, 1);
    assert_eq!(stats.series_completed, 1);
}

#[tokio::test]
async fn moving_a_favourited_video_creates_no_rollup() {
    let ctx = TestContext::new().await;
    let learner = ctx.user("sol", "freemium", None).await;
    let from = ctx.series("Bookmarks", "freemium").await;
    let to = ctx.series("Archive Shelf", "freemium").await;
    let video = ctx.video(from.id, "Saved", 300).await;

    ProgressService::toggle_favorite(&ctx.db, &ctx.clock, learner.id, video.id)
        .await
        .unwrap();
    CatalogService::update_video(
        &ctx.db,
        &ctx.clock,
        video.id,
        VideoChanges {
            series_id: Some(to.id),
            ..VideoChanges::default()
        },
    )
    .await
    .unwrap();

    assert!(
        ProgressService::series_progress(&ctx.db, learner.id, to.id)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn views_roll_into_series_total() {
    let ctx = TestContext::new().await;
    let series = ctx.series("Cargo", "freemium").await;
    let a = ctx.video(series.id, "Workspaces", 100).await;
    let b = ctx.video(series.id, "Features", 100).await;

    CatalogService::record_view(&ctx.db, &ctx.clock, a.id).await.unwrap();
    CatalogService::record_view(&ctx.db, &ctx.clock, a.id).await.unwrap();
    let b = CatalogService::record_view(&ctx.db, &ctx.clock, b.id).await.unwrap();
    assert_eq!(b.views, 1);

    let series = CatalogService::find_series(&ctx.db, series.id).await.unwrap();
    assert_eq!(series.total_views, 3);

    let missing = CatalogService::record_view(&ctx.db, &ctx.clock, uuid::Uuid::new_v4()).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn invalid_catalog_input_is_rejected() {
    let ctx = TestContext::new().await;
    let series = ctx.series("Serde", "freemium").await;
    ctx.video(series.id, "Derive", 100).await;

    let new_video = |title: &str, visibility: &str, duration: i64| NewVideo {
        series_id: series.id,
        title: title.to_string(),
        slug: None,
        description: None,
        visibility: visibility.to_string(),
        status: ContentStatus::Published,
        duration,
        episode_number: 2,
        sort_order: 1,
    };

    let duplicate =
        CatalogService::create_video(&ctx.db, &ctx.clock, new_video("Derive", "freemium", 100)).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let admin_only =
        CatalogService::create_video(&ctx.db, &ctx.clock, new_video("Custom", "admin", 100)).await;
    assert!(matches!(admin_only, Err(AppError::BadRequest(_))));

    let negative =
        CatalogService::create_video(&ctx.db, &ctx.clock, new_video("Custom", "basic", -5)).await;
    assert!(matches!(negative, Err(AppError::BadRequest(_))));

    let duplicate_category = CatalogService::create_category(&ctx.db, &ctx.clock, "Serde category", None).await;
    assert!(matches!(duplicate_category, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn videos_list_in_playback_order() {
    let ctx = TestContext::new().await;
    let series = ctx.series("Error Handling", "freemium").await;

    for (title, sort_order) in [("Third", 3), ("First", 1), ("Second", 2)] {
        CatalogService::create_video(
            &ctx.db,
            &ctx.clock,
            NewVideo {
                series_id: series.id,
                title: title.to_string(),
                slug: None,
                description: None,
                visibility: "freemium".to_string(),
                status: ContentStatus::Published,
                duration: 60,
                episode_number: sort_order,
                sort_order,
            },
        )
        .await
        .unwrap();
    }

    let titles: Vec<String> = CatalogService::list_series_videos(&ctx.db, series.id)
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.title)
        .collect();
    assert_eq!(titles, ["First", "Second", "Third"]);
}
