//! LearnStream API - backend for a subscription video-learning platform
//!
//! This crate provides:
//! - Tier-based entitlement checks for series and videos
//! - Per-user watch progress with series rollups
//! - Catalog aggregates (durations, views, ratings) kept in step with edits
//! - Subscription plans that drive a user's tier

pub mod access;
pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
