//! Library entrypoint for FundWatch.
//!
//! This file exists mainly to make tests easy (integration tests under
//! `tests/` can import the app state, routers, controllers, services).

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod models;

#[path = "middleware/auth.rs"]
pub mod auth;

pub mod services;
pub mod templates;

pub mod controllers;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    // None when running on in-memory stores
    pub db: Option<mongodb::Database>,
    pub orchestrator: Arc<services::orchestrator::AlertOrchestrator>,
}
