//! GameLend server
//!
//! REST JSON API for a board-game lending community: members catalog their
//! games, borrow each other's copies through a request and lending lifecycle,
//! host game nights and review the games they played.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
