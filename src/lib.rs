//! BiblioTech library management server
//!
//! A REST JSON API letting each account manage its own book catalog,
//! members, loans and late-return fines, with email verification,
//! password reset by code and scheduled database snapshots.

use std::sync::Arc;

pub mod api;
pub mod cli;
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
