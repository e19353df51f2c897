//! Data layer module
//!
//! Handles connection bootstrap and the persistent data models:
//! - SQLite pool setup and migrations
//! - User and provider models

mod database;
mod models;

pub use database::Database;
pub use models::*;
