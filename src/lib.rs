//! # Modellwald Backend Library
//!
//! Modellwald keeps a SQLite catalog in sync with a directory tree of 3D-model
//! folders and can fold two catalogued models into one.
//!
//! ## Architecture
//!
//! - **Axum**: HTTP server and routing
//! - **SQLx**: asynchronous SQLite access
//! - **Tokio**: async runtime, blocking pool for filesystem work
//! - **Serde**: JSON for the API
//!
//! ## Core Components
//!
//! - [`config`]: layered application configuration
//! - [`db`]: schema initialization and migrations
//! - [`catalog`]: repository functions for categories, models, files, tags and settings
//! - [`scanner`]: the folder scanner, its classification rules, status and scheduler
//! - [`merge`]: merging two models and moving a model to a new path
//! - [`error`]: HTTP error responses
//! - [`metrics`]: process counters
//! - [`middleware`]: request validation
//! - [`routes`]: HTTP handlers
//! - [`state`]: shared application state
//! - [`types`]: catalog rows and DTOs

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod merge;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod scanner;
pub mod state;
pub mod types;

#[cfg(test)]
mod tests;
