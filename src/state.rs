use std::{path::PathBuf, sync::Arc};

use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::scanner::Scanner;

/// The shared application state.
///
/// Cloned into every handler. The scanner is the only owner of the scan
/// status; handlers reach it through [`Scanner::status`] and
/// [`Scanner::trigger_scan`].
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool.
    pub db: sqlx::SqlitePool,
    /// The application configuration.
    pub config: Arc<AppConfig>,
    /// Library scanner bound to `config.library.root_path`.
    pub scanner: Scanner,
    /// Process-wide counters.
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(db: sqlx::SqlitePool, config: AppConfig) -> Self {
        let metrics = Metrics::new();
        let scanner =
            Scanner::new(db.clone(), config.library.root_path.clone(), config.scanner.clone(), metrics.clone());
        Self { db, config: Arc::new(config), scanner, metrics }
    }

    pub fn library_root(&self) -> PathBuf {
        self.config.library.root_path.clone()
    }
}
