//! Der Scanner: gleicht den Modellordner-Baum mit dem Katalog ab.
//!
//! One pass rebuilds the category tree, upserts every model leaf, stamps it
//! with the pass watermark and finally deletes all models the pass did not
//! visit. Passes never overlap; see [`Scanner::trigger_scan`].

pub mod probe;
pub mod rules;
pub mod scheduler;
pub mod status;

use std::{path::PathBuf, sync::Arc};

use sqlx::SqlitePool;
use tokio::sync::watch;
use tokio::task;
use tracing::{debug, error, info, warn};

use crate::catalog::{self, categories, files, models, settings};
use crate::config::ScannerConfig;
use crate::metrics::Metrics;
use crate::types::{ScanStatus, ScanSummary};

use probe::SearchLimits;
use rules::{DirClass, Rules};
use status::StatusCell;

struct Inner {
    pool: SqlitePool,
    root: PathBuf,
    defaults: ScannerConfig,
    status: StatusCell,
    metrics: Metrics,
}

/// Cheap to clone; all clones share one status and one running flag.
#[derive(Clone)]
pub struct Scanner {
    inner: Arc<Inner>,
}

/// A directory waiting to be visited.
struct Frame {
    path: PathBuf,
    rel: String,
    depth: i64,
    category_id: Option<i64>,
}

impl Scanner {
    pub fn new(pool: SqlitePool, root: impl Into<PathBuf>, defaults: ScannerConfig, metrics: Metrics) -> Self {
        Self {
            inner: Arc::new(Inner { pool, root: root.into(), defaults, status: StatusCell::new(), metrics }),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    pub fn root(&self) -> &std::path::Path {
        &self.inner.root
    }

    /// Starts a pass in the background. A no-op returning `false` while one is running.
    pub fn trigger_scan(&self) -> bool {
        if !self.inner.status.try_begin() {
            debug!("Scan already running, trigger ignored");
            return false;
        }
        let this = self.clone();
        tokio::spawn(async move {
            this.execute_pass().await;
        });
        true
    }

    /// Runs a pass on the current task. `None` if another pass is running.
    pub async fn run_pass(&self) -> Option<ScanSummary> {
        if !self.inner.status.try_begin() {
            return None;
        }
        Some(self.execute_pass().await)
    }

    pub fn status(&self) -> ScanStatus {
        self.inner.status.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanStatus> {
        self.inner.status.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.inner.status.is_running()
    }

    async fn load_rules(&self) -> Result<Rules, regex::Error> {
        let pool = &self.inner.pool;
        let d = &self.inner.defaults;
        let ignored = settings::get_string(pool, settings::IGNORED_FOLDER_NAMES, &d.ignored_folder_names).await;
        let excluded = settings::get_string(pool, settings::EXCLUDED_FOLDERS, &d.excluded_folders).await;
        let min_depth = settings::get_int(pool, settings::SCANNER_MIN_DEPTH, d.min_depth).await;
        Rules::new(&ignored, &excluded, min_depth)
    }

    /// Strictly above every watermark handed out before.
    async fn next_watermark(&self) -> i64 {
        let now = models::now_micros();
        match models::max_scanned_at(&self.inner.pool).await {
            Ok(Some(max)) => now.max(max + 1),
            Ok(None) => now,
            Err(e) => {
                warn!("Failed to read last watermark: {}", e);
                now
            }
        }
    }

    async fn execute_pass(&self) -> ScanSummary {
        let status = &self.inner.status;
        self.inner.metrics.inc_scans_started();
        let started = std::time::Instant::now();

        let rules = match self.load_rules().await {
            Ok(r) => Arc::new(r),
            Err(e) => {
                error!("Invalid folder rules, scan aborted: {}", e);
                status.finish(format!("Scan failed: {}", e));
                return ScanSummary::default();
            }
        };
        let limits = SearchLimits {
            model_depth: self.inner.defaults.model_search_depth,
            thumbnail_depth: self.inner.defaults.thumbnail_search_depth,
        };
        let watermark = self.next_watermark().await;
        info!(root = %self.inner.root.display(), min_depth = rules.min_depth(), "Scan started");

        status.set_message("Scanning directories...");
        let mut summary = ScanSummary { watermark, ..Default::default() };

        let root = self.inner.root.clone();
        let root_listing = {
            let root = root.clone();
            task::spawn_blocking(move || probe::list_dir(&root)).await
        };
        let root_subdirs = match root_listing {
            Ok(Ok(listing)) => listing.subdirs,
            Ok(Err(e)) => {
                error!("Cannot read library root {}: {}", root.display(), e);
                status.finish(format!("Scan failed: cannot read {}", root.display()));
                return summary;
            }
            Err(e) => {
                error!("Root listing task failed: {}", e);
                status.finish("Scan failed");
                return summary;
            }
        };

        // An unreadable root leaves the old tree in place
        if let Err(e) = categories::delete_all(&self.inner.pool).await {
            warn!("Failed to clear category tree: {}", e);
        }

        let mut stack: Vec<Frame> = Vec::new();
        push_children(&mut stack, &root, "", &root_subdirs, 0, None);

        while let Some(frame) = stack.pop() {
            summary.total += 1;
            status.update(|s| s.total = summary.total);

            let probed = {
                let dir = frame.path.clone();
                let depth = frame.depth;
                let rules = rules.clone();
                task::spawn_blocking(move || probe::probe_dir(&dir, depth, &rules, limits)).await
            };
            let probed = match probed {
                Ok(Ok(p)) => p,
                Ok(Err(e)) => {
                    warn!("Skipping unreadable directory {}: {}", frame.rel, e);
                    continue;
                }
                Err(e) => {
                    warn!("Probe task for {} failed: {}", frame.rel, e);
                    continue;
                }
            };

            match probed.class {
                DirClass::Excluded => {
                    debug!("Excluded: {}", frame.rel);
                }
                DirClass::Category => {
                    let category_id = match self.ensure_category(&frame).await {
                        Ok(id) => id,
                        Err(e) => {
                            // subtree is dropped for this pass
                            warn!("Failed to store category {}, skipping branch: {}", frame.rel, e);
                            continue;
                        }
                    };
                    push_children(
                        &mut stack,
                        &frame.path,
                        &frame.rel,
                        &probed.subdirs,
                        frame.depth + 1,
                        Some(category_id),
                    );
                }
                DirClass::ModelLeaf(detection) => {
                    status.set_message(format!("Processing: {}", frame.rel));
                    debug!(path = %frame.rel, ?detection, "Model leaf");
                    match self.upsert_model(&frame, watermark, limits).await {
                        Ok(created) => {
                            summary.processed += 1;
                            if created {
                                summary.new += 1;
                            }
                            status.update(|s| {
                                s.processed = summary.processed;
                                s.new = summary.new;
                            });
                        }
                        Err(e) => warn!("Failed to store model {}: {:#}", frame.rel, e),
                    }
                }
                DirClass::Unclassified => {
                    push_children(
                        &mut stack,
                        &frame.path,
                        &frame.rel,
                        &probed.subdirs,
                        frame.depth + 1,
                        frame.category_id,
                    );
                }
            }
        }

        status.set_message("Cleaning up removed models...");
        summary.removed = match self.delete_stale(watermark).await {
            Ok(n) => n,
            Err(e) => {
                error!("Stale model cleanup failed: {}", e);
                0
            }
        };
        status.update(|s| s.removed = summary.removed);

        if let Err(e) =
            settings::set(&self.inner.pool, settings::LAST_SCAN_AT, &chrono::Utc::now().to_rfc3339()).await
        {
            warn!("Failed to record last_scan_at: {}", e);
        }

        self.inner.metrics.inc_scans_completed();
        self.inner.metrics.add_models_created(summary.new);
        self.inner.metrics.add_models_removed(summary.removed);
        info!(
            dirs = summary.total,
            models = summary.processed,
            new = summary.new,
            removed = summary.removed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Scan finished"
        );
        status.finish(format!("Scan complete. {} new, {} removed.", summary.new, summary.removed));
        summary
    }

    async fn ensure_category(&self, frame: &Frame) -> Result<i64, sqlx::Error> {
        let pool = &self.inner.pool;
        if let Some(existing) = categories::find_by_path(pool, &frame.rel).await? {
            return Ok(existing.id);
        }
        let name = catalog::base_name(&frame.rel);
        categories::create(pool, name, &frame.rel, frame.category_id, frame.depth).await
    }

    /// Returns true if a new model row was created.
    async fn upsert_model(&self, frame: &Frame, watermark: i64, limits: SearchLimits) -> anyhow::Result<bool> {
        let pool = &self.inner.pool;
        let root = self.inner.root.clone();
        let dir = frame.path.clone();

        if let Some(existing) = models::find_by_path(pool, &frame.rel).await? {
            models::mark_scanned(pool, existing.id, watermark).await?;
            if existing.category_id != frame.category_id {
                models::update_category(pool, existing.id, frame.category_id).await?;
            }
            if existing.thumbnail_path.is_empty() {
                let thumb =
                    task::spawn_blocking(move || probe::find_thumbnail(&root, &dir, limits.thumbnail_depth)).await?;
                if let Some(thumb) = thumb {
                    models::update_thumbnail(pool, existing.id, &thumb).await?;
                }
            }
            debug!("Existing model: {}", frame.rel);
            return Ok(false);
        }

        let (found, thumb) = task::spawn_blocking(move || {
            let found = probe::collect_model_files(&root, &dir, limits.model_depth);
            let thumb = probe::find_thumbnail(&root, &dir, limits.thumbnail_depth);
            (found, thumb)
        })
        .await?;

        let mut tx = pool.begin().await?;
        let name = catalog::base_name(&frame.rel);
        let id = models::create(
            &mut *tx,
            name,
            &frame.rel,
            frame.category_id,
            thumb.as_deref().unwrap_or(""),
            watermark,
        )
        .await?;
        for file in &found {
            files::create(&mut *tx, id, file).await?;
        }
        tx.commit().await?;
        info!(path = %frame.rel, files = found.len(), "New model");
        Ok(true)
    }

    async fn delete_stale(&self, watermark: i64) -> Result<u64, sqlx::Error> {
        let mut tx = self.inner.pool.begin().await?;
        let removed = models::delete_stale_before(&mut *tx, watermark).await?;
        tx.commit().await?;
        if removed > 0 {
            info!("Removed {} stale models", removed);
        }
        Ok(removed)
    }
}

/// Pushes in reverse so the stack pops children in name order.
fn push_children(
    stack: &mut Vec<Frame>,
    dir: &std::path::Path,
    rel: &str,
    subdirs: &[String],
    depth: i64,
    category_id: Option<i64>,
) {
    for name in subdirs.iter().rev() {
        stack.push(Frame { path: dir.join(name), rel: catalog::join_rel(rel, name), depth, category_id });
    }
}
