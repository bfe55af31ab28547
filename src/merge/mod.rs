//! Zusammenführen zweier Modelle.
//!
//! [`merge_models`] folds a source model into a target: files move on disk
//! first, the catalog follows in one transaction, and the source directory
//! is only removed once that transaction has committed. Files already moved
//! when a later step fails stay where they are; the next scan picks them up.

pub mod relocate;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sqlx::{SqliteConnection, SqlitePool};
use tokio::task;
use tracing::{info, warn};

use crate::catalog::{self, files, models, tags};
use crate::error::AppError;
use crate::types::{MergeOutcome, Model, ModelFile, PathUpdate};

use relocate::Placement;

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("{role} model {id} not found")]
    NotFound { role: &'static str, id: i64 },
    #[error("{0}")]
    Invalid(String),
    #[error("path already exists on disk: {0}")]
    PathTaken(String),
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("background task failed: {0}")]
    Task(String),
}

impl From<task::JoinError> for MergeError {
    fn from(err: task::JoinError) -> Self {
        MergeError::Task(err.to_string())
    }
}

impl From<MergeError> for AppError {
    fn from(err: MergeError) -> Self {
        match err {
            MergeError::NotFound { .. } => AppError::NotFound(err.to_string()),
            MergeError::Invalid(msg) => AppError::InvalidInput(msg),
            MergeError::PathTaken(_) => AppError::Conflict(err.to_string()),
            MergeError::Database(e) => AppError::from(e),
            MergeError::Io { .. } => AppError::IoError(err.to_string()),
            MergeError::Task(_) => AppError::Internal(anyhow::anyhow!(err)),
        }
    }
}

/// True if `path` is `dir` or lies beneath it.
fn is_within(path: &str, dir: &str) -> bool {
    path == dir || path.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/'))
}

async fn blocking<T, F>(f: F) -> Result<T, MergeError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, MergeError> + Send + 'static,
{
    task::spawn_blocking(f).await?
}

/// Working state of one merge, applied to the open transaction file by file.
struct Consolidation {
    root: PathBuf,
    target_id: i64,
    rows: HashMap<String, ModelFile>,
    relocated: HashMap<String, String>,
    outcome: MergeOutcome,
}

impl Consolidation {
    /// Moves one file on disk, then mirrors the result in the catalog.
    async fn place(
        &mut self,
        conn: &mut SqliteConnection,
        from: &str,
        dest: String,
        drop_duplicate: bool,
    ) -> Result<(), MergeError> {
        let placement = {
            let root = self.root.clone();
            let from = from.to_string();
            blocking(move || relocate::place_file(&root, &from, &dest, drop_duplicate)).await?
        };
        let row = self.rows.remove(from);
        match placement {
            Placement::Moved { dest, name } => {
                self.outcome.moved += 1;
                self.relink(conn, row, from, dest, &name).await?;
            }
            Placement::Renamed { dest, name } => {
                self.outcome.renamed += 1;
                self.relink(conn, row, from, dest, &name).await?;
            }
            Placement::Duplicate { existing } => {
                self.outcome.duplicates += 1;
                if let Some(row) = row {
                    files::delete(&mut *conn, row.id).await?;
                }
                self.relocated.insert(from.to_string(), existing);
            }
            Placement::Missing => {
                warn!("File vanished during merge: {}", from);
                self.outcome.missing += 1;
                if let Some(row) = row {
                    files::delete(&mut *conn, row.id).await?;
                }
            }
        }
        Ok(())
    }

    async fn relink(
        &mut self,
        conn: &mut SqliteConnection,
        row: Option<ModelFile>,
        from: &str,
        dest: String,
        name: &str,
    ) -> Result<(), MergeError> {
        if let Some(row) = row {
            files::relocate(&mut *conn, row.id, self.target_id, &dest, name).await?;
        }
        self.relocated.insert(from.to_string(), dest);
        Ok(())
    }

    /// New location of a thumbnail. With `owner_dir` set, a path inside that
    /// directory that was not relocated is gone and maps to "".
    fn follow(&self, path: &str, owner_dir: Option<&str>) -> String {
        if let Some(new) = self.relocated.get(path) {
            return new.clone();
        }
        match owner_dir {
            Some(dir) if is_within(path, dir) => String::new(),
            _ => path.to_string(),
        }
    }
}

/// Folds `source_id` into `target_id`. See the module docs for the ordering.
pub async fn merge_models(
    pool: &SqlitePool,
    root: &Path,
    target_id: i64,
    source_id: i64,
) -> Result<MergeOutcome, MergeError> {
    if target_id == source_id {
        return Err(MergeError::Invalid("cannot merge a model into itself".into()));
    }
    let target = models::get(pool, target_id)
        .await?
        .ok_or(MergeError::NotFound { role: "target", id: target_id })?;
    let source = models::get(pool, source_id)
        .await?
        .ok_or(MergeError::NotFound { role: "source", id: source_id })?;
    if is_within(&target.path, &source.path) || is_within(&source.path, &target.path) {
        return Err(MergeError::Invalid(format!(
            "model directories are nested: {} / {}",
            target.path, source.path
        )));
    }

    let target_rows = files::list_by_model(pool, target_id).await?;
    let source_rows = files::list_by_model(pool, source_id).await?;

    let mut work = Consolidation {
        root: root.to_path_buf(),
        target_id,
        rows: HashMap::new(),
        relocated: HashMap::new(),
        outcome: MergeOutcome { target_id, ..Default::default() },
    };

    let mut tx = pool.begin().await?;

    // Loose target files go to <target>/<target name>/ first
    let target_own_dir = catalog::join_rel(&target.path, catalog::base_name(&target.path));
    let loose = {
        let root = work.root.clone();
        let dir = target.path.clone();
        blocking(move || relocate::list_loose_files(&root, &dir)).await?
    };
    work.rows.extend(target_rows.into_iter().map(|r| (r.file_path.clone(), r)));
    for rel in &loose {
        let dest = catalog::join_rel(&target_own_dir, catalog::base_name(rel));
        work.place(&mut *tx, rel, dest, true).await?;
    }
    // Rows of target files that were not loose stay untouched
    work.rows.clear();

    // Source files keep their layout below <target>/<source name>/
    let source_dest_dir = catalog::join_rel(&target.path, catalog::base_name(&source.path));
    let on_disk = {
        let root = work.root.clone();
        let dir = source.path.clone();
        blocking(move || relocate::list_files_under(&root, &dir)).await?
    };
    work.rows.extend(source_rows.into_iter().map(|r| (r.file_path.clone(), r)));
    for rel in &on_disk {
        let Some(dest) = catalog::rebase(rel, &source.path, &source_dest_dir) else {
            continue;
        };
        work.place(&mut *tx, rel, dest, false).await?;
    }

    // Rows without a file on disk
    let leftovers: Vec<ModelFile> = work.rows.drain().map(|(_, r)| r).collect();
    for row in leftovers {
        warn!("Source file missing on disk, dropping row: {}", row.file_path);
        files::delete(&mut *tx, row.id).await?;
        work.outcome.missing += 1;
    }

    tags::merge_into(&mut *tx, target_id, source_id).await?;

    let target_thumb = work.follow(&target.thumbnail_path, None);
    if target_thumb != target.thumbnail_path {
        models::update_thumbnail(&mut *tx, target_id, &target_thumb).await?;
    }
    let source_thumb = work.follow(&source.thumbnail_path, Some(&source.path));
    models::backfill_metadata(&mut *tx, target_id, &source.notes, source.author_id, &source_thumb).await?;
    models::delete(&mut *tx, source_id).await?;

    tx.commit().await?;

    // Erst nach dem Commit aufräumen
    let source_dir = root.join(&source.path);
    let removal = task::spawn_blocking(move || std::fs::remove_dir_all(&source_dir)).await;
    match removal {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Merged source directory {} not removed: {}", source.path, e),
        Err(e) => warn!("Removal task for {} failed: {}", source.path, e),
    }

    info!(
        target = %target.path,
        source = %source.path,
        moved = work.outcome.moved,
        renamed = work.outcome.renamed,
        duplicates = work.outcome.duplicates,
        missing = work.outcome.missing,
        "Models merged"
    );
    Ok(work.outcome)
}

/// Trims and checks a root-relative model path.
pub fn normalize_model_path(raw: &str) -> Result<String, MergeError> {
    let path = raw.trim().replace('\\', "/");
    let path = path.trim_matches('/');
    if path.is_empty() {
        return Err(MergeError::Invalid("path must not be empty".into()));
    }
    if raw.trim().starts_with('/') || raw.trim().starts_with('\\') || path.contains(':') {
        return Err(MergeError::Invalid("path must be relative to the library root".into()));
    }
    if path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
        return Err(MergeError::Invalid(format!("invalid path: {}", path)));
    }
    Ok(path.to_string())
}

/// Moves a model to a new root-relative path. Moving onto another model's
/// path merges this model into that one. If the folder was already moved by
/// hand (old path gone, new path present) only the catalog is updated.
pub async fn update_path(
    pool: &SqlitePool,
    root: &Path,
    model_id: i64,
    new_path: &str,
) -> Result<PathUpdate, MergeError> {
    let new_path = normalize_model_path(new_path)?;
    let model = models::get(pool, model_id)
        .await?
        .ok_or(MergeError::NotFound { role: "model", id: model_id })?;

    if model.path == new_path {
        return Ok(PathUpdate::Unchanged { model });
    }

    if let Some(owner) = models::find_by_path(pool, &new_path).await? {
        let outcome = merge_models(pool, root, owner.id, model.id).await?;
        let merged = fetch(pool, owner.id, "target").await?;
        return Ok(PathUpdate::Merged { outcome, model: merged });
    }

    if is_within(&new_path, &model.path) || is_within(&model.path, &new_path) {
        return Err(MergeError::Invalid(format!("cannot move {} into {}", model.path, new_path)));
    }

    // A folder already moved by hand only needs the catalog to follow
    let already_moved = {
        let root = root.to_path_buf();
        let (from, to) = (model.path.clone(), new_path.clone());
        blocking(move || Ok(!root.join(&from).exists() && root.join(&to).is_dir())).await?
    };

    if !already_moved {
        let root = root.to_path_buf();
        let (from, to) = (model.path.clone(), new_path.clone());
        blocking(move || relocate::rename_dir(&root, &from, &to)).await?;
    }

    let result = async {
        let mut tx = pool.begin().await?;
        models::rebase_paths(&mut *tx, model_id, &model.path, &new_path).await?;
        tx.commit().await
    }
    .await;

    if let Err(e) = result {
        if already_moved {
            return Err(e.into());
        }
        let root = root.to_path_buf();
        let (from, to) = (new_path.clone(), model.path.clone());
        match task::spawn_blocking(move || std::fs::rename(root.join(&from), root.join(&to))).await {
            Ok(Ok(())) => {}
            Ok(Err(re)) => warn!("Could not move {} back after failed update: {}", new_path, re),
            Err(je) => warn!("Revert task failed: {}", je),
        }
        return Err(e.into());
    }

    info!("Model {} moved: {} -> {}", model_id, model.path, new_path);
    let moved = fetch(pool, model_id, "model").await?;
    Ok(PathUpdate::Renamed { model: moved })
}

async fn fetch(pool: &SqlitePool, id: i64, role: &'static str) -> Result<Model, MergeError> {
    models::get(pool, id).await?.ok_or(MergeError::NotFound { role, id })
}
