//! Repository functions over the SQLite catalog.
//!
//! Every function takes an `sqlx::Executor`, so the same call works against the
//! pool or inside an open transaction (`&mut *tx`). Functions that need more
//! than one statement take a `&mut SqliteConnection` instead.

pub mod categories;
pub mod files;
pub mod models;
pub mod settings;
pub mod tags;

/// Joins root-relative path segments with `/`.
pub fn join_rel(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), name)
    }
}

/// Returns the last segment of a root-relative path.
pub fn base_name(rel: &str) -> &str {
    rel.trim_end_matches('/').rsplit('/').next().unwrap_or(rel)
}

/// Replaces `old` by `new` when `path` equals `old` or lies beneath it.
pub fn rebase(path: &str, old: &str, new: &str) -> Option<String> {
    if path == old {
        return Some(new.to_string());
    }
    path.strip_prefix(old)
        .and_then(|rest| rest.strip_prefix('/'))
        .map(|rest| join_rel(new, rest))
}
