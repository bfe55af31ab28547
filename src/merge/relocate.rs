//! Blocking file moves for merges and path updates.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use walkdir::WalkDir;

use super::MergeError;
use crate::catalog::join_rel;
use crate::scanner::probe::rel_path;

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Moved to the planned destination.
    Moved { dest: String, name: String },
    /// Destination taken by a file of different size, moved under a `_merged` name.
    Renamed { dest: String, name: String },
    /// Destination holds a file of the same size; `existing` survives.
    Duplicate { existing: String },
    /// The file was not on disk any more.
    Missing,
}

fn io_err(path: &Path, source: io::Error) -> MergeError {
    MergeError::Io { path: path.display().to_string(), source }
}

/// Walks `dir_rel` and returns every non-directory entry, root-relative and
/// sorted. A missing `dir_rel` yields nothing; any other walk error aborts.
fn walk_files(root: &Path, dir_rel: &str, max_depth: usize) -> Result<Vec<String>, MergeError> {
    let mut out = Vec::new();
    for entry in WalkDir::new(root.join(dir_rel)).min_depth(1).max_depth(max_depth).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.join(dir_rel));
                let root_missing =
                    err.depth() == 0 && err.io_error().is_some_and(|e| e.kind() == io::ErrorKind::NotFound);
                if root_missing {
                    return Ok(Vec::new());
                }
                return Err(io_err(&path, err.into()));
            }
        };
        if !entry.file_type().is_dir() {
            out.push(rel_path(root, entry.path()));
        }
    }
    Ok(out)
}

/// Every file below `dir_rel`, root-relative and sorted. Hidden files included.
pub fn list_files_under(root: &Path, dir_rel: &str) -> Result<Vec<String>, MergeError> {
    walk_files(root, dir_rel, usize::MAX)
}

/// Files directly inside `dir_rel`, root-relative and sorted.
pub fn list_loose_files(root: &Path, dir_rel: &str) -> Result<Vec<String>, MergeError> {
    walk_files(root, dir_rel, 1)
}

/// `render.png` -> `render_merged.png`, `render_merged_2.png`, ...
pub fn merged_name(name: &str, attempt: u32) -> String {
    let suffix = if attempt <= 1 { "_merged".to_string() } else { format!("_merged_{}", attempt) };
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}{}{}", &name[..dot], suffix, &name[dot..]),
        _ => format!("{}{}", name, suffix),
    }
}

/// rename, falling back to copy + remove when the rename fails (e.g. across volumes).
pub fn move_file(source: &Path, destination: &Path) -> Result<(), MergeError> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(err) => {
            tracing::info!("Rename failed for file {} ({}), falling back to copy", source.display(), err.kind());
            fs::copy(source, destination).map_err(|e| io_err(destination, e))?;
            fs::remove_file(source).map_err(|e| io_err(source, e))?;
            Ok(())
        }
    }
}

fn split_rel(rel: &str) -> (&str, &str) {
    match rel.rfind('/') {
        Some(i) => (&rel[..i], &rel[i + 1..]),
        None => ("", rel),
    }
}

/// Moves `from_rel` to `dest_rel` (both root-relative) applying the collision
/// policy. With `drop_duplicate` an equally sized source file is deleted
/// right away instead of being left for the caller.
pub fn place_file(root: &Path, from_rel: &str, dest_rel: &str, drop_duplicate: bool) -> Result<Placement, MergeError> {
    let from = root.join(from_rel);
    let from_meta = match fs::metadata(&from) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Placement::Missing),
        Err(e) => return Err(io_err(&from, e)),
    };

    let dest = root.join(dest_rel);
    let (dest_dir, dest_name) = split_rel(dest_rel);
    let dest_meta = match fs::metadata(&dest) {
        Ok(m) => Some(m),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(io_err(&dest, e)),
    };

    let Some(dest_meta) = dest_meta else {
        move_file(&from, &dest)?;
        return Ok(Placement::Moved { dest: dest_rel.to_string(), name: dest_name.to_string() });
    };

    if dest_meta.is_file() && dest_meta.len() == from_meta.len() {
        if drop_duplicate {
            fs::remove_file(&from).map_err(|e| io_err(&from, e))?;
        }
        return Ok(Placement::Duplicate { existing: dest_rel.to_string() });
    }

    let mut attempt = 1;
    loop {
        let name = merged_name(dest_name, attempt);
        let candidate_rel = join_rel(dest_dir, &name);
        let candidate: PathBuf = root.join(&candidate_rel);
        if !candidate.exists() {
            move_file(&from, &candidate)?;
            return Ok(Placement::Renamed { dest: candidate_rel, name });
        }
        attempt += 1;
    }
}

/// Renames a whole model directory; the destination must not exist.
pub fn rename_dir(root: &Path, from_rel: &str, to_rel: &str) -> Result<(), MergeError> {
    let from = root.join(from_rel);
    let to = root.join(to_rel);
    if to.exists() {
        return Err(MergeError::PathTaken(to_rel.to_string()));
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    fs::rename(&from, &to).map_err(|e| io_err(&from, e))
}
