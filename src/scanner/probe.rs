//! Blocking filesystem probes used by the scan walk.
//!
//! All functions here do synchronous I/O and are meant to run inside
//! `tokio::task::spawn_blocking`.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use walkdir::{DirEntry, WalkDir};

use super::rules::{is_image_ext, is_model_ext, is_render_dir, DirClass, DirFacts, Rules};
use crate::types::FoundFile;

/// Bounded search depths for model files and preview images.
#[derive(Debug, Clone, Copy)]
pub struct SearchLimits {
    pub model_depth: usize,
    pub thumbnail_depth: usize,
}

/// One sorted directory listing. Hidden directories are left out.
#[derive(Debug, Clone)]
pub struct DirListing {
    pub path: PathBuf,
    pub subdirs: Vec<String>,
    pub files: Vec<String>,
}

pub fn list_dir(path: &Path) -> io::Result<DirListing> {
    let mut subdirs = Vec::new();
    let mut files = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!("Skipping unreadable entry in {}: {}", path.display(), e);
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().to_string();
        // file_type() folgt keinen Symlinks, metadata() schon
        let is_dir = match entry.file_type() {
            Ok(ft) if ft.is_symlink() => entry.path().is_dir(),
            Ok(ft) => ft.is_dir(),
            Err(_) => continue,
        };
        if is_dir {
            if !name.starts_with('.') {
                subdirs.push(name);
            }
        } else {
            files.push(name);
        }
    }
    subdirs.sort();
    files.sort();
    Ok(DirListing { path: path.to_path_buf(), subdirs, files })
}

/// Lowercase extension of a file name, empty when there is none.
pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Root-relative path with `/` separators.
pub fn rel_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_type().is_dir() && entry.file_name().to_string_lossy().starts_with('.')
}

/// Anything that `list_dir` would put into `files`: regular files and
/// symlinks that do not point at a directory.
fn is_file_entry(entry: &DirEntry) -> bool {
    let ft = entry.file_type();
    if ft.is_symlink() {
        return !entry.path().is_dir();
    }
    !ft.is_dir()
}

fn is_model_entry(entry: &DirEntry) -> bool {
    is_file_entry(entry) && is_model_ext(&extension_of(&entry.file_name().to_string_lossy()))
}

/// Walks below `dir`, descending at most `levels` directories. Files inside
/// the deepest directory are still yielded (walk depth `levels + 1`).
fn bounded_walk(dir: &Path, levels: usize) -> impl Iterator<Item = DirEntry> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(levels + 1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden_dir(e))
        .filter_map(|e| e.ok())
}

fn has_model_file_directly(dir: &Path) -> bool {
    match fs::read_dir(dir) {
        Ok(rd) => rd.flatten().any(|e| {
            let is_file = match e.file_type() {
                Ok(ft) if ft.is_symlink() => !e.path().is_dir(),
                Ok(ft) => !ft.is_dir(),
                Err(_) => false,
            };
            is_file && is_model_ext(&extension_of(&e.file_name().to_string_lossy()))
        }),
        Err(_) => false,
    }
}

/// Answers the classifier's questions against the real filesystem.
pub struct FsFacts<'a> {
    pub listing: &'a DirListing,
    pub limits: SearchLimits,
}

impl DirFacts for FsFacts<'_> {
    fn has_model_files(&self) -> bool {
        self.listing.files.iter().any(|f| is_model_ext(&extension_of(f)))
    }

    fn subdirs(&self) -> &[String] {
        &self.listing.subdirs
    }

    fn subdir_has_model_files(&self, name: &str) -> bool {
        has_model_file_directly(&self.listing.path.join(name))
    }

    // Each subdirectory gets its own bounded search, one level further down.
    fn has_nested_model_files(&self) -> bool {
        bounded_walk(&self.listing.path, self.limits.model_depth + 1).any(|e| e.depth() > 1 && is_model_entry(&e))
    }
}

/// Result of looking at one directory during the walk.
#[derive(Debug, Clone)]
pub struct Probed {
    pub class: DirClass,
    pub subdirs: Vec<String>,
}

pub fn probe_dir(dir: &Path, depth: i64, rules: &Rules, limits: SearchLimits) -> io::Result<Probed> {
    let name = dir.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    // Excluded folders are never opened
    if rules.is_excluded(&name) {
        return Ok(Probed { class: DirClass::Excluded, subdirs: Vec::new() });
    }
    let listing = list_dir(dir)?;
    let class = rules.classify(&name, depth, &FsFacts { listing: &listing, limits });
    Ok(Probed { class, subdirs: listing.subdirs })
}

/// Every 3D file below `model_dir`, at most `levels` directories down, sorted by path.
pub fn collect_model_files(root: &Path, model_dir: &Path, levels: usize) -> Vec<FoundFile> {
    bounded_walk(model_dir, levels)
        .filter(is_model_entry)
        .map(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            let ext = extension_of(&name);
            // fs::metadata follows symlinks, DirEntry::metadata does not
            let size = match fs::metadata(e.path()) {
                Ok(md) => md.len() as i64,
                Err(err) => {
                    tracing::debug!("stat failed for {}: {}", e.path().display(), err);
                    0
                }
            };
            FoundFile { rel_path: rel_path(root, e.path()), name, ext, size }
        })
        .collect()
}

fn first_image(dir: &Path) -> Option<PathBuf> {
    let listing = list_dir(dir).ok()?;
    listing.files.iter().find(|f| is_image_ext(&extension_of(f))).map(|img| dir.join(img))
}

/// Depth-first over the subdirectories of `dir` in name order. Each
/// subdirectory's own images are checked before descending into it.
fn search_subdirs(dir: &Path, level: usize, levels: usize) -> Option<PathBuf> {
    if level >= levels {
        return None;
    }
    let listing = list_dir(dir).ok()?;
    listing.subdirs.iter().find_map(|name| {
        let sub = dir.join(name);
        first_image(&sub).or_else(|| search_subdirs(&sub, level + 1, levels))
    })
}

/// Picks a preview image for a model folder, first match wins:
/// an image directly inside, then an image directly inside a render-style
/// subfolder, then a search through the subfolders (at most `levels` deep)
/// in name order.
pub fn find_thumbnail(root: &Path, model_dir: &Path, levels: usize) -> Option<String> {
    let listing = match list_dir(model_dir) {
        Ok(l) => l,
        Err(e) => {
            tracing::debug!("Cannot list {} for thumbnail: {}", model_dir.display(), e);
            return None;
        }
    };

    if let Some(img) = listing.files.iter().find(|f| is_image_ext(&extension_of(f))) {
        return Some(rel_path(root, &model_dir.join(img)));
    }

    listing
        .subdirs
        .iter()
        .filter(|d| is_render_dir(d))
        .find_map(|d| first_image(&model_dir.join(d)))
        .or_else(|| search_subdirs(model_dir, 0, levels))
        .map(|found| rel_path(root, &found))
}
