//! Ordnerklassifikation: Kategorie, Modell oder weder noch.
//!
//! Everything in here is pure. Filesystem facts reach [`Rules::classify`]
//! through the [`DirFacts`] trait so the walk can answer them lazily.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

pub const MODEL_EXTENSIONS: &[&str] = &["stl", "obj", "lys", "3mf", "3ds"];
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

lazy_static! {
    static ref RENDER_DIR_RE: Regex =
        Regex::new(r"(?i)^(0?renders?|imgs?|images?|pictures?|photos?)$").unwrap();
}

pub fn is_model_ext(ext: &str) -> bool {
    MODEL_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext))
}

pub fn is_image_ext(ext: &str) -> bool {
    IMAGE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext))
}

/// Folder names like `renders`, `imgs` or `Photos` that usually hold previews.
pub fn is_render_dir(name: &str) -> bool {
    RENDER_DIR_RE.is_match(name)
}

/// Which detection rule turned a directory into a model leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// 3D files directly inside the directory.
    DirectFiles,
    /// An ignored-named child (`STL`, `supported`, `32mm`) holds 3D files.
    IgnoredSubfolder,
    /// Some descendant within the search depth holds 3D files.
    NestedSubfolder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirClass {
    Excluded,
    Category,
    ModelLeaf(Detection),
    Unclassified,
}

/// What the classifier may ask about a directory.
pub trait DirFacts {
    fn has_model_files(&self) -> bool;
    /// Names of the immediate, non-hidden subdirectories.
    fn subdirs(&self) -> &[String];
    fn subdir_has_model_files(&self, name: &str) -> bool;
    fn has_nested_model_files(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct Rules {
    ignored: Regex,
    excluded: HashSet<String>,
    min_depth: i64,
}

impl Rules {
    /// Builds the rule set from the comma-separated setting values.
    pub fn new(ignored_folder_names: &str, excluded_folders: &str, min_depth: i64) -> Result<Self, regex::Error> {
        Ok(Self {
            ignored: build_ignored_regex(ignored_folder_names)?,
            excluded: split_list(excluded_folders).map(|s| s.to_lowercase()).collect(),
            min_depth: min_depth.max(0),
        })
    }

    pub fn min_depth(&self) -> i64 {
        self.min_depth
    }

    pub fn is_ignored_name(&self, name: &str) -> bool {
        self.ignored.is_match(name)
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded.contains(&name.to_lowercase())
    }

    /// Classifies the directory `name` sitting `depth` levels below the root
    /// (the root's children have depth 0). Rules are tried in order and the
    /// first match wins.
    pub fn classify<F: DirFacts + ?Sized>(&self, name: &str, depth: i64, facts: &F) -> DirClass {
        if self.is_excluded(name) {
            return DirClass::Excluded;
        }
        if depth < self.min_depth {
            return DirClass::Category;
        }
        if facts.has_model_files() {
            return DirClass::ModelLeaf(Detection::DirectFiles);
        }
        if facts
            .subdirs()
            .iter()
            .any(|sub| self.is_ignored_name(sub) && facts.subdir_has_model_files(sub))
        {
            return DirClass::ModelLeaf(Detection::IgnoredSubfolder);
        }
        if facts.has_nested_model_files() {
            return DirClass::ModelLeaf(Detection::NestedSubfolder);
        }
        DirClass::Unclassified
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// `(?i)^(stl|supported|...|\d{2,3}\s*mm)$`
fn build_ignored_regex(names: &str) -> Result<Regex, regex::Error> {
    let mut alternatives: Vec<String> = split_list(names).map(regex::escape).collect();
    alternatives.push(r"\d{2,3}\s*mm".to_string());
    Regex::new(&format!("(?i)^({})$", alternatives.join("|")))
}
