use serde::{Deserialize, Serialize};

// Catalog rows

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub parent_id: Option<i64>,
    pub depth: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Model {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub author_id: Option<i64>,
    pub category_id: Option<i64>,
    pub notes: String,
    pub thumbnail_path: String,
    pub hidden: bool,
    pub created_at: String,
    pub updated_at: String,
    /// Microseconds since the Unix epoch of the last pass that visited this model.
    pub scanned_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ModelFile {
    pub id: i64,
    pub model_id: i64,
    pub file_path: String,
    pub file_name: String,
    pub file_ext: String,
    pub file_size: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub color: String,
}

/// A 3D file found on disk, not yet written to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundFile {
    pub rel_path: String,
    pub name: String,
    pub ext: String,
    pub size: i64,
}

// Scan status

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatus {
    pub running: bool,
    pub total: u64,
    pub processed: u64,
    pub new: u64,
    pub removed: u64,
    pub message: String,
}

/// Counters of one finished pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub total: u64,
    pub processed: u64,
    pub new: u64,
    pub removed: u64,
    pub watermark: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TriggerScanResponse {
    pub started: bool,
    pub status: ScanStatus,
}

// Merge / path update

#[derive(Debug, Clone, Deserialize)]
pub struct MergeRequest {
    pub source_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub target_id: i64,
    /// Files moved to a free destination.
    pub moved: usize,
    /// Files moved under a `_merged` name because the destination differed.
    pub renamed: usize,
    /// Source files dropped because an equally sized file already existed.
    pub duplicates: usize,
    /// Catalog rows whose file was no longer on disk.
    pub missing: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePathRequest {
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PathUpdate {
    Unchanged { model: Model },
    Renamed { model: Model },
    Merged { outcome: MergeOutcome, model: Model },
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CandidateQuery {
    pub q: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelDetail {
    #[serde(flatten)]
    pub model: Model,
    pub files: Vec<ModelFile>,
    pub tags: Vec<Tag>,
}
