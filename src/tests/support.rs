use std::{fs, path::Path};

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::catalog::{files, models};
use crate::config::ScannerConfig;
use crate::metrics::Metrics;
use crate::scanner::{probe, Scanner};
use crate::types::FoundFile;

/// Single-connection in-memory database with the full schema.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await.unwrap();
    crate::db::init_db(&pool).await.unwrap();
    pool
}

pub fn write_file(root: &Path, rel: &str, bytes: usize) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, vec![7u8; bytes]).unwrap();
}

pub fn scanner(pool: &SqlitePool, root: &Path) -> Scanner {
    Scanner::new(pool.clone(), root, ScannerConfig::default(), Metrics::new())
}

/// Creates a model row at `path` plus one file row and one file on disk per entry.
pub async fn add_model(pool: &SqlitePool, root: &Path, path: &str, entries: &[(&str, usize)]) -> i64 {
    let name = crate::catalog::base_name(path);
    let id = models::create(pool, name, path, None, "", models::now_micros()).await.unwrap();
    for (rel, bytes) in entries {
        let file_path = format!("{}/{}", path, rel);
        write_file(root, &file_path, *bytes);
        let name = crate::catalog::base_name(&file_path).to_string();
        let found = FoundFile {
            rel_path: file_path.clone(),
            ext: probe::extension_of(&name),
            name,
            size: *bytes as i64,
        };
        files::create(pool, id, &found).await.unwrap();
    }
    id
}
