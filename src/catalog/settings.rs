use sqlx::{Executor, Sqlite, SqlitePool};

pub const IGNORED_FOLDER_NAMES: &str = "ignored_folder_names";
pub const SCANNER_MIN_DEPTH: &str = "scanner_min_depth";
pub const EXCLUDED_FOLDERS: &str = "excluded_folders";
pub const LAST_SCAN_AT: &str = "last_scan_at";
pub const AUTO_SCAN_ENABLED: &str = "auto_scan_enabled";
pub const SCAN_SCHEDULE_HOUR: &str = "scan_schedule_hour";

pub async fn get<'e, E>(ex: E, key: &str) -> Result<Option<String>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?1")
        .bind(key)
        .fetch_optional(ex)
        .await
}

pub async fn set<'e, E>(ex: E, key: &str, value: &str) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"INSERT INTO settings(key, value) VALUES (?1, ?2)
           ON CONFLICT(key) DO UPDATE SET value = excluded.value,
               updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now')"#,
    )
    .bind(key)
    .bind(value)
    .execute(ex)
    .await?;
    Ok(())
}

// Readers below never fail: a broken or missing value falls back to the default.

pub async fn get_string(pool: &SqlitePool, key: &str, default: &str) -> String {
    match get(pool, key).await {
        Ok(Some(v)) => v,
        Ok(None) => default.to_string(),
        Err(e) => {
            tracing::warn!("Failed to read setting {}: {}", key, e);
            default.to_string()
        }
    }
}

pub async fn get_bool(pool: &SqlitePool, key: &str, default: bool) -> bool {
    let raw = get_string(pool, key, "").await;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => default,
    }
}

pub async fn get_int(pool: &SqlitePool, key: &str, default: i64) -> i64 {
    let raw = get_string(pool, key, "").await;
    raw.trim().parse::<i64>().unwrap_or(default)
}
