use sqlx::{Executor, Sqlite, SqliteConnection};

use crate::types::Model;

const COLUMNS: &str = "id, name, path, author_id, category_id, notes, thumbnail_path, hidden, \
                       created_at, updated_at, scanned_at";

/// Microseconds since the Unix epoch, the unit of `models.scanned_at`.
pub fn now_micros() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

pub async fn get<'e, E>(ex: E, id: i64) -> Result<Option<Model>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Model>(&format!("SELECT {COLUMNS} FROM models WHERE id = ?1"))
        .bind(id)
        .fetch_optional(ex)
        .await
}

pub async fn find_by_path<'e, E>(ex: E, path: &str) -> Result<Option<Model>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Model>(&format!("SELECT {COLUMNS} FROM models WHERE path = ?1"))
        .bind(path)
        .fetch_optional(ex)
        .await
}

pub async fn list_all<'e, E>(ex: E) -> Result<Vec<Model>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Model>(&format!("SELECT {COLUMNS} FROM models ORDER BY path"))
        .fetch_all(ex)
        .await
}

pub async fn create<'e, E>(
    ex: E,
    name: &str,
    path: &str,
    category_id: Option<i64>,
    thumbnail_path: &str,
    scanned_at: i64,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let res = sqlx::query(
        "INSERT INTO models(name, path, category_id, thumbnail_path, scanned_at) VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(name)
    .bind(path)
    .bind(category_id)
    .bind(thumbnail_path)
    .bind(scanned_at)
    .execute(ex)
    .await?;
    Ok(res.last_insert_rowid())
}

pub async fn mark_scanned<'e, E>(ex: E, id: i64, watermark: i64) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE models SET scanned_at = ?1 WHERE id = ?2")
        .bind(watermark)
        .bind(id)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn update_category<'e, E>(ex: E, id: i64, category_id: Option<i64>) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE models SET category_id = ?1 WHERE id = ?2")
        .bind(category_id)
        .bind(id)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn update_thumbnail<'e, E>(ex: E, id: i64, thumbnail_path: &str) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "UPDATE models SET thumbnail_path = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now') WHERE id = ?2",
    )
    .bind(thumbnail_path)
    .bind(id)
    .execute(ex)
    .await?;
    Ok(())
}

pub async fn update_path<'e, E>(ex: E, id: i64, path: &str) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE models SET path = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now') WHERE id = ?2")
        .bind(path)
        .bind(id)
        .execute(ex)
        .await?;
    Ok(())
}

/// Fills notes, author and thumbnail of `target_id` where they are still empty.
pub async fn backfill_metadata<'e, E>(
    ex: E,
    target_id: i64,
    notes: &str,
    author_id: Option<i64>,
    thumbnail_path: &str,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"UPDATE models SET
            notes = CASE WHEN notes = '' THEN ?1 ELSE notes END,
            author_id = COALESCE(author_id, ?2),
            thumbnail_path = CASE WHEN thumbnail_path = '' THEN ?3 ELSE thumbnail_path END,
            updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now')
        WHERE id = ?4"#,
    )
    .bind(notes)
    .bind(author_id)
    .bind(thumbnail_path)
    .bind(target_id)
    .execute(ex)
    .await?;
    Ok(())
}

pub async fn delete<'e, E>(ex: E, id: i64) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let res = sqlx::query("DELETE FROM models WHERE id = ?1").bind(id).execute(ex).await?;
    Ok(res.rows_affected())
}

pub async fn max_scanned_at<'e, E>(ex: E) -> Result<Option<i64>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar::<_, Option<i64>>("SELECT MAX(scanned_at) FROM models")
        .fetch_one(ex)
        .await
}

/// Deletes every model not stamped by the pass with `watermark`, file rows first.
pub async fn delete_stale_before(conn: &mut SqliteConnection, watermark: i64) -> Result<u64, sqlx::Error> {
    sqlx::query("DELETE FROM model_files WHERE model_id IN (SELECT id FROM models WHERE scanned_at < ?1)")
        .bind(watermark)
        .execute(&mut *conn)
        .await?;
    let res = sqlx::query("DELETE FROM models WHERE scanned_at < ?1")
        .bind(watermark)
        .execute(&mut *conn)
        .await?;
    Ok(res.rows_affected())
}

/// Rewrites the model path and every file/thumbnail path below `old` to `new`.
pub async fn rebase_paths(conn: &mut SqliteConnection, id: i64, old: &str, new: &str) -> Result<(), sqlx::Error> {
    update_path(&mut *conn, id, new).await?;
    // substr() is 1-based; old_len + 1 is the first character after the prefix
    let old_len = old.chars().count() as i64;
    sqlx::query(
        r#"UPDATE model_files SET file_path = ?1 || substr(file_path, ?2 + 1)
           WHERE model_id = ?3 AND substr(file_path, 1, ?2 + 1) = ?4 || '/'"#,
    )
    .bind(new)
    .bind(old_len)
    .bind(id)
    .bind(old)
    .execute(&mut *conn)
    .await?;
    sqlx::query(
        r#"UPDATE models SET thumbnail_path = ?1 || substr(thumbnail_path, ?2 + 1)
           WHERE id = ?3 AND substr(thumbnail_path, 1, ?2 + 1) = ?4 || '/'"#,
    )
    .bind(new)
    .bind(old_len)
    .bind(id)
    .bind(old)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Models that could be merged into `model_id`, most shared tags first.
pub async fn merge_candidates<'e, E>(
    ex: E,
    model_id: i64,
    query: Option<&str>,
    limit: i64,
) -> Result<Vec<Model>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let pattern = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(|q| format!("%{}%", q.to_lowercase()));
    sqlx::query_as::<_, Model>(&format!(
        r#"SELECT {cols} FROM models m
           WHERE m.id != ?1
             AND (?2 IS NULL OR lower(m.name) LIKE ?2)
           ORDER BY (
               SELECT COUNT(*) FROM model_tags a
               JOIN model_tags b ON a.tag_id = b.tag_id
               WHERE a.model_id = m.id AND b.model_id = ?1
           ) DESC, m.name COLLATE NOCASE
           LIMIT ?3"#,
        cols = COLUMNS
            .split(", ")
            .map(|c| format!("m.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ")
    ))
    .bind(model_id)
    .bind(pattern)
    .bind(limit)
    .fetch_all(ex)
    .await
}
