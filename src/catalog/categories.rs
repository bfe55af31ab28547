use sqlx::{Executor, Sqlite};

use crate::types::Category;

const COLUMNS: &str = "id, name, path, parent_id, depth";

pub async fn get<'e, E>(ex: E, id: i64) -> Result<Option<Category>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Category>(&format!("SELECT {COLUMNS} FROM categories WHERE id = ?1"))
        .bind(id)
        .fetch_optional(ex)
        .await
}

pub async fn find_by_path<'e, E>(ex: E, path: &str) -> Result<Option<Category>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Category>(&format!("SELECT {COLUMNS} FROM categories WHERE path = ?1"))
        .bind(path)
        .fetch_optional(ex)
        .await
}

pub async fn create<'e, E>(
    ex: E,
    name: &str,
    path: &str,
    parent_id: Option<i64>,
    depth: i64,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let res = sqlx::query("INSERT INTO categories(name, path, parent_id, depth) VALUES (?1, ?2, ?3, ?4)")
        .bind(name)
        .bind(path)
        .bind(parent_id)
        .bind(depth)
        .execute(ex)
        .await?;
    Ok(res.last_insert_rowid())
}

pub async fn list_roots<'e, E>(ex: E) -> Result<Vec<Category>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Category>(&format!(
        "SELECT {COLUMNS} FROM categories WHERE parent_id IS NULL ORDER BY name COLLATE NOCASE"
    ))
    .fetch_all(ex)
    .await
}

pub async fn list_children<'e, E>(ex: E, parent_id: i64) -> Result<Vec<Category>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Category>(&format!(
        "SELECT {COLUMNS} FROM categories WHERE parent_id = ?1 ORDER BY name COLLATE NOCASE"
    ))
    .bind(parent_id)
    .fetch_all(ex)
    .await
}

pub async fn list_all<'e, E>(ex: E) -> Result<Vec<Category>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Category>(&format!("SELECT {COLUMNS} FROM categories ORDER BY path"))
        .fetch_all(ex)
        .await
}

/// Drops the whole tree. Models keep their rows, their `category_id` goes NULL.
pub async fn delete_all<'e, E>(ex: E) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let res = sqlx::query("DELETE FROM categories").execute(ex).await?;
    Ok(res.rows_affected())
}
