use sqlx::{Executor, Sqlite};

use crate::types::{FoundFile, ModelFile};

const COLUMNS: &str = "id, model_id, file_path, file_name, file_ext, file_size";

pub async fn create<'e, E>(ex: E, model_id: i64, file: &FoundFile) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let res = sqlx::query(
        "INSERT INTO model_files(model_id, file_path, file_name, file_ext, file_size) VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(model_id)
    .bind(&file.rel_path)
    .bind(&file.name)
    .bind(&file.ext)
    .bind(file.size)
    .execute(ex)
    .await?;
    Ok(res.last_insert_rowid())
}

pub async fn find_by_path<'e, E>(ex: E, file_path: &str) -> Result<Option<ModelFile>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, ModelFile>(&format!(
        "SELECT {COLUMNS} FROM model_files WHERE file_path = ?1 ORDER BY id LIMIT 1"
    ))
    .bind(file_path)
    .fetch_optional(ex)
    .await
}

pub async fn list_by_model<'e, E>(ex: E, model_id: i64) -> Result<Vec<ModelFile>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, ModelFile>(&format!(
        "SELECT {COLUMNS} FROM model_files WHERE model_id = ?1 ORDER BY file_path"
    ))
    .bind(model_id)
    .fetch_all(ex)
    .await
}

/// Points a file row at a new owner, path and name.
pub async fn relocate<'e, E>(
    ex: E,
    id: i64,
    model_id: i64,
    file_path: &str,
    file_name: &str,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE model_files SET model_id = ?1, file_path = ?2, file_name = ?3 WHERE id = ?4")
        .bind(model_id)
        .bind(file_path)
        .bind(file_name)
        .bind(id)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn delete<'e, E>(ex: E, id: i64) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let res = sqlx::query("DELETE FROM model_files WHERE id = ?1").bind(id).execute(ex).await?;
    Ok(res.rows_affected())
}

pub async fn count_all<'e, E>(ex: E) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM model_files").fetch_one(ex).await
}
