use sqlx::{Executor, Sqlite};

use crate::types::Tag;

pub async fn list_for_model<'e, E>(ex: E, model_id: i64) -> Result<Vec<Tag>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Tag>(
        r#"SELECT t.id, t.name, t.color FROM tags t
           JOIN model_tags mt ON mt.tag_id = t.id
           WHERE mt.model_id = ?1
           ORDER BY t.name COLLATE NOCASE"#,
    )
    .bind(model_id)
    .fetch_all(ex)
    .await
}

/// Copies every tag of `source_id` onto `target_id`, existing pairs are kept.
pub async fn merge_into<'e, E>(ex: E, target_id: i64, source_id: i64) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let res = sqlx::query(
        "INSERT OR IGNORE INTO model_tags (model_id, tag_id) SELECT ?1, tag_id FROM model_tags WHERE model_id = ?2",
    )
    .bind(target_id)
    .bind(source_id)
    .execute(ex)
    .await?;
    Ok(res.rows_affected())
}

pub async fn create<'e, E>(ex: E, name: &str) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let res = sqlx::query("INSERT INTO tags(name) VALUES (?1)").bind(name).execute(ex).await?;
    Ok(res.last_insert_rowid())
}

pub async fn attach<'e, E>(ex: E, model_id: i64, tag_id: i64) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("INSERT OR IGNORE INTO model_tags(model_id, tag_id) VALUES (?1, ?2)")
        .bind(model_id)
        .bind(tag_id)
        .execute(ex)
        .await?;
    Ok(())
}
