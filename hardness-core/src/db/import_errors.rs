//! Import error log
//!
//! Cleared at the start of every import run.

use hardness_common::db::MeasurementImportError;
use sqlx::{Row, SqlitePool};

use crate::models::FileError;

pub async fn clear_import_errors(pool: &SqlitePool) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM measurement_import_errors")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn insert_import_error(pool: &SqlitePool, error: &FileError) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO measurement_import_errors (file, folder, code, message, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&error.file)
    .bind(&error.folder)
    .bind(&error.code)
    .bind(&error.message)
    .bind(hardness_common::time::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Error log in insertion order
pub async fn list_import_errors(pool: &SqlitePool) -> sqlx::Result<Vec<MeasurementImportError>> {
    let rows = sqlx::query(
        r#"
        SELECT id, file, folder, code, message, created_at
        FROM measurement_import_errors
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| MeasurementImportError {
            id: row.get("id"),
            file: row.get("file"),
            folder: row.get("folder"),
            code: row.get("code"),
            message: row.get("message"),
            created_at: row.get("created_at"),
        })
        .collect())
}
