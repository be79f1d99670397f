//! Measurement persistence
//!
//! Rows are append-only. The only mutation is setting the block/ledger pair,
//! which happens once per row and only while both are still NULL.

use sqlx::{Row, SqlitePool};

use crate::models::{DepthReading, MemoryGroup, ProbeHeader};
use hardness_common::time;

/// Minimal row shape used by the association walk
#[derive(Debug, Clone)]
pub struct RangeRow {
    pub id: i64,
    pub memory_index: i64,
    pub recorded_at: String,
    pub configured_depth: i64,
    pub land_ledger_id: Option<i64>,
}

/// One reading joined to its block name, for surface building
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceRow {
    pub land_block_name: String,
    pub depth: i64,
    pub pressure: i64,
}

/// Insert every reading of one file in a single transaction
///
/// A UNIQUE violation aborts the whole file; the caller maps it to a duplicate.
pub async fn insert_file_rows(
    pool: &SqlitePool,
    device_id: i64,
    header: &ProbeHeader,
    folder: &str,
    readings: &[DepthReading],
) -> sqlx::Result<u64> {
    let recorded_at = time::to_storage(&header.recorded_at);
    let mut tx = pool.begin().await?;
    let mut inserted = 0u64;

    for reading in readings {
        let result = sqlx::query(
            r#"
            INSERT INTO measurements
                (device_id, memory_index, recorded_at, configured_depth, spring_constant,
                 cone_area, depth, pressure, folder)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(device_id)
        .bind(header.memory_index)
        .bind(&recorded_at)
        .bind(header.configured_depth)
        .bind(header.spring_constant)
        .bind(header.cone_area)
        .bind(reading.depth)
        .bind(reading.pressure)
        .bind(folder)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Rows whose memory index lies in `[first, last]`, in insertion order
pub async fn fetch_memory_range(
    pool: &SqlitePool,
    first: i64,
    last: i64,
    folder: Option<&str>,
) -> sqlx::Result<Vec<RangeRow>> {
    let rows = sqlx::query(
        r#"
        SELECT id, memory_index, recorded_at, configured_depth, land_ledger_id
        FROM measurements
        WHERE memory_index BETWEEN ? AND ?
          AND (? IS NULL OR folder = ?)
        ORDER BY id
        "#,
    )
    .bind(first)
    .bind(last)
    .bind(folder)
    .bind(folder)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| RangeRow {
            id: row.get("id"),
            memory_index: row.get("memory_index"),
            recorded_at: row.get("recorded_at"),
            configured_depth: row.get("configured_depth"),
            land_ledger_id: row.get("land_ledger_id"),
        })
        .collect())
}

/// Bind rows to blocks under one ledger, all or nothing
///
/// Each `(measurement_id, land_block_id)` pair is updated only while the row is
/// still unbound. Returns the number of rows bound; if that differs from
/// `assignments.len()` the transaction is rolled back and nothing changes.
pub async fn bind_rows(
    pool: &SqlitePool,
    land_ledger_id: i64,
    assignments: &[(i64, i64)],
) -> sqlx::Result<u64> {
    let mut tx = pool.begin().await?;
    let mut bound = 0u64;

    for (measurement_id, land_block_id) in assignments {
        let result = sqlx::query(
            r#"
            UPDATE measurements
            SET land_block_id = ?, land_ledger_id = ?
            WHERE id = ? AND land_ledger_id IS NULL AND land_block_id IS NULL
            "#,
        )
        .bind(land_block_id)
        .bind(land_ledger_id)
        .bind(measurement_id)
        .execute(&mut *tx)
        .await?;
        bound += result.rows_affected();
    }

    if bound as usize != assignments.len() {
        tx.rollback().await?;
        return Ok(bound);
    }

    tx.commit().await?;
    Ok(bound)
}

/// Unassociated memory groups ordered by folder, memory index and time
pub async fn list_unassociated_groups(pool: &SqlitePool) -> sqlx::Result<Vec<MemoryGroup>> {
    let rows = sqlx::query(
        r#"
        SELECT folder, memory_index, recorded_at, COUNT(*) AS row_count
        FROM measurements
        WHERE land_block_id IS NULL
        GROUP BY folder, memory_index, recorded_at
        ORDER BY folder, memory_index, recorded_at
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(memory_group_from_row).collect())
}

/// Memory groups in `[first, last]`, bound or not
pub async fn list_groups_in_range(
    pool: &SqlitePool,
    first: i64,
    last: i64,
    folder: Option<&str>,
) -> sqlx::Result<Vec<MemoryGroup>> {
    let rows = sqlx::query(
        r#"
        SELECT folder, memory_index, recorded_at, COUNT(*) AS row_count
        FROM measurements
        WHERE memory_index BETWEEN ? AND ?
          AND (? IS NULL OR folder = ?)
        GROUP BY folder, memory_index, recorded_at
        ORDER BY folder, memory_index, recorded_at
        "#,
    )
    .bind(first)
    .bind(last)
    .bind(folder)
    .bind(folder)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(memory_group_from_row).collect())
}

fn memory_group_from_row(row: &sqlx::sqlite::SqliteRow) -> MemoryGroup {
    MemoryGroup {
        folder: row.get("folder"),
        memory_index: row.get("memory_index"),
        recorded_at: row.get("recorded_at"),
        row_count: row.get("row_count"),
    }
}

pub async fn count_measurements(pool: &SqlitePool) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM measurements")
        .fetch_one(pool)
        .await
}

pub async fn count_unbound(pool: &SqlitePool) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM measurements WHERE land_ledger_id IS NULL")
        .fetch_one(pool)
        .await
}

pub async fn count_for_ledger(pool: &SqlitePool, land_ledger_id: i64) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM measurements WHERE land_ledger_id = ?")
        .bind(land_ledger_id)
        .fetch_one(pool)
        .await
}

/// Readings bound to a ledger, ordered by depth then insertion
pub async fn load_surface_rows(
    pool: &SqlitePool,
    land_ledger_id: i64,
) -> sqlx::Result<Vec<SurfaceRow>> {
    let rows = sqlx::query(
        r#"
        SELECT lb.name AS land_block_name, m.depth, m.pressure
        FROM measurements m
        JOIN land_blocks lb ON lb.id = m.land_block_id
        WHERE m.land_ledger_id = ?
        ORDER BY m.depth, m.id
        "#,
    )
    .bind(land_ledger_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| SurfaceRow {
            land_block_name: row.get("land_block_name"),
            depth: row.get("depth"),
            pressure: row.get("pressure"),
        })
        .collect())
}

/// Latest acquisition time stored for a folder
pub async fn latest_recorded_at(pool: &SqlitePool, folder: &str) -> sqlx::Result<Option<String>> {
    sqlx::query_scalar("SELECT MAX(recorded_at) FROM measurements WHERE folder = ?")
        .bind(folder)
        .fetch_one(pool)
        .await
}

/// Ledgers that have at least one bound measurement
pub async fn associated_ledger_ids(pool: &SqlitePool) -> sqlx::Result<Vec<i64>> {
    sqlx::query_scalar(
        r#"
        SELECT DISTINCT land_ledger_id
        FROM measurements
        WHERE land_ledger_id IS NOT NULL
        ORDER BY land_ledger_id
        "#,
    )
    .fetch_all(pool)
    .await
}
