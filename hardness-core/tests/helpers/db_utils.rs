//! Database Test Utilities
//!
//! Temporary databases and master-data fixtures

use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use hardness_common::db::{SamplingMethod, DEFAULT_METHOD_NAME};
use hardness_core::db::{self, ledgers, masters};
use sqlx::{Row, SqlitePool};
use tempfile::TempDir;

/// Create a temporary database with schema and default seed data
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> Result<(TempDir, SqlitePool)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test_hardness.db");

    let pool = db::init_database(&db_path).await?;
    db::seed_defaults(&pool).await?;

    Ok((temp_dir, pool))
}

/// Ledger created for a test land, using the default 5-point method
#[derive(Debug, Clone)]
pub struct LedgerFixture {
    pub ledger_id: i64,
    pub land_id: i64,
    pub method: SamplingMethod,
}

/// Create company, crop, period and land as needed, then a ledger for the land
pub async fn create_ledger(
    pool: &SqlitePool,
    land_name: &str,
    sampling_date: NaiveDate,
) -> Result<LedgerFixture> {
    let company_id = match sqlx::query_scalar::<_, i64>("SELECT id FROM companies WHERE name = ?")
        .bind("Test Farm")
        .fetch_optional(pool)
        .await?
    {
        Some(id) => id,
        None => masters::insert_company(pool, "Test Farm").await?,
    };

    let crop_id = match sqlx::query_scalar::<_, i64>("SELECT id FROM crops WHERE name = ?")
        .bind("Cabbage")
        .fetch_optional(pool)
        .await?
    {
        Some(id) => id,
        None => masters::insert_crop(pool, "Cabbage").await?,
    };

    let year = sampling_date.year() as i64;
    let period_id = match sqlx::query_scalar::<_, i64>(
        "SELECT id FROM land_periods WHERE year = ? AND name = ?",
    )
    .bind(year)
    .bind("Spring")
    .fetch_optional(pool)
    .await?
    {
        Some(id) => id,
        None => masters::insert_land_period(pool, year, "Spring").await?,
    };

    let land_id = masters::insert_land(pool, company_id, land_name).await?;

    let method = masters::find_sampling_method_by_name(pool, DEFAULT_METHOD_NAME)
        .await?
        .ok_or_else(|| anyhow::anyhow!("default sampling method not seeded"))?;

    let ledger_id = ledgers::insert_ledger(
        pool,
        &ledgers::NewLandLedger {
            land_id,
            land_period_id: period_id,
            crop_id,
            sampling_method_id: method.id,
            sampling_date,
            sampling_staff: Some("Tester".to_string()),
            agency: None,
        },
    )
    .await?;

    Ok(LedgerFixture {
        ledger_id,
        land_id,
        method,
    })
}

/// (memory_index, depth, block name, ledger id) for every row, in id order
pub async fn measurement_bindings(
    pool: &SqlitePool,
) -> Result<Vec<(i64, i64, Option<String>, Option<i64>)>> {
    let rows = sqlx::query(
        r#"
        SELECT m.memory_index, m.depth, lb.name AS block_name, m.land_ledger_id
        FROM measurements m
        LEFT JOIN land_blocks lb ON lb.id = m.land_block_id
        ORDER BY m.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| {
            (
                row.get("memory_index"),
                row.get("depth"),
                row.get("block_name"),
                row.get("land_ledger_id"),
            )
        })
        .collect())
}
