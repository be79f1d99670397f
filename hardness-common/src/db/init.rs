//! Database initialization
//!
//! Schema creation is idempotent and runs on every start. Timestamps are stored
//! as RFC 3339 text carrying the acquisition offset so that lexical MIN/MAX
//! matches chronological order.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Current schema version
pub const SCHEMA_VERSION: i64 = 1;

/// Name of the default sampling method inserted by [`seed_defaults`]
pub const DEFAULT_METHOD_NAME: &str = "5-point method";

/// Blocks of the 3x3 field subdivision
pub const DEFAULT_BLOCKS: [&str; 9] = ["A1", "A2", "A3", "B1", "B2", "B3", "C1", "C2", "C3"];

/// R-pattern walk of the default method
pub const DEFAULT_ORDER: [&str; 5] = ["C1", "C3", "A3", "B2", "A1"];

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Pragmas go on the connect options so every pooled connection gets them
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table and index (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;

    // Master data
    create_devices_table(pool).await?;
    create_companies_table(pool).await?;
    create_crops_table(pool).await?;
    create_land_periods_table(pool).await?;
    create_lands_table(pool).await?;
    create_land_blocks_table(pool).await?;
    create_sampling_methods_table(pool).await?;
    create_sampling_orders_table(pool).await?;
    create_land_ledgers_table(pool).await?;

    // Raw readings and the import error log
    create_measurements_table(pool).await?;
    create_measurement_import_errors_table(pool).await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_devices_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS devices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            remark TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_companies_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS companies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_crops_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS crops (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            remark TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_land_periods_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS land_periods (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            year INTEGER NOT NULL,
            name TEXT NOT NULL,
            UNIQUE (year, name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_lands_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lands (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            company_id INTEGER NOT NULL REFERENCES companies(id),
            image TEXT,
            remark TEXT,
            UNIQUE (company_id, name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_land_blocks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS land_blocks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sampling_methods_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sampling_methods (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            replicates INTEGER NOT NULL,
            positions_per_block INTEGER NOT NULL DEFAULT 5,
            remark TEXT,
            CHECK (replicates > 0),
            CHECK (positions_per_block > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sampling_orders_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sampling_orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sampling_method_id INTEGER NOT NULL REFERENCES sampling_methods(id) ON DELETE CASCADE,
            ordering INTEGER NOT NULL,
            land_block_id INTEGER NOT NULL REFERENCES land_blocks(id),
            UNIQUE (sampling_method_id, ordering)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_land_ledgers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS land_ledgers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            land_id INTEGER NOT NULL REFERENCES lands(id),
            land_period_id INTEGER NOT NULL REFERENCES land_periods(id),
            crop_id INTEGER NOT NULL REFERENCES crops(id),
            sampling_method_id INTEGER NOT NULL REFERENCES sampling_methods(id),
            sampling_date TEXT NOT NULL,
            sampling_staff TEXT,
            agency TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (land_id, land_period_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_measurements_table(pool: &SqlitePool) -> Result<()> {
    // Both bindings are set together or not at all
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS measurements (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            device_id INTEGER NOT NULL REFERENCES devices(id),
            memory_index INTEGER NOT NULL,
            recorded_at TEXT NOT NULL,
            configured_depth INTEGER NOT NULL,
            spring_constant INTEGER NOT NULL,
            cone_area INTEGER NOT NULL,
            depth INTEGER NOT NULL,
            pressure INTEGER NOT NULL,
            folder TEXT NOT NULL,
            land_block_id INTEGER REFERENCES land_blocks(id),
            land_ledger_id INTEGER REFERENCES land_ledgers(id),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (device_id, memory_index, recorded_at, depth),
            CHECK (memory_index > 0),
            CHECK (depth >= 1 AND depth <= configured_depth),
            CHECK ((land_block_id IS NULL) = (land_ledger_id IS NULL))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_measurements_group ON measurements(folder, memory_index, recorded_at)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_measurements_ledger ON measurements(land_ledger_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_measurement_import_errors_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS measurement_import_errors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file TEXT NOT NULL,
            folder TEXT NOT NULL,
            code TEXT NOT NULL,
            message TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert the default land blocks and the 5-point sampling method
///
/// Safe to call repeatedly; existing rows are left untouched.
pub async fn seed_defaults(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await?;

    for name in DEFAULT_BLOCKS {
        sqlx::query("INSERT OR IGNORE INTO land_blocks (name) VALUES (?)")
            .bind(name)
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query(
        "INSERT OR IGNORE INTO sampling_methods (name, replicates, positions_per_block) VALUES (?, 5, 5)",
    )
    .bind(DEFAULT_METHOD_NAME)
    .execute(&mut *tx)
    .await?;

    let method_id: i64 = sqlx::query_scalar("SELECT id FROM sampling_methods WHERE name = ?")
        .bind(DEFAULT_METHOD_NAME)
        .fetch_one(&mut *tx)
        .await?;

    for (ordering, block) in DEFAULT_ORDER.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO sampling_orders (sampling_method_id, ordering, land_block_id)
            SELECT ?, ?, id FROM land_blocks WHERE name = ?
            "#,
        )
        .bind(method_id)
        .bind(ordering as i64 + 1)
        .bind(*block)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    info!("Seeded {} land blocks and '{}'", DEFAULT_BLOCKS.len(), DEFAULT_METHOD_NAME);
    Ok(())
}
