//! Land ledger persistence

use chrono::NaiveDate;
use hardness_common::db::{LandLedger, SamplingMethod};
use sqlx::{Row, SqlitePool};

/// Fields needed to open a new ledger
#[derive(Debug, Clone)]
pub struct NewLandLedger {
    pub land_id: i64,
    pub land_period_id: i64,
    pub crop_id: i64,
    pub sampling_method_id: i64,
    pub sampling_date: NaiveDate,
    pub sampling_staff: Option<String>,
    pub agency: Option<String>,
}

/// A ledger together with what association and plotting need from its joins
#[derive(Debug, Clone)]
pub struct LedgerContext {
    pub ledger: LandLedger,
    pub method: SamplingMethod,
    pub land_name: String,
}

/// Insert a ledger; a second ledger for the same land and period is rejected
pub async fn insert_ledger(pool: &SqlitePool, ledger: &NewLandLedger) -> sqlx::Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO land_ledgers
            (land_id, land_period_id, crop_id, sampling_method_id, sampling_date,
             sampling_staff, agency)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(ledger.land_id)
    .bind(ledger.land_period_id)
    .bind(ledger.crop_id)
    .bind(ledger.sampling_method_id)
    .bind(ledger.sampling_date.format("%Y-%m-%d").to_string())
    .bind(&ledger.sampling_staff)
    .bind(&ledger.agency)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Load a ledger with its sampling method and land name
pub async fn load_ledger_context(
    pool: &SqlitePool,
    land_ledger_id: i64,
) -> sqlx::Result<Option<LedgerContext>> {
    let row = sqlx::query(
        r#"
        SELECT ll.id, ll.land_id, ll.land_period_id, ll.crop_id, ll.sampling_method_id,
               ll.sampling_date, ll.sampling_staff, ll.agency,
               sm.name AS method_name, sm.replicates, sm.positions_per_block,
               l.name AS land_name
        FROM land_ledgers ll
        JOIN sampling_methods sm ON sm.id = ll.sampling_method_id
        JOIN lands l ON l.id = ll.land_id
        WHERE ll.id = ?
        "#,
    )
    .bind(land_ledger_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let sampling_date: String = row.get("sampling_date");
    let sampling_date = NaiveDate::parse_from_str(&sampling_date, "%Y-%m-%d")
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

    Ok(Some(LedgerContext {
        ledger: LandLedger {
            id: row.get("id"),
            land_id: row.get("land_id"),
            land_period_id: row.get("land_period_id"),
            crop_id: row.get("crop_id"),
            sampling_method_id: row.get("sampling_method_id"),
            sampling_date,
            sampling_staff: row.get("sampling_staff"),
            agency: row.get("agency"),
        },
        method: SamplingMethod {
            id: row.get("sampling_method_id"),
            name: row.get("method_name"),
            replicates: row.get("replicates"),
            positions_per_block: row.get("positions_per_block"),
        },
        land_name: row.get("land_name"),
    }))
}
