//! Master data: devices, companies, crops, periods, lands, blocks, methods
//!
//! Plain insert and lookup; there is no editing surface.

use hardness_common::db::{Land, LandBlock, SamplingMethod};
use sqlx::{Row, SqlitePool};

/// Device id for a model name, registering it on first sight
pub async fn get_or_create_device(pool: &SqlitePool, name: &str) -> sqlx::Result<i64> {
    sqlx::query("INSERT OR IGNORE INTO devices (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;

    sqlx::query_scalar("SELECT id FROM devices WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await
}

pub async fn insert_company(pool: &SqlitePool, name: &str) -> sqlx::Result<i64> {
    let result = sqlx::query("INSERT INTO companies (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn insert_crop(pool: &SqlitePool, name: &str) -> sqlx::Result<i64> {
    let result = sqlx::query("INSERT INTO crops (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn insert_land_period(pool: &SqlitePool, year: i64, name: &str) -> sqlx::Result<i64> {
    let result = sqlx::query("INSERT INTO land_periods (year, name) VALUES (?, ?)")
        .bind(year)
        .bind(name)
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn insert_land(pool: &SqlitePool, company_id: i64, name: &str) -> sqlx::Result<i64> {
    let result = sqlx::query("INSERT INTO lands (name, company_id) VALUES (?, ?)")
        .bind(name)
        .bind(company_id)
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn get_land(pool: &SqlitePool, land_id: i64) -> sqlx::Result<Option<Land>> {
    let row = sqlx::query("SELECT id, name, company_id, image FROM lands WHERE id = ?")
        .bind(land_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| Land {
        id: row.get("id"),
        name: row.get("name"),
        company_id: row.get("company_id"),
        image: row.get("image"),
    }))
}

/// Lands with their company name, ordered by company then land name
pub async fn list_lands_with_company(pool: &SqlitePool) -> sqlx::Result<Vec<(Land, String)>> {
    let rows = sqlx::query(
        r#"
        SELECT l.id, l.name, l.company_id, l.image, c.name AS company_name
        FROM lands l
        JOIN companies c ON c.id = l.company_id
        ORDER BY c.name, l.name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| {
            (
                Land {
                    id: row.get("id"),
                    name: row.get("name"),
                    company_id: row.get("company_id"),
                    image: row.get("image"),
                },
                row.get("company_name"),
            )
        })
        .collect())
}

pub async fn set_land_image(pool: &SqlitePool, land_id: i64, image: &str) -> sqlx::Result<()> {
    sqlx::query("UPDATE lands SET image = ? WHERE id = ?")
        .bind(image)
        .bind(land_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_land_blocks(pool: &SqlitePool) -> sqlx::Result<Vec<LandBlock>> {
    let rows = sqlx::query("SELECT id, name FROM land_blocks ORDER BY name")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| LandBlock {
            id: row.get("id"),
            name: row.get("name"),
        })
        .collect())
}

pub async fn get_land_block(pool: &SqlitePool, land_block_id: i64) -> sqlx::Result<Option<LandBlock>> {
    let row = sqlx::query("SELECT id, name FROM land_blocks WHERE id = ?")
        .bind(land_block_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| LandBlock {
        id: row.get("id"),
        name: row.get("name"),
    }))
}

pub async fn find_land_block_by_name(pool: &SqlitePool, name: &str) -> sqlx::Result<Option<LandBlock>> {
    let row = sqlx::query("SELECT id, name FROM land_blocks WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| LandBlock {
        id: row.get("id"),
        name: row.get("name"),
    }))
}

pub async fn insert_sampling_method(
    pool: &SqlitePool,
    name: &str,
    replicates: i64,
    positions_per_block: i64,
) -> sqlx::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO sampling_methods (name, replicates, positions_per_block) VALUES (?, ?, ?)",
    )
    .bind(name)
    .bind(replicates)
    .bind(positions_per_block)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn get_sampling_method(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<SamplingMethod>> {
    let row = sqlx::query(
        "SELECT id, name, replicates, positions_per_block FROM sampling_methods WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| SamplingMethod {
        id: row.get("id"),
        name: row.get("name"),
        replicates: row.get("replicates"),
        positions_per_block: row.get("positions_per_block"),
    }))
}

pub async fn find_sampling_method_by_name(
    pool: &SqlitePool,
    name: &str,
) -> sqlx::Result<Option<SamplingMethod>> {
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM sampling_methods WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?;

    match id {
        Some(id) => get_sampling_method(pool, id).await,
        None => Ok(None),
    }
}

/// Replace the walk of a method with the given blocks, in order
pub async fn set_sampling_order(
    pool: &SqlitePool,
    sampling_method_id: i64,
    land_block_ids: &[i64],
) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM sampling_orders WHERE sampling_method_id = ?")
        .bind(sampling_method_id)
        .execute(&mut *tx)
        .await?;

    for (ordering, land_block_id) in land_block_ids.iter().enumerate() {
        sqlx::query(
            "INSERT INTO sampling_orders (sampling_method_id, ordering, land_block_id) VALUES (?, ?, ?)",
        )
        .bind(sampling_method_id)
        .bind(ordering as i64 + 1)
        .bind(land_block_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Blocks of a method's walk, sorted by ordering
pub async fn sampling_order_blocks(
    pool: &SqlitePool,
    sampling_method_id: i64,
) -> sqlx::Result<Vec<LandBlock>> {
    let rows = sqlx::query(
        r#"
        SELECT lb.id, lb.name
        FROM sampling_orders so
        JOIN land_blocks lb ON lb.id = so.land_block_id
        WHERE so.sampling_method_id = ?
        ORDER BY so.ordering
        "#,
    )
    .bind(sampling_method_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| LandBlock {
            id: row.get("id"),
            name: row.get("name"),
        })
        .collect())
}
