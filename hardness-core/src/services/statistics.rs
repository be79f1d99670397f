//! Statistics aggregator (C5)
//!
//! Read-only views over the measurements table. They read committed state
//! only, so they always reflect exactly what the association engine wrote.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use crate::db::{import_errors, measurements};
use crate::models::{
    AssociationSummary, BlockStats, FolderStats, LedgerDescriptor, LedgerStats, PlotPrecheck,
};

/// Which rows the folder view aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderStatsMode {
    /// Every measurement
    Unassociated,
    /// Rows bound to both a block and a ledger
    Associated,
}

impl FromStr for FolderStatsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unassociated" => Ok(FolderStatsMode::Unassociated),
            "associated" => Ok(FolderStatsMode::Associated),
            other => Err(format!("unknown folder stats mode: {}", other)),
        }
    }
}

impl fmt::Display for FolderStatsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FolderStatsMode::Unassociated => write!(f, "unassociated"),
            FolderStatsMode::Associated => write!(f, "associated"),
        }
    }
}

pub struct StatisticsService {
    pool: SqlitePool,
}

impl StatisticsService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Per-folder, per-device aggregates ordered by folder then device
    pub async fn folder_stats(&self, mode: FolderStatsMode) -> sqlx::Result<Vec<FolderStats>> {
        let filter = match mode {
            FolderStatsMode::Unassociated => "",
            FolderStatsMode::Associated => {
                "WHERE m.land_block_id IS NOT NULL AND m.land_ledger_id IS NOT NULL"
            }
        };

        let sql = format!(
            r#"
            SELECT m.folder, d.name AS device_name, COUNT(*) AS row_count,
                   MIN(m.memory_index) AS min_memory, MAX(m.memory_index) AS max_memory,
                   MIN(m.recorded_at) AS min_recorded_at, MAX(m.recorded_at) AS max_recorded_at
            FROM measurements m
            JOIN devices d ON d.id = m.device_id
            {}
            GROUP BY m.folder, d.name
            ORDER BY m.folder, d.name
            "#,
            filter
        );

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let mut stats: Vec<FolderStats> = rows
            .iter()
            .map(|row| FolderStats {
                folder: row.get("folder"),
                device_name: row.get("device_name"),
                row_count: row.get("row_count"),
                min_memory: row.get("min_memory"),
                max_memory: row.get("max_memory"),
                min_recorded_at: row.get("min_recorded_at"),
                max_recorded_at: row.get("max_recorded_at"),
                ..Default::default()
            })
            .collect();

        if mode == FolderStatsMode::Associated {
            self.attach_associated_lists(&mut stats).await?;
        }

        Ok(stats)
    }

    async fn attach_associated_lists(&self, stats: &mut [FolderStats]) -> sqlx::Result<()> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT m.folder, d.name AS device_name, lb.name AS land_block_name,
                   l.name AS land_name, ll.sampling_date, c.name AS crop_name
            FROM measurements m
            JOIN devices d ON d.id = m.device_id
            JOIN land_blocks lb ON lb.id = m.land_block_id
            JOIN land_ledgers ll ON ll.id = m.land_ledger_id
            JOIN lands l ON l.id = ll.land_id
            JOIN crops c ON c.id = ll.crop_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        // Lists are sorted and deduplicated per folder
        let mut per_folder: BTreeMap<String, (Vec<String>, Vec<String>, Vec<LedgerDescriptor>)> =
            BTreeMap::new();
        for row in &rows {
            let entry = per_folder.entry(row.get("folder")).or_default();
            entry.0.push(row.get("device_name"));
            entry.1.push(row.get("land_block_name"));
            entry.2.push(LedgerDescriptor {
                land_name: row.get("land_name"),
                sampling_date: row.get("sampling_date"),
                crop_name: row.get("crop_name"),
            });
        }
        for (devices, blocks, ledgers) in per_folder.values_mut() {
            devices.sort();
            devices.dedup();
            blocks.sort();
            blocks.dedup();
            ledgers.sort();
            ledgers.dedup();
        }

        for folder in stats.iter_mut() {
            if let Some((devices, blocks, ledgers)) = per_folder.get(&folder.folder) {
                folder.device_names = devices.clone();
                folder.land_block_names = blocks.clone();
                folder.ledgers = ledgers.clone();
            }
        }

        Ok(())
    }

    /// Associated rows per land block, ordered by block name
    pub async fn block_stats(&self) -> sqlx::Result<Vec<BlockStats>> {
        let rows = sqlx::query(
            r#"
            SELECT lb.name AS land_block_name, COUNT(*) AS row_count,
                   MIN(m.configured_depth) AS min_configured_depth,
                   MIN(m.pressure) AS min_pressure, MAX(m.pressure) AS max_pressure
            FROM measurements m
            JOIN land_blocks lb ON lb.id = m.land_block_id
            WHERE m.land_ledger_id IS NOT NULL
            GROUP BY lb.name
            ORDER BY lb.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| BlockStats {
                land_block_name: row.get("land_block_name"),
                row_count: row.get("row_count"),
                min_configured_depth: row.get("min_configured_depth"),
                min_pressure: row.get("min_pressure"),
                max_pressure: row.get("max_pressure"),
            })
            .collect())
    }

    /// Associated rows per ledger, ordered by sampling date
    pub async fn ledger_stats(&self) -> sqlx::Result<Vec<LedgerStats>> {
        let rows = sqlx::query(
            r#"
            SELECT ll.id AS land_ledger_id, l.name AS land_name, ll.sampling_date,
                   c.name AS crop_name, lp.name AS period_name, COUNT(*) AS row_count
            FROM measurements m
            JOIN land_ledgers ll ON ll.id = m.land_ledger_id
            JOIN lands l ON l.id = ll.land_id
            JOIN crops c ON c.id = ll.crop_id
            JOIN land_periods lp ON lp.id = ll.land_period_id
            WHERE m.land_block_id IS NOT NULL
            GROUP BY ll.id, l.name, ll.sampling_date, c.name, lp.name
            ORDER BY ll.sampling_date, ll.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| LedgerStats {
                land_ledger_id: row.get("land_ledger_id"),
                land_name: row.get("land_name"),
                sampling_date: row.get("sampling_date"),
                crop_name: row.get("crop_name"),
                period_name: row.get("period_name"),
                row_count: row.get("row_count"),
            })
            .collect())
    }

    /// Error log plus every associated view, read in one pass
    pub async fn association_summary(&self) -> sqlx::Result<AssociationSummary> {
        let total_associated: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM measurements WHERE land_ledger_id IS NOT NULL",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(AssociationSummary {
            import_errors: import_errors::list_import_errors(&self.pool).await?,
            folders: self.folder_stats(FolderStatsMode::Associated).await?,
            blocks: self.block_stats().await?,
            ledgers: self.ledger_stats().await?,
            total_associated,
        })
    }

    /// Bound vs. total measurement counts
    pub async fn plot_precheck(&self) -> sqlx::Result<PlotPrecheck> {
        let total = measurements::count_measurements(&self.pool).await?;
        let unbound = measurements::count_unbound(&self.pool).await?;
        Ok(PlotPrecheck {
            assigned: total - unbound,
            total,
        })
    }
}
