//! Ledger suggestion for a staged folder
//!
//! Field crews usually name the folder after the land they walked, so the
//! folder name is matched against land names in both directions. The sampling
//! date is taken from the newest acquisition stored for the folder.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use hardness_common::time;

use crate::db::{masters, measurements};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSuggestion {
    pub folder: String,
    pub land_id: Option<i64>,
    pub land_name: Option<String>,
    pub company_name: Option<String>,
    pub sampling_date: Option<NaiveDate>,
}

impl LedgerSuggestion {
    pub fn display_string(&self) -> String {
        let land = match (&self.land_name, &self.company_name, self.land_id) {
            (Some(land), Some(company), Some(id)) => format!("{} / {} (id {})", company, land, id),
            _ => "no matching land".to_string(),
        };
        let date = self
            .sampling_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "no measurements".to_string());
        format!("{}: land {}, sampling date {}", self.folder, land, date)
    }
}

/// Case-insensitive containment in either direction
pub fn names_match(land_name: &str, folder: &str) -> bool {
    let land = land_name.to_lowercase();
    let folder = folder.to_lowercase();
    if land.is_empty() || folder.is_empty() {
        return false;
    }
    folder.contains(&land) || land.contains(&folder)
}

pub struct LedgerSuggester {
    pool: SqlitePool,
}

impl LedgerSuggester {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn suggest(&self, folder: &str) -> hardness_common::Result<LedgerSuggestion> {
        let lands = masters::list_lands_with_company(&self.pool).await?;
        let matched = lands
            .into_iter()
            .find(|(land, _)| names_match(&land.name, folder));

        let sampling_date = match measurements::latest_recorded_at(&self.pool, folder).await? {
            Some(stored) => Some(time::from_storage(&stored)?.date_naive()),
            None => None,
        };

        debug!(
            folder,
            land = matched.as_ref().map(|(land, _)| land.id),
            ?sampling_date,
            "Ledger suggestion"
        );

        let (land_id, land_name, company_name) = match matched {
            Some((land, company)) => (Some(land.id), Some(land.name), Some(company)),
            None => (None, None, None),
        };

        Ok(LedgerSuggestion {
            folder: folder.to_string(),
            land_id,
            land_name,
            company_name,
            sampling_date,
        })
    }
}
