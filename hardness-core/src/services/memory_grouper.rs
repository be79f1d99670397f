//! Memory-anchor grouping (C3)
//!
//! A memory group is every row of one probe insertion. Operators pick anchors
//! from the unassociated listing; the range preview shows what an anchor would
//! cover for a given ledger before anything is bound.

use sqlx::SqlitePool;

use crate::db::{ledgers, measurements};
use crate::error::AssociationError;
use crate::models::MemoryGroup;
use crate::services::association::session_last_memory;

pub struct MemoryGrouper {
    pool: SqlitePool,
}

impl MemoryGrouper {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Groups with no block bound, ordered by (folder, memory_index, recorded_at)
    pub async fn list_unassociated_groups(&self) -> sqlx::Result<Vec<MemoryGroup>> {
        measurements::list_unassociated_groups(&self.pool).await
    }

    /// Groups inside `[anchor, anchor + total_memories - 1]` for the ledger's method
    pub async fn preview_anchor_range(
        &self,
        land_ledger_id: i64,
        anchor: i64,
        folder: Option<&str>,
    ) -> Result<Vec<MemoryGroup>, AssociationError> {
        let context = ledgers::load_ledger_context(&self.pool, land_ledger_id)
            .await?
            .ok_or(AssociationError::LedgerNotFound(land_ledger_id))?;

        let last = session_last_memory(anchor, context.method.total_memories())?;
        Ok(measurements::list_groups_in_range(&self.pool, anchor, last, folder).await?)
    }
}
