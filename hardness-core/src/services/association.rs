//! Association engine (C4)
//!
//! Binds the memory range of one anchor to a ledger and to land blocks.
//!
//! A session is `positions_per_block x replicates` consecutive memories, each
//! holding `configured_depth` rows. Rows are walked in insertion order and a
//! block index advances every `rows_per_block` rows:
//!
//! - R-type: `configured_depth x replicates` rows per block, blocks taken from
//!   the method's sampling order
//! - individual: `configured_depth x positions_per_block` rows per block,
//!   blocks supplied by the operator
//!
//! Every anchor is bound in one transaction. Validation happens before any
//! write, and the write itself only touches rows that are still unbound, so
//! a failing anchor leaves its whole range unbound.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::db::ledgers::{self, LedgerContext};
use crate::db::measurements::{self, RangeRow};
use crate::db::masters;
use crate::error::AssociationError;
use hardness_common::db::LandBlock;

/// Result of binding one anchor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorOutcome {
    pub anchor: i64,
    pub bound_rows: u64,
    /// Block names in walk order
    pub blocks: Vec<String>,
}

/// Result of an individual assignment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndividualOutcome {
    pub outcome: AnchorOutcome,
    /// Measurements still without a ledger anywhere in the store
    pub remaining_unbound: i64,
}

impl IndividualOutcome {
    /// True once every imported measurement is bound
    pub fn is_complete(&self) -> bool {
        self.remaining_unbound == 0
    }
}

/// Last memory index of the session starting at `anchor`
///
/// Memory numbers start at 1; a range that would run past `i64::MAX` is
/// incomplete.
pub fn session_last_memory(anchor: i64, total_memories: i64) -> Result<i64, AssociationError> {
    if anchor < 1 {
        return Err(AssociationError::IncompleteSession {
            anchor,
            reason: format!("memory numbers start at 1, got anchor {}", anchor),
        });
    }

    total_memories
        .checked_sub(1)
        .and_then(|span| anchor.checked_add(span))
        .ok_or_else(|| AssociationError::IncompleteSession {
            anchor,
            reason: format!("memory range of {} from {} overflows", total_memories, anchor),
        })
}

/// Check that `rows` form one complete, unbound session starting at `anchor`
///
/// Returns the configured depth shared by every row.
pub fn validate_session(
    rows: &[RangeRow],
    anchor: i64,
    total_memories: i64,
) -> Result<i64, AssociationError> {
    let last = session_last_memory(anchor, total_memories)?;

    let bound_rows = rows.iter().filter(|r| r.land_ledger_id.is_some()).count() as i64;
    if bound_rows > 0 {
        return Err(AssociationError::AlreadyAssociated { anchor, bound_rows });
    }

    let Some(first) = rows.first() else {
        return Err(AssociationError::IncompleteSession {
            anchor,
            reason: format!("no measurements in memory range {}-{}", anchor, last),
        });
    };

    let configured_depth = first.configured_depth;
    if rows.iter().any(|r| r.configured_depth != configured_depth) {
        return Err(AssociationError::IncompleteSession {
            anchor,
            reason: "set depth differs between memories".to_string(),
        });
    }

    let expected = total_memories * configured_depth;
    if rows.len() as i64 != expected {
        return Err(AssociationError::IncompleteSession {
            anchor,
            reason: format!(
                "expected {} rows in memory range {}-{}, found {}",
                expected,
                anchor,
                last,
                rows.len()
            ),
        });
    }

    let memories: HashSet<i64> = rows.iter().map(|r| r.memory_index).collect();
    if memories.len() as i64 != total_memories {
        return Err(AssociationError::IncompleteSession {
            anchor,
            reason: format!(
                "expected {} distinct memories, found {}",
                total_memories,
                memories.len()
            ),
        });
    }

    Ok(configured_depth)
}

/// Pair each row with the block its ordinal falls into
///
/// Row `i` goes to `blocks[i / rows_per_block]`. A walk that would step past
/// the last block is an ordering mismatch.
pub fn plan_walk(
    rows: &[RangeRow],
    anchor: i64,
    rows_per_block: i64,
    blocks: &[LandBlock],
) -> Result<Vec<(i64, i64)>, AssociationError> {
    if rows_per_block < 1 {
        return Err(AssociationError::OrderingMismatch {
            anchor,
            reason: format!("invalid block size {}", rows_per_block),
        });
    }

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let needle = i as i64 / rows_per_block;
            blocks
                .get(needle as usize)
                .map(|block| (row.id, block.id))
                .ok_or_else(|| AssociationError::OrderingMismatch {
                    anchor,
                    reason: format!(
                        "row {} needs block {} but only {} blocks are given",
                        i,
                        needle + 1,
                        blocks.len()
                    ),
                })
        })
        .collect()
}

pub struct AssociationEngine {
    pool: SqlitePool,
}

impl AssociationEngine {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Bind each anchor's session following the method's sampling order
    ///
    /// Anchors are processed in the given order and the run stops at the first
    /// failure; anchors bound before it stay bound.
    pub async fn associate_r_type(
        &self,
        land_ledger_id: i64,
        anchors: &[i64],
        folder: Option<&str>,
    ) -> Result<Vec<AnchorOutcome>, AssociationError> {
        let context = self.load_context(land_ledger_id).await?;
        let order = masters::sampling_order_blocks(&self.pool, context.method.id).await?;

        let mut outcomes = Vec::with_capacity(anchors.len());
        for &anchor in anchors {
            if order.len() as i64 != context.method.replicates {
                return Err(AssociationError::OrderingMismatch {
                    anchor,
                    reason: format!(
                        "'{}' has {} ordered blocks for {} replicates",
                        context.method.name,
                        order.len(),
                        context.method.replicates
                    ),
                });
            }

            let rows = self.session_rows(&context, anchor, folder).await?;
            let depth = validate_session(&rows, anchor, context.method.total_memories())?;
            let plan = plan_walk(&rows, anchor, depth * context.method.replicates, &order)?;

            let outcome = self.bind(&context, anchor, &plan, &order).await?;
            info!(
                "Ledger {}: anchor {} bound {} rows (R-type)",
                land_ledger_id, anchor, outcome.bound_rows
            );
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// Bind one anchor's session to operator-chosen blocks
    pub async fn associate_individual(
        &self,
        land_ledger_id: i64,
        anchor: i64,
        land_block_ids: &[i64],
        folder: Option<&str>,
    ) -> Result<IndividualOutcome, AssociationError> {
        let context = self.load_context(land_ledger_id).await?;

        if land_block_ids.len() as i64 != context.method.replicates {
            return Err(AssociationError::OrderingMismatch {
                anchor,
                reason: format!(
                    "{} blocks given, '{}' expects {}",
                    land_block_ids.len(),
                    context.method.name,
                    context.method.replicates
                ),
            });
        }

        let mut blocks = Vec::with_capacity(land_block_ids.len());
        for &id in land_block_ids {
            let block = masters::get_land_block(&self.pool, id)
                .await?
                .ok_or(AssociationError::LandBlockNotFound(id))?;
            blocks.push(block);
        }

        let rows = self.session_rows(&context, anchor, folder).await?;
        let depth = validate_session(&rows, anchor, context.method.total_memories())?;
        let plan = plan_walk(
            &rows,
            anchor,
            depth * context.method.positions_per_block,
            &blocks,
        )?;

        let outcome = self.bind(&context, anchor, &plan, &blocks).await?;
        let remaining_unbound = measurements::count_unbound(&self.pool).await?;
        info!(
            "Ledger {}: anchor {} bound {} rows (individual), {} rows still unbound",
            land_ledger_id, anchor, outcome.bound_rows, remaining_unbound
        );

        Ok(IndividualOutcome {
            outcome,
            remaining_unbound,
        })
    }

    async fn load_context(&self, land_ledger_id: i64) -> Result<LedgerContext, AssociationError> {
        ledgers::load_ledger_context(&self.pool, land_ledger_id)
            .await?
            .ok_or(AssociationError::LedgerNotFound(land_ledger_id))
    }

    async fn session_rows(
        &self,
        context: &LedgerContext,
        anchor: i64,
        folder: Option<&str>,
    ) -> Result<Vec<RangeRow>, AssociationError> {
        let last = session_last_memory(anchor, context.method.total_memories())?;
        let rows = measurements::fetch_memory_range(&self.pool, anchor, last, folder).await?;
        debug!("Anchor {}: {} rows in memory range {}-{}", anchor, rows.len(), anchor, last);
        Ok(rows)
    }

    async fn bind(
        &self,
        context: &LedgerContext,
        anchor: i64,
        plan: &[(i64, i64)],
        blocks: &[LandBlock],
    ) -> Result<AnchorOutcome, AssociationError> {
        let bound = measurements::bind_rows(&self.pool, context.ledger.id, plan).await?;
        if bound as usize != plan.len() {
            // Lost a race with another binding; the transaction was rolled back
            return Err(AssociationError::AlreadyAssociated {
                anchor,
                bound_rows: (plan.len() as u64 - bound) as i64,
            });
        }

        Ok(AnchorOutcome {
            anchor,
            bound_rows: bound,
            blocks: blocks.iter().map(|b| b.name.clone()).collect(),
        })
    }
}
