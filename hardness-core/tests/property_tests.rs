//! Property tests for the parser and the association walk

mod helpers;

use hardness_common::db::LandBlock;
use hardness_core::db::measurements::RangeRow;
use hardness_core::error::{AssociationError, IngestError};
use hardness_core::services::association::{plan_walk, validate_session};
use hardness_core::services::parse_probe_csv;
use helpers::{base_time, probe_csv};
use proptest::prelude::*;

fn session_rows(memories: i64, depth: i64, anchor: i64) -> Vec<RangeRow> {
    let mut rows = Vec::new();
    for m in 0..memories {
        for _ in 0..depth {
            rows.push(RangeRow {
                id: rows.len() as i64 + 1,
                memory_index: anchor + m,
                recorded_at: format!("2024-05-10T08:{:02}:00+09:00", m % 60),
                configured_depth: depth,
                land_ledger_id: None,
            });
        }
    }
    rows
}

fn blocks(n: usize) -> Vec<LandBlock> {
    (0..n)
        .map(|i| LandBlock {
            id: 100 + i as i64,
            name: format!("B{}", i),
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_well_formed_file_parses_every_depth(
        depth in 1..80i64,
        pressures in proptest::collection::vec(0..3000i64, 80),
        memory in 1..9999i64,
    ) {
        let text = probe_csv(memory, &base_time(), depth, |d| pressures[(d - 1) as usize]);
        let parsed = parse_probe_csv("f.csv", "FIELD001", text.as_bytes()).unwrap();

        prop_assert_eq!(parsed.header.memory_index, memory);
        prop_assert_eq!(parsed.header.configured_depth, depth);
        prop_assert_eq!(parsed.readings.len() as i64, depth);
        for (i, reading) in parsed.readings.iter().enumerate() {
            prop_assert_eq!(reading.depth, i as i64 + 1);
            prop_assert_eq!(reading.pressure, pressures[i]);
        }
    }

    #[test]
    fn prop_missing_depth_row_rejected(depth in 2..80i64, missing in 1..80i64) {
        let missing = 1 + (missing - 1) % depth;
        let prefix = format!("{},", missing);
        let text: String = probe_csv(1, &base_time(), depth, |d| d * 10)
            .lines()
            .enumerate()
            // Header lines come first; only data rows are candidates
            .filter(|(i, line)| *i < 10 || !line.starts_with(&prefix))
            .map(|(_, line)| format!("{}\n", line))
            .collect();

        let result = parse_probe_csv("f.csv", "FIELD001", text.as_bytes());
        let is_field_parse = matches!(result, Err(IngestError::FieldParse { .. }));
        prop_assert!(is_field_parse);
    }

    #[test]
    fn prop_walk_fills_blocks_in_order(
        replicates in 1..7usize,
        positions in 1..6i64,
        depth in 1..20i64,
        anchor in 1..500i64,
    ) {
        let total_memories = replicates as i64 * positions;
        let rows = session_rows(total_memories, depth, anchor);
        let order = blocks(replicates);

        let validated = validate_session(&rows, anchor, total_memories).unwrap();
        prop_assert_eq!(validated, depth);

        let rows_per_block = depth * positions;
        let plan = plan_walk(&rows, anchor, rows_per_block, &order).unwrap();
        prop_assert_eq!(plan.len(), rows.len());

        for (i, (row_id, block_id)) in plan.iter().enumerate() {
            prop_assert_eq!(*row_id, rows[i].id);
            prop_assert_eq!(*block_id, order[i / rows_per_block as usize].id);
        }
        for block in &order {
            let count = plan.iter().filter(|(_, b)| *b == block.id).count() as i64;
            prop_assert_eq!(count, rows_per_block);
        }
    }

    #[test]
    fn prop_walk_past_last_block_rejected(
        replicates in 2..7usize,
        depth in 1..20i64,
    ) {
        let rows = session_rows(replicates as i64 * 5, depth, 1);
        let short = blocks(replicates - 1);

        let result = plan_walk(&rows, 1, depth * 5, &short);
        let is_mismatch = matches!(result, Err(AssociationError::OrderingMismatch { anchor: 1, .. }));
        prop_assert!(is_mismatch);
    }

    #[test]
    fn prop_any_bound_row_blocks_the_session(
        memories in 1..30i64,
        depth in 1..20i64,
        bound in 0..600usize,
    ) {
        let mut rows = session_rows(memories, depth, 1);
        let bound = bound % rows.len();
        rows[bound].land_ledger_id = Some(7);

        let result = validate_session(&rows, 1, memories);
        let is_already = matches!(
            result,
            Err(AssociationError::AlreadyAssociated { anchor: 1, bound_rows: 1 })
        );
        prop_assert!(is_already);
    }

    #[test]
    fn prop_short_range_is_incomplete(
        memories in 2..30i64,
        depth in 1..20i64,
    ) {
        let rows = session_rows(memories - 1, depth, 1);

        let result = validate_session(&rows, 1, memories);
        let is_incomplete = matches!(result, Err(AssociationError::IncompleteSession { anchor: 1, .. }));
        prop_assert!(is_incomplete);
    }
}
