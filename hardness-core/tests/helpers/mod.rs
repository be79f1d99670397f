//! Test Helper Utilities
//!
//! Shared utilities for testing hardness-core

#![allow(dead_code)]

pub mod db_utils;
pub mod staging;

// Re-export commonly used items
pub use db_utils::{create_ledger, create_test_db, measurement_bindings, LedgerFixture};
pub use staging::{base_time, probe_csv, stage_fields, write_probe};
