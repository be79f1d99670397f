//! Database access for hardness-core
//!
//! Table-level queries. Aggregate views live with the services that own them.

pub mod import_errors;
pub mod ledgers;
pub mod masters;
pub mod measurements;

pub use hardness_common::db::{init_database, seed_defaults};

/// True when the error is a UNIQUE constraint violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}
