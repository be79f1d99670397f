//! Error types for hardness-core
//!
//! One enum per component. Per-file ingestion errors carry the file and folder
//! so the import error log can be written from the error alone; association
//! errors carry the anchor they were raised for.

use std::path::PathBuf;
use thiserror::Error;

use crate::services::renderer::RenderError;

/// Message stored in the error log for files whose rows already exist
pub const DUPLICATE_MESSAGE: &str = "already imported";

/// Failure to ingest one penetrometer file (C1)
#[derive(Debug, Error)]
pub enum IngestError {
    /// Header block does not look like a penetrometer dump
    #[error("{folder}/{file}: header shape: {reason}")]
    HeaderShape {
        file: String,
        folder: String,
        reason: String,
    },

    /// A header value or data row could not be parsed
    #[error("{folder}/{file}: field parse: {reason}")]
    FieldParse {
        file: String,
        folder: String,
        reason: String,
    },

    /// Rows for this acquisition are already stored
    #[error("{folder}/{file}: {}", DUPLICATE_MESSAGE)]
    Duplicate { file: String, folder: String },

    /// File could not be read
    #[error("{folder}/{file}: I/O error: {source}")]
    Io {
        file: String,
        folder: String,
        #[source]
        source: std::io::Error,
    },

    /// Database failure other than a uniqueness violation
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IngestError {
    /// Stable code recorded in the import error log
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::HeaderShape { .. } => "HEADER_SHAPE",
            IngestError::FieldParse { .. } => "FIELD_PARSE",
            IngestError::Duplicate { .. } => "DUPLICATE",
            IngestError::Io { .. } => "IO_ERROR",
            IngestError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Log message without the file/folder prefix
    pub fn message(&self) -> String {
        match self {
            IngestError::HeaderShape { reason, .. } => format!("header shape: {}", reason),
            IngestError::FieldParse { reason, .. } => format!("field parse: {}", reason),
            IngestError::Duplicate { .. } => DUPLICATE_MESSAGE.to_string(),
            IngestError::Io { source, .. } => format!("I/O error: {}", source),
            IngestError::Database(e) => format!("database error: {}", e),
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, IngestError::Duplicate { .. })
    }
}

/// Failure of a whole import run (C2)
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Staging root not found: {0}")]
    StagingRootNotFound(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Failure to bind one anchor's memory range (C4)
///
/// Any of these leaves the range untouched.
#[derive(Debug, Error)]
pub enum AssociationError {
    #[error("Anchor {anchor}: incomplete session ({reason})")]
    IncompleteSession { anchor: i64, reason: String },

    #[error("Anchor {anchor}: {bound_rows} rows already associated")]
    AlreadyAssociated { anchor: i64, bound_rows: i64 },

    #[error("Anchor {anchor}: ordering mismatch ({reason})")]
    OrderingMismatch { anchor: i64, reason: String },

    #[error("Land ledger not found: {0}")]
    LedgerNotFound(i64),

    #[error("Land block not found: {0}")]
    LandBlockNotFound(i64),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AssociationError {
    pub fn anchor(&self) -> Option<i64> {
        match self {
            AssociationError::IncompleteSession { anchor, .. }
            | AssociationError::AlreadyAssociated { anchor, .. }
            | AssociationError::OrderingMismatch { anchor, .. } => Some(*anchor),
            _ => None,
        }
    }
}

/// Failure to produce the surface image of one ledger (C6)
#[derive(Debug, Error)]
pub enum PlotError {
    #[error("Land ledger not found: {0}")]
    LedgerNotFound(i64),

    #[error("Land ledger {0} has no associated measurements")]
    NoAssociatedData(i64),

    #[error("Render failed: {0}")]
    Render(#[from] RenderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_message_and_code() {
        let err = IngestError::Duplicate {
            file: "DIK-5531_0001.csv".to_string(),
            folder: "FIELD001".to_string(),
        };
        assert_eq!(err.code(), "DUPLICATE");
        assert_eq!(err.message(), "already imported");
        assert_eq!(err.to_string(), "FIELD001/DIK-5531_0001.csv: already imported");
        assert!(err.is_duplicate());
    }

    #[test]
    fn test_association_error_anchor() {
        let err = AssociationError::AlreadyAssociated {
            anchor: 26,
            bound_rows: 60,
        };
        assert_eq!(err.anchor(), Some(26));
        assert_eq!(AssociationError::LedgerNotFound(3).anchor(), None);
    }
}
