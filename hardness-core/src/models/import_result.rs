//! Import run results

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// One file that failed to import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileError {
    pub file: String,
    pub folder: String,
    /// Stable code, e.g. `DUPLICATE`
    pub code: String,
    pub message: String,
}

impl FileError {
    pub fn new(file: &str, folder: &str, error: &IngestError) -> Self {
        Self {
            file: file.to_string(),
            folder: folder.to_string(),
            code: error.code().to_string(),
            message: error.message(),
        }
    }
}

/// Import completion result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    /// CSV files discovered under the staging root
    pub total_files: usize,
    /// Files whose rows were inserted
    pub imported_files: usize,
    /// Files recorded in the error log
    pub errored_files: usize,
    /// Measurement rows inserted by this run
    pub inserted_rows: u64,
    pub errors: Vec<FileError>,
}

impl ImportSummary {
    /// Count errors with the given code
    pub fn count_by_code(&self, code: &str) -> usize {
        self.errors.iter().filter(|e| e.code == code).count()
    }

    pub fn display_string(&self) -> String {
        format!(
            "{} of {} files imported ({} rows), {} errors",
            self.imported_files, self.total_files, self.inserted_rows, self.errored_files
        )
    }
}
