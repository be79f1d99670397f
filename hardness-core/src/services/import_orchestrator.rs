//! Import orchestrator (C2)
//!
//! Walks a staging root, ingests every CSV file in path order and keeps the
//! error log. Files are independent: one failing never stops the run, and a
//! cancelled run leaves a prefix of files fully imported.

use std::path::Path;

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::import_errors;
use crate::error::{ImportError, IngestError};
use crate::models::{FileError, ImportSummary};
use crate::services::csv_ingestor::CsvIngestor;
use crate::services::file_scanner::{parent_folder_name, FileScanner};

pub struct ImportOrchestrator {
    pool: SqlitePool,
    scanner: FileScanner,
    ingestor: CsvIngestor,
}

impl ImportOrchestrator {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            scanner: FileScanner::new(),
            ingestor: CsvIngestor::new(pool.clone()),
            pool,
        }
    }

    /// Import every CSV under `staging_root`
    ///
    /// The error log is cleared first; afterwards it holds exactly one row per
    /// file that failed in this run.
    pub async fn import(&self, staging_root: &Path) -> Result<ImportSummary, ImportError> {
        let files = self.scanner.scan(staging_root)?;

        let cleared = import_errors::clear_import_errors(&self.pool).await?;
        if cleared > 0 {
            info!("Cleared {} import error log entries", cleared);
        }

        let mut summary = ImportSummary {
            total_files: files.len(),
            ..Default::default()
        };

        for path in &files {
            match self.ingestor.ingest_file(path).await {
                Ok(rows) => {
                    summary.imported_files += 1;
                    summary.inserted_rows += rows;
                }
                Err(e) => {
                    let file = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    let folder = parent_folder_name(path);
                    log_file_error(&e);

                    let entry = FileError::new(&file, &folder, &e);
                    import_errors::insert_import_error(&self.pool, &entry).await?;
                    summary.errored_files += 1;
                    summary.errors.push(entry);
                }
            }
        }

        info!(
            "Import of {} finished: {}",
            staging_root.display(),
            summary.display_string()
        );

        Ok(summary)
    }
}

fn log_file_error(e: &IngestError) {
    if e.is_duplicate() {
        warn!("Duplicate entry detected, skipping: {}", e);
    } else {
        warn!("Import failed: {}", e);
    }
}
