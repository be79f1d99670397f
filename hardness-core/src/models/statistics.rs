//! Read-only views over measurements
//!
//! Every struct has a `display_string` used by the CLI's human-readable output.

use serde::{Deserialize, Serialize};

/// Unassociated measurements sharing one acquisition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryGroup {
    pub folder: String,
    pub memory_index: i64,
    /// RFC 3339 with the acquisition offset
    pub recorded_at: String,
    pub row_count: i64,
}

impl MemoryGroup {
    pub fn display_string(&self) -> String {
        format!(
            "{} #{:04} {} ({} rows)",
            self.folder, self.memory_index, self.recorded_at, self.row_count
        )
    }
}

/// Land, date and crop of a ledger as shown next to folder stats
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LedgerDescriptor {
    pub land_name: String,
    pub sampling_date: String,
    pub crop_name: String,
}

/// Per-folder aggregate
///
/// The three lists are only filled in associated mode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FolderStats {
    pub folder: String,
    pub device_name: String,
    pub row_count: i64,
    pub min_memory: i64,
    pub max_memory: i64,
    pub min_recorded_at: String,
    pub max_recorded_at: String,
    pub device_names: Vec<String>,
    pub land_block_names: Vec<String>,
    pub ledgers: Vec<LedgerDescriptor>,
}

impl FolderStats {
    pub fn display_string(&self) -> String {
        let mut line = format!(
            "{} [{}] {} rows, memory {}-{}, {} .. {}",
            self.folder,
            self.device_name,
            self.row_count,
            self.min_memory,
            self.max_memory,
            self.min_recorded_at,
            self.max_recorded_at
        );
        if !self.land_block_names.is_empty() {
            line.push_str(&format!(", blocks {}", self.land_block_names.join("/")));
        }
        for ledger in &self.ledgers {
            line.push_str(&format!(
                ", {} {} {}",
                ledger.land_name, ledger.sampling_date, ledger.crop_name
            ));
        }
        line
    }
}

/// Associated rows per land block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockStats {
    pub land_block_name: String,
    pub row_count: i64,
    pub min_configured_depth: i64,
    pub min_pressure: i64,
    pub max_pressure: i64,
}

impl BlockStats {
    pub fn display_string(&self) -> String {
        format!(
            "{}: {} rows, depth {} cm, pressure {}-{} kPa",
            self.land_block_name,
            self.row_count,
            self.min_configured_depth,
            self.min_pressure,
            self.max_pressure
        )
    }
}

/// Associated rows per ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerStats {
    pub land_ledger_id: i64,
    pub land_name: String,
    pub sampling_date: String,
    pub crop_name: String,
    pub period_name: String,
    pub row_count: i64,
}

impl LedgerStats {
    pub fn display_string(&self) -> String {
        format!(
            "#{} {} {} {} ({}): {} rows",
            self.land_ledger_id,
            self.land_name,
            self.sampling_date,
            self.crop_name,
            self.period_name,
            self.row_count
        )
    }
}

/// Everything the operator sees after an association run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssociationSummary {
    pub import_errors: Vec<hardness_common::db::MeasurementImportError>,
    pub folders: Vec<FolderStats>,
    pub blocks: Vec<BlockStats>,
    pub ledgers: Vec<LedgerStats>,
    pub total_associated: i64,
}

impl AssociationSummary {
    pub fn display_string(&self) -> String {
        let mut out = format!(
            "{} associated rows, {} import errors",
            self.total_associated,
            self.import_errors.len()
        );
        for folder in &self.folders {
            out.push_str("\n  folder ");
            out.push_str(&folder.display_string());
        }
        for block in &self.blocks {
            out.push_str("\n  block ");
            out.push_str(&block.display_string());
        }
        for ledger in &self.ledgers {
            out.push_str("\n  ledger ");
            out.push_str(&ledger.display_string());
        }
        out
    }
}

/// Assigned vs. total measurement counts reported before plotting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotPrecheck {
    pub assigned: i64,
    pub total: i64,
}

impl PlotPrecheck {
    pub fn display_string(&self) -> String {
        format!("{}/{} measurements assigned", self.assigned, self.total)
    }

    /// True when a run over every associated ledger would find none
    ///
    /// Explicit ledger ids are always attempted so unknown ids still fail.
    pub fn nothing_to_plot(&self, ledger_ids: &[i64]) -> bool {
        self.assigned == 0 && ledger_ids.is_empty()
    }
}
