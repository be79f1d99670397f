//! Parsed penetrometer dump

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Header block of one acquisition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeHeader {
    /// Model name from the first cell, e.g. `DIK-5531`
    pub device_name: String,
    pub memory_index: i64,
    /// Set Depth in cm; the file must carry exactly this many rows
    pub configured_depth: i64,
    pub recorded_at: DateTime<FixedOffset>,
    pub spring_constant: i64,
    pub cone_area: i64,
}

/// One row of the data block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthReading {
    /// Depth in cm, 1-based
    pub depth: i64,
    /// Pressure in kPa
    pub pressure: i64,
}

/// A fully parsed file, ready to insert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeFile {
    pub file_name: String,
    /// Immediate parent directory name
    pub folder: String,
    pub header: ProbeHeader,
    /// Ascending, contiguous from depth 1
    pub readings: Vec<DepthReading>,
}
