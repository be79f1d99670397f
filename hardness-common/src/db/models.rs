//! Database row models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementImportError {
    pub id: i64,
    pub file: String,
    pub folder: String,
    pub code: String,
    pub message: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandBlock {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingMethod {
    pub id: i64,
    pub name: String,
    /// Number of distinct land blocks one session covers
    pub replicates: i64,
    /// Physical probe positions taken inside each block
    pub positions_per_block: i64,
}

impl SamplingMethod {
    /// Memory indices produced by one complete session
    pub fn total_memories(&self) -> i64 {
        self.positions_per_block * self.replicates
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Land {
    pub id: i64,
    pub name: String,
    pub company_id: i64,
    /// Media-relative path of the latest surface image
    pub image: Option<String>,
}

/// A sampling event: one land, one period, one method
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandLedger {
    pub id: i64,
    pub land_id: i64,
    pub land_period_id: i64,
    pub crop_id: i64,
    pub sampling_method_id: i64,
    pub sampling_date: NaiveDate,
    pub sampling_staff: Option<String>,
    pub agency: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_memories() {
        let method = SamplingMethod {
            id: 1,
            name: "5-point method".to_string(),
            replicates: 5,
            positions_per_block: 5,
        };
        assert_eq!(method.total_memories(), 25);
    }
}
