//! Pressure surface of one ledger
//!
//! Rows become a `blocks x depths` grid. Block names are sorted lexically and
//! depths ascending; cells without a reading stay `None` and are never
//! interpolated.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::db::measurements::SurfaceRow;

/// Lower bound of the pressure axis, kPa
pub const PRESSURE_MIN: f64 = 0.0;
/// Upper bound of the pressure axis, kPa
pub const PRESSURE_MAX: f64 = 3000.0;

/// How readings sharing one (block, depth) cell collapse into one value
///
/// Each block holds several probe positions, so a cell normally receives one
/// reading per position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceReduction {
    /// Last reading in (depth, insertion) order
    #[default]
    Last,
    Mean,
    Max,
}

impl FromStr for SurfaceReduction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last" => Ok(SurfaceReduction::Last),
            "mean" => Ok(SurfaceReduction::Mean),
            "max" => Ok(SurfaceReduction::Max),
            other => Err(format!("unknown surface reduction: {}", other)),
        }
    }
}

impl fmt::Display for SurfaceReduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SurfaceReduction::Last => "last",
            SurfaceReduction::Mean => "mean",
            SurfaceReduction::Max => "max",
        };
        write!(f, "{}", name)
    }
}

/// Grid handed to a renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceBundle {
    pub blocks: Vec<String>,
    pub depths: Vec<i64>,
    /// `pressures[block][depth]`, indexed like `blocks` and `depths`
    pub pressures: Vec<Vec<Option<f64>>>,
}

impl SurfaceBundle {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() || self.depths.is_empty()
    }

    pub fn get(&self, block: usize, depth: usize) -> Option<f64> {
        self.pressures.get(block).and_then(|row| row.get(depth)).copied().flatten()
    }

    /// Number of cells holding a value
    pub fn filled_cells(&self) -> usize {
        self.pressures.iter().flatten().filter(|v| v.is_some()).count()
    }
}

/// Build the grid from rows ordered by (depth, insertion)
pub fn build_surface(rows: &[SurfaceRow], reduction: SurfaceReduction) -> SurfaceBundle {
    let blocks: Vec<String> = rows
        .iter()
        .map(|r| r.land_block_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let depths: Vec<i64> = rows
        .iter()
        .map(|r| r.depth)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let block_index: BTreeMap<&str, usize> =
        blocks.iter().enumerate().map(|(i, b)| (b.as_str(), i)).collect();
    let depth_index: BTreeMap<i64, usize> = depths.iter().enumerate().map(|(i, d)| (*d, i)).collect();

    // (sum, count, max, last) per cell
    let mut cells = vec![vec![None::<(f64, u32, f64, f64)>; depths.len()]; blocks.len()];
    for row in rows {
        let (Some(&i), Some(&j)) = (
            block_index.get(row.land_block_name.as_str()),
            depth_index.get(&row.depth),
        ) else {
            continue;
        };
        let value = row.pressure as f64;
        cells[i][j] = Some(match cells[i][j] {
            None => (value, 1, value, value),
            Some((sum, count, max, _)) => (sum + value, count + 1, max.max(value), value),
        });
    }

    let pressures = cells
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| {
                    cell.map(|(sum, count, max, last)| match reduction {
                        SurfaceReduction::Last => last,
                        SurfaceReduction::Mean => sum / count as f64,
                        SurfaceReduction::Max => max,
                    })
                })
                .collect()
        })
        .collect();

    SurfaceBundle {
        blocks,
        depths,
        pressures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(block: &str, depth: i64, pressure: i64) -> SurfaceRow {
        SurfaceRow {
            land_block_name: block.to_string(),
            depth,
            pressure,
        }
    }

    fn sample_rows() -> Vec<SurfaceRow> {
        vec![
            row("B2", 1, 100),
            row("A1", 1, 200),
            row("A1", 1, 400),
            row("B2", 2, 300),
        ]
    }

    #[test]
    fn test_axes_sorted() {
        let bundle = build_surface(&sample_rows(), SurfaceReduction::Last);
        assert_eq!(bundle.blocks, vec!["A1", "B2"]);
        assert_eq!(bundle.depths, vec![1, 2]);
    }

    #[test]
    fn test_missing_cell_stays_empty() {
        let bundle = build_surface(&sample_rows(), SurfaceReduction::Last);
        assert_eq!(bundle.get(0, 1), None);
        assert_eq!(bundle.get(1, 1), Some(300.0));
        assert_eq!(bundle.filled_cells(), 3);
    }

    #[test]
    fn test_reductions() {
        let rows = sample_rows();
        assert_eq!(build_surface(&rows, SurfaceReduction::Last).get(0, 0), Some(400.0));
        assert_eq!(build_surface(&rows, SurfaceReduction::Mean).get(0, 0), Some(300.0));
        assert_eq!(build_surface(&rows, SurfaceReduction::Max).get(0, 0), Some(400.0));
    }

    #[test]
    fn test_empty_rows() {
        let bundle = build_surface(&[], SurfaceReduction::Mean);
        assert!(bundle.is_empty());
    }

    #[test]
    fn test_reduction_parse() {
        assert_eq!("MEAN".parse::<SurfaceReduction>().unwrap(), SurfaceReduction::Mean);
        assert_eq!(SurfaceReduction::default().to_string(), "last");
        assert!("median".parse::<SurfaceReduction>().is_err());
    }
}
