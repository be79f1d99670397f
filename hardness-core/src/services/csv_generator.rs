//! Synthetic penetrometer dumps
//!
//! Writes one `FIELDnnn` folder per field with 25 files each (five blocks,
//! five probe positions per block). Memory numbers keep counting across
//! fields, as they do on a real device. Output depends only on the seed and
//! the base time.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::services::csv_ingestor::DEVICE_BANNER;
use hardness_common::time::DEVICE_DATETIME_FORMAT;

pub const DEVICE_NAME: &str = "DIK-5531";
pub const SET_DEPTH: i64 = 60;
pub const SPRING: i64 = 490;
pub const CONE: i64 = 2;
pub const BLOCKS_PER_FIELD: i64 = 5;
pub const POSITIONS_PER_BLOCK: i64 = 5;

/// Generator settings
#[derive(Debug, Clone)]
pub struct CsvGeneratorOptions {
    pub fields: usize,
    pub seed: u64,
    /// Acquisition time of memory 1; later memories follow at short intervals
    pub base_time: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedFiles {
    pub folders: Vec<PathBuf>,
    pub files: usize,
}

/// File name the device would give a memory
pub fn device_file_name(memory: i64) -> String {
    format!("{}_{:04}_N00000000_E000000000.csv", DEVICE_NAME, memory)
}

/// Render one dump
///
/// Pressure rises with depth from a per-file surface value, plus bounded
/// noise, and never leaves 0..=3000 kPa.
pub fn render_probe_csv(memory: i64, recorded_at: &NaiveDateTime, rng: &mut StdRng) -> String {
    let stamp = recorded_at.format(DEVICE_DATETIME_FORMAT).to_string();
    let mut out = String::new();

    let _ = writeln!(out, "{},{}", DEVICE_NAME, DEVICE_BANNER);
    let _ = writeln!(out, "Memory No.,{:04}", memory);
    let _ = writeln!(out, "Latitude,N 00.00.0000");
    let _ = writeln!(out, "Longitude,E 000.00.0000");
    let _ = writeln!(out, "Set Depth[cm],{}", SET_DEPTH);
    let _ = writeln!(out, "Date and Time,{}", stamp);
    let _ = writeln!(out, "Spring[N/48.5mm],{}", SPRING);
    let _ = writeln!(out, "Cone[cm2],{}", CONE);
    let _ = writeln!(out);
    let _ = writeln!(out, "Depth[cm],Pressure[kPa],DateTime,GpsMode,GPS Satellites");

    let surface: f64 = rng.gen_range(150.0..600.0);
    let gradient: f64 = rng.gen_range(15.0..45.0);
    for depth in 1..=SET_DEPTH {
        let noise: f64 = rng.gen_range(-60.0..60.0);
        let pressure = (surface + gradient * depth as f64 + noise).clamp(0.0, 3000.0) as i64;
        let _ = writeln!(out, "{},{},{},0,0", depth, pressure, stamp);
    }

    out
}

/// Write the fields under `out_dir`
pub async fn generate_fields(out_dir: &Path, options: &CsvGeneratorOptions) -> std::io::Result<GeneratedFiles> {
    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut result = GeneratedFiles::default();
    let mut memory = 1i64;

    for field in 1..=options.fields {
        let folder = out_dir.join(format!("FIELD{:03}", field));
        tokio::fs::create_dir_all(&folder).await?;

        for _ in 0..BLOCKS_PER_FIELD * POSITIONS_PER_BLOCK {
            let recorded_at = options.base_time + Duration::seconds((memory - 1) * 90);
            let body = render_probe_csv(memory, &recorded_at, &mut rng);
            tokio::fs::write(folder.join(device_file_name(memory)), body).await?;
            memory += 1;
            result.files += 1;
        }

        result.folders.push(folder);
    }

    info!(
        "Generated {} files in {} folders under {}",
        result.files,
        result.folders.len(),
        out_dir.display()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::csv_ingestor::parse_probe_csv;
    use chrono::NaiveDate;

    fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_file_name() {
        assert_eq!(device_file_name(7), "DIK-5531_0007_N00000000_E000000000.csv");
    }

    #[test]
    fn test_generated_file_parses() {
        let mut rng = StdRng::seed_from_u64(1);
        let text = render_probe_csv(12, &base(), &mut rng);
        let parsed = parse_probe_csv("x.csv", "FIELD001", text.as_bytes()).unwrap();

        assert_eq!(parsed.header.memory_index, 12);
        assert_eq!(parsed.header.configured_depth, SET_DEPTH);
        assert_eq!(parsed.readings.len() as i64, SET_DEPTH);
        assert!(parsed.readings.iter().all(|r| (0..=3000).contains(&r.pressure)));
    }

    #[test]
    fn test_same_seed_same_output() {
        let a = render_probe_csv(1, &base(), &mut StdRng::seed_from_u64(42));
        let b = render_probe_csv(1, &base(), &mut StdRng::seed_from_u64(42));
        let c = render_probe_csv(1, &base(), &mut StdRng::seed_from_u64(43));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
