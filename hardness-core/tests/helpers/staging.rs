//! Staging directory fixtures
//!
//! Penetrometer dumps laid out the way a field crew uploads them:
//! `<staging_root>/<folder>/<device file>.csv`.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use hardness_common::time::DEVICE_DATETIME_FORMAT;
use hardness_core::services::csv_generator::{device_file_name, generate_fields};
use hardness_core::services::{CsvGeneratorOptions, GeneratedFiles};

/// Acquisition time of memory 1 in generated fields
pub fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 10)
        .and_then(|d| d.and_hms_opt(8, 0, 0))
        .expect("valid fixture time")
}

/// Generate `fields` folders of 25 files each under `root`
pub async fn stage_fields(root: &Path, fields: usize) -> Result<GeneratedFiles> {
    let options = CsvGeneratorOptions {
        fields,
        seed: 7,
        base_time: base_time(),
    };
    Ok(generate_fields(root, &options).await?)
}

/// Render a dump with an arbitrary configured depth and pressure profile
pub fn probe_csv(
    memory: i64,
    recorded_at: &NaiveDateTime,
    depth: i64,
    pressure: impl Fn(i64) -> i64,
) -> String {
    let stamp = recorded_at.format(DEVICE_DATETIME_FORMAT).to_string();
    let mut out = String::new();

    writeln!(out, "DIK-5531,Digital Cone Penetrometer").unwrap();
    writeln!(out, "Memory No.,{:04}", memory).unwrap();
    writeln!(out, "Latitude,N 00.00.0000").unwrap();
    writeln!(out, "Longitude,E 000.00.0000").unwrap();
    writeln!(out, "Set Depth[cm],{}", depth).unwrap();
    writeln!(out, "Date and Time,{}", stamp).unwrap();
    writeln!(out, "Spring[N/48.5mm],490").unwrap();
    writeln!(out, "Cone[cm2],2").unwrap();
    writeln!(out).unwrap();
    writeln!(out, "Depth[cm],Pressure[kPa],DateTime,GpsMode,GPS Satellites").unwrap();
    for d in 1..=depth {
        writeln!(out, "{},{},{},0,0", d, pressure(d), stamp).unwrap();
    }

    out
}

/// Write one dump into `<root>/<folder>/` under its device file name
pub fn write_probe(root: &Path, folder: &str, memory: i64, contents: &str) -> Result<PathBuf> {
    let dir = root.join(folder);
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(device_file_name(memory));
    std::fs::write(&path, contents)?;
    Ok(path)
}
