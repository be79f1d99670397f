//! Penetrometer CSV ingestion (C1)
//!
//! Layout of one dump:
//!
//! ```text
//! DIK-5531,Digital Cone Penetrometer
//! Memory No.,0001
//! Latitude,<free>
//! Longitude,<free>
//! Set Depth[cm],60
//! Date and Time,24.01.15 08:00:00
//! Spring[N/48.5mm],490
//! Cone[cm2],2
//!
//! Depth[cm],Pressure[kPa],DateTime,GpsMode,GPS Satellites
//! 1,123,...
//! ```
//!
//! Blank lines carry no records, so the column header immediately follows
//! the eighth header record.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use sqlx::SqlitePool;
use tracing::debug;

use crate::db::{is_unique_violation, masters, measurements};
use crate::error::IngestError;
use crate::models::{DepthReading, ProbeFile, ProbeHeader};
use crate::services::file_scanner::parent_folder_name;
use hardness_common::time;

/// Second cell of the first header record
pub const DEVICE_BANNER: &str = "Digital Cone Penetrometer";

/// Prefix every supported device model starts with
pub const DEVICE_PREFIX: &str = "DIK-";

/// Number of header records before the column header
const HEADER_RECORDS: usize = 8;

/// Deepest set depth accepted, in cm
pub const MAX_SET_DEPTH: i64 = 1000;

/// Parse one file's contents
///
/// `file_name` and `folder` only label errors and the result.
pub fn parse_probe_csv(file_name: &str, folder: &str, bytes: &[u8]) -> Result<ProbeFile, IngestError> {
    let header_shape = |reason: String| IngestError::HeaderShape {
        file: file_name.to_string(),
        folder: folder.to_string(),
        reason,
    };
    let field_parse = |reason: String| IngestError::FieldParse {
        file: file_name.to_string(),
        folder: folder.to_string(),
        reason,
    };

    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(bytes);

    let mut records = reader.records();
    let mut header_records = Vec::with_capacity(HEADER_RECORDS);
    for line in 1..=HEADER_RECORDS {
        match records.next() {
            Some(Ok(record)) => header_records.push(record),
            Some(Err(e)) => return Err(header_shape(format!("header line {}: {}", line, e))),
            None => {
                return Err(header_shape(format!(
                    "file ends after {} header lines",
                    line - 1
                )))
            }
        }
    }

    let device_name = extract_device(&header_records[0]).map_err(header_shape)?;
    let memory_index = extract_numeric_value(&header_records[1]).map_err(field_parse)?;
    // Latitude and longitude are not used
    let configured_depth = extract_numeric_value(&header_records[4]).map_err(field_parse)?;
    let recorded_at = extract_datetime(&header_records[5]).map_err(field_parse)?;
    let spring_constant = extract_numeric_value(&header_records[6]).map_err(field_parse)?;
    let cone_area = extract_numeric_value(&header_records[7]).map_err(field_parse)?;

    if memory_index < 1 {
        return Err(field_parse(format!("memory number must be positive: {}", memory_index)));
    }
    if configured_depth < 1 {
        return Err(field_parse(format!("set depth must be positive: {}", configured_depth)));
    }
    if configured_depth > MAX_SET_DEPTH {
        return Err(field_parse(format!(
            "set depth {} exceeds {}",
            configured_depth, MAX_SET_DEPTH
        )));
    }

    match records.next() {
        Some(Ok(record)) if cell(&record, 0).starts_with("Depth") => {}
        Some(Ok(record)) => {
            return Err(header_shape(format!(
                "expected column header, found '{}'",
                cell(&record, 0)
            )))
        }
        Some(Err(e)) => return Err(header_shape(format!("column header: {}", e))),
        None => return Err(header_shape("missing column header".to_string())),
    }

    let mut readings = Vec::with_capacity(configured_depth as usize);
    for record in records {
        let record = record.map_err(|e| field_parse(e.to_string()))?;
        if record.iter().all(|c| c.is_empty()) {
            continue;
        }

        let reading = parse_reading(&record).map_err(field_parse)?;
        let expected = readings.len() as i64 + 1;
        if reading.depth != expected {
            return Err(field_parse(format!(
                "depth {} out of sequence, expected {}",
                reading.depth, expected
            )));
        }
        if reading.depth > configured_depth {
            return Err(field_parse(format!(
                "depth {} beyond set depth {}",
                reading.depth, configured_depth
            )));
        }
        readings.push(reading);
    }

    if readings.len() as i64 != configured_depth {
        return Err(field_parse(format!(
            "{} depth rows, set depth is {}",
            readings.len(),
            configured_depth
        )));
    }

    Ok(ProbeFile {
        file_name: file_name.to_string(),
        folder: folder.to_string(),
        header: ProbeHeader {
            device_name,
            memory_index,
            configured_depth,
            recorded_at,
            spring_constant,
            cone_area,
        },
        readings,
    })
}

fn cell(record: &StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or("")
}

fn extract_device(record: &StringRecord) -> Result<String, String> {
    let banner = cell(record, 1);
    if banner != DEVICE_BANNER {
        return Err(format!("unexpected data row: {}", banner));
    }

    let name = cell(record, 0).trim_start_matches('\u{feff}');
    if !name.starts_with(DEVICE_PREFIX) {
        return Err(format!("unexpected device name: {}", name));
    }

    Ok(name.to_string())
}

fn extract_datetime(record: &StringRecord) -> Result<chrono::DateTime<chrono::FixedOffset>, String> {
    let key = cell(record, 0);
    if key != "Date and Time" {
        return Err(format!("unexpected data row: {}", key));
    }

    let value = cell(record, 1);
    time::parse_device_datetime(value).map_err(|_| format!("unexpected datetime: {}", value))
}

fn extract_numeric_value(record: &StringRecord) -> Result<i64, String> {
    let key = cell(record, 0);
    if !["Memory No.", "Set Depth", "Spring", "Cone"]
        .iter()
        .any(|prefix| key.starts_with(prefix))
    {
        return Err(format!("unexpected data row: {}", key));
    }

    let value = cell(record, 1);
    value
        .parse::<i64>()
        .map_err(|_| format!("unexpected numeric value: {}", value))
}

fn parse_reading(record: &StringRecord) -> Result<DepthReading, String> {
    let depth = cell(record, 0);
    let pressure = cell(record, 1);

    let depth = depth
        .parse::<i64>()
        .map_err(|_| format!("unexpected depth: '{}'", depth))?;
    let pressure = pressure
        .parse::<i64>()
        .map_err(|_| format!("unexpected pressure: '{}'", pressure))?;
    if pressure < 0 {
        return Err(format!("negative pressure at depth {}: {}", depth, pressure));
    }

    Ok(DepthReading { depth, pressure })
}

/// Loads penetrometer files into the measurements table
pub struct CsvIngestor {
    pool: SqlitePool,
}

impl CsvIngestor {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Parse and insert one file; returns the number of rows inserted
    ///
    /// The file's rows are inserted in one transaction, so a failure leaves
    /// nothing behind.
    pub async fn ingest_file(&self, path: &Path) -> Result<u64, IngestError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let folder = parent_folder_name(path);

        let bytes = tokio::fs::read(path).await.map_err(|source| IngestError::Io {
            file: file_name.clone(),
            folder: folder.clone(),
            source,
        })?;

        let parsed = parse_probe_csv(&file_name, &folder, &bytes)?;
        self.insert(&parsed).await
    }

    /// Insert an already parsed file
    pub async fn insert(&self, parsed: &ProbeFile) -> Result<u64, IngestError> {
        let device_id = masters::get_or_create_device(&self.pool, &parsed.header.device_name).await?;

        match measurements::insert_file_rows(
            &self.pool,
            device_id,
            &parsed.header,
            &parsed.folder,
            &parsed.readings,
        )
        .await
        {
            Ok(inserted) => {
                debug!(
                    "{}/{}: memory {} inserted {} rows",
                    parsed.folder, parsed.file_name, parsed.header.memory_index, inserted
                );
                Ok(inserted)
            }
            Err(e) if is_unique_violation(&e) => Err(IngestError::Duplicate {
                file: parsed.file_name.clone(),
                folder: parsed.folder.clone(),
            }),
            Err(e) => Err(IngestError::Database(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(depth: i64, rows: &[(i64, i64)]) -> String {
        let mut out = format!(
            "DIK-5531,Digital Cone Penetrometer\n\
             Memory No.,0007\n\
             Latitude,N00.00.00.00\n\
             Longitude,E000.00.00.00\n\
             Set Depth[cm],{}\n\
             Date and Time,24.01.15 08:00:00\n\
             Spring[N/48.5mm],490\n\
             Cone[cm2],2\n\
             \n\
             Depth[cm],Pressure[kPa],DateTime,GpsMode,GPS Satellites\n",
            depth
        );
        for (d, p) in rows {
            out.push_str(&format!("{},{},24.01.15 08:00:00,0,0\n", d, p));
        }
        out
    }

    fn rows(n: i64) -> Vec<(i64, i64)> {
        (1..=n).map(|d| (d, d * 10)).collect()
    }

    #[test]
    fn test_parse_valid_file() {
        let text = sample(3, &rows(3));
        let parsed = parse_probe_csv("a.csv", "FIELD001", text.as_bytes()).unwrap();

        assert_eq!(parsed.header.device_name, "DIK-5531");
        assert_eq!(parsed.header.memory_index, 7);
        assert_eq!(parsed.header.configured_depth, 3);
        assert_eq!(parsed.header.spring_constant, 490);
        assert_eq!(parsed.header.cone_area, 2);
        assert_eq!(
            time::to_storage(&parsed.header.recorded_at),
            "2024-01-15T08:00:00+09:00"
        );
        assert_eq!(parsed.readings.len(), 3);
        assert_eq!(parsed.readings[2], DepthReading { depth: 3, pressure: 30 });
        assert_eq!(parsed.folder, "FIELD001");
    }

    #[test]
    fn test_bom_is_ignored() {
        let text = format!("\u{feff}{}", sample(2, &rows(2)));
        assert!(parse_probe_csv("a.csv", "F", text.as_bytes()).is_ok());
    }

    #[test]
    fn test_wrong_banner_is_header_shape() {
        let text = sample(2, &rows(2)).replace("Digital Cone Penetrometer", "Other Device");
        let err = parse_probe_csv("a.csv", "F", text.as_bytes()).unwrap_err();
        assert_eq!(err.code(), "HEADER_SHAPE");
    }

    #[test]
    fn test_wrong_device_prefix_is_header_shape() {
        let text = sample(2, &rows(2)).replace("DIK-5531", "XYZ-1");
        let err = parse_probe_csv("a.csv", "F", text.as_bytes()).unwrap_err();
        assert_eq!(err.code(), "HEADER_SHAPE");
    }

    #[test]
    fn test_truncated_header_is_header_shape() {
        let text = "DIK-5531,Digital Cone Penetrometer\nMemory No.,1\n";
        let err = parse_probe_csv("a.csv", "F", text.as_bytes()).unwrap_err();
        assert_eq!(err.code(), "HEADER_SHAPE");
    }

    #[test]
    fn test_bad_numeric_is_field_parse() {
        let text = sample(2, &rows(2)).replace("Memory No.,0007", "Memory No.,seven");
        let err = parse_probe_csv("a.csv", "F", text.as_bytes()).unwrap_err();
        assert_eq!(err.code(), "FIELD_PARSE");
        assert!(err.to_string().contains("unexpected numeric value: seven"));
    }

    #[test]
    fn test_bad_key_is_field_parse() {
        let text = sample(2, &rows(2)).replace("Spring[N/48.5mm]", "Weight");
        let err = parse_probe_csv("a.csv", "F", text.as_bytes()).unwrap_err();
        assert_eq!(err.code(), "FIELD_PARSE");
    }

    #[test]
    fn test_bad_datetime_is_field_parse() {
        let text = sample(2, &rows(2)).replace("Date and Time,24.01.15 08:00:00", "Date and Time,2024-01-15");
        let err = parse_probe_csv("a.csv", "F", text.as_bytes()).unwrap_err();
        assert_eq!(err.code(), "FIELD_PARSE");
    }

    #[test]
    fn test_depth_gap_rejected() {
        let text = sample(3, &[(1, 10), (3, 30), (4, 40)]);
        let err = parse_probe_csv("a.csv", "F", text.as_bytes()).unwrap_err();
        assert_eq!(err.code(), "FIELD_PARSE");
    }

    #[test]
    fn test_duplicate_depth_rejected() {
        let text = sample(3, &[(1, 10), (1, 10), (2, 20)]);
        let err = parse_probe_csv("a.csv", "F", text.as_bytes()).unwrap_err();
        assert_eq!(err.code(), "FIELD_PARSE");
    }

    #[test]
    fn test_short_file_rejected() {
        let text = sample(60, &rows(59));
        let err = parse_probe_csv("a.csv", "F", text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("59 depth rows, set depth is 60"));
    }

    #[test]
    fn test_oversized_set_depth_is_field_parse() {
        let text = sample(999_999_999_999_999, &rows(1));
        let err = parse_probe_csv("a.csv", "F", text.as_bytes()).unwrap_err();
        assert_eq!(err.code(), "FIELD_PARSE");
        assert!(err.to_string().contains("exceeds 1000"));

        let deepest = sample(MAX_SET_DEPTH, &rows(MAX_SET_DEPTH));
        assert!(parse_probe_csv("a.csv", "F", deepest.as_bytes()).is_ok());
    }

    #[test]
    fn test_rows_beyond_set_depth_rejected() {
        let text = sample(2, &rows(3));
        let err = parse_probe_csv("a.csv", "F", text.as_bytes()).unwrap_err();
        assert_eq!(err.code(), "FIELD_PARSE");
    }
}
