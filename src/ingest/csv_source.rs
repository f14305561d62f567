//! CSV record source
//!
//! Reads one exported worksheet as CSV through a [`SchemaMap`]. Rows whose
//! animal id or timestamp cannot be parsed are dropped and counted; metric
//! cells that are not numeric become missing values, matching how the source
//! exports interleave header junk and summary rows with the data.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::PipelineError;
use crate::types::SensorRecord;

use super::schema::ResolvedSchema;
use super::{IngestBatch, IngestReport, RecordSource, SchemaMap};

/// CSV-backed [`RecordSource`].
pub struct CsvSource {
    path: PathBuf,
    schema: SchemaMap,
}

impl CsvSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            schema: SchemaMap::default(),
        }
    }

    pub fn with_schema(mut self, schema: SchemaMap) -> Self {
        self.schema = schema;
        self
    }
}

impl RecordSource for CsvSource {
    fn load(&self) -> Result<IngestBatch, PipelineError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let resolved = self.schema.resolve(&headers)?;

        let mut report = IngestReport::default();
        let mut records = Vec::new();

        for row in reader.records() {
            let row = row?;
            report.total_rows += 1;

            match parse_row(&row, &resolved) {
                RowOutcome::Record(record) => {
                    report.ingested += 1;
                    records.push(record);
                }
                RowOutcome::BadAnimalId => report.dropped_bad_animal_id += 1,
                RowOutcome::BadTimestamp => report.dropped_bad_timestamp += 1,
            }
        }

        records.sort_by(|a, b| {
            (a.animal_id, a.timestamp).cmp(&(b.animal_id, b.timestamp))
        });

        Ok(IngestBatch { records, report })
    }

    fn label(&self) -> String {
        self.path.display().to_string()
    }
}

enum RowOutcome {
    Record(SensorRecord),
    BadAnimalId,
    BadTimestamp,
}

fn parse_row(row: &csv::StringRecord, schema: &ResolvedSchema) -> RowOutcome {
    let cell = |idx: usize| row.get(idx).map(str::trim).unwrap_or("");

    let animal_id = match parse_animal_id(cell(schema.animal)) {
        Some(id) => id,
        None => return RowOutcome::BadAnimalId,
    };

    let timestamp = match parse_timestamp(cell(schema.date), cell(schema.time)) {
        Some(ts) => ts,
        None => return RowOutcome::BadTimestamp,
    };

    let metric = |idx: Option<usize>| idx.and_then(|i| parse_number(cell(i)));

    RowOutcome::Record(SensorRecord {
        animal_id,
        timestamp,
        rer: metric(schema.rer),
        activity_raw: metric(schema.activity),
        feed_cumulative: metric(schema.feed),
        vo2: metric(schema.vo2),
        energy_expenditure: metric(schema.energy),
    })
}

/// Animal ids must be positive integers; the exports write them as "7" or
/// "7.0" depending on the worksheet.
fn parse_animal_id(cell: &str) -> Option<u32> {
    let value: f64 = cell.parse().ok()?;
    if value > 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX) {
        Some(value as u32)
    } else {
        None
    }
}

fn parse_number(cell: &str) -> Option<f64> {
    if cell.is_empty() {
        return None;
    }
    cell.parse().ok().filter(|v: &f64| v.is_finite())
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];

/// Combine separate date and time cells into one timestamp.
///
/// Date cells sometimes carry a spurious midnight time component when the
/// worksheet stored them as full datetimes; both shapes are accepted.
fn parse_timestamp(date_cell: &str, time_cell: &str) -> Option<NaiveDateTime> {
    let date = parse_date(date_cell)?;
    let time = parse_time(time_cell)?;
    Some(date.and_time(time))
}

fn parse_date(cell: &str) -> Option<NaiveDate> {
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(cell, fmt) {
            return Some(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(cell, fmt) {
            return Some(dt.date());
        }
    }
    None
}

fn parse_time(cell: &str) -> Option<NaiveTime> {
    for fmt in TIME_FORMATS {
        if let Ok(time) = NaiveTime::parse_from_str(cell, fmt) {
            return Some(time);
        }
    }
    None
}
