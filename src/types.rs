//! Core types for the metaflux pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw sensor records, normalized records, hourly analysis windows,
//! and the encoded output payload.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::cycle::LightCycle;
use crate::ingest::IngestReport;

/// One raw sensor row for one animal at one sampling instant.
///
/// Metric fields are `None` when the source column is absent or the cell is
/// not numeric. `animal_id` is always a positive integer; rows that fail that
/// invariant never make it out of ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    /// Animal (box) identifier
    pub animal_id: u32,
    /// Raw timestamp as written by the instrument; marks the END of the
    /// 15-minute sampling window
    pub timestamp: NaiveDateTime,
    /// Respiratory exchange ratio
    pub rer: Option<f64>,
    /// Summed X+Y beam-break counts, instrument scale
    pub activity_raw: Option<f64>,
    /// Cumulative feed weight (g)
    pub feed_cumulative: Option<f64>,
    /// Oxygen consumption, used to derive energy expenditure
    pub vo2: Option<f64>,
    /// Energy expenditure (kcal/h), either from the source or derived
    pub energy_expenditure: Option<f64>,
}

/// A sensor record after timestamp alignment and per-animal derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Source record
    pub record: SensorRecord,
    /// Timestamp shifted to the configured position inside the sampling window
    pub timestamp_adjusted: NaiveDateTime,
    /// Non-negative first difference of `feed_cumulative` within this animal's
    /// sequence; `None` for the first record per animal, for rows adjacent to
    /// a missing reading, and for discarded outliers
    pub feed_delta: Option<f64>,
    /// `activity_raw` divided by the fixed instrument constant
    pub activity_normalized: Option<f64>,
}

impl NormalizedRecord {
    pub fn animal_id(&self) -> u32 {
        self.record.animal_id
    }
}

/// One aggregated (animal, relative-hour) bucket inside a 24 h day window.
///
/// `None` means the bucket had no contributing values for that metric. A
/// bucket with zero records exists with every metric missing; it is never
/// coerced to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyWindow {
    pub animal_id: u32,
    /// Integer hour offset from the day start, 0-23
    pub relative_hour: u32,
    /// Bucket midpoint: day start + relative_hour + 30 min
    pub timestamp: NaiveDateTime,
    /// Mean RER over contributing records
    pub rer: Option<f64>,
    /// Aggregated normalized activity (sum by default)
    pub activity: Option<f64>,
    /// Summed feed deltas, missing values excluded
    pub feed: Option<f64>,
    /// Aggregated energy expenditure (sum or mean per configuration)
    pub energy: Option<f64>,
}

/// All hourly windows for one 24 h analysis day, plus its light-cycle
/// annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayWindows {
    /// Calendar date the day window starts on
    pub date: NaiveDate,
    /// First instant of the window (date + day start hour)
    pub day_start: NaiveDateTime,
    /// Light cycle in effect for this day
    pub cycle: LightCycle,
    /// Display label, e.g. "Day2_DD"
    pub label: String,
    /// Dark-phase intervals to shade on charts of this day
    pub dark_intervals: Vec<(NaiveDateTime, NaiveDateTime)>,
    /// One row per (animal, relative hour); all 24 hours materialize for every
    /// animal observed in the window
    pub windows: Vec<HourlyWindow>,
}

impl DayWindows {
    /// True when the day-window selection matched no records at all.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// One aggregated (animal, calendar date, hour-of-day) bucket, used when
/// aggregating the whole experiment without fixed day windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarWindow {
    pub animal_id: u32,
    pub date: NaiveDate,
    /// Hour of day, 0-23
    pub hour: u32,
    /// Top of the hour
    pub timestamp: NaiveDateTime,
    pub rer: Option<f64>,
    pub activity: Option<f64>,
    pub feed: Option<f64>,
    pub energy: Option<f64>,
}

/// Producer metadata stamped on every emitted payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Provenance for an emitted payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    /// Label for the tabular source (usually the file path)
    pub source: String,
    /// Ingestion outcome, including dropped-row counts
    pub ingest: IngestReport,
    pub computed_at_utc: String,
}

/// Complete output payload: the aggregated day windows plus everything a
/// reporting collaborator needs to reproduce or audit the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisPayload {
    pub payload_version: String,
    pub producer: Producer,
    pub provenance: Provenance,
    /// Configuration the windows were computed under
    pub config: AnalysisConfig,
    pub days: Vec<DayWindows>,
}
