//! Chart and table handoff
//!
//! The reporting collaborator consumes per-animal `(timestamp, value)` series
//! with a list of shaded x-intervals, and wide per-animal tables with one
//! column per (metric, animal). This module builds both from aggregated
//! windows; rendering itself happens elsewhere.

use std::io::Write;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::types::{CalendarWindow, DayWindows, HourlyWindow, NormalizedRecord};

/// The four charted metrics, in their customary order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Rer,
    Activity,
    Feed,
    Energy,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Rer, Metric::Activity, Metric::Feed, Metric::Energy];

    /// Column label used in emitted tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Rer => "RER",
            Metric::Activity => "XT_YT",
            Metric::Feed => "Feed",
            Metric::Energy => "EE",
        }
    }

    fn of_window(&self, w: &HourlyWindow) -> Option<f64> {
        match self {
            Metric::Rer => w.rer,
            Metric::Activity => w.activity,
            Metric::Feed => w.feed,
            Metric::Energy => w.energy,
        }
    }
}

/// One plottable series: one animal, one metric, points in time order.
/// Missing values stay in the series as gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub animal_id: u32,
    pub metric: Metric,
    pub points: Vec<(NaiveDateTime, Option<f64>)>,
}

impl MetricSeries {
    /// True when no point carries a value; the charting collaborator skips
    /// such series entirely.
    pub fn is_blank(&self) -> bool {
        self.points.iter().all(|(_, v)| v.is_none())
    }
}

/// Build per-animal, per-metric series across consecutive day windows, in
/// day order. Series that are blank end to end are dropped.
pub fn animal_series(days: &[DayWindows]) -> Vec<MetricSeries> {
    let mut animals: Vec<u32> = days
        .iter()
        .flat_map(|d| d.windows.iter().map(|w| w.animal_id))
        .collect();
    animals.sort_unstable();
    animals.dedup();

    let mut series = Vec::new();
    for &animal_id in &animals {
        for metric in Metric::ALL {
            let points: Vec<(NaiveDateTime, Option<f64>)> = days
                .iter()
                .flat_map(|d| d.windows.iter())
                .filter(|w| w.animal_id == animal_id)
                .map(|w| (w.timestamp, metric.of_window(w)))
                .collect();

            let s = MetricSeries {
                animal_id,
                metric,
                points,
            };
            if !s.is_blank() {
                series.push(s);
            }
        }
    }
    series
}

/// Flat view of one aggregated row, shared by the wide-table writers.
struct TableRow {
    timestamp: NaiveDateTime,
    animal_id: u32,
    values: [Option<f64>; 4],
}

/// Write a wide hourly table for consecutive day windows: one row per bucket
/// timestamp, one column per (metric, animal), e.g. `RER_Animal7`.
pub fn write_day_table<W: Write>(days: &[DayWindows], out: W) -> Result<(), PipelineError> {
    let rows: Vec<TableRow> = days
        .iter()
        .flat_map(|d| d.windows.iter())
        .map(|w| TableRow {
            timestamp: w.timestamp,
            animal_id: w.animal_id,
            values: [w.rer, w.activity, w.feed, w.energy],
        })
        .collect();
    write_wide(&rows, out)
}

/// Write a wide table for calendar-hour windows.
pub fn write_calendar_table<W: Write>(
    windows: &[CalendarWindow],
    out: W,
) -> Result<(), PipelineError> {
    let rows: Vec<TableRow> = windows
        .iter()
        .map(|w| TableRow {
            timestamp: w.timestamp,
            animal_id: w.animal_id,
            values: [w.rer, w.activity, w.feed, w.energy],
        })
        .collect();
    write_wide(&rows, out)
}

fn write_wide<W: Write>(rows: &[TableRow], out: W) -> Result<(), PipelineError> {
    let mut animals: Vec<u32> = rows.iter().map(|r| r.animal_id).collect();
    animals.sort_unstable();
    animals.dedup();

    let mut cells: std::collections::BTreeMap<(NaiveDateTime, u32), &[Option<f64>; 4]> =
        std::collections::BTreeMap::new();
    for row in rows {
        cells.insert((row.timestamp, row.animal_id), &row.values);
    }
    let mut timestamps: Vec<NaiveDateTime> = cells.keys().map(|(ts, _)| *ts).collect();
    timestamps.dedup();

    let mut writer = csv::Writer::from_writer(out);

    let mut header = vec!["DateTime".to_string()];
    for metric in Metric::ALL {
        for &animal in &animals {
            header.push(format!("{}_Animal{}", metric.as_str(), animal));
        }
    }
    writer.write_record(&header)?;

    for ts in &timestamps {
        let mut record = vec![ts.format("%Y-%m-%d %H:%M:%S").to_string()];
        for mi in 0..Metric::ALL.len() {
            for &animal in &animals {
                let value = cells.get(&(*ts, animal)).and_then(|v| v[mi]);
                record.push(format_cell(value));
            }
        }
        writer.write_record(&record)?;
    }

    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Write normalized records as a flat table, one row per sample, for raw
/// (unaggregated) exports.
pub fn write_records_table<W: Write>(
    records: &[NormalizedRecord],
    out: W,
) -> Result<(), PipelineError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record([
        "Animal", "DateTime", "RER", "XT_YT", "Feed", "Feed_diff", "EE",
    ])?;

    for r in records {
        writer.write_record([
            r.animal_id().to_string(),
            r.timestamp_adjusted.format("%Y-%m-%d %H:%M:%S").to_string(),
            format_cell(r.record.rer),
            format_cell(r.activity_normalized),
            format_cell(r.record.feed_cumulative),
            format_cell(r.feed_delta),
            format_cell(r.record.energy_expenditure),
        ])?;
    }

    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Missing values export as empty cells, never as zero.
fn format_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::WindowAggregator;
    use crate::config::{AnalysisConfig, WindowAlignment};
    use crate::cycle::LightCycle;
    use crate::normalizer::Normalizer;
    use crate::types::SensorRecord;
    use chrono::{Duration, NaiveDate};
    use pretty_assertions::assert_eq;

    fn day_start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 10)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap()
    }

    fn sample_days() -> Vec<DayWindows> {
        let records = vec![
            SensorRecord {
                animal_id: 1,
                timestamp: day_start() + Duration::minutes(10),
                rer: Some(0.8),
                activity_raw: Some(800.0),
                feed_cumulative: None,
                vo2: None,
                energy_expenditure: None,
            },
            SensorRecord {
                animal_id: 2,
                timestamp: day_start() + Duration::minutes(10),
                rer: Some(0.9),
                activity_raw: None,
                feed_cumulative: None,
                vo2: None,
                energy_expenditure: None,
            },
        ];
        let normalized = Normalizer::normalize(records, WindowAlignment::WindowEnd, false);
        let config = AnalysisConfig::single_day(LightCycle::Standard);
        WindowAggregator::aggregate_days(
            &normalized,
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            &config,
        )
        .unwrap()
    }

    #[test]
    fn test_series_per_animal_per_metric() {
        let days = sample_days();
        let series = animal_series(&days);

        // Animal 1: RER + activity; animal 2: RER only. Feed and energy are
        // blank everywhere and dropped.
        assert_eq!(series.len(), 3);
        let rer_1 = series
            .iter()
            .find(|s| s.animal_id == 1 && s.metric == Metric::Rer)
            .unwrap();
        assert_eq!(rer_1.points.len(), 24);
        assert_eq!(rer_1.points[0].1, Some(0.8));
        assert_eq!(rer_1.points[5].1, None);

        assert!(series
            .iter()
            .all(|s| !(s.metric == Metric::Feed || s.metric == Metric::Energy)));
    }

    #[test]
    fn test_blank_series_detection() {
        let s = MetricSeries {
            animal_id: 1,
            metric: Metric::Feed,
            points: vec![(day_start(), None), (day_start(), None)],
        };
        assert!(s.is_blank());
    }

    #[test]
    fn test_wide_table_layout() {
        let days = sample_days();
        let mut buf = Vec::new();
        write_day_table(&days, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();

        let header = lines.next().unwrap();
        assert!(header.starts_with("DateTime,RER_Animal1,RER_Animal2"));
        assert!(header.contains("Feed_Animal1"));

        // 24 buckets, both animals share each timestamp row
        assert_eq!(lines.count(), 24);
        let first_row = text.lines().nth(1).unwrap();
        assert!(first_row.starts_with("2025-01-10 07:30:00,0.8,0.9"));
    }

    #[test]
    fn test_records_table_keeps_missing_cells_empty() {
        let records = Normalizer::normalize(
            vec![SensorRecord {
                animal_id: 5,
                timestamp: day_start(),
                rer: None,
                activity_raw: Some(400.0),
                feed_cumulative: None,
                vo2: None,
                energy_expenditure: None,
            }],
            WindowAlignment::WindowEnd,
            false,
        );
        let mut buf = Vec::new();
        write_records_table(&records, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let row = text.lines().nth(1).unwrap();
        assert_eq!(row, "5,2025-01-10 07:00:00,,0.05,,,");
    }
}
