//! Window aggregation
//!
//! Normalized records are bucketed into fixed one-hour analysis windows, per
//! animal, either inside explicit 24 h day windows (relative-hour buckets) or
//! by calendar day and hour across the whole experiment.
//!
//! Missing-value policy: a bucket aggregates only the values that are
//! present. A bucket with nothing to aggregate reports the metric as missing
//! -- "no feeding observed" (sum of present zeros) and "no data" (all values
//! missing) are distinct outcomes and are never conflated.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::config::{Aggregation, AnalysisConfig};
use crate::cycle::dark_intervals;
use crate::error::PipelineError;
use crate::types::{CalendarWindow, DayWindows, HourlyWindow, NormalizedRecord};

/// Hours in one analysis day window.
pub const DAY_WINDOW_HOURS: u32 = 24;

/// Window aggregator for bucketing normalized records.
pub struct WindowAggregator;

impl WindowAggregator {
    /// Aggregate one 24 h day window into relative-hour buckets.
    ///
    /// Every animal observed inside `[day_start, day_start + 24h)` gets all
    /// 24 buckets; buckets without records carry missing metrics. A window
    /// that matches no records at all yields an empty vector.
    pub fn aggregate_day(
        records: &[NormalizedRecord],
        day_start: NaiveDateTime,
        config: &AnalysisConfig,
    ) -> Vec<HourlyWindow> {
        let day_end = day_start + Duration::hours(i64::from(DAY_WINDOW_HOURS));

        let mut buckets: BTreeMap<(u32, u32), MetricAccumulator> = BTreeMap::new();
        let mut animals: BTreeSet<u32> = BTreeSet::new();

        for record in records {
            let t = record.timestamp_adjusted;
            if t < day_start || t >= day_end {
                continue;
            }
            let hour = ((t - day_start).num_seconds() / 3600) as u32;
            animals.insert(record.animal_id());
            buckets
                .entry((record.animal_id(), hour))
                .or_default()
                .add(record);
        }

        let mut windows = Vec::with_capacity(animals.len() * DAY_WINDOW_HOURS as usize);
        for animal_id in animals {
            for hour in 0..DAY_WINDOW_HOURS {
                let metrics = buckets
                    .remove(&(animal_id, hour))
                    .unwrap_or_default()
                    .finish(config);
                windows.push(HourlyWindow {
                    animal_id,
                    relative_hour: hour,
                    timestamp: day_start
                        + Duration::hours(i64::from(hour))
                        + Duration::minutes(30),
                    rer: metrics.rer,
                    activity: metrics.activity,
                    feed: metrics.feed,
                    energy: metrics.energy,
                });
            }
        }
        windows
    }

    /// Aggregate `config.day_count` consecutive day windows starting at
    /// `start_date` + `config.day_start_hour`, one light cycle per day from
    /// the schedule, concatenated in day order.
    pub fn aggregate_days(
        records: &[NormalizedRecord],
        start_date: NaiveDate,
        config: &AnalysisConfig,
    ) -> Result<Vec<DayWindows>, PipelineError> {
        config.validate()?;

        let mut days = Vec::with_capacity(config.day_count as usize);
        for (i, cycle) in config.cycle_schedule.iter().enumerate() {
            let date = start_date + Duration::days(i as i64);
            let day_start = date
                .and_hms_opt(config.day_start_hour, 0, 0)
                .ok_or(PipelineError::InvalidDayStartHour(config.day_start_hour))?;

            days.push(DayWindows {
                date,
                day_start,
                cycle: *cycle,
                label: format!("Day{}_{}", i + 1, cycle.label()),
                dark_intervals: dark_intervals(day_start, *cycle),
                windows: Self::aggregate_day(records, day_start, config),
            });
        }
        Ok(days)
    }

    /// Aggregate the whole record set by (animal, calendar date, hour of
    /// day), without any day-window selection. Only observed buckets appear.
    pub fn aggregate_calendar(
        records: &[NormalizedRecord],
        config: &AnalysisConfig,
    ) -> Vec<CalendarWindow> {
        let mut buckets: BTreeMap<(NaiveDate, u32, u32), MetricAccumulator> = BTreeMap::new();

        for record in records {
            let t = record.timestamp_adjusted;
            buckets
                .entry((t.date(), t.hour(), record.animal_id()))
                .or_default()
                .add(record);
        }

        buckets
            .into_iter()
            .map(|((date, hour, animal_id), accum)| {
                let metrics = accum.finish(config);
                CalendarWindow {
                    animal_id,
                    date,
                    hour,
                    // Top of the hour; `hour` comes from a valid timestamp
                    timestamp: date
                        .and_hms_opt(hour, 0, 0)
                        .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN)),
                    rer: metrics.rer,
                    activity: metrics.activity,
                    feed: metrics.feed,
                    energy: metrics.energy,
                }
            })
            .collect()
    }

    /// Select the normalized records inside one 24 h day window, unaggregated,
    /// for raw exports and point-by-point charts.
    pub fn select_day(
        records: &[NormalizedRecord],
        day_start: NaiveDateTime,
    ) -> Vec<NormalizedRecord> {
        let day_end = day_start + Duration::hours(i64::from(DAY_WINDOW_HOURS));
        records
            .iter()
            .filter(|r| r.timestamp_adjusted >= day_start && r.timestamp_adjusted < day_end)
            .cloned()
            .collect()
    }
}

/// Aggregated metric values for one finished bucket.
struct BucketMetrics {
    rer: Option<f64>,
    activity: Option<f64>,
    feed: Option<f64>,
    energy: Option<f64>,
}

/// Collects the present values of each metric within one bucket.
#[derive(Default)]
struct MetricAccumulator {
    rer: Vec<f64>,
    activity: Vec<f64>,
    feed: Vec<f64>,
    energy: Vec<f64>,
}

impl MetricAccumulator {
    fn add(&mut self, record: &NormalizedRecord) {
        if let Some(v) = record.record.rer {
            self.rer.push(v);
        }
        if let Some(v) = record.activity_normalized {
            self.activity.push(v);
        }
        if let Some(v) = record.feed_delta {
            self.feed.push(v);
        }
        if let Some(v) = record.record.energy_expenditure {
            self.energy.push(v);
        }
    }

    fn finish(self, config: &AnalysisConfig) -> BucketMetrics {
        BucketMetrics {
            rer: mean(&self.rer),
            activity: aggregate(&self.activity, config.activity_aggregation),
            feed: sum(&self.feed),
            energy: aggregate(&self.energy, config.energy_aggregation),
        }
    }
}

fn aggregate(values: &[f64], how: Aggregation) -> Option<f64> {
    match how {
        Aggregation::Sum => sum(values),
        Aggregation::Mean => mean(values),
    }
}

/// Sum of present values; missing when nothing is present.
fn sum(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum())
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
