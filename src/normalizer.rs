//! Record normalization
//!
//! This module turns raw sensor records into normalized records:
//! - timestamps shifted to the configured position inside the sampling window
//! - per-animal feed deltas derived from the cumulative feed weight
//! - activity scaled by the fixed instrument constant

use crate::config::WindowAlignment;
use crate::types::{NormalizedRecord, SensorRecord};

/// Length of the instrument's sampling window in minutes.
pub const SAMPLING_WINDOW_MINUTES: i64 = 15;

/// Fixed instrument scale for X+Y beam-break counts.
pub const ACTIVITY_SCALE: f64 = 8000.0;

/// Feed deltas above this many grams per sampling interval are implausible
/// (cage refill or scale bump) and are discarded when filtering is on.
pub const FEED_OUTLIER_THRESHOLD_G: f64 = 2.0;

/// Normalizer for converting raw records into normalized records.
pub struct Normalizer;

impl Normalizer {
    /// Normalize a batch of records.
    ///
    /// Records are re-sorted by (animal id, raw timestamp) first; feed deltas
    /// are only ever taken against the immediately preceding record of the
    /// same animal.
    pub fn normalize(
        mut records: Vec<SensorRecord>,
        alignment: WindowAlignment,
        feed_outlier_filter: bool,
    ) -> Vec<NormalizedRecord> {
        records.sort_by(|a, b| {
            (a.animal_id, a.timestamp).cmp(&(b.animal_id, b.timestamp))
        });

        let shift = alignment.shift();
        let mut normalized = Vec::with_capacity(records.len());

        for (i, record) in records.iter().enumerate() {
            let prev_feed = i
                .checked_sub(1)
                .map(|j| &records[j])
                .filter(|p| p.animal_id == record.animal_id)
                .and_then(|p| p.feed_cumulative);

            normalized.push(NormalizedRecord {
                timestamp_adjusted: record.timestamp - shift,
                feed_delta: feed_delta(prev_feed, record.feed_cumulative, feed_outlier_filter),
                activity_normalized: record.activity_raw.map(|a| a / ACTIVITY_SCALE),
                record: record.clone(),
            });
        }

        normalized
    }
}

/// Non-negative first difference of the cumulative feed weight.
///
/// Negative differences (hopper refills) clamp to zero. With filtering on,
/// differences above [`FEED_OUTLIER_THRESHOLD_G`] are discarded entirely --
/// the value becomes missing, it is not clamped to the threshold.
fn feed_delta(prev: Option<f64>, current: Option<f64>, filter: bool) -> Option<f64> {
    let (prev, current) = match (prev, current) {
        (Some(p), Some(c)) => (p, c),
        _ => return None,
    };
    let delta = (current - prev).max(0.0);
    if filter && delta > FEED_OUTLIER_THRESHOLD_G {
        None
    } else {
        Some(delta)
    }
}
