//! Light-cycle annotation
//!
//! Charts of a 24 h analysis day carry shaded spans for the dark phases of
//! the lighting schedule. The mapping from (day start, cycle) to intervals is
//! a fixed protocol convention and a pure function: same inputs, same spans,
//! for any day start.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Experimental lighting schedule for one 24 h day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightCycle {
    /// LD1:1 - alternating 1 h light / 1 h dark from the day start
    Alternating,
    /// DD - constant dark for the whole day
    ConstantDark,
    /// LD12:12 - 12 h light followed by 12 h dark
    Standard,
}

impl LightCycle {
    /// Parse the one-character code used by the lab protocol.
    pub fn from_code(code: &str) -> Result<Self, PipelineError> {
        match code.trim() {
            "1" => Ok(LightCycle::Alternating),
            "2" => Ok(LightCycle::ConstantDark),
            "3" => Ok(LightCycle::Standard),
            other => Err(PipelineError::InvalidCycleCode(other.to_string())),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            LightCycle::Alternating => "1",
            LightCycle::ConstantDark => "2",
            LightCycle::Standard => "3",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LightCycle::Alternating => "LD1-1",
            LightCycle::ConstantDark => "DD",
            LightCycle::Standard => "LD12-12",
        }
    }

    /// Dark-phase hour offsets from the day start, as `(start, end)` pairs in
    /// whole hours within `[0, 24]`.
    pub fn dark_hour_offsets(&self) -> Vec<(u32, u32)> {
        match self {
            // One dark hour at every odd offset: [1,2), [3,4), ..., [23,24)
            LightCycle::Alternating => (0..24).step_by(2).map(|h| (h + 1, h + 2)).collect(),
            LightCycle::ConstantDark => vec![(0, 24)],
            LightCycle::Standard => vec![(12, 24)],
        }
    }
}

/// Absolute dark-phase intervals for one analysis day.
///
/// Half-open `[start, end)` pairs in ascending order, all within
/// `[day_start, day_start + 24h]`.
pub fn dark_intervals(
    day_start: NaiveDateTime,
    cycle: LightCycle,
) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    cycle
        .dark_hour_offsets()
        .into_iter()
        .map(|(from, to)| {
            (
                day_start + Duration::hours(i64::from(from)),
                day_start + Duration::hours(i64::from(to)),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn day_start(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_codes_round_trip() {
        for cycle in [
            LightCycle::Alternating,
            LightCycle::ConstantDark,
            LightCycle::Standard,
        ] {
            assert_eq!(LightCycle::from_code(cycle.code()).unwrap(), cycle);
        }
        assert!(LightCycle::from_code("0").is_err());
        assert!(LightCycle::from_code("LD").is_err());
    }

    #[test]
    fn test_constant_dark_spans_whole_day() {
        let start = day_start(2025, 1, 10, 7);
        let spans = dark_intervals(start, LightCycle::ConstantDark);
        assert_eq!(spans, vec![(start, start + Duration::hours(24))]);

        // Same shape regardless of day start
        let other = day_start(2024, 6, 1, 0);
        let spans = dark_intervals(other, LightCycle::ConstantDark);
        assert_eq!(spans, vec![(other, other + Duration::hours(24))]);
    }

    #[test]
    fn test_standard_shades_second_half() {
        // 07:00 day start: dark from 19:00 to 07:00 the next day
        let start = day_start(2025, 1, 10, 7);
        let spans = dark_intervals(start, LightCycle::Standard);
        assert_eq!(
            spans,
            vec![(
                day_start(2025, 1, 10, 19),
                day_start(2025, 1, 11, 7),
            )]
        );
    }

    #[test]
    fn test_alternating_dark_every_odd_hour() {
        let start = day_start(2025, 1, 10, 7);
        let spans = dark_intervals(start, LightCycle::Alternating);

        assert_eq!(spans.len(), 12);
        for (i, (from, to)) in spans.iter().enumerate() {
            // Each span is exactly one hour long and starts at an odd offset
            assert_eq!(*to - *from, Duration::hours(1));
            let offset = (*from - start).num_hours();
            assert_eq!(offset, 2 * i as i64 + 1);
            assert_eq!(offset % 2, 1);
        }

        // Non-overlapping and ordered
        for pair in spans.windows(2) {
            assert!(pair[0].1 <= pair[1].0);
        }
    }

    #[test]
    fn test_offsets_stay_inside_the_day() {
        for cycle in [
            LightCycle::Alternating,
            LightCycle::ConstantDark,
            LightCycle::Standard,
        ] {
            for (from, to) in cycle.dark_hour_offsets() {
                assert!(from < to);
                assert!(to <= 24);
            }
        }
    }
}
