//! Analysis configuration
//!
//! The source workflows prompted for every parameter interactively; here the
//! whole run is described by one [`AnalysisConfig`], validated once at the
//! boundary. The pipeline itself takes no interactive dependency.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::cycle::LightCycle;
use crate::error::PipelineError;

/// Where inside the 15-minute sampling window a record's timestamp should
/// point. Raw instrument timestamps mark the end of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowAlignment {
    /// Shift back a full window (15 min)
    WindowStart,
    /// Shift back half a window (7 min 30 s)
    WindowCenter,
    /// Leave timestamps as recorded
    WindowEnd,
}

impl WindowAlignment {
    /// Parse the one-character code used by the lab protocol.
    pub fn from_code(code: &str) -> Result<Self, PipelineError> {
        match code.trim() {
            "1" => Ok(WindowAlignment::WindowStart),
            "2" => Ok(WindowAlignment::WindowCenter),
            "3" => Ok(WindowAlignment::WindowEnd),
            other => Err(PipelineError::InvalidAlignmentCode(other.to_string())),
        }
    }

    /// Amount subtracted from every raw timestamp.
    pub fn shift(&self) -> Duration {
        match self {
            WindowAlignment::WindowStart => Duration::minutes(15),
            WindowAlignment::WindowCenter => Duration::seconds(7 * 60 + 30),
            WindowAlignment::WindowEnd => Duration::zero(),
        }
    }
}

/// Aggregation function applied to a metric within one hourly bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Sum,
    Mean,
}

/// Full configuration for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Timestamp position inside the sampling window
    pub alignment: WindowAlignment,
    /// Hour of day each analysis day starts at (0-23)
    pub day_start_hour: u32,
    /// Number of consecutive 24 h day windows
    pub day_count: u32,
    /// Light cycle per day; length must equal `day_count`
    pub cycle_schedule: Vec<LightCycle>,
    /// Discard feed deltas above the outlier threshold instead of keeping them
    pub feed_outlier_filter: bool,
    /// How energy expenditure aggregates within a bucket; both appear in
    /// practice
    pub energy_aggregation: Aggregation,
    /// How normalized activity aggregates within a bucket; the source
    /// workflows disagree, so the choice stays configurable
    pub activity_aggregation: Aggregation,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        // The standard four-day protocol: LD12:12, constant dark, LD1:1,
        // then LD12:12 again, each day running 07:00 to 07:00.
        Self {
            alignment: WindowAlignment::WindowCenter,
            day_start_hour: 7,
            day_count: 4,
            cycle_schedule: vec![
                LightCycle::Standard,
                LightCycle::ConstantDark,
                LightCycle::Alternating,
                LightCycle::Standard,
            ],
            feed_outlier_filter: false,
            energy_aggregation: Aggregation::Sum,
            activity_aggregation: Aggregation::Sum,
        }
    }
}

impl AnalysisConfig {
    /// Validate the configuration before any processing happens.
    ///
    /// Fatal on the first violation; a run never starts with a bad config.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.day_start_hour > 23 {
            return Err(PipelineError::InvalidDayStartHour(self.day_start_hour));
        }
        if self.day_count == 0 {
            return Err(PipelineError::InvalidDayCount(self.day_count));
        }
        if self.cycle_schedule.len() != self.day_count as usize {
            return Err(PipelineError::ScheduleLengthMismatch {
                got: self.cycle_schedule.len(),
                days: self.day_count,
            });
        }
        Ok(())
    }

    /// Configuration for a single-day analysis under one light cycle.
    pub fn single_day(cycle: LightCycle) -> Self {
        Self {
            day_count: 1,
            cycle_schedule: vec![cycle],
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_codes() {
        assert_eq!(
            WindowAlignment::from_code("1").unwrap(),
            WindowAlignment::WindowStart
        );
        assert_eq!(
            WindowAlignment::from_code(" 2 ").unwrap(),
            WindowAlignment::WindowCenter
        );
        assert_eq!(
            WindowAlignment::from_code("3").unwrap(),
            WindowAlignment::WindowEnd
        );
        assert!(WindowAlignment::from_code("4").is_err());
    }

    #[test]
    fn test_alignment_shifts() {
        assert_eq!(
            WindowAlignment::WindowStart.shift(),
            Duration::minutes(15)
        );
        assert_eq!(
            WindowAlignment::WindowCenter.shift(),
            Duration::seconds(450)
        );
        assert_eq!(WindowAlignment::WindowEnd.shift(), Duration::zero());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_schedule_length_must_match_day_count() {
        let mut config = AnalysisConfig::default();
        config.day_count = 3;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ScheduleLengthMismatch { got: 4, days: 3 }
        ));
    }

    #[test]
    fn test_day_start_hour_bounds() {
        let mut config = AnalysisConfig::default();
        config.day_start_hour = 24;
        assert!(matches!(
            config.validate().unwrap_err(),
            PipelineError::InvalidDayStartHour(24)
        ));
    }

    #[test]
    fn test_zero_days_rejected() {
        let mut config = AnalysisConfig::default();
        config.day_count = 0;
        config.cycle_schedule.clear();
        assert!(matches!(
            config.validate().unwrap_err(),
            PipelineError::InvalidDayCount(0)
        ));
    }
}
