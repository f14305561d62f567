//! Pipeline orchestration
//!
//! This module provides the public API for metaflux. A run is: load records
//! from a source, derive energy where a model is present, normalize, then
//! aggregate into day windows. Configuration is validated before the source
//! is touched; a failed run produces no partial output.

use chrono::NaiveDate;

use crate::aggregator::WindowAggregator;
use crate::config::AnalysisConfig;
use crate::energy::EnergyModel;
use crate::error::PipelineError;
use crate::ingest::{CsvSource, IngestReport, RecordSource, SchemaMap};
use crate::normalizer::Normalizer;
use crate::types::{CalendarWindow, DayWindows, NormalizedRecord};

/// Everything a run produces, handed to reporting as one unit.
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    /// Source label for provenance
    pub source: String,
    /// Ingestion accounting, including dropped-row counts
    pub report: IngestReport,
    /// Aggregated day windows in day order
    pub days: Vec<DayWindows>,
}

/// Analyzer bundling a validated configuration with an optional energy model.
///
/// Use this when several sources are processed under one protocol; for a
/// single file, [`csv_to_day_windows`] does the whole thing in one call.
pub struct Analyzer {
    config: AnalysisConfig,
    energy: Option<EnergyModel>,
}

impl Analyzer {
    /// Create an analyzer. Fails fast on an invalid configuration, before
    /// any source is opened.
    pub fn new(config: AnalysisConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            energy: None,
        })
    }

    /// Attach a body-weight table for energy derivation.
    pub fn with_energy_model(mut self, model: EnergyModel) -> Self {
        self.energy = Some(model);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Load and normalize one source without aggregating, for raw exports.
    pub fn ingest(
        &self,
        source: &dyn RecordSource,
    ) -> Result<(Vec<NormalizedRecord>, IngestReport), PipelineError> {
        let mut batch = source.load()?;
        if let Some(model) = &self.energy {
            model.derive(&mut batch.records);
        }
        let normalized = Normalizer::normalize(
            batch.records,
            self.config.alignment,
            self.config.feed_outlier_filter,
        );
        Ok((normalized, batch.report))
    }

    /// Full run: ingest, normalize, aggregate the configured day windows
    /// starting at `start_date`.
    pub fn run(
        &self,
        source: &dyn RecordSource,
        start_date: NaiveDate,
    ) -> Result<AnalysisOutput, PipelineError> {
        let (normalized, report) = self.ingest(source)?;
        let days = WindowAggregator::aggregate_days(&normalized, start_date, &self.config)?;
        Ok(AnalysisOutput {
            source: source.label(),
            report,
            days,
        })
    }

    /// Ingest and aggregate by calendar day and hour across the whole
    /// source, without day-window selection.
    pub fn run_calendar(
        &self,
        source: &dyn RecordSource,
    ) -> Result<(Vec<CalendarWindow>, IngestReport), PipelineError> {
        let (normalized, report) = self.ingest(source)?;
        Ok((
            WindowAggregator::aggregate_calendar(&normalized, &self.config),
            report,
        ))
    }
}

/// Process one CSV export into aggregated day windows.
///
/// # Example
/// ```ignore
/// let output = csv_to_day_windows(
///     "merged_export.csv",
///     SchemaMap::merged_export(),
///     NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
///     AnalysisConfig::default(),
/// )?;
/// ```
pub fn csv_to_day_windows(
    path: &str,
    schema: SchemaMap,
    start_date: NaiveDate,
    config: AnalysisConfig,
) -> Result<AnalysisOutput, PipelineError> {
    let source = CsvSource::new(path).with_schema(schema);
    Analyzer::new(config)?.run(&source, start_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindowAlignment;
    use crate::cycle::LightCycle;
    use crate::ingest::MemorySource;
    use crate::types::SensorRecord;
    use chrono::{Duration, NaiveDateTime};
    use pretty_assertions::assert_eq;

    fn day_start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 10)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap()
    }

    fn record(animal_id: u32, minutes: i64) -> SensorRecord {
        SensorRecord {
            animal_id,
            timestamp: day_start() + Duration::minutes(minutes),
            rer: Some(0.85),
            activity_raw: Some(1200.0),
            feed_cumulative: Some(10.0 + minutes as f64 / 100.0),
            vo2: Some(3200.0),
            energy_expenditure: None,
        }
    }

    #[test]
    fn test_invalid_config_fails_before_ingest() {
        let mut config = AnalysisConfig::default();
        config.day_count = 2;
        assert!(Analyzer::new(config).is_err());
    }

    #[test]
    fn test_run_produces_day_windows_and_report() {
        let source = MemorySource::new(vec![
            record(1, 15),
            record(1, 30),
            record(2, 15),
        ])
        .with_label("test-source");

        let config = AnalysisConfig::single_day(LightCycle::Standard);
        let output = Analyzer::new(config)
            .unwrap()
            .run(&source, NaiveDate::from_ymd_opt(2025, 1, 10).unwrap())
            .unwrap();

        assert_eq!(output.source, "test-source");
        assert_eq!(output.report.ingested, 3);
        assert_eq!(output.days.len(), 1);
        // Two animals, 24 buckets each
        assert_eq!(output.days[0].windows.len(), 48);
    }

    #[test]
    fn test_energy_model_applies_before_aggregation() {
        let source = MemorySource::new(vec![record(1, 15)]);
        let model = EnergyModel::new().with_weight(1, 25.0);

        let config = AnalysisConfig::single_day(LightCycle::ConstantDark);
        let output = Analyzer::new(config)
            .unwrap()
            .with_energy_model(model)
            .run(&source, NaiveDate::from_ymd_opt(2025, 1, 10).unwrap())
            .unwrap();

        let bucket = output.days[0]
            .windows
            .iter()
            .find(|w| w.relative_hour == 0)
            .unwrap();
        // 3200 * 25 * 5e-6 = 0.4
        assert!((bucket.energy.unwrap() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_alignment_moves_boundary_records_between_days() {
        // A record stamped exactly at the day start leaves the window when
        // timestamps are pulled back to the window start.
        let source = MemorySource::new(vec![record(1, 0)]);

        let mut config = AnalysisConfig::single_day(LightCycle::Standard);
        config.alignment = WindowAlignment::WindowEnd;
        let output = Analyzer::new(config.clone())
            .unwrap()
            .run(&source, NaiveDate::from_ymd_opt(2025, 1, 10).unwrap())
            .unwrap();
        assert_eq!(output.days[0].windows.len(), 24);

        config.alignment = WindowAlignment::WindowStart;
        let output = Analyzer::new(config)
            .unwrap()
            .run(&source, NaiveDate::from_ymd_opt(2025, 1, 10).unwrap())
            .unwrap();
        assert!(output.days[0].is_empty());
    }

    #[test]
    fn test_run_calendar() {
        let source = MemorySource::new(vec![record(1, 15), record(1, 75)]);
        let config = AnalysisConfig::default();
        let (windows, report) = Analyzer::new(config)
            .unwrap()
            .run_calendar(&source)
            .unwrap();

        assert_eq!(report.ingested, 2);
        // Center alignment pulls 07:15 to 07:07:30 and 08:15 to 08:07:30
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].hour, 7);
        assert_eq!(windows[1].hour, 8);
    }
}
