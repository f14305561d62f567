//! Metaflux - batch compute engine for indirect-calorimetry time series
//!
//! Metaflux turns per-animal calorimetry exports (gas exchange, activity,
//! feeding, energy expenditure) into hourly analysis windows through a
//! deterministic pipeline: ingestion → timestamp normalization → window
//! aggregation, with light-cycle annotation for chart shading.
//!
//! ## Modules
//!
//! - **ingest**: schema-mapped tabular sources with dropped-row accounting
//! - **normalizer**: sampling-window alignment, feed deltas, activity scaling
//! - **aggregator**: per-animal hourly buckets inside fixed 24 h day windows
//! - **cycle**: dark-phase intervals for the protocol's light cycles
//! - **series** / **encoder**: chart series, wide tables and JSON payloads
//!   for the reporting side

pub mod aggregator;
pub mod config;
pub mod cycle;
pub mod encoder;
pub mod energy;
pub mod error;
pub mod ingest;
pub mod normalizer;
pub mod pipeline;
pub mod series;
pub mod types;

pub use aggregator::WindowAggregator;
pub use config::{Aggregation, AnalysisConfig, WindowAlignment};
pub use cycle::{dark_intervals, LightCycle};
pub use energy::EnergyModel;
pub use error::PipelineError;
pub use pipeline::{csv_to_day_windows, Analyzer};

// Schema exports
pub use ingest::{CsvSource, MemorySource, RecordSource, SchemaMap};

/// Metaflux version embedded in all emitted payloads
pub const METAFLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for emitted payloads
pub const PRODUCER_NAME: &str = "metaflux";
