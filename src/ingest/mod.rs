//! Record ingestion
//!
//! Sources implement [`RecordSource`] and hand the pipeline a batch of
//! [`SensorRecord`](crate::types::SensorRecord)s plus an [`IngestReport`]
//! describing what was dropped on the way in. Malformed rows never abort a
//! run; they are counted and surfaced to the caller.

mod csv_source;
mod schema;

pub use csv_source::CsvSource;
pub use schema::{ColumnSelector, SchemaMap};

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::types::SensorRecord;

/// A tabular source of sensor records.
pub trait RecordSource {
    /// Load the whole source. Row-level problems are recovered locally and
    /// reported; only source-level failures (unreadable file, missing
    /// required column) are errors.
    fn load(&self) -> Result<IngestBatch, PipelineError>;

    /// Label for provenance, usually the file path.
    fn label(&self) -> String;
}

/// Result of loading one source.
#[derive(Debug, Clone)]
pub struct IngestBatch {
    /// Records sorted by (animal id, raw timestamp)
    pub records: Vec<SensorRecord>,
    pub report: IngestReport,
}

/// Per-source ingestion accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Data rows seen in the source
    pub total_rows: usize,
    /// Rows that produced a record
    pub ingested: usize,
    /// Rows dropped for an unparseable date/time
    pub dropped_bad_timestamp: usize,
    /// Rows dropped for a missing or non-positive-integer animal id
    pub dropped_bad_animal_id: usize,
}

impl IngestReport {
    pub fn dropped(&self) -> usize {
        self.dropped_bad_timestamp + self.dropped_bad_animal_id
    }
}

/// In-memory source, for embedding and tests.
pub struct MemorySource {
    records: Vec<SensorRecord>,
    label: String,
}

impl MemorySource {
    pub fn new(records: Vec<SensorRecord>) -> Self {
        Self {
            records,
            label: "memory".to_string(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

impl RecordSource for MemorySource {
    fn load(&self) -> Result<IngestBatch, PipelineError> {
        let mut records = self.records.clone();
        records.sort_by(|a, b| {
            (a.animal_id, a.timestamp).cmp(&(b.animal_id, b.timestamp))
        });
        let n = records.len();
        Ok(IngestBatch {
            records,
            report: IngestReport {
                total_rows: n,
                ingested: n,
                ..IngestReport::default()
            },
        })
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}
