//! Payload encoding
//!
//! Aggregated windows are emitted as a single JSON payload carrying producer
//! and provenance metadata, so a downstream consumer can tell which build,
//! which source and which configuration produced the numbers.

use chrono::Utc;
use uuid::Uuid;

use crate::config::AnalysisConfig;
use crate::error::PipelineError;
use crate::ingest::IngestReport;
use crate::types::{AnalysisPayload, DayWindows, Producer, Provenance};
use crate::{METAFLUX_VERSION, PRODUCER_NAME};

/// Current payload schema version
pub const PAYLOAD_VERSION: &str = "calo.windows.v1";

/// Encoder for producing output payloads
pub struct PayloadEncoder {
    instance_id: String,
}

impl Default for PayloadEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PayloadEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Assemble the payload for one finished run.
    pub fn encode(
        &self,
        source: &str,
        ingest: IngestReport,
        config: &AnalysisConfig,
        days: Vec<DayWindows>,
    ) -> AnalysisPayload {
        AnalysisPayload {
            payload_version: PAYLOAD_VERSION.to_string(),
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: METAFLUX_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            provenance: Provenance {
                source: source.to_string(),
                ingest,
                computed_at_utc: Utc::now().to_rfc3339(),
            },
            config: config.clone(),
            days,
        }
    }

    /// Encode to a JSON string
    pub fn encode_to_json(
        &self,
        source: &str,
        ingest: IngestReport,
        config: &AnalysisConfig,
        days: Vec<DayWindows>,
    ) -> Result<String, PipelineError> {
        let payload = self.encode(source, ingest, config, days);
        serde_json::to_string_pretty(&payload).map_err(PipelineError::JsonError)
    }
}
