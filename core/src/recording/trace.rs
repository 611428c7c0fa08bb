use serde::{Deserialize, Serialize};

/// Acquisition modality of a trace, derived from the legacy recording tags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TraceKind {
    Extracellular,
    Intracellular,
    VsdOptical,
    Synthetic,
}

/// Describes the recording session a trace was taken from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub name: String,
    pub preparation: String,
    pub stimulus: Option<String>,
    pub description: Option<String>,
    pub timestamp_start: Option<f64>,
}

/// Ancillary metadata accompanying each raw trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceAncillary {
    pub timestamp: f64,
    pub kind: TraceKind,
    pub channel: u32,
    pub sample_rate_hz: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SessionMetadata>,
}

/// Raw trace consumed by the conditioning core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracePayload {
    pub samples: Vec<f64>,
    pub ancillary: TraceAncillary,
}

impl TracePayload {
    pub fn new(samples: Vec<f64>, ancillary: TraceAncillary) -> Self {
        Self { samples, ancillary }
    }
}
