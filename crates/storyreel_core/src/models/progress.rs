//! Progress records and the output artifact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discrete stage of a composition run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Bootstrapping,
    StagingInputs,
    Encoding,
    Finished,
    Failed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Bootstrapping => write!(f, "bootstrapping"),
            Stage::StagingInputs => write!(f, "staging-inputs"),
            Stage::Encoding => write!(f, "encoding"),
            Stage::Finished => write!(f, "finished"),
            Stage::Failed => write!(f, "failed"),
        }
    }
}

/// Transient status value emitted throughout a run. Not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionProgress {
    /// Current stage.
    pub stage: Stage,
    /// 0-100, monotonically non-decreasing within one run.
    pub percent: u8,
    /// Human-readable status text.
    pub message: String,
    /// 1-based scene being staged (present during staging).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_scene: Option<u32>,
    /// Total renderable scenes (present during staging).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_scenes: Option<u32>,
    /// When this record was emitted.
    pub emitted_at: DateTime<Utc>,
}

/// The final binary video output returned to the caller.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// File name derived from the sanitized project name.
    pub file_name: String,
    /// MIME type of the encoded output.
    pub content_type: &'static str,
    /// Encoded video bytes.
    pub bytes: Vec<u8>,
    /// Final timeline duration in seconds.
    pub duration_seconds: f64,
}
