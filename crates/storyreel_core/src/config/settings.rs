//! Settings struct with TOML-based sections.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Encoding-engine sourcing and lifecycle settings.
    #[serde(default)]
    pub engine: EngineSettings,

    /// Output encoding settings.
    #[serde(default)]
    pub output: OutputSettings,
}

/// One candidate location for the engine artifacts.
///
/// Each source names both required artifacts: the small control
/// manifest and the large binary payload. Sources are tried in order;
/// the first whose fetches and verification succeed wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSource {
    /// Short name used in logs and aggregated error messages.
    pub name: String,
    /// URL of the control manifest (JSON).
    pub manifest_url: String,
    /// URL of the binary payload (tar.gz).
    pub payload_url: String,
}

/// Engine bootstrap configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Directory the engine is installed into. Defaults to the
    /// platform data directory when unset.
    #[serde(default)]
    pub install_dir: Option<PathBuf>,

    /// Ordered candidate sources for the engine artifacts.
    #[serde(default = "default_sources")]
    pub sources: Vec<EngineSource>,

    /// Timeout for the control-manifest fetch. The manifest is tiny,
    /// so a slow source is abandoned quickly.
    #[serde(default = "default_manifest_timeout")]
    pub manifest_timeout_secs: u64,

    /// Timeout for the binary-payload fetch. The payload is large.
    #[serde(default = "default_payload_timeout")]
    pub payload_timeout_secs: u64,

    /// Timeout for fetching a remote scene image during staging.
    #[serde(default = "default_image_timeout")]
    pub image_fetch_timeout_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            install_dir: None,
            sources: default_sources(),
            manifest_timeout_secs: default_manifest_timeout(),
            payload_timeout_secs: default_payload_timeout(),
            image_fetch_timeout_secs: default_image_timeout(),
        }
    }
}

impl EngineSettings {
    /// Resolved install directory, falling back to the platform data dir.
    pub fn resolved_install_dir(&self) -> PathBuf {
        if let Some(dir) = &self.install_dir {
            return dir.clone();
        }
        directories::ProjectDirs::from("io", "storyreel", "storyreel")
            .map(|dirs| dirs.data_dir().join("engine"))
            .unwrap_or_else(|| std::env::temp_dir().join("storyreel-engine"))
    }

    pub fn manifest_timeout(&self) -> Duration {
        Duration::from_secs(self.manifest_timeout_secs)
    }

    pub fn payload_timeout(&self) -> Duration {
        Duration::from_secs(self.payload_timeout_secs)
    }

    pub fn image_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.image_fetch_timeout_secs)
    }
}

fn default_sources() -> Vec<EngineSource> {
    vec![
        EngineSource {
            name: "primary".to_string(),
            manifest_url: "https://builds.storyreel.io/engine/manifest.json".to_string(),
            payload_url: "https://builds.storyreel.io/engine/engine-linux-x86_64.tar.gz"
                .to_string(),
        },
        EngineSource {
            name: "mirror".to_string(),
            manifest_url: "https://cdn.storyreel.io/engine/manifest.json".to_string(),
            payload_url: "https://cdn.storyreel.io/engine/engine-linux-x86_64.tar.gz".to_string(),
        },
    ]
}

fn default_manifest_timeout() -> u64 {
    10
}

fn default_payload_timeout() -> u64 {
    180
}

fn default_image_timeout() -> u64 {
    30
}

/// Output encoding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Video codec.
    #[serde(default = "default_codec")]
    pub codec: String,

    /// Constant rate factor (quality; lower is better).
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Encoder speed preset.
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Output pixel format.
    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    /// Container extension for the artifact file name.
    #[serde(default = "default_container")]
    pub container: String,

    /// Whether to relocate the index for progressive playback.
    #[serde(default = "default_faststart")]
    pub faststart: bool,

    /// Hard ceiling on a single encode command's runtime.
    #[serde(default = "default_encode_timeout")]
    pub encode_timeout_secs: u64,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            codec: default_codec(),
            crf: default_crf(),
            preset: default_preset(),
            pixel_format: default_pixel_format(),
            container: default_container(),
            faststart: default_faststart(),
            encode_timeout_secs: default_encode_timeout(),
        }
    }
}

impl OutputSettings {
    pub fn encode_timeout(&self) -> Duration {
        Duration::from_secs(self.encode_timeout_secs)
    }
}

fn default_codec() -> String {
    "libx264".to_string()
}

fn default_crf() -> u8 {
    23
}

fn default_preset() -> String {
    "medium".to_string()
}

fn default_pixel_format() -> String {
    "yuv420p".to_string()
}

fn default_container() -> String {
    "mp4".to_string()
}

fn default_faststart() -> bool {
    true
}

fn default_encode_timeout() -> u64 {
    600
}
