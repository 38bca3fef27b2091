//! Engine bootstrap: fetch, verify, and install the encoder binary.
//!
//! Each configured source publishes two artifacts: a small JSON control
//! manifest naming the engine version, binary, and payload checksum,
//! and the payload itself as a gzipped tarball. Sources are tried in
//! declared order with independent timeouts for the two fetches; the
//! first source whose payload verifies wins. A prior successful install
//! is reused without touching the network.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{EngineSettings, EngineSource};

use super::fetch::SourceFetcher;
use super::ffmpeg::FfmpegEngine;

/// Control manifest describing one published engine build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineManifest {
    /// Build version; also the install subdirectory name.
    pub version: String,
    /// Binary file name inside the payload tarball.
    pub binary: String,
    /// Lowercase hex SHA-256 of the payload tarball.
    pub sha256: String,
}

/// Bootstrap failures.
///
/// Per-source failures are aggregated into one message rather than
/// surfaced individually; the caller decides whether to retry, and a
/// retry starts the whole source walk over.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("all engine sources failed: {0}")]
    AllSourcesFailed(String),

    #[error("engine install failed: {0}")]
    Install(String),
}

/// Download, verify, and install the engine, reporting coarse progress
/// milestones in the 5..=25 percent band.
///
/// Reuses an existing install when its manifest and binary are already
/// on disk. Not re-entrant by itself; the compositor serializes calls
/// through its engine cell.
pub async fn bootstrap(
    settings: &EngineSettings,
    fetcher: &dyn SourceFetcher,
    report: &(dyn Fn(u8, &str) + Send + Sync),
) -> Result<FfmpegEngine, BootstrapError> {
    report(5, "preparing encoding engine");

    let install_dir = settings.resolved_install_dir();
    if let Some(engine) = FfmpegEngine::installed(&install_dir) {
        debug!("reusing installed engine at {}", install_dir.display());
        report(25, "encoding engine ready");
        return Ok(engine);
    }

    let mut failures: Vec<String> = Vec::new();
    for source in &settings.sources {
        match try_source(source, settings, fetcher, report).await {
            Ok(payload) => {
                report(22, "initializing encoding engine");
                let engine = install(&install_dir, &payload.manifest, payload.bytes).await?;
                info!(
                    "installed engine {} from source '{}'",
                    payload.manifest.version, source.name
                );
                report(25, "encoding engine ready");
                return Ok(engine);
            }
            Err(reason) => {
                warn!("engine source '{}' failed: {reason}", source.name);
                failures.push(format!("{}: {reason}", source.name));
            }
        }
    }

    Err(BootstrapError::AllSourcesFailed(failures.join("; ")))
}

struct VerifiedPayload {
    manifest: EngineManifest,
    bytes: Vec<u8>,
}

async fn try_source(
    source: &EngineSource,
    settings: &EngineSettings,
    fetcher: &dyn SourceFetcher,
    report: &(dyn Fn(u8, &str) + Send + Sync),
) -> Result<VerifiedPayload, String> {
    report(10, "fetching engine manifest");
    let manifest_bytes = fetcher
        .fetch(&source.manifest_url, settings.manifest_timeout())
        .await
        .map_err(|err| err.to_string())?;
    let manifest: EngineManifest =
        serde_json::from_slice(&manifest_bytes).map_err(|err| format!("bad manifest: {err}"))?;

    report(18, "downloading engine payload");
    let bytes = fetcher
        .fetch(&source.payload_url, settings.payload_timeout())
        .await
        .map_err(|err| err.to_string())?;

    let actual = sha256_hex(&bytes);
    if !actual.eq_ignore_ascii_case(&manifest.sha256) {
        return Err(format!(
            "payload checksum mismatch: expected {}, got {actual}",
            manifest.sha256
        ));
    }

    Ok(VerifiedPayload { manifest, bytes })
}

/// Extract the payload under `install_dir/<version>/` and record the
/// manifest so later runs can reuse the install.
async fn install(
    install_dir: &Path,
    manifest: &EngineManifest,
    payload: Vec<u8>,
) -> Result<FfmpegEngine, BootstrapError> {
    let version_dir = install_dir.join(&manifest.version);
    let binary_path = version_dir.join(&manifest.binary);
    let manifest_json = serde_json::to_string_pretty(manifest)
        .map_err(|err| BootstrapError::Install(err.to_string()))?;

    let extract_dir = version_dir.clone();
    let extract_target = binary_path.clone();
    tokio::task::spawn_blocking(move || extract_payload(&extract_dir, &extract_target, &payload))
        .await
        .map_err(|err| BootstrapError::Install(format!("extraction task failed: {err}")))??;

    tokio::fs::write(install_dir.join("manifest.json"), manifest_json)
        .await
        .map_err(|err| BootstrapError::Install(format!("could not record manifest: {err}")))?;

    FfmpegEngine::new(binary_path, install_dir.join("work"))
        .map_err(|err| BootstrapError::Install(err.to_string()))
}

fn extract_payload(
    version_dir: &Path,
    binary_path: &Path,
    payload: &[u8],
) -> Result<(), BootstrapError> {
    std::fs::create_dir_all(version_dir)
        .map_err(|err| BootstrapError::Install(format!("could not create install dir: {err}")))?;

    let decoder = flate2::read::GzDecoder::new(payload);
    let mut archive = tar::Archive::new(decoder);
    archive
        .unpack(version_dir)
        .map_err(|err| BootstrapError::Install(format!("could not unpack payload: {err}")))?;

    if !binary_path.is_file() {
        return Err(BootstrapError::Install(format!(
            "payload did not contain '{}'",
            binary_path.display()
        )));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(binary_path, std::fs::Permissions::from_mode(0o755))
            .map_err(|err| BootstrapError::Install(format!("could not mark executable: {err}")))?;
    }

    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
