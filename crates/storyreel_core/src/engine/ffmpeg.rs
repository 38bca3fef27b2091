//! ffmpeg-backed engine: flat working storage plus one-shot encodes.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::compose::CancelHandle;

use super::bootstrap::EngineManifest;
use super::{EncodeJob, Engine, EngineError};

/// Engine implementation wrapping an installed ffmpeg binary.
///
/// Working storage is a single flat directory; names are validated so
/// callers cannot escape it.
#[derive(Debug)]
pub struct FfmpegEngine {
    binary: PathBuf,
    work_dir: PathBuf,
}

impl FfmpegEngine {
    /// Wrap a binary, creating the working directory.
    pub fn new(binary: PathBuf, work_dir: PathBuf) -> Result<Self, EngineError> {
        std::fs::create_dir_all(&work_dir)
            .map_err(|err| EngineError::io("create work dir", err))?;
        Ok(Self { binary, work_dir })
    }

    /// Load a previously installed engine, if the recorded manifest
    /// and its binary are both still present.
    pub fn installed(install_dir: &Path) -> Option<Self> {
        let raw = std::fs::read(install_dir.join("manifest.json")).ok()?;
        let manifest: EngineManifest = serde_json::from_slice(&raw).ok()?;
        let binary = install_dir.join(&manifest.version).join(&manifest.binary);
        if !binary.is_file() {
            return None;
        }
        Self::new(binary, install_dir.join("work")).ok()
    }

    /// Resolve a storage name to a path, rejecting anything that could
    /// leave the flat namespace.
    fn storage_path(&self, name: &str) -> Result<PathBuf, EngineError> {
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(EngineError::InvalidName(name.to_string()));
        }
        Ok(self.work_dir.join(name))
    }

    fn build_encode_args(&self, job: &EncodeJob) -> Result<Vec<String>, EngineError> {
        let mut args: Vec<String> = vec![
            "-y".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-nostdin".into(),
        ];

        for input in &job.inputs {
            args.extend(input.input_args());
            args.push("-i".into());
            args.push(self.storage_path(&input.file_name)?.display().to_string());
        }

        args.push("-filter_complex".into());
        args.push(job.filter_complex.clone());
        args.push("-map".into());
        args.push(job.output_label.clone());

        args.push("-c:v".into());
        args.push(job.video.codec.clone());
        args.push("-preset".into());
        args.push(job.video.preset.clone());
        args.push("-crf".into());
        args.push(job.video.crf.to_string());
        args.push("-pix_fmt".into());
        args.push(job.video.pixel_format.clone());
        args.push("-r".into());
        args.push(job.frame_rate.to_string());
        args.push("-an".into());

        if job.video.faststart && job.video.container == "mp4" {
            args.push("-movflags".into());
            args.push("+faststart".into());
        }

        args.push("-progress".into());
        args.push("pipe:1".into());
        args.push(self.storage_path(&job.output_name)?.display().to_string());

        Ok(args)
    }
}

/// Parse one key=value line of the encoder's progress stream into
/// elapsed output seconds.
fn parse_progress_line(line: &str) -> Option<f64> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        "out_time_us" | "out_time_ms" => {
            let micros: i64 = value.parse().ok()?;
            Some(micros.max(0) as f64 / 1_000_000.0)
        }
        "out_time" => {
            // HH:MM:SS.micros
            let mut parts = value.split(':');
            let hours: f64 = parts.next()?.parse().ok()?;
            let minutes: f64 = parts.next()?.parse().ok()?;
            let seconds: f64 = parts.next()?.parse().ok()?;
            Some(hours * 3600.0 + minutes * 60.0 + seconds)
        }
        _ => None,
    }
}

#[async_trait]
impl Engine for FfmpegEngine {
    async fn stage_input(&self, name: &str, bytes: &[u8]) -> Result<(), EngineError> {
        let path = self.storage_path(name)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|err| EngineError::io("write", err))
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        let path = self.storage_path(name)?;
        tokio::fs::read(&path).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                EngineError::FileNotFound(name.to_string())
            } else {
                EngineError::io("read", err)
            }
        })
    }

    async fn remove_file(&self, name: &str) -> Result<(), EngineError> {
        let path = self.storage_path(name)?;
        tokio::fs::remove_file(&path).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                EngineError::FileNotFound(name.to_string())
            } else {
                EngineError::io("remove", err)
            }
        })
    }

    async fn run_encode(
        &self,
        job: &EncodeJob,
        progress: &(dyn Fn(f64) + Send + Sync),
        cancel: &CancelHandle,
    ) -> Result<(), EngineError> {
        let args = self.build_encode_args(job)?;
        debug!("encode command: {} {}", self.binary.display(), args.join(" "));

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| EngineError::Spawn(err.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Spawn("encoder stdout unavailable".to_string()))?;
        let mut lines = BufReader::new(stdout).lines();
        let mut ticker = tokio::time::interval(Duration::from_millis(200));

        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if let Some(elapsed) = parse_progress_line(&line) {
                            if job.total_duration_seconds > 0.0 {
                                progress((elapsed / job.total_duration_seconds).clamp(0.0, 1.0));
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        child.kill().await.ok();
                        return Err(EngineError::io("read progress", err));
                    }
                },
                _ = ticker.tick() => {
                    if cancel.is_cancelled() {
                        child.kill().await.ok();
                        return Err(EngineError::Cancelled);
                    }
                }
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|err| EngineError::io("wait", err))?;
        if !output.status.success() {
            return Err(EngineError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        progress(1.0);
        Ok(())
    }
}
