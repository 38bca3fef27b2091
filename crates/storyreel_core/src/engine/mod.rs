//! Encoding engine abstraction and its ffmpeg-backed implementation.
//!
//! The compositor talks to the engine through the [`Engine`] trait:
//! stage named input files, run one encode command, read the result
//! back, remove working files. The production implementation wraps an
//! ffmpeg binary installed by [`bootstrap`].

mod bootstrap;
mod fetch;
mod ffmpeg;

pub use bootstrap::{bootstrap, BootstrapError, EngineManifest};
pub use fetch::{FetchError, HttpFetcher, SourceFetcher};
pub use ffmpeg::FfmpegEngine;

use async_trait::async_trait;
use thiserror::Error;

use crate::compose::CancelHandle;
use crate::config::OutputSettings;
use crate::graph::InputSpec;

/// Failures inside the encoding engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine storage {operation} failed: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to launch encoder: {0}")]
    Spawn(String),

    #[error("encoder exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("encode was cancelled")]
    Cancelled,

    #[error("no such engine file: {0}")]
    FileNotFound(String),

    #[error("invalid engine file name: {0}")]
    InvalidName(String),
}

impl EngineError {
    pub(crate) fn io(operation: &'static str, source: std::io::Error) -> Self {
        EngineError::Io { operation, source }
    }
}

/// One complete encode command: inputs, filter graph, output settings.
#[derive(Debug, Clone)]
pub struct EncodeJob {
    /// Looped-still inputs, in graph order.
    pub inputs: Vec<InputSpec>,
    pub filter_complex: String,
    /// The graph label to map into the output stream.
    pub output_label: String,
    /// Name of the output file inside engine storage.
    pub output_name: String,
    pub frame_rate: u32,
    /// Expected timeline length; used to turn encoder time reports
    /// into a completion fraction.
    pub total_duration_seconds: f64,
    pub video: OutputSettings,
}

/// A video encoding engine with flat, name-addressed working storage.
#[async_trait]
pub trait Engine: std::fmt::Debug + Send + Sync {
    /// Write `bytes` into engine storage under `name`.
    async fn stage_input(&self, name: &str, bytes: &[u8]) -> Result<(), EngineError>;

    /// Read a file out of engine storage.
    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineError>;

    /// Remove a file from engine storage.
    async fn remove_file(&self, name: &str) -> Result<(), EngineError>;

    /// Run a single encode command to completion.
    ///
    /// `progress` receives completion fractions in `[0.0, 1.0]`;
    /// implementations report `1.0` on success. Cancellation is
    /// checked while the encoder runs and surfaces as
    /// [`EngineError::Cancelled`].
    async fn run_encode(
        &self,
        job: &EncodeJob,
        progress: &(dyn Fn(f64) + Send + Sync),
        cancel: &CancelHandle,
    ) -> Result<(), EngineError>;
}
