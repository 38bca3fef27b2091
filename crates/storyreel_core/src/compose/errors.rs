//! Typed error taxonomy for composition runs.
//!
//! The orchestrator never surfaces raw engine errors; every failure
//! maps into one of these variants and no partial artifact is ever
//! returned. Cleanup runs on every exit path and its own failures are
//! logged, never escalated.

use thiserror::Error;

use crate::engine::BootstrapError;
use crate::models::ValidationError;

/// Error returned by [`Compositor::compose`](super::Compositor::compose).
#[derive(Error, Debug)]
pub enum ComposeError {
    /// The request's timing configuration is unusable; detected before
    /// any engine work.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ValidationError),

    /// Every scene is missing a usable image reference.
    #[error("no renderable scenes: every scene is missing a usable image")]
    NoRenderableScenes,

    /// The encoding engine could not be sourced from any candidate.
    /// Not retried automatically; a later call bootstraps from scratch.
    #[error("encoding engine unavailable: {0}")]
    EngineUnavailable(#[from] BootstrapError),

    /// A scene's image bytes could not be resolved or staged.
    #[error("failed to stage scene {scene_index}: {message}")]
    Staging { scene_index: u32, message: String },

    /// The engine's encode command failed.
    #[error("encode failed: {0}")]
    Encode(String),

    /// The caller cancelled the run.
    #[error("composition cancelled")]
    Cancelled,
}
