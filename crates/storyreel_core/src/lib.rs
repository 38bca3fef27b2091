//! StoryReel Core - scene-to-video composition engine
//!
//! This crate turns an ordered list of still images, each tagged with
//! narration text and an exact display duration, into a single encoded
//! video with pan/zoom motion, inter-scene transitions, and color
//! grading. It contains all composition logic with zero UI
//! dependencies; it can be driven from a CLI, a service, or tests.
//!
//! # Pipeline
//!
//! ```text
//! CompositionRequest
//!     ├── validate timing/configuration
//!     ├── ensure encoding engine ready (download once per process)
//!     ├── stage scene images into the engine's working storage
//!     ├── build the filter graph (motion, grading, transitions)
//!     ├── run the single encode command, streaming progress
//!     └── read the artifact back and purge staged files
//! ```

pub mod compose;
pub mod config;
pub mod engine;
pub mod grading;
pub mod graph;
pub mod logging;
pub mod models;
pub mod timing;

pub use compose::{CancelHandle, ComposeError, Compositor, ProgressSink};
pub use models::{
    Artifact, ColorGradeStyle, CompositionProgress, CompositionRequest, Resolution, Scene,
    SceneImage, Stage, TransitionStyle,
};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
