//! Encode orchestration: the `compose` entry point and its supporting
//! progress, cancellation, and staging machinery.

mod cancel;
mod errors;
mod orchestrator;
mod progress;
mod staging;

pub use cancel::CancelHandle;
pub use errors::ComposeError;
pub use orchestrator::Compositor;
pub use progress::{ProgressCallback, ProgressSink};
