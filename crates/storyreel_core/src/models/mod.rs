//! Data model for composition requests, progress, and results.

mod enums;
mod progress;
mod scene;

pub use enums::{ColorGradeStyle, Resolution, TransitionStyle};
pub use progress::{Artifact, CompositionProgress, Stage};
pub use scene::{CompositionRequest, Scene, SceneImage, ValidationError};

pub(crate) use scene::sanitize_file_name;
