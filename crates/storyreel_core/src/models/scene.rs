//! Composition request and scene types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::enums::{ColorGradeStyle, Resolution, TransitionStyle};

/// Reference to a scene's still image.
///
/// The compositor only needs to resolve this to raw bytes before
/// staging; it does not care where the bytes come from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneImage {
    /// Embedded `data:image/...;base64,...` payload.
    DataUri(String),
    /// Fetchable remote reference.
    Url(String),
    /// Local file path.
    Path(PathBuf),
    /// No image attached; the scene is skipped during composition.
    #[default]
    None,
}

impl SceneImage {
    /// Whether this reference can be resolved to image bytes at all.
    pub fn is_resolvable(&self) -> bool {
        !matches!(self, SceneImage::None)
    }
}

/// One unit of visual content: a still image shown for an exact duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    /// 1-based position; defines render and timeline order.
    pub index: u32,
    /// The scene's still image.
    #[serde(default)]
    pub source_image: SceneImage,
    /// Narration text. Not rendered into pixels by this subsystem;
    /// carried through for caller bookkeeping only.
    #[serde(default)]
    pub narration_text: String,
    /// On-screen time in seconds, before any transition overlap.
    pub duration_seconds: f64,
}

/// Validation failures for a composition request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("frame rate must be positive, got {0}")]
    BadFrameRate(u32),

    #[error("scene {index} has non-positive duration {duration}s")]
    BadSceneDuration { index: u32, duration: f64 },

    #[error(
        "transition duration {transition}s must be strictly less than the \
         shortest scene duration {shortest}s"
    )]
    TransitionTooLong { transition: f64, shortest: f64 },

    #[error("transition duration must be positive, got {0}s")]
    BadTransitionDuration(f64),

    #[error("request contains no scenes")]
    NoScenes,
}

fn default_frame_rate() -> u32 {
    30
}

/// The full composition job: an ordered scene list plus global options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionRequest {
    /// Scenes in display order.
    pub scenes: Vec<Scene>,
    /// Used only to derive the output artifact's file name.
    pub project_name: String,
    /// Output frames per second.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    /// Output resolution preset.
    #[serde(default)]
    pub resolution: Resolution,
    /// Toggle pan/zoom motion.
    #[serde(default)]
    pub motion_enabled: bool,
    /// Toggle inter-scene blending.
    #[serde(default)]
    pub transition_enabled: bool,
    /// Transition style when blending is enabled.
    #[serde(default)]
    pub transition_style: TransitionStyle,
    /// Transition overlap in seconds.
    #[serde(default = "default_transition_duration")]
    pub transition_duration_seconds: f64,
    /// Toggle per-scene tonal adjustment.
    #[serde(default)]
    pub color_grade_enabled: bool,
    /// Grading style when grading is enabled.
    #[serde(default)]
    pub color_grade_style: ColorGradeStyle,
}

fn default_transition_duration() -> f64 {
    0.5
}

impl CompositionRequest {
    /// Validate the request's timing configuration.
    ///
    /// A transition duration at or above the shortest scene duration
    /// would produce overlapping transitions that invert scene
    /// ordering, so it is rejected here instead of being silently
    /// clamped downstream.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.frame_rate == 0 {
            return Err(ValidationError::BadFrameRate(self.frame_rate));
        }
        if self.scenes.is_empty() {
            return Err(ValidationError::NoScenes);
        }
        for scene in &self.scenes {
            if !(scene.duration_seconds > 0.0) {
                return Err(ValidationError::BadSceneDuration {
                    index: scene.index,
                    duration: scene.duration_seconds,
                });
            }
        }
        if self.transition_enabled && self.scenes.len() > 1 {
            let t = self.transition_duration_seconds;
            if !(t > 0.0) {
                return Err(ValidationError::BadTransitionDuration(t));
            }
            let shortest = self
                .scenes
                .iter()
                .map(|s| s.duration_seconds)
                .fold(f64::INFINITY, f64::min);
            if t >= shortest {
                return Err(ValidationError::TransitionTooLong {
                    transition: t,
                    shortest,
                });
            }
        }
        Ok(())
    }

    /// Scenes whose image reference can be resolved, in display order.
    pub fn renderable_scenes(&self) -> Vec<&Scene> {
        self.scenes
            .iter()
            .filter(|s| s.source_image.is_resolvable())
            .collect()
    }

    /// Effective transition duration, or `None` when transitions are
    /// disabled or there is nothing to blend between.
    pub fn effective_transition(&self) -> Option<f64> {
        if self.transition_enabled && self.scenes.len() > 1 {
            Some(self.transition_duration_seconds)
        } else {
            None
        }
    }
}

/// Sanitize a project name for use as an output file name.
pub(crate) fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() => '_',
            _ => c,
        })
        .collect();
    if cleaned.is_empty() {
        "storyreel".to_string()
    } else {
        cleaned
    }
}
