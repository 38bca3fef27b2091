//! Typed filter-graph intermediate representation.
//!
//! Per-scene visual work is described as a list of [`FilterStep`]s plus
//! a [`Combine`] strategy, and only rendered to the engine's textual
//! filter syntax at the last step. This keeps the
//! timing and ordering logic testable without parsing filter strings.

mod render;

pub use render::RenderedGraph;

use crate::grading;
use crate::models::{ColorGradeStyle, TransitionStyle};
use crate::timing;

/// Linear zoom factor reached at the end of each motion scene.
pub const ZOOM_END: f64 = 1.15;

/// Factor by which a scene is upscaled beyond the target resolution,
/// leaving headroom for panning without exposing edges.
const OVERSCAN: f64 = 1.25;

/// Total horizontal pan travel across a scene, in pixels.
const PAN_TRAVEL_X: f64 = 30.0;

/// Total vertical pan travel across a scene, in pixels.
const PAN_TRAVEL_Y: f64 = 18.0;

/// One staged scene as the graph builder sees it: a file already in
/// working storage plus its display duration.
#[derive(Debug, Clone)]
pub struct SceneInput {
    pub file_name: String,
    pub duration_seconds: f64,
}

/// Inter-scene blending parameters.
#[derive(Debug, Clone, Copy)]
pub struct TransitionSpec {
    pub style: TransitionStyle,
    pub duration_seconds: f64,
}

/// Global options the builder needs; derived from the request.
#[derive(Debug, Clone)]
pub struct GraphOptions {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub motion_enabled: bool,
    pub grade: ColorGradeStyle,
    pub transition: Option<TransitionSpec>,
}

/// Per-input arguments: the still image is looped for exactly its
/// scene duration, establishing the synthetic per-frame timeline.
#[derive(Debug, Clone)]
pub struct InputSpec {
    pub file_name: String,
    pub duration_seconds: f64,
    pub frame_rate: u32,
}

/// Pan direction signs for one scene. Alternates deterministically by
/// scene position so consecutive scenes don't all drift the same way:
/// horizontal flips by parity, vertical cycles through down/up/none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pan {
    pub horizontal: i8,
    pub vertical: i8,
}

impl Pan {
    /// Pan for the scene at the given 0-based render position.
    pub fn for_position(position: usize) -> Self {
        let horizontal = if position % 2 == 0 { 1 } else { -1 };
        let vertical = match position % 3 {
            0 => 1,
            1 => -1,
            _ => 0,
        };
        Pan {
            horizontal,
            vertical,
        }
    }
}

/// One visual operation in a scene's chain.
#[derive(Debug, Clone)]
pub enum FilterStep {
    /// Moderate upscale beyond the target resolution.
    Scale { width: u32, height: u32 },
    /// Linear zoom from 1.0 to [`ZOOM_END`] across the scene's frames,
    /// combined with a small directional pan.
    ZoomPan {
        frames: u64,
        width: u32,
        height: u32,
        frame_rate: u32,
        pan: Pan,
    },
    /// Aspect-preserving fit and pad to exact target resolution (the
    /// motion-disabled path).
    FitPad {
        width: u32,
        height: u32,
        frame_rate: u32,
    },
    /// Fixed tonal adjustment expression from the grading catalog.
    Grade(&'static str),
    /// Trim to the exact scene duration and reset the chain time base
    /// so combination math is not polluted by upstream offsets.
    Trim { duration_seconds: f64 },
}

/// The ordered operations applied to one scene's image stream.
#[derive(Debug, Clone)]
pub struct SceneChain {
    /// Index of the engine input this chain consumes.
    pub input_index: usize,
    pub steps: Vec<FilterStep>,
    /// Unique output label, keyed by scene position.
    pub label: String,
}

/// How per-scene outputs are combined into one stream.
#[derive(Debug, Clone)]
pub enum Combine {
    /// One scene; its chain output is the final stream.
    Single,
    /// Plain end-to-end concatenation.
    Concat,
    /// Pairwise left-to-right blending at precomputed offsets.
    Crossfade {
        style: TransitionStyle,
        duration_seconds: f64,
        /// Timeline offset of each of the N-1 blends, in seconds.
        offsets: Vec<f64>,
    },
}

/// The complete composition graph for one request.
#[derive(Debug, Clone)]
pub struct FilterGraph {
    pub inputs: Vec<InputSpec>,
    pub chains: Vec<SceneChain>,
    pub combine: Combine,
}

impl FilterGraph {
    /// Build the graph for a non-empty, already-filtered scene list.
    ///
    /// Callers must have dropped scenes without a resolvable image
    /// before invoking this; an empty list is a precondition violation,
    /// not a builder-level error.
    pub fn build(scenes: &[SceneInput], opts: &GraphOptions) -> Self {
        assert!(
            !scenes.is_empty(),
            "graph builder requires at least one staged scene"
        );

        let inputs = scenes
            .iter()
            .map(|s| InputSpec {
                file_name: s.file_name.clone(),
                duration_seconds: s.duration_seconds,
                frame_rate: opts.frame_rate,
            })
            .collect();

        let grade_expr = if opts.grade == ColorGradeStyle::None {
            ""
        } else {
            grading::grade_expression(opts.grade)
        };

        let chains = scenes
            .iter()
            .enumerate()
            .map(|(i, scene)| {
                let mut steps = Vec::new();
                if opts.motion_enabled {
                    steps.push(FilterStep::Scale {
                        width: oversize(opts.width),
                        height: oversize(opts.height),
                    });
                    steps.push(FilterStep::ZoomPan {
                        frames: timing::seconds_to_frames(
                            scene.duration_seconds,
                            opts.frame_rate,
                        ),
                        width: opts.width,
                        height: opts.height,
                        frame_rate: opts.frame_rate,
                        pan: Pan::for_position(i),
                    });
                } else {
                    steps.push(FilterStep::FitPad {
                        width: opts.width,
                        height: opts.height,
                        frame_rate: opts.frame_rate,
                    });
                }
                if !grade_expr.is_empty() {
                    steps.push(FilterStep::Grade(grade_expr));
                }
                steps.push(FilterStep::Trim {
                    duration_seconds: scene.duration_seconds,
                });
                SceneChain {
                    input_index: i,
                    steps,
                    label: format!("v{i}"),
                }
            })
            .collect();

        let combine = match (scenes.len(), opts.transition) {
            (1, _) => Combine::Single,
            (_, None) => Combine::Concat,
            (_, Some(t)) => {
                let durations: Vec<f64> = scenes.iter().map(|s| s.duration_seconds).collect();
                Combine::Crossfade {
                    style: t.style,
                    duration_seconds: t.duration_seconds,
                    offsets: timing::transition_offsets(&durations, t.duration_seconds),
                }
            }
        };

        FilterGraph {
            inputs,
            chains,
            combine,
        }
    }

    /// Per-scene pan travel in pixels per frame, signed.
    pub(crate) fn pan_steps(frames: u64, pan: Pan) -> (f64, f64) {
        let frames = frames.max(1) as f64;
        (
            f64::from(pan.horizontal) * PAN_TRAVEL_X / frames,
            f64::from(pan.vertical) * PAN_TRAVEL_Y / frames,
        )
    }
}

/// Upscale a dimension by the overscan factor, rounded up to even.
fn oversize(dim: u32) -> u32 {
    let scaled = (f64::from(dim) * OVERSCAN).ceil() as u32;
    scaled + (scaled & 1)
}
