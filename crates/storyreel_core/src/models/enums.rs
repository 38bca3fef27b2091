//! Core enums used throughout the compositor.

use serde::{Deserialize, Serialize};

/// Output resolution preset.
///
/// A small fixed set; every pair is even on both axes, which the
/// yuv420p pixel format requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// 1920x1080, 16:9.
    #[default]
    Landscape,
    /// 1080x1920, 9:16.
    Portrait,
    /// 1080x1080, 1:1.
    Square,
    /// 1280x720, 16:9.
    Hd,
}

impl Resolution {
    /// Pixel dimensions as (width, height).
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Resolution::Landscape => (1920, 1080),
            Resolution::Portrait => (1080, 1920),
            Resolution::Square => (1080, 1080),
            Resolution::Hd => (1280, 720),
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (w, h) = self.dimensions();
        write!(f, "{}x{}", w, h)
    }
}

/// Inter-scene transition style.
///
/// Each variant maps to an engine transition name understood by the
/// xfade filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionStyle {
    #[default]
    Fade,
    Dissolve,
    SlideLeft,
    SlideRight,
    WipeLeft,
    WipeRight,
    CircleOpen,
}

impl TransitionStyle {
    /// Engine-level transition name.
    pub fn filter_name(self) -> &'static str {
        match self {
            TransitionStyle::Fade => "fade",
            TransitionStyle::Dissolve => "dissolve",
            TransitionStyle::SlideLeft => "slideleft",
            TransitionStyle::SlideRight => "slideright",
            TransitionStyle::WipeLeft => "wipeleft",
            TransitionStyle::WipeRight => "wiperight",
            TransitionStyle::CircleOpen => "circleopen",
        }
    }
}

impl std::fmt::Display for TransitionStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.filter_name())
    }
}

/// Named color grading style applied per scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorGradeStyle {
    /// No tonal adjustment.
    #[default]
    None,
    Warm,
    Cool,
    Cinematic,
    Vintage,
}

impl std::fmt::Display for ColorGradeStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorGradeStyle::None => write!(f, "none"),
            ColorGradeStyle::Warm => write!(f, "warm"),
            ColorGradeStyle::Cool => write!(f, "cool"),
            ColorGradeStyle::Cinematic => write!(f, "cinematic"),
            ColorGradeStyle::Vintage => write!(f, "vintage"),
        }
    }
}
