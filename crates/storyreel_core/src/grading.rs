//! Fixed catalog of color grading styles.
//!
//! Maps a named style to the engine filter expression that implements
//! it. Absence of a grade is not an error; `None` resolves to an empty
//! expression and the graph builder simply skips the step.

use crate::models::ColorGradeStyle;

/// Filter expression implementing the given grading style.
///
/// Returns an empty string for [`ColorGradeStyle::None`].
pub fn grade_expression(style: ColorGradeStyle) -> &'static str {
    match style {
        ColorGradeStyle::None => "",
        ColorGradeStyle::Warm => {
            "colorbalance=rs=0.08:gs=0.02:bs=-0.08,eq=saturation=1.12:gamma=1.02"
        }
        ColorGradeStyle::Cool => {
            "colorbalance=rs=-0.08:bs=0.10,eq=saturation=1.05:brightness=0.01"
        }
        ColorGradeStyle::Cinematic => {
            "curves=preset=increase_contrast,eq=saturation=0.92:contrast=1.08,colorbalance=bs=0.04"
        }
        ColorGradeStyle::Vintage => "curves=preset=vintage,eq=saturation=0.80:brightness=0.02",
    }
}
