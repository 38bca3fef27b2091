//! Frame and transition-offset arithmetic.
//!
//! Pure functions, no side effects. Scene durations arrive in seconds;
//! the encoder works in whole frames and transition offsets in seconds
//! on the composite timeline. An off-by-one here desynchronizes every
//! scene after it, so these stay independently testable.

/// Convert a duration in seconds to a whole frame count at the given
/// frame rate, rounding to nearest.
pub fn seconds_to_frames(seconds: f64, fps: u32) -> u64 {
    (seconds * f64::from(fps)).round().max(0.0) as u64
}

/// Start offsets, in seconds, at which each transition begins on the
/// composite timeline.
///
/// For N scene durations and transition duration `t`, returns N-1
/// offsets where `offset[i] = sum(durations[0..=i]) - t * (i + 1)`,
/// i.e. the moment scene i+1 starts blending into the tail of the
/// running composite. Offsets are clamped at zero; configurations that
/// would actually go negative are rejected by request validation
/// before this is ever rendered.
pub fn transition_offsets(durations: &[f64], transition: f64) -> Vec<f64> {
    let mut offsets = Vec::with_capacity(durations.len().saturating_sub(1));
    let mut elapsed = 0.0;
    for (i, d) in durations
        .iter()
        .enumerate()
        .take(durations.len().saturating_sub(1))
    {
        elapsed += d;
        let offset = elapsed - transition * (i as f64 + 1.0);
        offsets.push(offset.max(0.0));
    }
    offsets
}

/// Total output duration in seconds.
///
/// With transitions, each of the N-1 blends borrows its duration from
/// the timeline rather than adding to it; without, the output is the
/// plain sum.
pub fn total_duration(durations: &[f64], transition: Option<f64>) -> f64 {
    let sum: f64 = durations.iter().sum();
    match transition {
        Some(t) if durations.len() > 1 => {
            (sum - t * (durations.len() as f64 - 1.0)).max(0.0)
        }
        _ => sum,
    }
}
