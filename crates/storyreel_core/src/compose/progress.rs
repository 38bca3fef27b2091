//! Progress reporting with a monotonic percentage clamp.

use parking_lot::Mutex;

use crate::models::{CompositionProgress, Stage};

/// Callback receiving progress records.
pub type ProgressCallback = Box<dyn Fn(CompositionProgress) + Send + Sync>;

/// Wraps a caller's progress callback and clamps the percentage to be
/// monotonically non-decreasing at the point of emission.
///
/// The underlying engine's progress callbacks are asynchronous and may
/// arrive repeated or out of order; the clamp guarantees the reported
/// percentage never moves backward within a run.
pub struct ProgressSink {
    callback: Option<ProgressCallback>,
    last_percent: Mutex<u8>,
}

impl ProgressSink {
    /// Create a sink forwarding to the given callback.
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            last_percent: Mutex::new(0),
        }
    }

    /// Create a sink that drops all records.
    pub fn noop() -> Self {
        Self {
            callback: None,
            last_percent: Mutex::new(0),
        }
    }

    /// Reset the clamp for a new run.
    pub fn reset(&self) {
        *self.last_percent.lock() = 0;
    }

    /// Emit a record for the given stage.
    pub fn emit(&self, stage: Stage, percent: u8, message: impl Into<String>) {
        self.emit_scene(stage, percent, message, None, None);
    }

    /// Emit a record carrying scene counters (used during staging).
    pub fn emit_scene(
        &self,
        stage: Stage,
        percent: u8,
        message: impl Into<String>,
        current_scene: Option<u32>,
        total_scenes: Option<u32>,
    ) {
        let clamped = {
            let mut last = self.last_percent.lock();
            let value = percent.min(100).max(*last);
            *last = value;
            value
        };
        if let Some(callback) = &self.callback {
            callback(CompositionProgress {
                stage,
                percent: clamped,
                message: message.into(),
                current_scene,
                total_scenes,
                emitted_at: chrono::Utc::now(),
            });
        }
    }
}
