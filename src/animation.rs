//! Animation timing as pure functions of `now`; callers pass the clock in.

use std::time::{Duration, Instant};

/// Placement tween from drop position to the target cell.
pub const PLACE_TWEEN: Duration = Duration::from_millis(140);
/// Lifetime of a `+N` score burst.
pub const BURST: Duration = Duration::from_millis(1200);
/// Rows a burst rises over its lifetime.
const BURST_RISE_ROWS: f32 = 3.0;
/// Fade of cleared cells to the board background.
pub const CLEAR_FLASH: Duration = Duration::from_millis(400);

/// Fraction of `duration` elapsed since `started`, clamped to 0..=1. Zero duration is complete.
pub fn progress(started: Instant, now: Instant, duration: Duration) -> f32 {
    if duration.is_zero() {
        return 1.0;
    }
    let elapsed = now.saturating_duration_since(started);
    (elapsed.as_secs_f32() / duration.as_secs_f32()).min(1.0)
}

pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Screen position (column, row) between `from` and `to` at eased fraction `t`.
pub fn lerp_point(from: (i32, i32), to: (i32, i32), t: f32) -> (i32, i32) {
    let lerp = |a: i32, b: i32| a + ((b - a) as f32 * t).round() as i32;
    (lerp(from.0, to.0), lerp(from.1, to.1))
}

/// Transient "points awarded" feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreBurst {
    pub amount: u32,
    /// Screen cell the points came from.
    pub origin: (i32, i32),
    pub started: Instant,
}

impl ScoreBurst {
    pub fn is_done(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started) >= BURST
    }

    /// Current label position: floats up from the origin.
    pub fn position(&self, now: Instant) -> (i32, i32) {
        let t = ease_out_cubic(progress(self.started, now, BURST));
        let rise = (t * BURST_RISE_ROWS).round() as i32;
        (self.origin.0, self.origin.1 - rise)
    }

    /// True in the last third of the lifetime, when the label is drawn dimmed.
    pub fn is_fading(&self, now: Instant) -> bool {
        progress(self.started, now, BURST) > 2.0 / 3.0
    }
}
