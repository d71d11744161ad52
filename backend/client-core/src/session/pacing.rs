//! Frame-rate, stride and timestamp rules, plus the wall-clock pacer.

use crate::SESSION_DEFAULT_FPS;

use std::time::Duration;

use tokio::time::{Instant, sleep as TokioSleep};

/// Frame rates at or below this are treated as "unknown".
pub const FPS_EPSILON: f64 = 1e-3;

/// Pick the frame rate for a session: the source's own rate, else the
/// requested one, else `fallback`, else [`SESSION_DEFAULT_FPS`].
pub fn effective_fps(source_fps: Option<f64>, requested_fps: f64, fallback: f64) -> f64 {
    let usable = |fps: f64| fps.is_finite() && fps > FPS_EPSILON;

    match source_fps {
        Some(fps) if usable(fps) => fps,
        _ if usable(requested_fps) => requested_fps,
        _ if usable(fallback) => fallback,
        _ => SESSION_DEFAULT_FPS,
    }
}

/// Whether the frame at `frame_index` (0-based, within the current pass) is analyzed.
pub fn should_analyze(frame_index: u64, frame_interval: u32) -> bool {
    frame_index % u64::from(frame_interval.max(1)) == 0
}

/// Media timestamp for a frame.
///
/// Uses the source position when it rounds to a positive millisecond count,
/// otherwise derives it from the frame index.
pub fn frame_timestamp_ms(position_ms: Option<f64>, frame_index: u64, fps: f64) -> u64 {
    if let Some(position) = position_ms.filter(|p| p.is_finite()) {
        let rounded = position.round();
        if rounded > 0.0 {
            return rounded as u64;
        }
    }

    (frame_index as f64 / fps * 1000.0).round() as u64
}

/// How long to sleep so that `frames_done` frames take `frames_done / fps` seconds.
pub fn pacing_delay(frames_done: u64, fps: f64, elapsed: Duration) -> Option<Duration> {
    let target = Duration::try_from_secs_f64(frames_done as f64 / fps).ok()?;
    target.checked_sub(elapsed).filter(|d| !d.is_zero())
}

/// Holds a session to real time.
///
/// The schedule is anchored at session start and never re-anchored, so a
/// slow frame is made up by later ones instead of accumulating drift.
#[derive(Debug)]
pub struct Pacer {
    started: Instant,
    fps: f64,
    enabled: bool,
    frames_done: u64,
}

impl Pacer {
    pub fn new(fps: f64, enabled: bool) -> Self {
        Self {
            started: Instant::now(),
            fps,
            enabled,
            frames_done: 0,
        }
    }

    pub fn frames_done(&self) -> u64 {
        self.frames_done
    }

    /// Mark one frame done and sleep until its slot ends.
    pub async fn frame_done(&mut self) {
        self.frames_done += 1;
        if !self.enabled {
            return;
        }

        if let Some(delay) = pacing_delay(self.frames_done, self.fps, self.started.elapsed()) {
            TokioSleep(delay).await;
        }
    }
}
