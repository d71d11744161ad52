// Unit tests for frame-rate, stride, timestamp and pacing rules

use crate::SESSION_DEFAULT_FPS;
use crate::session::pacing::{effective_fps, frame_timestamp_ms, pacing_delay, should_analyze};

use std::time::Duration;

/// **VALUE**: Verifies the frame-rate precedence: source, then request, then default.
///
/// **WHY THIS MATTERS**: Timestamps and pacing both derive from this value. Picking
/// the wrong one makes every timestamp in the session drift.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - A source rate of 0 (unknown) is used as-is
/// - The requested rate overrides a known source rate
#[test]
fn given_rate_candidates_when_choosing_fps_then_first_usable_wins() {
    assert_eq!(effective_fps(Some(25.0), 10.0, 30.0), 25.0, "Source rate wins");
    assert_eq!(effective_fps(Some(0.0), 10.0, 30.0), 10.0, "Unknown source falls back to request");
    assert_eq!(effective_fps(None, 10.0, 30.0), 10.0);
    assert_eq!(effective_fps(None, 0.0, 30.0), 30.0, "Zero request falls back to default");
    assert_eq!(effective_fps(Some(f64::NAN), 0.0005, 12.0), 12.0);
    assert_eq!(
        effective_fps(None, 0.0, 0.0),
        SESSION_DEFAULT_FPS,
        "Unusable default falls back to the built-in rate"
    );
}

/// **VALUE**: Verifies that stride selects frames 0, N, 2N, ... and never divides by zero.
#[test]
fn given_frame_interval_when_checking_frames_then_every_nth_selected() {
    let selected: Vec<u64> = (0..10).filter(|&i| should_analyze(i, 3)).collect();
    assert_eq!(selected, vec![0, 3, 6, 9]);

    assert!((0..5).all(|i| should_analyze(i, 1)), "Interval 1 analyzes every frame");
    assert!((0..5).all(|i| should_analyze(i, 0)), "Interval 0 is treated as 1");
}

/// **VALUE**: Verifies timestamp fallback from source position to frame index.
///
/// **WHY THIS MATTERS**: Sources without position data (or reporting 0 on the first
/// frame) must still produce increasing timestamps.
///
/// **BUG THIS CATCHES**: Would catch if a sub-millisecond position masks the
/// index-derived timestamp, or rounding differs from nearest-millisecond.
#[test]
fn given_position_or_index_when_computing_timestamp_then_matches_rules() {
    assert_eq!(frame_timestamp_ms(Some(1234.4), 7, 30.0), 1234, "Position wins when positive");
    assert_eq!(frame_timestamp_ms(Some(0.4), 2, 10.0), 200, "Rounds to 0, so index is used");
    assert_eq!(frame_timestamp_ms(None, 0, 10.0), 0);
    assert_eq!(frame_timestamp_ms(None, 2, 10.0), 200);
    assert_eq!(frame_timestamp_ms(None, 1, 30.0), 33);
    assert_eq!(frame_timestamp_ms(None, 2, 30.0), 67);
}

/// **VALUE**: Verifies the pacing schedule is anchored at session start.
///
/// **BUG THIS CATCHES**: Would catch if the pacer sleeps a full period after a slow
/// frame instead of only the remainder, or sleeps when already behind.
#[test]
fn given_elapsed_time_when_computing_delay_then_only_remaining_slot_time() {
    // 2 frames at 4 fps should end at 500 ms
    assert_eq!(
        pacing_delay(2, 4.0, Duration::from_millis(100)),
        Some(Duration::from_millis(400))
    );
    assert_eq!(pacing_delay(2, 4.0, Duration::from_millis(500)), None, "On schedule");
    assert_eq!(pacing_delay(2, 4.0, Duration::from_millis(900)), None, "Behind: no sleep");
}
