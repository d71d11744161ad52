// Unit tests for the synthetic media and detector

use crate::simulation::{
    DEFAULT_SYNTHETIC_FRAMES, SIMULATED_CLASS, SimulatedDetector, SyntheticFrame, SyntheticMedia,
    synthetic_frame_count,
};

use client_core::error::media::MediaError;
use client_core::session::{Detector, FrameSource, MediaOpener};

use models::StartCommand;

fn start(video_path: &str, duration_sec: f64, fps: f64) -> StartCommand {
    StartCommand {
        video_path: video_path.to_string(),
        duration_sec,
        fps,
        loop_playback: false,
        frame_interval: None,
    }
}

/// **VALUE**: Verifies clip length follows duration and frame rate.
///
/// **BUG THIS CATCHES**: Would catch if a missing duration produced an empty clip,
/// or an unknown fps produced zero frames.
#[test]
fn given_duration_and_fps_when_sizing_clip_then_frame_count_matches() {
    assert_eq!(synthetic_frame_count(2.0, 10.0), 20);
    assert_eq!(synthetic_frame_count(1.5, 0.0), 45, "Unknown fps falls back to 30");
    assert_eq!(synthetic_frame_count(0.0, 25.0), DEFAULT_SYNTHETIC_FRAMES);
    assert_eq!(synthetic_frame_count(f64::NAN, 25.0), DEFAULT_SYNTHETIC_FRAMES);
}

/// **VALUE**: Verifies the empty-path rejection used to exercise the media failure path.
///
/// **WHY THIS MATTERS**: The supervisor expects a single empty message when media
/// cannot be opened; the simulator must be able to produce that case.
#[test]
fn given_empty_path_when_opening_then_open_error() {
    let mut media = SyntheticMedia;

    let result = media.open(&start("  ", 1.0, 10.0));

    assert!(matches!(result, Err(MediaError::Open { .. })));
}

/// **VALUE**: Verifies the synthetic source plays its frames in order and rewinds.
#[test]
fn given_synthetic_source_when_played_and_rewound_then_frames_repeat() {
    // GIVEN: A 3-frame clip
    let mut media = SyntheticMedia;
    let mut source = media.open(&start("sim.mp4", 0.3, 10.0)).expect("Should open");

    // WHEN: Playing to the end, rewinding, and reading again
    let first_pass: Vec<u64> = std::iter::from_fn(|| source.next_frame())
        .map(|f| f.index)
        .collect();
    source.rewind().expect("Should rewind");
    let after_rewind = source.next_frame();

    // THEN: 0,1,2 then back to 0; no position or rate reported
    assert_eq!(first_pass, vec![0, 1, 2]);
    assert_eq!(after_rewind, Some(SyntheticFrame { index: 0 }));
    assert_eq!(source.position_ms(), None);
    assert_eq!(source.frame_rate(), None);
}

/// **VALUE**: Verifies simulated detections are deterministic and within the documented ranges.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - More than two detections are produced per frame
/// - Boxes or confidences fall outside their ranges
/// - The same seed and frame give different output
#[test]
fn given_seeded_detector_when_detecting_then_deterministic_and_in_range() {
    // GIVEN: Two detectors with the same seed and no threshold
    let mut a = SimulatedDetector::new(42, 0.0);
    let mut b = SimulatedDetector::new(42, 0.0);
    let mut total = 0;

    for index in 0..200 {
        let frame = SyntheticFrame { index };

        // WHEN: Detecting on the same frame
        let first = a.detect(&frame);
        let second = b.detect(&frame);

        // THEN: Identical and bounded
        assert_eq!(first, second, "Frame {index} should be deterministic");
        assert!(first.len() <= 2, "At most two detections per frame");
        for d in &first {
            assert_eq!(d.class, SIMULATED_CLASS);
            assert!((0.6..0.99).contains(&d.confidence), "Confidence {}", d.confidence);
            assert!((50..=500).contains(&d.bbox.x));
            assert!((50..=300).contains(&d.bbox.y));
            assert!((50..=200).contains(&d.bbox.width));
            assert!((100..=300).contains(&d.bbox.height));
        }
        total += first.len();
    }

    // 200 frames averaging 0.9 detections each
    assert!(total > 100 && total < 260, "Unexpected detection volume: {total}");
}

/// **VALUE**: Verifies the confidence threshold filters simulated output.
#[test]
fn given_threshold_above_range_when_detecting_then_nothing_passes() {
    let mut detector = SimulatedDetector::new(7, 0.995);

    let any = (0..100).any(|index| !detector.detect(&SyntheticFrame { index }).is_empty());

    assert!(!any, "No simulated confidence reaches 0.995");
}
