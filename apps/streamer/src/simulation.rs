//! Stand-in media and detector so the streamer can talk to a real supervisor
//! without a decoder or a model.
//!
//! Output is deterministic for a given seed and frame, which keeps runs
//! reproducible when comparing supervisor behavior.

use client_core::SESSION_DEFAULT_FPS;
use client_core::error::media::MediaError;
use client_core::session::{Detector, FPS_EPSILON, FrameSource, MediaOpener};

use common::ErrorLocation;
use models::{BoundingBox, RawDetection, StartCommand};

use std::panic::Location;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Clip length used when a start command carries no duration.
pub const DEFAULT_SYNTHETIC_FRAMES: u64 = 300;

pub const SIMULATED_CLASS: &str = "person";

/// Number of frames a synthetic clip of `duration_sec` at `fps` has.
pub fn synthetic_frame_count(duration_sec: f64, fps: f64) -> u64 {
    if !duration_sec.is_finite() || duration_sec <= 0.0 {
        return DEFAULT_SYNTHETIC_FRAMES;
    }
    let fps = if fps.is_finite() && fps > FPS_EPSILON {
        fps
    } else {
        SESSION_DEFAULT_FPS
    };
    (duration_sec * fps).round() as u64
}

/// One synthetic frame; only its position in the clip matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticFrame {
    pub index: u64,
}

/// Opens a [`SyntheticSource`] for any non-empty path.
#[derive(Debug, Default)]
pub struct SyntheticMedia;

impl MediaOpener for SyntheticMedia {
    type Source = SyntheticSource;

    fn open(&mut self, start: &StartCommand) -> Result<SyntheticSource, MediaError> {
        if start.video_path.trim().is_empty() {
            return Err(MediaError::Open {
                message: "video_path is empty".to_string(),
                location: ErrorLocation::from(Location::caller()),
                source: None,
            });
        }

        let frames = synthetic_frame_count(start.duration_sec, start.fps);
        info!(
            "Opened synthetic clip for '{}': {frames} frames",
            start.video_path
        );
        Ok(SyntheticSource::new(frames))
    }
}

/// Yields `frames` frames, then end of stream. Always rewindable.
#[derive(Debug)]
pub struct SyntheticSource {
    frames: u64,
    next: u64,
}

impl SyntheticSource {
    pub fn new(frames: u64) -> Self {
        Self { frames, next: 0 }
    }

    pub fn len(&self) -> u64 {
        self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }
}

impl FrameSource for SyntheticSource {
    type Frame = SyntheticFrame;

    fn next_frame(&mut self) -> Option<SyntheticFrame> {
        if self.next >= self.frames {
            return None;
        }
        let frame = SyntheticFrame { index: self.next };
        self.next += 1;
        Some(frame)
    }

    fn rewind(&mut self) -> Result<(), MediaError> {
        self.next = 0;
        Ok(())
    }
}

/// Pseudo-random detector: 0, 1 or 2 people per frame (30/50/20 %).
#[derive(Debug, Clone)]
pub struct SimulatedDetector {
    seed: u64,
    confidence_threshold: f64,
}

impl SimulatedDetector {
    pub fn new(seed: u64, confidence_threshold: f64) -> Self {
        Self {
            seed,
            confidence_threshold,
        }
    }

    fn detection_count(rng: &mut StdRng) -> usize {
        match rng.gen_range(0..100u32) {
            0..30 => 0,
            30..80 => 1,
            _ => 2,
        }
    }

    fn detection(rng: &mut StdRng) -> RawDetection {
        let bbox = BoundingBox::new(
            rng.gen_range(50..=500),
            rng.gen_range(50..=300),
            rng.gen_range(50..=200),
            rng.gen_range(100..=300),
        );
        RawDetection::new(SIMULATED_CLASS, rng.gen_range(0.6..0.99), bbox)
    }
}

impl Detector<SyntheticFrame> for SimulatedDetector {
    fn detect(&mut self, frame: &SyntheticFrame) -> Vec<RawDetection> {
        let mut rng = StdRng::seed_from_u64(self.seed ^ frame.index.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        let count = Self::detection_count(&mut rng);

        let detections: Vec<RawDetection> = (0..count)
            .map(|_| Self::detection(&mut rng))
            .filter(|d| d.confidence >= self.confidence_threshold)
            .collect();

        debug!(
            "Frame {}: {} simulated detection(s), {} above threshold",
            frame.index,
            count,
            detections.len()
        );
        detections
    }
}
