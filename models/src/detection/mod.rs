//! Detection results streamed back to the supervisor.

pub mod builder;

use serde::{Deserialize, Serialize};

/// Axis-aligned box in source pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Width and height are clamped to at least one pixel.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width: width.max(1),
            height: height.max(1),
        }
    }
}

/// Detector output for one object, before ids and ordering are assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub class: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
}

impl RawDetection {
    pub fn new(class: impl Into<String>, confidence: f64, bbox: BoundingBox) -> Self {
        Self {
            class: class.into(),
            confidence,
            bbox,
        }
    }
}

/// One entry of a [`DetectionMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub id: String,
    pub class: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    #[serde(rename = "target_detection")]
    TargetDetection,
}

/// `{"type":"target_detection","timestamp_ms":..,"detections":[..]}`
///
/// Sent for every analyzed frame, including frames with no detections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub timestamp_ms: u64,
    pub detections: Vec<Detection>,
}

impl DetectionMessage {
    pub fn empty(timestamp_ms: u64) -> Self {
        Self {
            kind: MessageKind::TargetDetection,
            timestamp_ms,
            detections: Vec::new(),
        }
    }
}

/// Round to three decimal places.
pub fn round_confidence(confidence: f64) -> f64 {
    (confidence * 1000.0).round() / 1000.0
}
