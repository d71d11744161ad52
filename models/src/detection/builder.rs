use crate::detection::{Detection, DetectionMessage, MessageKind, RawDetection, round_confidence};
use crate::error::model_error::ModelError;
use crate::ErrorLocation;

use std::cmp::Ordering;
use std::panic::Location;

/// Builder for wire-ready [`DetectionMessage`] instances.
///
/// Takes detector output in any order and produces the canonical message:
/// detections sorted by descending confidence, ids assigned as dense
/// 1-based sequence numbers, confidences clamped to `[0, 1]` and rounded
/// to three decimals.
#[derive(Debug, Default)]
pub struct DetectionMessageBuilder {
    timestamp_ms: Option<u64>,
    detections: Vec<RawDetection>,
}

impl DetectionMessageBuilder {
    pub fn with_timestamp_ms(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }

    pub fn with_detection(mut self, detection: RawDetection) -> Self {
        self.detections.push(detection);
        self
    }

    pub fn with_detections(mut self, detections: impl IntoIterator<Item = RawDetection>) -> Self {
        self.detections.extend(detections);
        self
    }

    /// Build the message with validation.
    #[track_caller]
    pub fn build(self) -> Result<DetectionMessage, ModelError> {
        let timestamp_ms = self.timestamp_ms.ok_or_else(|| ModelError::Validation {
            message: String::from("Timestamp is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let mut detections = self.detections;

        for (index, detection) in detections.iter().enumerate() {
            if !detection.confidence.is_finite() {
                return Err(ModelError::Validation {
                    message: format!(
                        "Detection {index} has non-finite confidence: {}",
                        detection.confidence
                    ),
                    location: ErrorLocation::from(Location::caller()),
                });
            }

            if detection.class.is_empty() {
                return Err(ModelError::Validation {
                    message: format!("Detection {index} has an empty class"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }

        // Stable: equal confidences keep detector order.
        detections.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
        });

        let detections = detections
            .into_iter()
            .enumerate()
            .map(|(index, raw)| Detection {
                id: (index + 1).to_string(),
                class: raw.class,
                confidence: round_confidence(raw.confidence.clamp(0.0, 1.0)),
                bbox: raw.bbox,
            })
            .collect();

        Ok(DetectionMessage {
            kind: MessageKind::TargetDetection,
            timestamp_ms,
            detections,
        })
    }
}
