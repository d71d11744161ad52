// Unit tests for detection message encoding

use crate::error::ipc::IpcError;
use crate::ipc::emitter::DetectionEmitter;

use models::{BoundingBox, DetectionMessage, RawDetection};

use serde_json::{Value, json};

/// **VALUE**: Verifies the exact wire object produced for one analyzed frame.
///
/// **WHY THIS MATTERS**: The supervisor parses these lines; a renamed key or an
/// unsorted list silently breaks target selection on the other side.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Detections are not sorted by descending confidence
/// - Ids are not dense 1-based strings
/// - Confidence is not rounded to three decimals
/// - The encoded line contains a newline
#[test]
fn given_unsorted_detections_when_encoded_then_canonical_compact_line() {
    // GIVEN: Detector output in arbitrary order with noisy confidences
    let detections = vec![
        RawDetection::new("car", 0.61234, BoundingBox::new(5, 6, 7, 8)),
        RawDetection::new("person", 0.98765, BoundingBox::new(1, 2, 3, 4)),
    ];

    // WHEN: Encoding
    let line = DetectionEmitter::encode(1234, detections).expect("Should encode");

    // THEN: Single compact line with the canonical content
    assert!(!line.contains(&b'\n'), "Encoded line must not contain a newline");
    let value: Value = serde_json::from_slice(&line).expect("Should be valid JSON");
    assert_eq!(
        value,
        json!({
            "type": "target_detection",
            "timestamp_ms": 1234,
            "detections": [
                {"id": "1", "class": "person", "confidence": 0.988,
                 "bbox": {"x": 1, "y": 2, "width": 3, "height": 4}},
                {"id": "2", "class": "car", "confidence": 0.612,
                 "bbox": {"x": 5, "y": 6, "width": 7, "height": 8}}
            ]
        })
    );
}

/// **VALUE**: Verifies that a frame with no detections still encodes a message.
///
/// **WHY THIS MATTERS**: The supervisor uses empty messages as a heartbeat that the
/// frame was processed.
#[test]
fn given_no_detections_when_encoded_then_empty_array_present() {
    let line = DetectionEmitter::encode(0, Vec::new()).expect("Should encode");
    let message: DetectionMessage = serde_json::from_slice(&line).expect("Should parse back");

    assert_eq!(message, DetectionMessage::empty(0));
}

/// **VALUE**: Verifies that invalid detector output is an encode error, not a panic.
///
/// **BUG THIS CATCHES**: Would catch if a NaN confidence reached the wire as `null`.
#[test]
fn given_nan_confidence_when_encoded_then_encode_error() {
    let detections = vec![RawDetection::new("person", f64::NAN, BoundingBox::new(0, 0, 1, 1))];

    let result = DetectionEmitter::encode(10, detections);

    match result {
        Err(e @ IpcError::Encode { .. }) => {
            assert!(!e.is_disconnect(), "Encode errors must not end the session");
        }
        other => panic!("Expected Encode error, got {other:?}"),
    }
}
