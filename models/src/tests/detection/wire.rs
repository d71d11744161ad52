use crate::{BoundingBox, DetectionMessage, DetectionMessageBuilder, RawDetection};

use serde_json::{Value, json};

/// **VALUE**: Verifies the exact outbound wire shape the supervisor parses.
///
/// **WHY THIS MATTERS**: The supervisor looks up `type`, `timestamp_ms`, `detections`,
/// `class` and `bbox.width` by name. Any rename breaks the link silently.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - `kind` is serialized as `kind` instead of `type`
/// - The tag value changes from `target_detection`
/// - Bbox fields are serialized as floats
#[test]
fn given_detection_message_when_serialized_then_matches_wire_format() {
    // GIVEN: A message with one detection
    let message = DetectionMessageBuilder::default()
        .with_timestamp_ms(200)
        .with_detection(RawDetection::new(
            "HUMAN",
            0.85,
            BoundingBox::new(100, 50, 200, 400),
        ))
        .build()
        .expect("valid message");

    // WHEN: Serializing
    let value = serde_json::to_value(&message).expect("serializable");

    // THEN: Wire shape matches
    assert_eq!(
        value,
        json!({
            "type": "target_detection",
            "timestamp_ms": 200,
            "detections": [{
                "id": "1",
                "class": "HUMAN",
                "confidence": 0.85,
                "bbox": {"x": 100, "y": 50, "width": 200, "height": 400}
            }]
        })
    );
}

/// **VALUE**: Verifies that an empty message keeps `detections` as an empty array.
///
/// **WHY THIS MATTERS**: A missing key and an empty list mean different things to a parser.
///
/// **BUG THIS CATCHES**: Would catch if empty vectors were skipped during serialization.
#[test]
fn given_empty_message_when_serialized_then_detections_is_empty_array() {
    // GIVEN: Empty message
    let message = DetectionMessage::empty(0);

    // WHEN: Serializing
    let value = serde_json::to_value(&message).expect("serializable");

    // THEN: Empty array present
    assert_eq!(value["detections"], Value::Array(Vec::new()));
    assert_eq!(value["type"], "target_detection");
}

/// **VALUE**: Verifies decode on the peer side preserves count, confidences and boxes.
///
/// **WHY THIS MATTERS**: Confidence must survive at three decimals and bbox integers bit-exact.
///
/// **BUG THIS CATCHES**: Would catch precision loss from encoding or integer/float drift.
#[test]
fn given_encoded_message_when_decoded_by_peer_then_fields_are_preserved() {
    // GIVEN: A message with several detections
    let raws: Vec<RawDetection> = (0..5u32)
        .map(|i| {
            RawDetection::new(
                "person",
                0.5 + f64::from(i) * 0.0913,
                BoundingBox::new(i * 7, i * 11, 30 + i, 60 + i),
            )
        })
        .collect();
    let message = DetectionMessageBuilder::default()
        .with_timestamp_ms(3_600_000)
        .with_detections(raws)
        .build()
        .expect("valid message");

    // WHEN: Encoding and decoding
    let line = serde_json::to_string(&message).expect("serializable");
    let decoded: DetectionMessage = serde_json::from_str(&line).expect("peer can decode");

    // THEN: Identical
    assert_eq!(decoded, message);
    assert_eq!(decoded.detections.len(), 5);
    assert_eq!(decoded.detections[0].confidence, 0.865);
}
