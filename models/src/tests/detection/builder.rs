use crate::{BoundingBox, DetectionMessageBuilder, MessageKind, ModelError, RawDetection};

fn raw(class: &str, confidence: f64) -> RawDetection {
    RawDetection::new(class, confidence, BoundingBox::new(10, 20, 30, 40))
}

/// **VALUE**: Verifies that detections are ordered by descending confidence with dense ids.
///
/// **WHY THIS MATTERS**: The supervisor treats `id: "1"` as the primary target.
/// If ordering or numbering breaks, the wrong object gets highlighted.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Sorting direction flips
/// - Ids are assigned before sorting
/// - Ids start at 0 or skip numbers
#[test]
fn given_unordered_detections_when_built_then_sorted_descending_with_dense_ids() {
    // GIVEN: Detections in detector order
    let builder = DetectionMessageBuilder::default()
        .with_timestamp_ms(400)
        .with_detections([raw("person", 0.55), raw("person", 0.91), raw("car", 0.72)]);

    // WHEN: Building
    let message = builder.build().expect("valid detections");

    // THEN: Sorted and numbered
    let summary: Vec<(&str, &str, f64)> = message
        .detections
        .iter()
        .map(|d| (d.id.as_str(), d.class.as_str(), d.confidence))
        .collect();
    assert_eq!(
        summary,
        vec![("1", "person", 0.91), ("2", "car", 0.72), ("3", "person", 0.55)]
    );
    assert_eq!(message.kind, MessageKind::TargetDetection);
    assert_eq!(message.timestamp_ms, 400);
}

/// **VALUE**: Verifies confidence rounding to three decimals and clamping into [0, 1].
///
/// **WHY THIS MATTERS**: Stable payload size and no floating-point noise across sends.
///
/// **BUG THIS CATCHES**: Would catch if rounding is dropped or applied with the wrong precision.
#[test]
fn given_noisy_confidences_when_built_then_rounded_and_clamped() {
    // GIVEN: Confidences with excess precision and out of range
    let builder = DetectionMessageBuilder::default()
        .with_timestamp_ms(0)
        .with_detection(raw("person", 0.856_749))
        .with_detection(raw("person", 1.2))
        .with_detection(raw("person", -0.3));

    // WHEN: Building
    let message = builder.build().expect("finite confidences");

    // THEN: Clamped and rounded
    let confidences: Vec<f64> = message.detections.iter().map(|d| d.confidence).collect();
    assert_eq!(confidences, vec![1.0, 0.857, 0.0]);
}

/// **VALUE**: Verifies that an empty batch still builds a message.
///
/// **WHY THIS MATTERS**: "Nothing seen" is a signal the supervisor relies on.
///
/// **BUG THIS CATCHES**: Would catch if empty batches were rejected.
#[test]
fn given_no_detections_when_built_then_message_has_empty_list() {
    // GIVEN: Timestamp only
    let builder = DetectionMessageBuilder::default().with_timestamp_ms(1200);

    // WHEN: Building
    let message = builder.build().expect("empty batch is valid");

    // THEN: Empty detections
    assert!(message.detections.is_empty());
    assert_eq!(message.timestamp_ms, 1200);
}

/// **VALUE**: Verifies that a missing timestamp is a validation error.
///
/// **WHY THIS MATTERS**: The supervisor aligns detections to video by timestamp.
///
/// **BUG THIS CATCHES**: Would catch if the builder defaulted the timestamp to 0.
#[test]
fn given_missing_timestamp_when_built_then_validation_error() {
    // GIVEN: No timestamp
    let builder = DetectionMessageBuilder::default().with_detection(raw("person", 0.9));

    // WHEN: Building
    let result = builder.build();

    // THEN: Validation error
    match result {
        Err(ModelError::Validation { message, .. }) => {
            assert_eq!(message, "Timestamp is required");
        }
        other => panic!("Expected validation error, got {other:?}"),
    }
}

/// **VALUE**: Verifies that NaN confidences are rejected rather than serialized.
///
/// **WHY THIS MATTERS**: `serde_json` encodes NaN as `null`, which the supervisor
/// cannot parse as a number.
///
/// **BUG THIS CATCHES**: Would catch if non-finite values slip through clamping.
#[test]
fn given_nan_confidence_when_built_then_validation_error() {
    // GIVEN: A NaN confidence
    let builder = DetectionMessageBuilder::default()
        .with_timestamp_ms(0)
        .with_detection(raw("person", f64::NAN));

    // WHEN: Building
    let result = builder.build();

    // THEN: Validation error
    assert!(matches!(result, Err(ModelError::Validation { .. })));
}

/// **VALUE**: Verifies that degenerate boxes are widened to one pixel.
///
/// **WHY THIS MATTERS**: The wire contract requires width and height of at least 1.
///
/// **BUG THIS CATCHES**: Would catch if `BoundingBox::new` stops clamping.
#[test]
fn given_zero_sized_box_when_constructed_then_clamped_to_one_pixel() {
    // GIVEN / WHEN: A zero-sized box
    let bbox = BoundingBox::new(5, 6, 0, 0);

    // THEN: Minimum size applies, origin untouched
    assert_eq!(bbox, BoundingBox { x: 5, y: 6, width: 1, height: 1 });
}
