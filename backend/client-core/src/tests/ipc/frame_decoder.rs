// Unit tests for newline framing and command decoding

use crate::error::ipc::IpcError;
use crate::ipc::frame_decoder::FrameDecoder;

use models::Command;

const STREAM: &[u8] = b"{\"cmd\":\"start\",\"video_path\":\"a.mp4\",\"fps\":10}\n{\"cmd\":\"stop\"}\n{\"cmd\":\"reboot\"}\n";

fn drain(decoder: &mut FrameDecoder) -> Vec<Result<Vec<u8>, IpcError>> {
    std::iter::from_fn(|| decoder.next_message()).collect()
}

fn drain_lines(decoder: &mut FrameDecoder) -> Vec<Vec<u8>> {
    drain(decoder)
        .into_iter()
        .map(|entry| entry.expect("Expected a complete line"))
        .collect()
}

/// **VALUE**: Verifies that the same byte stream yields the same lines however it is chunked.
///
/// **WHY THIS MATTERS**: The socket hands out reads of arbitrary size. A supervisor
/// burst may arrive as one read, or one byte at a time under load.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - A line split across two reads is emitted as two lines
/// - Several lines in one read collapse into one
/// - The terminator leaks into the emitted line
#[test]
fn given_any_chunking_when_fed_then_yields_identical_lines() {
    // GIVEN: The whole stream decoded in one feed
    let mut whole = FrameDecoder::new(64 * 1024);
    whole.feed(STREAM);
    let expected = drain_lines(&mut whole);
    assert_eq!(expected.len(), 3, "Should split three lines");

    for chunk_size in [1, 2, 3, 7, 16, 50, STREAM.len()] {
        // WHEN: Feeding the same stream in fixed-size chunks
        let mut decoder = FrameDecoder::new(64 * 1024);
        for chunk in STREAM.chunks(chunk_size) {
            decoder.feed(chunk);
        }

        // THEN: Lines match the single-feed result exactly
        assert_eq!(
            drain_lines(&mut decoder),
            expected,
            "Chunk size {chunk_size} should not change framing"
        );
        assert_eq!(decoder.buffered_bytes(), 0, "Nothing should remain buffered");
    }
}

/// **VALUE**: Verifies that an incomplete line is held until its terminator arrives.
///
/// **WHY THIS MATTERS**: A read that ends mid-command must not lose the first half.
///
/// **BUG THIS CATCHES**: Would catch if partial data is dropped between feeds.
#[test]
fn given_partial_line_when_completed_later_then_single_line_emitted() {
    // GIVEN: A decoder fed half a command
    let mut decoder = FrameDecoder::new(1024);
    let produced = decoder.feed(b"{\"cmd\":\"st");

    // THEN: Nothing is ready yet but the bytes are kept
    assert_eq!(produced, 0, "Partial line should not complete");
    assert_eq!(decoder.buffered_bytes(), 10, "Partial bytes should be retained");
    assert!(decoder.next_message().is_none(), "No message should be ready");

    // WHEN: The rest arrives
    let produced = decoder.feed(b"op\"}\n");

    // THEN: Exactly one full line comes out
    assert_eq!(produced, 1, "Completing the line should produce one message");
    assert_eq!(drain_lines(&mut decoder), vec![b"{\"cmd\":\"stop\"}".to_vec()]);
}

/// **VALUE**: Verifies that a malformed line between two valid ones does not disturb them.
///
/// **WHY THIS MATTERS**: One corrupted command from the supervisor must not cost the
/// client the commands after it.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - A decode failure clears the buffer
/// - Valid commands after a bad one are reordered or lost
#[test]
fn given_malformed_line_between_valid_ones_when_decoded_then_two_commands_in_order() {
    // GIVEN: valid, garbage, valid
    let mut decoder = FrameDecoder::new(1024);
    decoder.feed(b"{\"cmd\":\"start\",\"video_path\":\"a.mp4\"}\n{not json\n{\"cmd\":\"stop\"}\n");

    // WHEN: Decoding every line
    let decoded: Vec<_> = drain_lines(&mut decoder)
        .iter()
        .map(|line| FrameDecoder::decode(line))
        .collect();

    // THEN: Middle line fails, outer lines decode in order
    assert_eq!(decoded.len(), 3);
    assert!(matches!(decoded[0], Ok(Command::Start(_))), "First should be start");
    assert!(
        matches!(decoded[1], Err(IpcError::JsonDecode { .. })),
        "Garbage should be a decode error"
    );
    assert!(matches!(decoded[2], Ok(Command::Stop)), "Last should be stop");
}

/// **VALUE**: Verifies that a runaway unterminated line is dropped and reported once.
///
/// **WHY THIS MATTERS**: Without a bound, a peer that never sends a newline grows
/// the buffer until the process runs out of memory.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The buffer grows past the limit
/// - The rest of the oversized line is mistaken for a new command
/// - The line after the oversized one is lost
#[test]
fn given_unterminated_line_over_limit_when_fed_then_discarded_until_next_newline() {
    // GIVEN: A 16 byte limit and 20 bytes without a newline
    let mut decoder = FrameDecoder::new(16);
    decoder.feed(&[b'x'; 20]);

    // THEN: One frame error, nothing buffered
    let entries = drain(&mut decoder);
    assert_eq!(entries.len(), 1, "Oversize should be reported once");
    assert!(matches!(entries[0], Err(IpcError::Frame { .. })));
    assert_eq!(decoder.buffered_bytes(), 0, "Oversized bytes should be dropped");

    // WHEN: More of the same line, then its terminator and a valid command
    decoder.feed(&[b'x'; 40]);
    decoder.feed(b"tail\n{\"cmd\":\"stop\"}\n");

    // THEN: Only the command after the terminator survives
    assert_eq!(drain_lines(&mut decoder), vec![b"{\"cmd\":\"stop\"}".to_vec()]);
}

/// **VALUE**: Verifies that a complete line over the limit is rejected without losing neighbors.
///
/// **BUG THIS CATCHES**: Would catch if oversize checks only apply to partial tails.
#[test]
fn given_complete_line_over_limit_when_fed_then_rejected_and_following_line_kept() {
    // GIVEN: An oversized line and a valid one in the same chunk
    let mut decoder = FrameDecoder::new(16);
    let mut chunk = vec![b'y'; 30];
    chunk.extend_from_slice(b"\n{\"cmd\":\"stop\"}\n");

    // WHEN: Feeding it
    decoder.feed(&chunk);
    let entries = drain(&mut decoder);

    // THEN: Error first, then the valid line
    assert_eq!(entries.len(), 2);
    assert!(matches!(entries[0], Err(IpcError::Frame { .. })));
    assert_eq!(
        entries[1].as_ref().ok(),
        Some(&b"{\"cmd\":\"stop\"}".to_vec())
    );
}

/// **VALUE**: Verifies that JSON values other than objects are decode errors.
///
/// **BUG THIS CATCHES**: Would catch if `[1,2]` or `"stop"` were treated as commands.
#[test]
fn given_non_object_json_when_decoded_then_decode_error() {
    let lines: [&[u8]; 4] = [b"[1,2]", b"\"stop\"", b"42", b"null"];
    for line in lines {
        let result = FrameDecoder::decode(line);
        assert!(
            matches!(result, Err(IpcError::JsonDecode { .. })),
            "{:?} should not decode",
            String::from_utf8_lossy(line)
        );
    }
}

/// **VALUE**: Verifies that `clear()` drops both ready lines and the partial tail.
///
/// **WHY THIS MATTERS**: Close clears the decoder; stale bytes must not leak into
/// a later connection.
#[test]
fn given_buffered_data_when_cleared_then_decoder_is_empty() {
    // GIVEN: One ready line and a partial one
    let mut decoder = FrameDecoder::new(1024);
    decoder.feed(b"{\"cmd\":\"stop\"}\n{\"cmd\"");
    assert_eq!(decoder.pending(), 1);

    // WHEN: Clearing
    decoder.clear();

    // THEN: Nothing is left
    assert_eq!(decoder.pending(), 0);
    assert_eq!(decoder.buffered_bytes(), 0);
    assert!(decoder.next_message().is_none());
}
