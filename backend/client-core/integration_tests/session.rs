use crate::helpers::{
    FakeSupervisor, RecordingDetector, ScriptedMedia, TEST_WAIT, fast_session_config,
    socket_path, start_line, test_ipc_config, timestamps,
};

use client_core::config::SessionConfig;
use client_core::ipc::{CommandEvent, IpcClient};
use client_core::session::{SessionEnd, SessionReport, SessionScheduler};

use models::Command;

use std::time::{Duration, Instant};

use serde_json::json;
use tempfile::TempDir;
use tokio::spawn as TokioSpawn;

/// Wait for the supervisor's start command and run one session for it.
async fn run_next_session(
    client: &mut IpcClient,
    scheduler: &SessionScheduler,
    media: &mut ScriptedMedia,
    detector: &mut RecordingDetector,
) -> SessionReport {
    let event = client.wait_for_command(Some(TEST_WAIT)).await;
    let CommandEvent::Command(Command::Start(start)) = event.clone() else {
        panic!("Expected start, got {event:?}");
    };
    scheduler.run(client, media, detector, &start).await
}

/// **VALUE**: End-to-end check of stride and timestamps on a short clip.
///
/// **WHY THIS MATTERS**: This is the canonical supervisor scenario: 4 frames at
/// 10 fps, analyze every 2nd, no loop. Exactly two messages must come back,
/// stamped at 0 and 200 ms.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The stride is applied off by one (frames 1 and 3 instead of 0 and 2)
/// - Timestamps use the analyzed-frame count instead of the frame index
/// - The session keeps going after end of media
#[tokio::test]
async fn given_four_frame_clip_when_stride_two_then_two_messages_at_0_and_200() {
    // GIVEN: A supervisor that sends the start and collects all output
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = socket_path(&dir);
    let supervisor = FakeSupervisor::bind(&path);
    let peer = TokioSpawn(async move {
        let mut conn = supervisor.accept().await;
        conn.send(r#"{"cmd":"start","video_path":"a.mp4","fps":10,"frame_interval":2,"loop":false}"#)
            .await;
        conn.recv_all().await
    });
    let mut client = IpcClient::connect(&test_ipc_config(&path))
        .await
        .expect("Should connect");
    let scheduler = SessionScheduler::new(fast_session_config());
    let mut media = ScriptedMedia::with_frames(4);
    let mut detector = RecordingDetector::default();

    // WHEN: Running the session
    let report = run_next_session(&mut client, &scheduler, &mut media, &mut detector).await;
    client.close();

    // THEN: Two messages, frames 0 and 2, timestamps 0 and 200
    let messages = peer.await.expect("Supervisor task panicked");
    assert_eq!(timestamps(&messages), vec![0, 200]);
    assert_eq!(detector.seen, vec![0, 2]);
    assert_eq!(report.end, SessionEnd::EndOfMedia);
    assert_eq!(report.frames_read, 4);
    assert_eq!(report.frames_analyzed, 2);
    assert_eq!(report.messages_sent, 2);
    assert_eq!(messages[0]["detections"][0]["id"], "1");
}

/// **VALUE**: Verifies that the source's own frame rate wins over the start command's.
///
/// **WHY THIS MATTERS**: The supervisor's `fps` is a hint. Timestamps must follow
/// the media, or overlays drift against the video.
///
/// **BUG THIS CATCHES**: Would catch if the scheduler stamped frames with the
/// requested rate (0/100/200) when the source reports 20 fps.
#[tokio::test]
async fn given_source_reports_20_fps_when_start_asks_10_then_timestamps_follow_source() {
    // GIVEN: A 3-frame source at 20 fps and a start requesting 10 fps
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = socket_path(&dir);
    let supervisor = FakeSupervisor::bind(&path);
    let peer = TokioSpawn(async move {
        let mut conn = supervisor.accept().await;
        conn.send(&start_line("native.mp4", 10.0, 1, false)).await;
        conn.recv_all().await
    });
    let mut client = IpcClient::connect(&test_ipc_config(&path))
        .await
        .expect("Should connect");
    let scheduler = SessionScheduler::new(fast_session_config());
    let mut media = ScriptedMedia {
        fps: Some(20.0),
        ..ScriptedMedia::with_frames(3)
    };
    let mut detector = RecordingDetector::default();

    // WHEN: Running the session
    let report = run_next_session(&mut client, &scheduler, &mut media, &mut detector).await;
    client.close();

    // THEN: 50 ms per frame
    let messages = peer.await.expect("Supervisor task panicked");
    assert_eq!(timestamps(&messages), vec![0, 50, 100]);
    assert_eq!(report.end, SessionEnd::EndOfMedia);
}

/// **VALUE**: Verifies that a reported playback position overrides the index timestamp.
///
/// **WHY THIS MATTERS**: Variable-frame-rate media only has correct times in its
/// position. The index-based value is the fallback, used while the position is 0.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The position is ignored (timestamps 0/100/200 at 10 fps)
/// - A zero position is trusted instead of falling back to the index
#[tokio::test]
async fn given_source_reports_position_when_running_then_timestamps_use_position() {
    // GIVEN: A source whose position advances 33 ms per frame, start at 10 fps
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = socket_path(&dir);
    let supervisor = FakeSupervisor::bind(&path);
    let peer = TokioSpawn(async move {
        let mut conn = supervisor.accept().await;
        conn.send(&start_line("vfr.mp4", 10.0, 1, false)).await;
        conn.recv_all().await
    });
    let mut client = IpcClient::connect(&test_ipc_config(&path))
        .await
        .expect("Should connect");
    let scheduler = SessionScheduler::new(fast_session_config());
    let mut media = ScriptedMedia {
        position_step_ms: Some(33.0),
        ..ScriptedMedia::with_frames(3)
    };
    let mut detector = RecordingDetector::default();

    // WHEN: Running the session
    let report = run_next_session(&mut client, &scheduler, &mut media, &mut detector).await;
    client.close();

    // THEN: Position-based stamps after the first frame
    let messages = peer.await.expect("Supervisor task panicked");
    assert_eq!(timestamps(&messages), vec![0, 33, 66]);
    assert_eq!(report.messages_sent, 3);
}

/// **VALUE**: Verifies real-time pacing: 10 frames at 10 fps take at least 0.9 s.
///
/// **WHY THIS MATTERS**: The supervisor overlays detections on live video. A client
/// that runs ahead of the clock produces timestamps the video has not reached.
#[tokio::test]
async fn given_realtime_session_when_ten_frames_at_ten_fps_then_takes_at_least_900ms() {
    // GIVEN: Pacing enabled
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = socket_path(&dir);
    let supervisor = FakeSupervisor::bind(&path);
    let peer = TokioSpawn(async move {
        let mut conn = supervisor.accept().await;
        conn.send(&start_line("paced.mp4", 10.0, 1, false)).await;
        conn.recv_all().await
    });
    let mut client = IpcClient::connect(&test_ipc_config(&path))
        .await
        .expect("Should connect");
    let scheduler = SessionScheduler::new(SessionConfig {
        realtime: true,
        ..SessionConfig::default()
    });
    let mut media = ScriptedMedia::with_frames(10);
    let mut detector = RecordingDetector::default();

    // WHEN: Running the whole clip
    let started = Instant::now();
    let report = run_next_session(&mut client, &scheduler, &mut media, &mut detector).await;
    let elapsed = started.elapsed();
    client.close();

    // THEN: Not faster than real time
    assert!(elapsed >= Duration::from_millis(900), "Session took only {elapsed:?}");
    assert_eq!(report.messages_sent, 10);
    assert_eq!(report.end, SessionEnd::EndOfMedia);
    let messages = peer.await.expect("Supervisor task panicked");
    assert_eq!(timestamps(&messages).last(), Some(&900));
}

/// **VALUE**: Verifies that Stop ends a running session within about one frame slot.
///
/// **WHY THIS MATTERS**: Operators stop sessions to switch sources. A client that
/// only notices Stop at end of media would keep streaming stale detections.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The in-session poll is skipped or blocks for long
/// - Stop is consumed but not acted on
#[tokio::test]
async fn given_running_session_when_stop_sent_then_ends_within_one_frame() {
    // GIVEN: A paced, looping session at 20 fps (50ms slots)
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = socket_path(&dir);
    let supervisor = FakeSupervisor::bind(&path);
    let peer = TokioSpawn(async move {
        let mut conn = supervisor.accept().await;
        conn.send(&start_line("loop.mp4", 20.0, 1, true)).await;
        for _ in 0..3 {
            conn.recv().await.expect("Expected a detection before stop");
        }
        let stop_sent = Instant::now();
        conn.send(r#"{"cmd":"stop"}"#).await;
        conn.recv_all().await;
        stop_sent.elapsed()
    });
    let mut client = IpcClient::connect(&test_ipc_config(&path))
        .await
        .expect("Should connect");
    let scheduler = SessionScheduler::new(SessionConfig {
        realtime: true,
        ..SessionConfig::default()
    });
    let mut media = ScriptedMedia::with_frames(5);
    let mut detector = RecordingDetector::default();

    // WHEN: The supervisor stops the session mid-stream
    let report = run_next_session(&mut client, &scheduler, &mut media, &mut detector).await;
    client.close();

    // THEN: Session reports Stopped and the client let go quickly
    assert_eq!(report.end, SessionEnd::Stopped);
    let latency = peer.await.expect("Supervisor task panicked");
    assert!(latency < Duration::from_millis(300), "Stop took {latency:?}");
}

/// **VALUE**: Verifies that looping restarts timestamps at 0 on every pass.
///
/// **WHY THIS MATTERS**: Timestamps are media positions. After a rewind the
/// supervisor expects them to follow the replayed video, not keep growing.
#[tokio::test]
async fn given_looping_three_frame_source_when_running_then_timestamps_restart() {
    // GIVEN: 3 frames, loop, every frame analyzed at 10 fps
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = socket_path(&dir);
    let supervisor = FakeSupervisor::bind(&path);
    let peer = TokioSpawn(async move {
        let mut conn = supervisor.accept().await;
        conn.send(&start_line("short.mp4", 10.0, 1, true)).await;
        let mut first = Vec::new();
        for _ in 0..7 {
            first.push(conn.recv().await.expect("Expected a detection"));
        }
        conn.send(r#"{"cmd":"stop"}"#).await;
        conn.recv_all().await;
        first
    });
    let mut client = IpcClient::connect(&test_ipc_config(&path))
        .await
        .expect("Should connect");
    let scheduler = SessionScheduler::new(fast_session_config());
    let mut media = ScriptedMedia::with_frames(3);
    let mut detector = RecordingDetector::default();

    // WHEN: Running until stopped
    let report = run_next_session(&mut client, &scheduler, &mut media, &mut detector).await;
    client.close();

    // THEN: 0,100,200 repeating
    let first = peer.await.expect("Supervisor task panicked");
    assert_eq!(timestamps(&first), vec![0, 100, 200, 0, 100, 200, 0]);
    assert!(report.loops_completed >= 2, "Report: {report:?}");
    assert_eq!(report.end, SessionEnd::Stopped);
}

/// **VALUE**: Verifies that an unopenable source yields exactly one empty message.
///
/// **WHY THIS MATTERS**: The supervisor waits for at least one reply per start.
/// A missing file must answer with an empty result rather than silence.
#[tokio::test]
async fn given_unopenable_media_when_started_then_single_empty_message() {
    // GIVEN: A media backend that refuses to open anything
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = socket_path(&dir);
    let supervisor = FakeSupervisor::bind(&path);
    let peer = TokioSpawn(async move {
        let mut conn = supervisor.accept().await;
        conn.send(&start_line("missing.mp4", 30.0, 5, false)).await;
        conn.recv_all().await
    });
    let mut client = IpcClient::connect(&test_ipc_config(&path))
        .await
        .expect("Should connect");
    let scheduler = SessionScheduler::new(fast_session_config());
    let mut media = ScriptedMedia::failing();
    let mut detector = RecordingDetector::default();

    // WHEN: Running the session
    let report = run_next_session(&mut client, &scheduler, &mut media, &mut detector).await;
    client.close();

    // THEN: One empty message at t=0, no frames
    let messages = peer.await.expect("Supervisor task panicked");
    assert_eq!(
        messages,
        vec![json!({"type": "target_detection", "timestamp_ms": 0, "detections": []})]
    );
    assert_eq!(report.end, SessionEnd::MediaUnavailable);
    assert_eq!(report.frames_read, 0);
    assert_eq!(report.messages_sent, 1);
    assert!(detector.seen.is_empty());
}

/// **VALUE**: Verifies that looping an empty source ends instead of spinning.
///
/// **BUG THIS CATCHES**: Would catch a rewind loop that never yields a frame and
/// never returns.
#[tokio::test]
async fn given_empty_looping_source_when_running_then_ends_as_end_of_media() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = socket_path(&dir);
    let supervisor = FakeSupervisor::bind(&path);
    let peer = TokioSpawn(async move {
        let mut conn = supervisor.accept().await;
        conn.send(&start_line("empty.mp4", 30.0, 1, true)).await;
        conn.recv_all().await
    });
    let mut client = IpcClient::connect(&test_ipc_config(&path))
        .await
        .expect("Should connect");
    let scheduler = SessionScheduler::new(fast_session_config());
    let mut media = ScriptedMedia::with_frames(0);
    let mut detector = RecordingDetector::default();

    let report = run_next_session(&mut client, &scheduler, &mut media, &mut detector).await;
    client.close();

    assert_eq!(report.end, SessionEnd::EndOfMedia);
    assert_eq!(report.loops_completed, 0);
    assert!(peer.await.expect("Supervisor task panicked").is_empty());
}

/// **VALUE**: Verifies that a second start and unknown commands do not disturb a session.
///
/// **WHY THIS MATTERS**: At most one session runs at a time. A duplicate start
/// must not reopen media or reset the running session.
#[tokio::test]
async fn given_running_session_when_start_and_unknown_arrive_then_ignored() {
    // GIVEN: A supervisor that interleaves noise before stopping
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = socket_path(&dir);
    let supervisor = FakeSupervisor::bind(&path);
    let peer = TokioSpawn(async move {
        let mut conn = supervisor.accept().await;
        conn.send(&start_line("first.mp4", 10.0, 1, true)).await;
        conn.recv().await.expect("Expected a detection");
        conn.send(&start_line("second.mp4", 10.0, 1, true)).await;
        conn.send(r#"{"cmd":"pause"}"#).await;
        for _ in 0..3 {
            conn.recv().await.expect("Session should keep streaming");
        }
        conn.send(r#"{"cmd":"stop"}"#).await;
        conn.recv_all().await
    });
    let mut client = IpcClient::connect(&test_ipc_config(&path))
        .await
        .expect("Should connect");
    let scheduler = SessionScheduler::new(fast_session_config());
    let mut media = ScriptedMedia::with_frames(3);
    let mut detector = RecordingDetector::default();

    // WHEN: Running until stopped
    let report = run_next_session(&mut client, &scheduler, &mut media, &mut detector).await;
    client.close();
    peer.await.expect("Supervisor task panicked");

    // THEN: Only the first source was opened, session ended on stop
    assert_eq!(media.opened, vec!["first.mp4".to_string()]);
    assert_eq!(report.end, SessionEnd::Stopped);
    assert_eq!(client.commands_dispatched(), 4);
}

/// **VALUE**: Verifies that losing the supervisor mid-session ends the session.
///
/// **BUG THIS CATCHES**: Would catch if send failures are retried forever or the
/// session keeps reading frames into a dead socket.
#[tokio::test]
async fn given_supervisor_gone_mid_session_when_running_then_ends_disconnected() {
    // GIVEN: A supervisor that hangs up after the first detection
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = socket_path(&dir);
    let supervisor = FakeSupervisor::bind(&path);
    let peer = TokioSpawn(async move {
        let mut conn = supervisor.accept().await;
        conn.send(&start_line("endless.mp4", 30.0, 1, true)).await;
        conn.recv().await.expect("Expected a detection");
        drop(conn);
    });
    let mut client = IpcClient::connect(&test_ipc_config(&path))
        .await
        .expect("Should connect");
    let scheduler = SessionScheduler::new(fast_session_config());
    let mut media = ScriptedMedia::with_frames(10);
    let mut detector = RecordingDetector::default();

    // WHEN: Running an endless looping session
    let report = tokio::time::timeout(
        TEST_WAIT,
        run_next_session(&mut client, &scheduler, &mut media, &mut detector),
    )
    .await
    .expect("Session should end once the supervisor is gone");
    peer.await.expect("Supervisor task panicked");

    // THEN: Ended as disconnected, channel closed
    assert_eq!(report.end, SessionEnd::Disconnected);
    assert!(!client.is_connected());
}
