use crate::helpers::{FakeSupervisor, TEST_WAIT, socket_path, test_ipc_config};

use client_core::config::IpcConfig;
use client_core::error::ipc::IpcError;
use client_core::ipc::{CommandEvent, ConnectionState, IpcClient};

use models::{BoundingBox, Command, RawDetection};

use std::time::{Duration, Instant};

use serde_json::json;
use tempfile::TempDir;
use tokio::spawn as TokioSpawn;
use tokio::time::sleep as TokioSleep;

/// **VALUE**: Verifies that connecting to an absent endpoint gives up within T + R.
///
/// **WHY THIS MATTERS**: The client is started alongside the supervisor. If the
/// supervisor never comes up the client must fail in bounded time, not hang.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The retry loop ignores the overall timeout
/// - A missing socket file is treated as fatal on the first attempt
/// - The state is left at `Connecting` after failure
#[tokio::test]
async fn given_no_supervisor_when_connecting_then_times_out_after_connect_timeout() {
    // GIVEN: A socket path nobody listens on
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = IpcConfig {
        socket_path: socket_path(&dir),
        connect_timeout_secs: 0.3,
        retry_interval_secs: 0.1,
        ..IpcConfig::default()
    };

    // WHEN: Connecting
    let started = Instant::now();
    let mut client = IpcClient::new(&config);
    let result = client.open().await;
    let elapsed = started.elapsed();

    // THEN: Timeout error, within T + R (plus scheduling slack)
    assert!(
        matches!(result, Err(IpcError::Timeout { .. })),
        "Should time out, got {result:?}"
    );
    assert!(
        elapsed < Duration::from_millis(300 + 100 + 250),
        "Connect took {elapsed:?}, limit was 400ms"
    );
    assert!(
        elapsed >= Duration::from_millis(100),
        "Should have retried at least once, took {elapsed:?}"
    );
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);
}

/// **VALUE**: Verifies that the client keeps retrying until the supervisor binds.
///
/// **WHY THIS MATTERS**: Start order between supervisor and client is not
/// guaranteed; the socket file may appear a moment after the client starts.
#[tokio::test]
async fn given_late_supervisor_when_connecting_then_connects_after_bind() {
    // GIVEN: A supervisor that binds 200ms from now
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = socket_path(&dir);
    let bind_path = path.clone();
    let supervisor = TokioSpawn(async move {
        TokioSleep(Duration::from_millis(200)).await;
        let supervisor = FakeSupervisor::bind(&bind_path);
        let mut conn = supervisor.accept().await;
        conn.recv().await
    });

    // WHEN: Connecting immediately
    let mut client = IpcClient::connect(&test_ipc_config(&path))
        .await
        .expect("Should connect once the socket appears");

    // THEN: Connected; closing lets the supervisor see EOF
    assert!(client.is_connected());
    assert_eq!(client.connection_state(), ConnectionState::Connected);
    client.close();
    let received = supervisor.await.expect("Supervisor task panicked");
    assert!(received.is_none(), "Supervisor should see a clean close");
}

/// **VALUE**: Verifies a full command/response exchange over the socket.
///
/// **WHY THIS MATTERS**: This is the whole protocol in miniature: a start command
/// in, a detection line out, in the exact wire shape the supervisor parses.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Start fields are lost in decoding (`loop`, `frame_interval`)
/// - Detection lines are not newline-terminated JSON
/// - `send_raw` does not reach the peer
#[tokio::test]
async fn given_connected_client_when_start_received_then_detections_reach_supervisor() {
    // GIVEN: A supervisor that sends one start and collects everything
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = socket_path(&dir);
    let supervisor = FakeSupervisor::bind(&path);
    let peer = TokioSpawn(async move {
        let mut conn = supervisor.accept().await;
        conn.send(r#"{"cmd":"start","video_path":"clip.mp4","duration_sec":2.5,"fps":15,"loop":true,"frame_interval":3}"#)
            .await;
        conn.recv_all().await
    });
    let mut client = IpcClient::connect(&test_ipc_config(&path))
        .await
        .expect("Should connect");

    // WHEN: Waiting for the command and answering it
    let event = client.wait_for_command(Some(TEST_WAIT)).await;
    let CommandEvent::Command(Command::Start(start)) = event.clone() else {
        panic!("Expected start, got {event:?}");
    };
    client
        .send_detection(
            40,
            vec![
                RawDetection::new("car", 0.5, BoundingBox::new(0, 0, 2, 2)),
                RawDetection::new("person", 0.87654, BoundingBox::new(1, 2, 3, 4)),
            ],
        )
        .await
        .expect("Should send detections");
    client
        .send_raw(&json!({"type": "status", "ok": true}))
        .await
        .expect("Should send raw value");
    client.close();

    // THEN: Start fields decoded, both lines arrived intact
    assert_eq!(start.video_path, "clip.mp4");
    assert_eq!(start.duration_sec, 2.5);
    assert_eq!(start.fps, 15.0);
    assert!(start.loop_playback);
    assert_eq!(start.frame_interval, Some(3));

    let messages = peer.await.expect("Supervisor task panicked");
    assert_eq!(messages.len(), 2, "Should receive detection and raw lines");
    assert_eq!(
        messages[0],
        json!({
            "type": "target_detection",
            "timestamp_ms": 40,
            "detections": [
                {"id": "1", "class": "person", "confidence": 0.877,
                 "bbox": {"x": 1, "y": 2, "width": 3, "height": 4}},
                {"id": "2", "class": "car", "confidence": 0.5,
                 "bbox": {"x": 0, "y": 0, "width": 2, "height": 2}}
            ]
        })
    );
    assert_eq!(messages[1], json!({"type": "status", "ok": true}));
    assert_eq!(client.messages_sent(), 1, "Raw values are not counted as detections");
}

/// **VALUE**: Verifies that garbage on the wire is skipped and the next command still arrives.
///
/// **BUG THIS CATCHES**: Would catch if a decode error ends the wait or drops the
/// command that shares its read.
#[tokio::test]
async fn given_garbage_before_command_when_waiting_then_command_still_dispatched() {
    // GIVEN: Garbage, a non-object, and a stop in one write
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = socket_path(&dir);
    let supervisor = FakeSupervisor::bind(&path);
    let peer = TokioSpawn(async move {
        let mut conn = supervisor.accept().await;
        conn.send_bytes(b"not json\n[1,2,3]\n{\"cmd\":\"stop\"}\n").await;
        conn.recv_all().await
    });
    let mut client = IpcClient::connect(&test_ipc_config(&path))
        .await
        .expect("Should connect");

    // WHEN: Waiting for a command
    let event = client.wait_for_command(Some(TEST_WAIT)).await;
    client.close();

    // THEN: Stop arrives, two lines counted as discarded
    assert_eq!(event, CommandEvent::Command(Command::Stop));
    assert_eq!(client.lines_discarded(), 2);
    assert_eq!(client.commands_dispatched(), 1);
    peer.await.expect("Supervisor task panicked");
}

/// **VALUE**: Verifies that a bounded wait with nothing on the wire returns `NoCommand`.
///
/// **WHY THIS MATTERS**: The in-session Stop poll relies on this returning promptly.
#[tokio::test]
async fn given_silent_supervisor_when_waiting_with_timeout_then_no_command() {
    // GIVEN: A supervisor that stays silent
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = socket_path(&dir);
    let supervisor = FakeSupervisor::bind(&path);
    let peer = TokioSpawn(async move {
        let mut conn = supervisor.accept().await;
        conn.recv_all().await
    });
    let mut client = IpcClient::connect(&test_ipc_config(&path))
        .await
        .expect("Should connect");

    // WHEN: Waiting 50ms, then polling
    let started = Instant::now();
    let waited = client.wait_for_command(Some(Duration::from_millis(50))).await;
    let elapsed = started.elapsed();
    let polled = client.check_for_command().await;

    // THEN: Both report no command, connection intact
    assert_eq!(waited, CommandEvent::NoCommand);
    assert_eq!(polled, CommandEvent::NoCommand);
    assert!(elapsed >= Duration::from_millis(45), "Returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(1), "Returned late: {elapsed:?}");
    assert!(client.is_connected());

    client.close();
    peer.await.expect("Supervisor task panicked");
}

/// **VALUE**: Verifies that a peer close is surfaced as `Disconnected` and sends fail cleanly.
///
/// **WHY THIS MATTERS**: When the supervisor exits, the client must stop rather
/// than spin on a dead socket.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - EOF is mistaken for "no message yet"
/// - Sending after disconnect panics instead of returning an error
/// - Close is not idempotent
#[tokio::test]
async fn given_supervisor_closes_when_waiting_then_disconnected() {
    // GIVEN: A supervisor that accepts and hangs up
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = socket_path(&dir);
    let supervisor = FakeSupervisor::bind(&path);
    let peer = TokioSpawn(async move {
        let conn = supervisor.accept().await;
        drop(conn);
    });
    let mut client = IpcClient::connect(&test_ipc_config(&path))
        .await
        .expect("Should connect");
    peer.await.expect("Supervisor task panicked");

    // WHEN: Waiting for a command
    let event = client.wait_for_command(Some(TEST_WAIT)).await;

    // THEN: Disconnected, and later operations fail without panicking
    assert_eq!(event, CommandEvent::Disconnected);
    assert!(!client.is_connected());

    let send = client.send_detection(0, Vec::new()).await;
    match send {
        Err(e @ IpcError::NotConnected { .. }) => assert!(e.is_disconnect()),
        other => panic!("Expected NotConnected, got {other:?}"),
    }

    client.close();
    client.close();
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);
}
