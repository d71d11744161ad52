use crate::helpers::{
    FakeSupervisor, RecordingDetector, ScriptedMedia, TEST_WAIT, fast_session_config,
    socket_path, start_line, test_ipc_config, timestamps,
};

use client_core::ipc::{ConnectionState, IpcClient};
use client_core::service::{ServeReport, serve};
use client_core::session::SessionScheduler;

use tempfile::TempDir;
use tokio::spawn as TokioSpawn;
use tokio::time::timeout;

/// **VALUE**: Verifies the idle loop: stray stop and unknown commands are ignored,
/// start runs a session, and supervisor exit ends serving.
///
/// **WHY THIS MATTERS**: This is the client's whole lifetime against one
/// supervisor. Any of these commands killing the loop would leave the supervisor
/// without a detector.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Stop while idle ends the loop
/// - An unknown command is fatal
/// - The loop does not return to waiting after a session
/// - The channel is left open on exit
#[tokio::test]
async fn given_mixed_commands_when_serving_then_one_session_and_clean_exit() {
    // GIVEN: stop, unknown, then a 4-frame start; hang up after its output
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = socket_path(&dir);
    let supervisor = FakeSupervisor::bind(&path);
    let peer = TokioSpawn(async move {
        let mut conn = supervisor.accept().await;
        conn.send(r#"{"cmd":"stop"}"#).await;
        conn.send(r#"{"cmd":"dance","speed":3}"#).await;
        conn.send(&start_line("clip.mp4", 10.0, 2, false)).await;
        let first = conn.recv().await.expect("Expected first detection");
        let second = conn.recv().await.expect("Expected second detection");
        vec![first, second]
    });
    let mut client = IpcClient::connect(&test_ipc_config(&path))
        .await
        .expect("Should connect");
    let scheduler = SessionScheduler::new(fast_session_config());
    let mut media = ScriptedMedia::with_frames(4);
    let mut detector = RecordingDetector::default();

    // WHEN: Serving until the supervisor goes away
    let report = timeout(
        TEST_WAIT,
        serve(&mut client, &scheduler, &mut media, &mut detector),
    )
    .await
    .expect("Serve should return after the supervisor hangs up");

    // THEN: One session, two messages, one unknown command, channel closed
    assert_eq!(
        report,
        ServeReport {
            sessions: 1,
            messages_sent: 2,
            unknown_commands: 1,
        }
    );
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    let messages = peer.await.expect("Supervisor task panicked");
    assert_eq!(timestamps(&messages), vec![0, 200]);
}

/// **VALUE**: Verifies that serving on a never-connected client returns immediately.
#[tokio::test]
async fn given_unconnected_client_when_serving_then_returns_empty_report() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut client = IpcClient::new(&test_ipc_config(&socket_path(&dir)));
    let scheduler = SessionScheduler::new(fast_session_config());
    let mut media = ScriptedMedia::with_frames(1);
    let mut detector = RecordingDetector::default();

    let report = serve(&mut client, &scheduler, &mut media, &mut detector).await;

    assert_eq!(report, ServeReport::default());
    assert!(media.opened.is_empty());
}
