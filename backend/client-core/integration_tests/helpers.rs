//! Test helpers for integration tests against a live Unix socket.
//!
//! - [`FakeSupervisor`]: listener bound inside a temp dir, speaks the line protocol
//! - [`ScriptedMedia`] / [`ScriptedSource`]: frame source with a fixed frame count,
//!   optionally reporting its own frame rate and playback position
//! - [`RecordingDetector`]: one fixed detection per frame, remembers what it saw

use client_core::config::{IpcConfig, SessionConfig};
use client_core::error::media::MediaError;
use client_core::session::{Detector, FrameSource, MediaOpener};

use common::ErrorLocation;
use models::{BoundingBox, RawDetection, StartCommand};

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::time::timeout;

/// Upper bound for any single wait in a test.
pub const TEST_WAIT: Duration = Duration::from_secs(5);

/// Socket path inside `dir`.
pub fn socket_path(dir: &TempDir) -> PathBuf {
    dir.path().join("sup.sock")
}

/// IPC config with short retry timings for tests.
pub fn test_ipc_config(path: &Path) -> IpcConfig {
    IpcConfig {
        socket_path: path.to_path_buf(),
        connect_timeout_secs: 2.0,
        retry_interval_secs: 0.05,
        ..IpcConfig::default()
    }
}

/// Session config without wall-clock pacing.
pub fn fast_session_config() -> SessionConfig {
    SessionConfig {
        realtime: false,
        ..SessionConfig::default()
    }
}

pub fn start_line(video_path: &str, fps: f64, frame_interval: u32, loop_playback: bool) -> String {
    serde_json::json!({
        "cmd": "start",
        "video_path": video_path,
        "duration_sec": 0,
        "fps": fps,
        "loop": loop_playback,
        "frame_interval": frame_interval,
    })
    .to_string()
}

// ============================================
// FAKE SUPERVISOR
// ============================================

pub struct FakeSupervisor {
    listener: UnixListener,
}

impl FakeSupervisor {
    pub fn bind(path: &Path) -> Self {
        let listener = UnixListener::bind(path).expect("Failed to bind test socket");
        Self { listener }
    }

    pub async fn accept(&self) -> SupervisorConn {
        let (stream, _) = timeout(TEST_WAIT, self.listener.accept())
            .await
            .expect("Client did not connect in time")
            .expect("Accept failed");
        SupervisorConn::new(stream)
    }
}

/// Supervisor side of one accepted connection.
pub struct SupervisorConn {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl SupervisorConn {
    fn new(stream: UnixStream) -> Self {
        let (read, write) = stream.into_split();
        Self {
            reader: BufReader::new(read),
            writer: write,
        }
    }

    /// Write `line` plus a newline.
    pub async fn send(&mut self, line: &str) {
        self.send_bytes(format!("{line}\n").as_bytes()).await;
    }

    pub async fn send_bytes(&mut self, bytes: &[u8]) {
        self.writer
            .write_all(bytes)
            .await
            .expect("Failed to write to client");
    }

    /// Next JSON line from the client, or `None` once the client closed.
    pub async fn recv(&mut self) -> Option<Value> {
        let mut line = String::new();
        let read = timeout(TEST_WAIT, self.reader.read_line(&mut line))
            .await
            .expect("Client sent nothing in time")
            .expect("Failed to read from client");

        if read == 0 {
            return None;
        }
        assert!(line.ends_with('\n'), "Every message must be newline-terminated");
        Some(serde_json::from_str(&line).expect("Client sent invalid JSON"))
    }

    /// Read until the client closes the connection.
    pub async fn recv_all(&mut self) -> Vec<Value> {
        let mut messages = Vec::new();
        while let Some(message) = self.recv().await {
            messages.push(message);
        }
        messages
    }
}

pub fn timestamps(messages: &[Value]) -> Vec<u64> {
    messages
        .iter()
        .map(|m| m["timestamp_ms"].as_u64().expect("timestamp_ms should be an integer"))
        .collect()
}

// ============================================
// SCRIPTED CAPABILITIES
// ============================================

#[derive(Debug, Default)]
pub struct ScriptedMedia {
    pub frames: u64,
    pub fps: Option<f64>,
    /// Source position advances by this much per frame when set.
    pub position_step_ms: Option<f64>,
    pub fail_open: bool,
    pub opened: Vec<String>,
}

impl ScriptedMedia {
    pub fn with_frames(frames: u64) -> Self {
        Self {
            frames,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }
}

impl MediaOpener for ScriptedMedia {
    type Source = ScriptedSource;

    fn open(&mut self, start: &StartCommand) -> Result<ScriptedSource, MediaError> {
        self.opened.push(start.video_path.clone());
        if self.fail_open {
            return Err(MediaError::Open {
                message: format!("cannot open {}", start.video_path),
                location: ErrorLocation::from(Location::caller()),
                source: None,
            });
        }
        Ok(ScriptedSource {
            frames: self.frames,
            next: 0,
            fps: self.fps,
            position_step_ms: self.position_step_ms,
        })
    }
}

/// Yields frame numbers `0..frames`.
pub struct ScriptedSource {
    frames: u64,
    next: u64,
    fps: Option<f64>,
    position_step_ms: Option<f64>,
}

impl FrameSource for ScriptedSource {
    type Frame = u64;

    fn next_frame(&mut self) -> Option<u64> {
        if self.next >= self.frames {
            return None;
        }
        let frame = self.next;
        self.next += 1;
        Some(frame)
    }

    fn position_ms(&self) -> Option<f64> {
        let step = self.position_step_ms?;
        Some(self.next.saturating_sub(1) as f64 * step)
    }

    fn frame_rate(&self) -> Option<f64> {
        self.fps
    }

    fn rewind(&mut self) -> Result<(), MediaError> {
        self.next = 0;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingDetector {
    pub seen: Vec<u64>,
}

impl Detector<u64> for RecordingDetector {
    fn detect(&mut self, frame: &u64) -> Vec<RawDetection> {
        self.seen.push(*frame);
        vec![RawDetection::new("person", 0.9, BoundingBox::new(10, 20, 30, 40))]
    }
}
