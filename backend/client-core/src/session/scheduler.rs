//! The paced per-frame processing loop.

use crate::config::SessionConfig;
use crate::ipc::{CommandEvent, IpcClient};
use crate::session::capability::{Detector, FrameSource, MediaOpener};
use crate::session::pacing::{Pacer, effective_fps, frame_timestamp_ms, should_analyze};

use models::{Command, StartCommand};

use std::fmt::{Display, Formatter, Result as FmtResult};

use log::{debug, error, info, warn};

/// Why a session stopped running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The supervisor sent `stop`.
    Stopped,
    /// The source ran out (non-looping, empty after rewind, or rewind failed).
    EndOfMedia,
    /// The channel dropped; no further commands will arrive.
    Disconnected,
    /// The media could not be opened; one empty message was sent.
    MediaUnavailable,
}

impl Display for SessionEnd {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let reason = match self {
            SessionEnd::Stopped => "stopped",
            SessionEnd::EndOfMedia => "end of media",
            SessionEnd::Disconnected => "disconnected",
            SessionEnd::MediaUnavailable => "media unavailable",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub frames_read: u64,
    pub frames_analyzed: u64,
    pub messages_sent: u64,
    pub loops_completed: u64,
    pub end: SessionEnd,
}

#[derive(Debug, Default)]
struct Counters {
    frames_read: u64,
    frames_analyzed: u64,
    messages_sent: u64,
    loops_completed: u64,
}

impl Counters {
    fn finish(self, end: SessionEnd) -> SessionReport {
        SessionReport {
            frames_read: self.frames_read,
            frames_analyzed: self.frames_analyzed,
            messages_sent: self.messages_sent,
            loops_completed: self.loops_completed,
            end,
        }
    }
}

/// Runs one session per `start` command.
#[derive(Debug, Clone)]
pub struct SessionScheduler {
    config: SessionConfig,
}

impl SessionScheduler {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Process `start` until Stop, end of media, or connection loss.
    ///
    /// Before every frame the channel is polled for a command, so a Stop is
    /// honored within one frame slot. Every analyzed frame produces exactly
    /// one message, empty or not.
    pub async fn run<O, D>(
        &self,
        client: &mut IpcClient,
        media: &mut O,
        detector: &mut D,
        start: &StartCommand,
    ) -> SessionReport
    where
        O: MediaOpener,
        D: Detector<<O::Source as FrameSource>::Frame>,
    {
        let mut counters = Counters::default();

        let mut source = match media.open(start) {
            Ok(source) => source,
            Err(e) => {
                error!("Cannot open video source '{}': {e}", start.video_path);
                let end = match client.send_detection(0, Vec::new()).await {
                    Ok(()) => {
                        counters.messages_sent += 1;
                        SessionEnd::MediaUnavailable
                    }
                    Err(e) => {
                        warn!("Failed to report unavailable media: {e}");
                        SessionEnd::Disconnected
                    }
                };
                return counters.finish(end);
            }
        };

        let fps = effective_fps(source.frame_rate(), start.fps, self.config.default_fps);
        let frame_interval = start.frame_interval_or(self.config.default_frame_interval);
        let mut pacer = Pacer::new(fps, self.config.realtime);

        info!(
            "Session started: {} @ {fps:.2} fps, every {frame_interval} frame(s), loop={}, realtime={}",
            start.video_path, start.loop_playback, self.config.realtime
        );

        // Index within the current pass; restarts at 0 after each rewind.
        let mut frame_index: u64 = 0;

        let end = loop {
            if !client.is_connected() {
                break SessionEnd::Disconnected;
            }

            match client.check_for_command().await {
                CommandEvent::Command(Command::Stop) => {
                    info!("Stop received during processing");
                    break SessionEnd::Stopped;
                }
                CommandEvent::Command(Command::Start(next)) => {
                    warn!(
                        "Ignoring start for '{}': a session is already running",
                        next.video_path
                    );
                }
                CommandEvent::Command(Command::Unknown { raw }) => {
                    warn!("Ignoring unknown command during processing: {raw}");
                }
                CommandEvent::NoCommand => {}
                CommandEvent::Disconnected => break SessionEnd::Disconnected,
            }

            let Some(frame) = source.next_frame() else {
                if !start.loop_playback {
                    break SessionEnd::EndOfMedia;
                }
                if frame_index == 0 {
                    warn!("Source '{}' has no frames, ending session", start.video_path);
                    break SessionEnd::EndOfMedia;
                }
                if let Err(e) = source.rewind() {
                    warn!("Cannot loop '{}': {e}", start.video_path);
                    break SessionEnd::EndOfMedia;
                }
                counters.loops_completed += 1;
                frame_index = 0;
                debug!("Rewound '{}' (loop {})", start.video_path, counters.loops_completed);
                continue;
            };

            counters.frames_read += 1;

            if should_analyze(frame_index, frame_interval) {
                let detections = detector.detect(&frame);
                let timestamp_ms = frame_timestamp_ms(source.position_ms(), frame_index, fps);
                counters.frames_analyzed += 1;

                match client.send_detection(timestamp_ms, detections).await {
                    Ok(()) => counters.messages_sent += 1,
                    Err(e) if e.is_disconnect() => {
                        error!("Failed to send detections, ending session: {e}");
                        break SessionEnd::Disconnected;
                    }
                    Err(e) => {
                        warn!("Skipping detections for frame {frame_index}: {e}");
                    }
                }
            }

            frame_index += 1;
            pacer.frame_done().await;
        };

        let report = counters.finish(end);
        info!(
            "Session ended ({}): {} frames read, {} analyzed, {} messages sent, {} loop(s)",
            report.end,
            report.frames_read,
            report.frames_analyzed,
            report.messages_sent,
            report.loops_completed
        );
        report
    }
}
