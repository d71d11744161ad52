//! Top-level command loop: wait for `start`, run the session, repeat.

use crate::ipc::{CommandEvent, IpcClient};
use crate::session::{Detector, FrameSource, MediaOpener, SessionScheduler};

use models::Command;

use log::{debug, info, warn};

/// Totals over the lifetime of one connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServeReport {
    pub sessions: u64,
    pub messages_sent: u64,
    pub unknown_commands: u64,
}

/// Serve commands until the supervisor goes away.
///
/// `stop` while idle and unrecognized commands are logged and ignored. The
/// channel is closed before returning.
pub async fn serve<O, D>(
    client: &mut IpcClient,
    scheduler: &SessionScheduler,
    media: &mut O,
    detector: &mut D,
) -> ServeReport
where
    O: MediaOpener,
    D: Detector<<O::Source as FrameSource>::Frame>,
{
    let mut report = ServeReport::default();
    info!("Waiting for commands");

    while client.is_connected() {
        match client.wait_for_command(None).await {
            CommandEvent::Command(Command::Start(start)) => {
                info!(
                    "Start: video_path='{}' duration_sec={} fps={} loop={} frame_interval={:?}",
                    start.video_path,
                    start.duration_sec,
                    start.fps,
                    start.loop_playback,
                    start.frame_interval
                );

                let session = scheduler.run(client, media, detector, &start).await;
                report.sessions += 1;
                report.messages_sent += session.messages_sent;
                info!(
                    "Session {} finished ({}), {} messages total",
                    report.sessions, session.end, report.messages_sent
                );
            }
            CommandEvent::Command(Command::Stop) => {
                info!("Stop received while idle, nothing to do");
            }
            CommandEvent::Command(Command::Unknown { raw }) => {
                report.unknown_commands += 1;
                warn!("Unknown command: {raw}");
            }
            CommandEvent::NoCommand => {
                debug!("Command wait returned without a command");
            }
            CommandEvent::Disconnected => break,
        }
    }

    client.close();
    info!(
        "Supervisor disconnected after {} session(s), {} messages sent",
        report.sessions, report.messages_sent
    );
    report
}
