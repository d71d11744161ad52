//! Turns inbound lines into commands.
//!
//! Malformed lines are logged and skipped; the wait continues until a valid
//! command arrives, the deadline passes, or the connection drops.

use crate::ipc::channel::{ChannelManager, Inbound};
use crate::ipc::frame_decoder::FrameDecoder;

use models::Command;

use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::Instant;

/// Longest slice of a rejected line echoed into the log.
const LOGGED_LINE_BYTES: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchState {
    #[default]
    WaitingForCommand,
    Dispatched,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandEvent {
    Command(Command),
    /// Deadline passed without a valid command.
    NoCommand,
    Disconnected,
}

#[derive(Debug)]
pub struct CommandDispatcher {
    poll_timeout: Duration,
    state: DispatchState,
    dispatched: u64,
    discarded: u64,
}

impl CommandDispatcher {
    pub fn new(poll_timeout: Duration) -> Self {
        Self {
            poll_timeout,
            state: DispatchState::WaitingForCommand,
            dispatched: 0,
            discarded: 0,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Commands handed out so far.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Inbound lines dropped as undecodable or oversized.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Block until a valid command arrives, `timeout` elapses, or the link drops.
    ///
    /// The timeout bounds the whole wait, including time spent skipping bad lines.
    pub async fn wait_for_command(
        &mut self,
        channel: &mut ChannelManager,
        timeout: Option<Duration>,
    ) -> CommandEvent {
        self.state = DispatchState::WaitingForCommand;
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            match channel.receive_line_until(deadline).await {
                Inbound::Line(line) => match FrameDecoder::decode(&line) {
                    Ok(command) => {
                        self.state = DispatchState::Dispatched;
                        self.dispatched += 1;
                        debug!("Dispatching {} command", command.name());
                        return CommandEvent::Command(command);
                    }
                    Err(e) => {
                        self.discarded += 1;
                        let shown = &line[..line.len().min(LOGGED_LINE_BYTES)];
                        warn!(
                            "Ignoring invalid command line {:?}: {e}",
                            String::from_utf8_lossy(shown)
                        );
                    }
                },
                Inbound::Rejected(e) => {
                    self.discarded += 1;
                    warn!("Ignoring inbound line: {e}");
                }
                Inbound::NoMessage => return CommandEvent::NoCommand,
                Inbound::Disconnected => {
                    info!("Connection lost while waiting for a command");
                    return CommandEvent::Disconnected;
                }
            }
        }
    }

    /// Non-blocking check used between frames; waits at most the poll timeout.
    pub async fn check_for_command(&mut self, channel: &mut ChannelManager) -> CommandEvent {
        let poll_timeout = self.poll_timeout;
        self.wait_for_command(channel, Some(poll_timeout)).await
    }
}
