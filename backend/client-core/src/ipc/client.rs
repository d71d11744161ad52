//! Single entry point bundling transport, dispatch and emission.

use crate::config::IpcConfig;
use crate::error::ipc::IpcError;
use crate::ipc::channel::{ChannelConfig, ChannelManager};
use crate::ipc::connection_state::ConnectionState;
use crate::ipc::dispatcher::{CommandDispatcher, CommandEvent};
use crate::ipc::emitter::DetectionEmitter;

use models::RawDetection;

use std::time::Duration;

use serde_json::Value;

/// Connected client for the supervisor socket.
///
/// Owns the one [`ChannelManager`]; reads go through the dispatcher and
/// writes through the emitter, both borrowing the channel per call.
#[derive(Debug)]
pub struct IpcClient {
    channel: ChannelManager,
    dispatcher: CommandDispatcher,
    emitter: DetectionEmitter,
}

impl IpcClient {
    /// Unconnected client; call [`IpcClient::open`] before use.
    pub fn new(config: &IpcConfig) -> Self {
        Self {
            channel: ChannelManager::new(ChannelConfig::from(config)),
            dispatcher: CommandDispatcher::new(config.poll_timeout()),
            emitter: DetectionEmitter::new(),
        }
    }

    /// Create a client and connect it.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Timeout`] if the supervisor socket is not reachable
    /// within the connect timeout.
    pub async fn connect(config: &IpcConfig) -> Result<Self, IpcError> {
        let mut client = Self::new(config);
        client.open().await?;
        Ok(client)
    }

    /// Connect (or reconnect) the underlying channel.
    pub async fn open(&mut self) -> Result<(), IpcError> {
        self.channel.connect().await
    }

    pub async fn wait_for_command(&mut self, timeout: Option<Duration>) -> CommandEvent {
        self.dispatcher
            .wait_for_command(&mut self.channel, timeout)
            .await
    }

    pub async fn check_for_command(&mut self) -> CommandEvent {
        self.dispatcher.check_for_command(&mut self.channel).await
    }

    pub async fn send_detection(
        &mut self,
        timestamp_ms: u64,
        detections: Vec<RawDetection>,
    ) -> Result<(), IpcError> {
        self.emitter
            .send_detection(&mut self.channel, timestamp_ms, detections)
            .await
    }

    pub async fn send_raw(&mut self, value: &Value) -> Result<(), IpcError> {
        self.emitter.send_raw(&mut self.channel, value).await
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.channel.state()
    }

    pub fn messages_sent(&self) -> u64 {
        self.emitter.messages_sent()
    }

    pub fn commands_dispatched(&self) -> u64 {
        self.dispatcher.dispatched()
    }

    pub fn lines_discarded(&self) -> u64 {
        self.dispatcher.discarded()
    }

    pub fn close(&mut self) {
        self.channel.close();
    }
}
