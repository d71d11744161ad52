//! Unix-socket transport to the supervisor.
//!
//! [`ChannelManager`] owns at most one stream. It connects with a bounded,
//! constant-interval retry, reads with an optional deadline, writes one line
//! per message under a send timeout, and closes idempotently. Any transport
//! failure closes the channel; callers observe it as
//! [`Inbound::Disconnected`] or an error with [`IpcError::is_disconnect`].

use crate::config::IpcConfig;
use crate::error::ipc::IpcError;
use crate::ipc::connection_state::ConnectionState;
use crate::ipc::frame_decoder::{FrameDecoder, LINE_TERMINATOR};

use common::ErrorLocation;

use std::io::{Error as IoError, ErrorKind};
use std::os::unix::net::UnixStream as StdUnixStream;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use log::{debug, error, info, trace, warn};
use socket2::{Domain, SockAddr, Socket, Type};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::{Instant, sleep as TokioSleep, timeout as TokioTimeout, timeout_at};

/// Size of a single read from the socket.
pub const RECV_CHUNK_BYTES: usize = 4096;

/// Transport parameters, resolved from [`IpcConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    pub socket_path: PathBuf,
    pub connect_timeout: Duration,
    pub retry_interval: Duration,
    pub send_timeout: Duration,
    pub send_buffer_bytes: usize,
    pub max_message_bytes: usize,
}

impl From<&IpcConfig> for ChannelConfig {
    fn from(config: &IpcConfig) -> Self {
        Self {
            socket_path: config.socket_path.clone(),
            connect_timeout: config.connect_timeout(),
            retry_interval: config.retry_interval(),
            send_timeout: config.send_timeout(),
            send_buffer_bytes: config.send_buffer_bytes,
            max_message_bytes: config.max_message_bytes,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::from(&IpcConfig::default())
    }
}

/// Outcome of one receive attempt.
#[derive(Debug)]
pub enum Inbound {
    /// One complete line, terminator stripped.
    Line(Vec<u8>),
    /// A line was dropped by the framer; the channel is still usable.
    Rejected(IpcError),
    /// Nothing complete arrived before the deadline.
    NoMessage,
    /// Peer closed, read failed, or the channel was never connected.
    Disconnected,
}

#[derive(Debug)]
pub struct ChannelManager {
    config: ChannelConfig,
    state: ConnectionState,
    stream: Option<UnixStream>,
    decoder: FrameDecoder,
    read_buf: Vec<u8>,
}

impl ChannelManager {
    pub fn new(config: ChannelConfig) -> Self {
        let decoder = FrameDecoder::new(config.max_message_bytes);
        Self {
            config,
            state: ConnectionState::Disconnected,
            stream: None,
            decoder,
            read_buf: vec![0; RECV_CHUNK_BYTES],
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Connect to the supervisor socket, retrying until the connect timeout elapses.
    ///
    /// Attempts are spaced by `retry_interval`; a missing socket file and a
    /// refused connection are both treated as "supervisor not up yet". The
    /// total time spent is bounded by `connect_timeout + retry_interval`.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Timeout`] once the connect timeout elapses.
    pub async fn connect(&mut self) -> Result<(), IpcError> {
        if self.is_connected() {
            return Ok(());
        }

        self.state = ConnectionState::Connecting;
        self.decoder.clear();

        let retry = self.config.retry_interval;
        let connect_timeout = self.config.connect_timeout;
        let mut backoff = ExponentialBackoff {
            current_interval: retry,
            initial_interval: retry,
            randomization_factor: 0.0,
            multiplier: 1.0,
            max_interval: retry,
            max_elapsed_time: Some(connect_timeout),
            ..Default::default()
        };

        info!("Connecting to {}", self.config.socket_path.display());

        let mut attempts: u32 = 0;
        loop {
            attempts += 1;

            match open_stream(&self.config.socket_path, self.config.send_buffer_bytes) {
                Ok(stream) => {
                    self.stream = Some(stream);
                    self.state = ConnectionState::Connected;
                    info!(
                        "Connected to {} (attempt {attempts})",
                        self.config.socket_path.display()
                    );
                    return Ok(());
                }
                Err(e) => match e.kind() {
                    ErrorKind::NotFound => {
                        debug!("Socket not found, retrying in {retry:?}");
                    }
                    ErrorKind::ConnectionRefused | ErrorKind::WouldBlock => {
                        debug!("Connection refused, retrying in {retry:?}");
                    }
                    _ => {
                        warn!("Connection error: {e}, retrying in {retry:?}");
                    }
                },
            }

            match backoff.next_backoff() {
                Some(duration) => {
                    trace!("Connect attempt {attempts} failed, sleeping {duration:?}");
                    TokioSleep(duration).await;
                }
                None => {
                    self.state = ConnectionState::Disconnected;
                    error!(
                        "Failed to connect to {} within {connect_timeout:?}",
                        self.config.socket_path.display()
                    );
                    return Err(IpcError::Timeout {
                        message: format!(
                            "Could not connect to {} within {connect_timeout:?} ({attempts} attempts)",
                            self.config.socket_path.display()
                        ),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
            }
        }
    }

    /// Receive one complete line, waiting at most `timeout` (forever if `None`).
    pub async fn receive_line(&mut self, timeout: Option<Duration>) -> Inbound {
        let deadline = timeout.map(|t| Instant::now() + t);
        self.receive_line_until(deadline).await
    }

    /// Like [`ChannelManager::receive_line`] with an absolute deadline.
    pub async fn receive_line_until(&mut self, deadline: Option<Instant>) -> Inbound {
        loop {
            if let Some(next) = self.decoder.next_message() {
                return match next {
                    Ok(line) => Inbound::Line(line),
                    Err(e) => Inbound::Rejected(e),
                };
            }

            let Some(stream) = self.stream.as_mut() else {
                return Inbound::Disconnected;
            };

            let read = stream.read(&mut self.read_buf);
            let outcome = match deadline {
                Some(deadline) => match timeout_at(deadline, read).await {
                    Ok(outcome) => outcome,
                    Err(_) => return Inbound::NoMessage,
                },
                None => read.await,
            };

            match outcome {
                Ok(0) => {
                    info!("Supervisor closed the connection");
                    self.close();
                    return Inbound::Disconnected;
                }
                Ok(n) => {
                    self.decoder.feed(&self.read_buf[..n]);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    error!("Error receiving from supervisor: {e}");
                    self.close();
                    return Inbound::Disconnected;
                }
            }
        }
    }

    /// Write `payload` followed by a newline, as one write under the send timeout.
    ///
    /// # Errors
    ///
    /// - [`IpcError::NotConnected`] if the channel is closed
    /// - [`IpcError::Encode`] if `payload` contains a newline
    /// - [`IpcError::Send`] or [`IpcError::Timeout`] on transport failure; the
    ///   channel is closed before returning
    pub async fn send_line(&mut self, payload: &[u8]) -> Result<(), IpcError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(IpcError::NotConnected {
                message: "Cannot send: not connected to supervisor".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        };

        if payload.contains(&LINE_TERMINATOR) {
            return Err(IpcError::Encode {
                message: "Outbound payload contains a line terminator".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut framed = Vec::with_capacity(payload.len() + 1);
        framed.extend_from_slice(payload);
        framed.push(LINE_TERMINATOR);

        let send_timeout = self.config.send_timeout;
        let result = TokioTimeout(send_timeout, stream.write_all(&framed)).await;
        match result {
            Ok(Ok(())) => {
                trace!("Sent {} bytes", framed.len());
                Ok(())
            }
            Ok(Err(e)) => {
                error!("Error sending to supervisor: {e}");
                self.close();
                Err(IpcError::Send {
                    message: e.to_string(),
                    location: ErrorLocation::from(Location::caller()),
                })
            }
            Err(_) => {
                error!("Send timed out after {send_timeout:?}");
                self.close();
                Err(IpcError::Timeout {
                    message: format!("Send did not complete within {send_timeout:?}"),
                    location: ErrorLocation::from(Location::caller()),
                })
            }
        }
    }

    /// Release the socket. Safe to call any number of times.
    pub fn close(&mut self) {
        self.decoder.clear();
        self.state = ConnectionState::Disconnected;
        if self.stream.take().is_some() {
            info!("Closed connection to {}", self.config.socket_path.display());
        }
    }
}

impl Drop for ChannelManager {
    fn drop(&mut self) {
        self.close();
    }
}

/// One connection attempt. The socket is dropped (and its fd released) on any failure.
fn open_stream(path: &Path, send_buffer_bytes: usize) -> Result<UnixStream, IoError> {
    let address = SockAddr::unix(path)?;
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;

    if let Err(e) = socket.set_send_buffer_size(send_buffer_bytes) {
        warn!("Failed to set send buffer to {send_buffer_bytes} bytes: {e}");
    }

    // Non-blocking first: a full listen backlog fails fast instead of stalling the retry loop.
    socket.set_nonblocking(true)?;
    socket.connect(&address)?;

    UnixStream::from_std(StdUnixStream::from(socket))
}
