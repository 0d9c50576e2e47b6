//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//


//! Command client

use crate::{ClientConfig, ClientError, Result};
use cmdwire_codec::{Frame, FrameCodec, ReservedCommand};
use futures_util::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, instrument, trace, warn};

/// Host details a client announces after connecting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostInfo {
    /// Operating system name
    pub os_name: String,
    /// Operating system user name
    pub user_name: String,
    /// Current working directory
    pub working_dir: String,
    /// Home directory of the user
    pub home_dir: String,
}

impl HostInfo {
    /// Details of the running process
    pub fn current() -> Self {
        Self {
            os_name: std::env::consts::OS.to_string(),
            user_name: first_env(&["USER", "USERNAME"]),
            working_dir: std::env::current_dir()
                .map(|dir| dir.display().to_string())
                .unwrap_or_default(),
            home_dir: first_env(&["HOME", "USERPROFILE"]),
        }
    }

    /// The client info frame carrying these details
    pub fn to_frame(&self) -> Frame {
        Frame::command(
            ReservedCommand::ClientInfo.code(),
            [
                self.os_name.as_str(),
                self.user_name.as_str(),
                self.working_dir.as_str(),
                self.home_dir.as_str(),
            ],
        )
    }
}

fn first_env(names: &[&str]) -> String {
    names
        .iter()
        .find_map(|name| std::env::var(name).ok())
        .unwrap_or_default()
}

/// Milliseconds since the Unix epoch on the local clock
pub fn local_time_millis() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_millis() as i64,
        Err(e) => -(e.duration().as_millis() as i64),
    }
}

/// Whether the frame is the server's shutdown notification
pub fn is_server_shutdown(frame: &Frame) -> bool {
    frame.code() == ReservedCommand::DisconnectNotify.code()
}

/// A connection to a command server
///
/// Frames are read in arrival order. Frames skipped over by
/// [`wait_for_id`](Self::wait_for_id) are kept and returned by later reads.
pub struct CommandClient {
    config: ClientConfig,
    codec: FrameCodec,
    reader: FramedRead<OwnedReadHalf, FrameCodec>,
    writer: FramedWrite<OwnedWriteHalf, FrameCodec>,
    pending: VecDeque<Frame>,
    id: Option<u64>,
    peer_addr: SocketAddr,
}

impl CommandClient {
    /// Connect to the configured server, announcing host details if enabled
    #[instrument(skip(config), fields(address = %config.address()))]
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let address = config.address();
        debug!("Connecting");

        let stream = match timeout(config.connect_timeout, TcpStream::connect(&address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(ClientError::Connect { address, source }),
            Err(_) => return Err(ClientError::ConnectionTimeout),
        };
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr()?;
        info!(peer_addr = %peer_addr, "Connected");

        let codec = FrameCodec::with_format(config.field_format);
        let (read_half, write_half) = stream.into_split();
        let mut client = Self {
            codec,
            reader: FramedRead::new(read_half, codec),
            writer: FramedWrite::new(write_half, codec),
            pending: VecDeque::new(),
            id: None,
            peer_addr,
            config,
        };

        if client.config.announce {
            client.announce(&HostInfo::current()).await?;
        }
        Ok(client)
    }

    /// Send host details to the server
    pub async fn announce(&mut self, info: &HostInfo) -> Result<()> {
        self.send(&info.to_frame()).await
    }

    /// Write one frame
    pub async fn send(&mut self, frame: &Frame) -> Result<()> {
        trace!(command = %frame.code(), "Sending frame");
        SinkExt::<&Frame>::send(&mut self.writer, frame).await?;
        Ok(())
    }

    /// Write a frame built from a command code and its arguments
    pub async fn send_command<I, S>(&mut self, code: &str, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send(&Frame::command(code, args)).await
    }

    /// Next frame from the server, `None` once the server closed the connection.
    ///
    /// Waits at most the configured read timeout, if any.
    pub async fn next_frame(&mut self) -> Result<Option<Frame>> {
        match self.config.read_timeout {
            Some(limit) => self.recv_timeout(limit).await,
            None => match self.pending.pop_front() {
                Some(frame) => Ok(Some(frame)),
                None => self.read_frame().await,
            },
        }
    }

    /// Like [`next_frame`](Self::next_frame) with an explicit timeout
    pub async fn recv_timeout(&mut self, limit: Duration) -> Result<Option<Frame>> {
        if let Some(frame) = self.pending.pop_front() {
            return Ok(Some(frame));
        }
        timeout(limit, self.read_frame())
            .await
            .map_err(|_| ClientError::ReadTimeout)?
    }

    async fn read_frame(&mut self) -> Result<Option<Frame>> {
        let payload = match self.reader.next().await {
            Some(payload) => payload?,
            None => return Ok(None),
        };
        let frame = self.codec.parse(&payload)?;
        self.observe(&frame);
        Ok(Some(frame))
    }

    fn observe(&mut self, frame: &Frame) {
        if frame.code() != ReservedCommand::NewClientId.code() {
            return;
        }
        match frame.arg(0).map(str::parse::<u64>) {
            Some(Ok(id)) => {
                debug!(id, "Server assigned id");
                self.id = Some(id);
            }
            _ => warn!(frame = %frame, "Ignoring malformed id notification"),
        }
    }

    /// Read until the server's id notification arrives and return the id.
    ///
    /// Other frames read on the way are kept for later reads.
    pub async fn wait_for_id(&mut self) -> Result<u64> {
        while self.id.is_none() {
            let read = match self.config.read_timeout {
                Some(limit) => timeout(limit, self.read_frame())
                    .await
                    .map_err(|_| ClientError::ReadTimeout)?,
                None => self.read_frame().await,
            };
            match read? {
                Some(frame) if frame.code() == ReservedCommand::NewClientId.code() => {
                    if self.id.is_none() {
                        return Err(ClientError::Protocol(format!(
                            "invalid id notification: {frame}"
                        )));
                    }
                }
                Some(frame) => self.pending.push_back(frame),
                None => return Err(ClientError::ConnectionClosed),
            }
        }
        self.id.ok_or(ClientError::ConnectionClosed)
    }

    /// Id assigned by the server, once seen
    pub fn id(&self) -> Option<u64> {
        self.id
    }

    /// Address of the server
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Report the local wall clock to the server; returns the value sent
    pub async fn report_time(&mut self) -> Result<i64> {
        let now = local_time_millis();
        self.send_command(ReservedCommand::ClientTimeReport.code(), [now.to_string()])
            .await?;
        Ok(now)
    }

    /// Tell the server this client is leaving, then close the connection
    pub async fn close(mut self) -> Result<()> {
        let notify = Frame::new([ReservedCommand::ClientDisconnects.code()]);
        self.send(&notify).await?;
        SinkExt::<&Frame>::close(&mut self.writer).await?;
        info!(peer_addr = %self.peer_addr, "Disconnected");
        Ok(())
    }
}

impl std::fmt::Debug for CommandClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandClient")
            .field("peer_addr", &self.peer_addr)
            .field("id", &self.id)
            .field("pending", &self.pending.len())
            .finish()
    }
}
