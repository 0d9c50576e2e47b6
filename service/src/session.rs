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


//! Server-side state for one accepted client connection

use crate::{ClientInfo, ClockOffset, Result, ServiceError, SessionId, unix_millis_now};
use cmdwire_codec::{Frame, FrameCodec};
use futures_util::SinkExt;
use metrics::{counter, gauge, histogram};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace};

/// Inbound half of a session, owned by its reader task
pub(crate) type FrameStream = FramedRead<OwnedReadHalf, FrameCodec>;

/// A connected client
///
/// The session owns the outbound half of the socket. Writes from handlers,
/// broadcasts and the server are serialized through an async mutex so frames
/// are never interleaved on the wire. A pending write gives up as soon as the
/// session is disconnected, so a peer that stops reading cannot hold the
/// writer hostage.
pub struct ClientSession {
    // Metadata
    id: SessionId,
    peer_addr: SocketAddr,
    connected_at: Instant,

    // Liveness
    connected: AtomicBool,
    disconnect_reported: AtomicBool,
    closed: CancellationToken,

    // Outbound I/O, None once disconnected
    writer: tokio::sync::Mutex<Option<FramedWrite<OwnedWriteHalf, FrameCodec>>>,

    // Client-reported state
    clock_offset: Mutex<Option<ClockOffset>>,
    client_info: RwLock<Option<ClientInfo>>,

    frames_sent: AtomicU64,
    frames_received: AtomicU64,
}

impl ClientSession {
    /// Split an accepted socket into a session and its inbound frame stream.
    ///
    /// Fails with [`ServiceError::SessionSetup`] when the socket cannot be
    /// configured, in which case nothing has been registered yet.
    #[instrument(skip(socket, codec), fields(session_id = %id))]
    pub(crate) fn open(
        id: SessionId,
        socket: TcpStream,
        codec: FrameCodec,
    ) -> Result<(Arc<Self>, FrameStream)> {
        let peer_addr = socket.peer_addr().map_err(ServiceError::SessionSetup)?;
        socket.set_nodelay(true).map_err(ServiceError::SessionSetup)?;
        let (read_half, write_half) = socket.into_split();

        info!(peer_addr = %peer_addr, "Opening client session");

        counter!("cmdwire.connections.total").increment(1);
        gauge!("cmdwire.connections.active").increment(1.0);

        let session = Arc::new(Self {
            id,
            peer_addr,
            connected_at: Instant::now(),
            connected: AtomicBool::new(true),
            disconnect_reported: AtomicBool::new(false),
            closed: CancellationToken::new(),
            writer: tokio::sync::Mutex::new(Some(FramedWrite::new(write_half, codec))),
            clock_offset: Mutex::new(None),
            client_info: RwLock::new(None),
            frames_sent: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
        });

        Ok((session, FramedRead::new(read_half, codec)))
    }

    /// Session id
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Address of the peer as seen at accept time
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Address of the peer while connected
    pub fn remote_address(&self) -> Option<SocketAddr> {
        self.is_connected().then_some(self.peer_addr)
    }

    /// When the socket was accepted
    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    /// Whether the session is still usable
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Frames written to the client
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    /// Frames read from the client
    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    pub(crate) fn record_frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        counter!("cmdwire.frames.received").increment(1);
    }

    /// Write one frame to the client
    #[instrument(skip(self, frame), fields(session_id = %self.id, command = %frame.code()))]
    pub async fn send(&self, frame: &Frame) -> Result<()> {
        if !self.is_connected() {
            return Err(ServiceError::ConnectionClosed);
        }

        let mut writer = tokio::select! {
            _ = self.closed.cancelled() => return Err(ServiceError::ConnectionClosed),
            writer = self.writer.lock() => writer,
        };
        let Some(sink) = writer.as_mut() else {
            return Err(ServiceError::ConnectionClosed);
        };

        let start = Instant::now();
        let outcome = tokio::select! {
            _ = self.closed.cancelled() => {
                debug!("Send abandoned, session disconnected");
                return Err(ServiceError::ConnectionClosed);
            }
            outcome = SinkExt::<&Frame>::send(sink, frame) => outcome,
        };
        match outcome {
            Ok(()) => {
                self.frames_sent.fetch_add(1, Ordering::Relaxed);
                counter!("cmdwire.frames.sent").increment(1);
                histogram!("cmdwire.frame.send_duration").record(start.elapsed().as_secs_f64());
                trace!("Frame sent");
                Ok(())
            }
            Err(e) => {
                counter!("cmdwire.errors.send").increment(1);
                debug!(error = %e, "Failed to send frame");
                Err(e.into())
            }
        }
    }

    /// Close the session.
    ///
    /// Idempotent: returns `true` only for the call that actually closed it.
    /// Writes still in flight are abandoned and unsent bytes are dropped.
    /// Errors while closing the socket are swallowed.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn disconnect(&self) -> bool {
        if !self.connected.swap(false, Ordering::AcqRel) {
            return false;
        }
        self.closed.cancel();

        let writer = self.writer.lock().await.take();
        if let Some(writer) = writer
            && let Err(e) = writer.into_inner().shutdown().await
        {
            trace!(error = %e, "Ignoring error while closing socket");
        }

        gauge!("cmdwire.connections.active").decrement(1.0);
        info!(
            peer_addr = %self.peer_addr,
            sent = self.frames_sent(),
            received = self.frames_received(),
            "Client session closed"
        );
        true
    }

    /// Resolves once the session has been disconnected
    pub(crate) async fn closed(&self) {
        self.closed.cancelled().await;
    }

    /// Fold a client wall-clock report (ms since the Unix epoch) into the
    /// stored clock offset, measured against the server clock now.
    pub fn report_clock_offset(&self, client_millis: i64) -> ClockOffset {
        self.report_clock_offset_at(client_millis, unix_millis_now())
    }

    /// Same as [`report_clock_offset`](Self::report_clock_offset) with an
    /// explicit server time.
    ///
    /// The first report is stored verbatim, later ones go through
    /// [`ClockOffset::smooth`].
    pub fn report_clock_offset_at(&self, client_millis: i64, server_millis: i64) -> ClockOffset {
        let measured = ClockOffset::from_millis(server_millis.saturating_sub(client_millis));
        let mut slot = self
            .clock_offset
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let offset = match *slot {
            Some(current) => current.smooth(measured),
            None => measured,
        };
        *slot = Some(offset);
        debug!(session_id = %self.id, measured = %measured, offset = %offset, "Clock offset updated");
        offset
    }

    /// Current clock offset estimate, if the client ever reported its time
    pub fn clock_offset(&self) -> Option<ClockOffset> {
        *self
            .clock_offset
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Host details announced by the client
    pub fn client_info(&self) -> Option<ClientInfo> {
        self.client_info
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_client_info(&self, info: ClientInfo) {
        *self
            .client_info
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(info);
    }

    /// Claim the right to report this session as gone; true exactly once
    pub(crate) fn mark_disconnect_reported(&self) -> bool {
        !self.disconnect_reported.swap(true, Ordering::AcqRel)
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("connected", &self.is_connected())
            .field("clock_offset", &self.clock_offset())
            .finish()
    }
}
