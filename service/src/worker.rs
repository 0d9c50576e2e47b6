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


//! Session reader
//!
//! One reader task per session. It reads frames in arrival order, handles the
//! reserved protocol codes itself and hands everything else to the command
//! executor. A malformed frame is reported and skipped; it never ends the
//! session on its own.

use crate::session::FrameStream;
use crate::{ClientInfo, ClientSession, CommandContext, CommandServer, ServiceError};
use cmdwire_codec::{CodecError, Frame, ReservedCommand};
use futures_util::StreamExt;
use metrics::counter;
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::select;
use tracing::{debug, instrument, trace, warn};

/// Why a read loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadOutcome {
    /// The peer closed or reset the connection
    PeerClosed,
    /// A non-recoverable transport error
    Failed,
    /// The session was disconnected or the server stopped serving
    Stopped,
}

/// Drives the inbound half of one session
pub(crate) struct SessionReader {
    server: CommandServer,
    session: Arc<ClientSession>,
    frames: FrameStream,
}

impl SessionReader {
    pub(crate) fn new(server: CommandServer, session: Arc<ClientSession>, frames: FrameStream) -> Self {
        Self {
            server,
            session,
            frames,
        }
    }

    /// Run until the session ends, then tear it down
    #[instrument(skip(self), fields(session_id = %self.session.id()))]
    pub(crate) async fn run(mut self) {
        let outcome = self.read_loop().await;
        debug!(outcome = ?outcome, "Session reader finished");
        self.teardown().await;
    }

    async fn read_loop(&mut self) -> ReadOutcome {
        while self.server.state().is_serving() && self.session.is_connected() {
            let next = select! {
                _ = self.session.closed() => return ReadOutcome::Stopped,
                next = self.frames.next() => next,
            };

            match next {
                Some(Ok(payload)) => {
                    self.session.record_frame_received();
                    match self.server.codec().parse(&payload) {
                        Ok(frame) => self.dispatch(frame),
                        Err(e) => self.frame_format_error(ServiceError::Codec(e)),
                    }
                }
                None => return ReadOutcome::PeerClosed,
                Some(Err(CodecError::Io(e))) if is_peer_reset(e.kind()) => {
                    trace!(error = %e, "Peer reset connection");
                    return ReadOutcome::PeerClosed;
                }
                Some(Err(e)) if e.is_recoverable() => {
                    self.frame_format_error(ServiceError::Codec(e));
                }
                Some(Err(e)) => {
                    let error = ServiceError::Codec(e);
                    counter!("cmdwire.errors.read").increment(1);
                    warn!(error = %error, "Read failed, closing session");
                    self.server.hooks().io_error(&self.session, &error);
                    return ReadOutcome::Failed;
                }
            }
        }
        ReadOutcome::Stopped
    }

    fn dispatch(&self, frame: Frame) {
        let code = frame.code();
        if let Some(reserved) = ReservedCommand::from_code(code) {
            self.handle_reserved(reserved, &frame);
            return;
        }

        match self.server.commands().lookup(code) {
            Some(handler) => {
                trace!(command = %code, "Dispatching command");
                let ctx = CommandContext::new(self.server.clone(), self.session.clone(), frame);
                self.server.executor().execute(handler, ctx);
            }
            None => {
                counter!("cmdwire.commands.unknown").increment(1);
                trace!(command = %code, "Ignoring unregistered command");
            }
        }
    }

    fn handle_reserved(&self, reserved: ReservedCommand, frame: &Frame) {
        match reserved {
            ReservedCommand::ClientInfo => {
                let info = ClientInfo::from_args(frame.args());
                debug!(os = %info.os_name, user = %info.user_name, "Client identified");
                self.session.set_client_info(info.clone());
                self.server.hooks().client_info(&self.session, &info);
            }
            ReservedCommand::ClientDisconnects => {
                debug!("Client announced disconnect");
                self.server.report_disconnected(&self.session);
            }
            ReservedCommand::ClientTimeReport => {
                match frame.arg(0).map(|arg| arg.trim().parse::<i64>()) {
                    Some(Ok(client_millis)) => {
                        self.session.report_clock_offset(client_millis);
                    }
                    Some(Err(e)) => self.frame_format_error(ServiceError::MalformedArgument {
                        code: reserved.code().to_string(),
                        reason: e.to_string(),
                    }),
                    None => self.frame_format_error(ServiceError::MalformedArgument {
                        code: reserved.code().to_string(),
                        reason: "missing client time".to_string(),
                    }),
                }
            }
            ReservedCommand::NewClientId | ReservedCommand::DisconnectNotify => {
                trace!(command = %reserved, "Ignoring server-to-client command from client");
            }
        }
    }

    fn frame_format_error(&self, error: ServiceError) {
        counter!("cmdwire.frames.malformed").increment(1);
        debug!(error = %error, "Malformed frame");
        self.server.hooks().frame_format_error(&self.session, &error);
    }

    async fn teardown(&self) {
        self.server.sessions().remove_session(&self.session);
        self.session.disconnect().await;
        self.server.report_disconnected(&self.session);
    }
}

fn is_peer_reset(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof
    )
}
