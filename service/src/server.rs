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


//! Command server
//!
//! The [`CommandServer`] is the façade over the acceptor, the session
//! registry, the command registry and the lifecycle hooks. It is cheap to
//! clone; every clone drives the same server.

use crate::handler::Hooks;
use crate::manager::SessionRegistry;
use crate::executor::CommandExecutor;
use crate::worker::SessionReader;
use crate::{
    BroadcastResult, ClientInfo, ClientSession, CommandHandler, CommandRegistry, ExecutionError,
    Result, ServerConfig, ServerSnapshot, ServerState, ServiceError, SessionId,
};
use cmdwire_codec::{Frame, FrameCodec, ReservedCommand};
use metrics::counter;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Running accept loop and the signal that ends it
struct Acceptor {
    handle: JoinHandle<()>,
    shutdown: Arc<Notify>,
}

struct ServerInner {
    config: ServerConfig,
    codec: FrameCodec,
    commands: CommandRegistry,
    sessions: SessionRegistry,
    hooks: Arc<Hooks>,
    executor: CommandExecutor,
    state: AtomicU8,
    local_addr: Mutex<Option<SocketAddr>>,
    acceptor: tokio::sync::Mutex<Option<Acceptor>>,
}

/// TCP command dispatch server
///
/// # Example
///
/// ```no_run
/// use cmdwire_service::{CommandServer, ServerConfig, handler_fn};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = CommandServer::new(ServerConfig::default());
///     server.register_command("ECHO", handler_fn(|ctx| async move {
///         ctx.reply(ctx.frame()).await?;
///         Ok(())
///     }))?;
///
///     let addr = server.start(4000).await?;
///     println!("listening on {addr}");
///
///     // tokio::signal::ctrl_c().await?;
///     server.stop().await;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct CommandServer {
    inner: Arc<ServerInner>,
}

impl CommandServer {
    /// Create a stopped server
    pub fn new(config: ServerConfig) -> Self {
        let hooks = Arc::new(Hooks::default());
        Self {
            inner: Arc::new(ServerInner {
                codec: FrameCodec::with_format(config.field_format),
                config,
                commands: CommandRegistry::new(),
                sessions: SessionRegistry::new(),
                executor: CommandExecutor::new(hooks.clone()),
                hooks,
                state: AtomicU8::new(ServerState::Stopped.as_u8()),
                local_addr: Mutex::new(None),
                acceptor: tokio::sync::Mutex::new(None),
            }),
        }
    }

    /// Bind the configured interface on `port` and start accepting.
    ///
    /// Port 0 picks an ephemeral port; the bound address is returned and is
    /// also available from [`local_addr`](Self::local_addr).
    pub async fn start(&self, port: u16) -> Result<SocketAddr> {
        let inner = &self.inner;
        if inner
            .state
            .compare_exchange(
                ServerState::Stopped.as_u8(),
                ServerState::Starting.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            return Err(ServiceError::AlreadyRunning);
        }

        let address = inner.config.socket_addr(port);
        let bound = match TcpListener::bind(address).await {
            Ok(listener) => listener.local_addr().map(|local| (listener, local)),
            Err(e) => Err(e),
        };
        let (listener, local_addr) = match bound {
            Ok(bound) => bound,
            Err(source) => {
                self.set_state(ServerState::Stopped);
                warn!(address = %address, error = %source, "Failed to bind command server");
                return Err(ServiceError::Bind { address, source });
            }
        };

        // Held until the acceptor is stored so a concurrent stop waits for it
        let mut acceptor = inner.acceptor.lock().await;
        *inner
            .local_addr
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(local_addr);
        self.set_state(ServerState::Listening);

        let shutdown = Arc::new(Notify::new());
        let handle = tokio::spawn(self.clone().accept_loop(listener, shutdown.clone()));
        *acceptor = Some(Acceptor { handle, shutdown });

        info!(local_addr = %local_addr, "Command server listening");
        Ok(local_addr)
    }

    async fn accept_loop(self, listener: TcpListener, shutdown: Arc<Notify>) {
        loop {
            let accepted = tokio::select! {
                _ = shutdown.notified() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((socket, peer_addr)) => self.admit(socket, peer_addr).await,
                Err(e) => {
                    counter!("cmdwire.errors.accept").increment(1);
                    warn!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(self.inner.config.accept_error_backoff).await;
                }
            }
        }

        drop(listener);
        self.shutdown_sessions().await;
        info!("Accept loop terminated");
    }

    #[instrument(skip(self, socket))]
    async fn admit(&self, socket: TcpStream, peer_addr: SocketAddr) {
        let inner = &self.inner;
        if let Some(max) = inner.config.max_connections
            && inner.sessions.len() >= max
        {
            counter!("cmdwire.connections.rejected").increment(1);
            warn!(max, "Connection limit reached, rejecting connection");
            drop(socket);
            return;
        }

        let codec = inner.codec;
        let opened = inner
            .sessions
            .open_session(|id| ClientSession::open(id, socket, codec))
            .await;
        let (session, frames) = match opened {
            Ok(opened) => opened,
            Err(e) => {
                counter!("cmdwire.errors.setup").increment(1);
                warn!(error = %e, "Failed to set up session");
                return;
            }
        };
        let id = session.id();

        if inner.config.send_id_on_connect {
            let notify = Frame::command(ReservedCommand::NewClientId.code(), [id.as_u64().to_string()]);
            if let Err(e) = session.send(&notify).await {
                debug!(session_id = %id, error = %e, "Failed to send id notification");
            }
        }

        tokio::spawn(SessionReader::new(self.clone(), session.clone(), frames).run());
        info!(session_id = %id, "Client connected");
        inner.hooks.new_client_connected(&session);
    }

    /// Stop accepting and disconnect every session.
    ///
    /// When configured, every session first receives the disconnect
    /// notification. Calling `stop` on a server that is not listening does
    /// nothing.
    pub async fn stop(&self) {
        let inner = &self.inner;
        if inner
            .state
            .compare_exchange(
                ServerState::Listening.as_u8(),
                ServerState::Stopping.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            debug!(state = %self.state(), "Stop ignored, server not listening");
            return;
        }

        info!("Stopping command server");

        if inner.config.notify_clients_on_shutdown {
            let notify = Frame::new([ReservedCommand::DisconnectNotify.code()]);
            let result = inner
                .sessions
                .broadcast(&notify, None, inner.config.send_timeout)
                .await;
            debug!(
                total = result.total,
                failed = result.failed,
                "Sent shutdown notification"
            );
        }

        let acceptor = inner.acceptor.lock().await.take();
        if let Some(Acceptor { mut handle, shutdown }) = acceptor {
            shutdown.notify_one();
            if tokio::time::timeout(inner.config.shutdown_timeout, &mut handle)
                .await
                .is_err()
            {
                warn!("Accept loop did not stop in time, aborting");
                handle.abort();
            }
        }

        self.shutdown_sessions().await;
        *inner
            .local_addr
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.set_state(ServerState::Stopped);
        info!("Command server stopped");
    }

    async fn shutdown_sessions(&self) -> usize {
        let sessions = self.inner.sessions.disconnect_all().await;
        for session in &sessions {
            self.report_disconnected(session);
        }
        sessions.len()
    }

    /// Bind a handler to a command code
    pub fn register_command<H>(&self, code: impl Into<String>, handler: H) -> Result<()>
    where
        H: CommandHandler,
    {
        self.inner.commands.register(code, Arc::new(handler))
    }

    /// Registered command codes, sorted
    pub fn registered_commands(&self) -> Vec<String> {
        self.inner.commands.codes()
    }

    /// Write a frame to one session
    pub async fn send_to(&self, id: SessionId, frame: &Frame) -> Result<()> {
        let session = self
            .inner
            .sessions
            .get(id)
            .ok_or(ServiceError::SessionNotFound(id))?;
        session.send(frame).await
    }

    /// Write a frame to every session. Failures are counted, never raised.
    ///
    /// Each delivery is bounded by [`ServerConfig::send_timeout`].
    pub async fn broadcast(&self, frame: &Frame) -> BroadcastResult {
        self.inner
            .sessions
            .broadcast(frame, None, self.inner.config.send_timeout)
            .await
    }

    /// Write a frame to every session except `id`
    pub async fn broadcast_except(&self, id: SessionId, frame: &Frame) -> BroadcastResult {
        self.inner
            .sessions
            .broadcast(frame, Some(id), self.inner.config.send_timeout)
            .await
    }

    /// Disconnect one session
    pub async fn disconnect(&self, id: SessionId) -> Result<()> {
        let session = self
            .inner
            .sessions
            .remove(id)
            .ok_or(ServiceError::SessionNotFound(id))?;
        session.disconnect().await;
        self.report_disconnected(&session);
        Ok(())
    }

    /// Disconnect every session and restart the id sequence at 1.
    ///
    /// Returns the number of sessions disconnected.
    pub async fn disconnect_all(&self) -> usize {
        self.shutdown_sessions().await
    }

    /// Set the hook fired after a client has been accepted
    pub fn on_new_client_connected<F>(&self, hook: F)
    where
        F: Fn(&ClientSession) + Send + Sync + 'static,
    {
        self.inner.hooks.set_new_client_connected(Arc::new(hook));
    }

    /// Set the hook fired once when a client goes away
    pub fn on_client_disconnected<F>(&self, hook: F)
    where
        F: Fn(&ClientSession) + Send + Sync + 'static,
    {
        self.inner.hooks.set_client_disconnected(Arc::new(hook));
    }

    /// Set the hook fired when a client announces its host details
    pub fn on_client_info<F>(&self, hook: F)
    where
        F: Fn(&ClientSession, &ClientInfo) + Send + Sync + 'static,
    {
        self.inner.hooks.set_client_info(Arc::new(hook));
    }

    /// Set the hook fired for frames that could not be decoded
    pub fn on_frame_format_error<F>(&self, hook: F)
    where
        F: Fn(&ClientSession, &ServiceError) + Send + Sync + 'static,
    {
        self.inner.hooks.set_frame_format_error(Arc::new(hook));
    }

    /// Set the hook fired for transport errors that end a session
    pub fn on_io_error<F>(&self, hook: F)
    where
        F: Fn(&ClientSession, &ServiceError) + Send + Sync + 'static,
    {
        self.inner.hooks.set_io_error(Arc::new(hook));
    }

    /// Set the hook fired when a handler fails or panics
    pub fn on_execution_error<F>(&self, hook: F)
    where
        F: Fn(&ExecutionError) + Send + Sync + 'static,
    {
        self.inner.hooks.set_execution_error(Arc::new(hook));
    }

    /// Check if the server is accepting connections
    pub fn is_running(&self) -> bool {
        self.state() == ServerState::Listening
    }

    /// Current listener state
    pub fn state(&self) -> ServerState {
        ServerState::from_u8(self.inner.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: ServerState) {
        self.inner.state.store(state.as_u8(), Ordering::SeqCst);
    }

    /// Bound listening address while listening
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self
            .inner
            .local_addr
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a session
    pub fn session(&self, id: SessionId) -> Option<Arc<ClientSession>> {
        self.inner.sessions.get(id)
    }

    /// Ids of all registered sessions, sorted
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.inner.sessions.ids()
    }

    /// Number of registered sessions
    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }

    /// Visit every registered session
    pub fn for_each_session<F>(&self, action: F)
    where
        F: FnMut(&Arc<ClientSession>),
    {
        self.inner.sessions.for_each(action);
    }

    /// Get a snapshot of the server state
    pub fn snapshot(&self) -> ServerSnapshot {
        ServerSnapshot {
            state: self.state(),
            active_sessions: self.inner.sessions.len(),
            total_sessions: self.inner.sessions.total(),
            local_addr: self.local_addr(),
        }
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    pub(crate) fn codec(&self) -> &FrameCodec {
        &self.inner.codec
    }

    pub(crate) fn commands(&self) -> &CommandRegistry {
        &self.inner.commands
    }

    pub(crate) fn sessions(&self) -> &SessionRegistry {
        &self.inner.sessions
    }

    pub(crate) fn hooks(&self) -> &Hooks {
        &self.inner.hooks
    }

    pub(crate) fn executor(&self) -> &CommandExecutor {
        &self.inner.executor
    }

    /// Fire the disconnect hook, at most once per session
    pub(crate) fn report_disconnected(&self, session: &ClientSession) {
        if session.mark_disconnect_reported() {
            info!(session_id = %session.id(), "Client disconnected");
            self.inner.hooks.client_disconnected(session);
        }
    }
}

impl std::fmt::Debug for CommandServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandServer")
            .field("state", &self.state())
            .field("local_addr", &self.local_addr())
            .field("session_count", &self.session_count())
            .field("commands", &self.inner.commands)
            .finish()
    }
}
