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


//! Command handler trait, dispatch context and lifecycle hooks

use crate::{
    ClientInfo, ClientSession, CommandServer, ExecutionError, HandlerResult, Result, ServiceError,
};
use async_trait::async_trait;
use cmdwire_codec::Frame;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

/// Logic bound to a command code
///
/// Handlers run on their own task, so a slow handler never stalls the session
/// reader that dispatched it. Errors returned here (and panics) are routed to
/// the server's execution error hook.
///
/// # Example
///
/// ```no_run
/// use cmdwire_service::{CommandContext, CommandHandler, HandlerResult};
/// use async_trait::async_trait;
///
/// struct Echo;
///
/// #[async_trait]
/// impl CommandHandler for Echo {
///     async fn handle(&self, ctx: CommandContext) -> HandlerResult {
///         ctx.reply(ctx.frame()).await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait CommandHandler: Send + Sync + 'static {
    /// Execute the command
    async fn handle(&self, ctx: CommandContext) -> HandlerResult;
}

/// Everything a handler gets to work with for one dispatched frame
#[derive(Clone)]
pub struct CommandContext {
    server: CommandServer,
    session: Arc<ClientSession>,
    frame: Frame,
}

impl CommandContext {
    pub(crate) fn new(server: CommandServer, session: Arc<ClientSession>, frame: Frame) -> Self {
        Self {
            server,
            session,
            frame,
        }
    }

    /// The server, for sending to other sessions or broadcasting
    pub fn server(&self) -> &CommandServer {
        &self.server
    }

    /// The session the frame came from
    pub fn session(&self) -> &Arc<ClientSession> {
        &self.session
    }

    /// The full decoded frame
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Command code of the frame
    pub fn code(&self) -> &str {
        self.frame.code()
    }

    /// Arguments following the command code
    pub fn args(&self) -> &[String] {
        self.frame.args()
    }

    /// Argument at `index`
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.frame.arg(index)
    }

    /// Write a frame back to the originating session
    pub async fn reply(&self, frame: &Frame) -> Result<()> {
        self.session.send(frame).await
    }
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("session_id", &self.session.id())
            .field("frame", &self.frame)
            .finish()
    }
}

/// Closure-based handler, see [`handler_fn`]
pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> CommandHandler for FnHandler<F>
where
    F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, ctx: CommandContext) -> HandlerResult {
        (self.f)(ctx).await
    }
}

/// Wrap an async closure as a [`CommandHandler`]
///
/// # Example
///
/// ```no_run
/// use cmdwire_service::{CommandServer, ServerConfig, handler_fn};
///
/// let server = CommandServer::new(ServerConfig::default());
/// server
///     .register_command("PING", handler_fn(|ctx| async move {
///         ctx.reply(&cmdwire_codec::Frame::command("PONG", Vec::<String>::new())).await?;
///         Ok(())
///     }))
///     .unwrap();
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    FnHandler { f }
}

type SessionHook = Arc<dyn Fn(&ClientSession) + Send + Sync + 'static>;
type ClientInfoHook = Arc<dyn Fn(&ClientSession, &ClientInfo) + Send + Sync + 'static>;
type SessionErrorHook = Arc<dyn Fn(&ClientSession, &ServiceError) + Send + Sync + 'static>;
type ExecutionHook = Arc<dyn Fn(&ExecutionError) + Send + Sync + 'static>;

/// Optional lifecycle callbacks, read at call time
#[derive(Default)]
pub(crate) struct Hooks {
    new_client_connected: RwLock<Option<SessionHook>>,
    client_disconnected: RwLock<Option<SessionHook>>,
    client_info: RwLock<Option<ClientInfoHook>>,
    frame_format_error: RwLock<Option<SessionErrorHook>>,
    io_error: RwLock<Option<SessionErrorHook>>,
    execution_error: RwLock<Option<ExecutionHook>>,
}

fn store<T>(slot: &RwLock<Option<T>>, hook: T) {
    *slot.write().unwrap_or_else(PoisonError::into_inner) = Some(hook);
}

fn load<T: Clone>(slot: &RwLock<Option<T>>) -> Option<T> {
    slot.read().unwrap_or_else(PoisonError::into_inner).clone()
}

impl Hooks {
    pub(crate) fn set_new_client_connected(&self, hook: SessionHook) {
        store(&self.new_client_connected, hook);
    }

    pub(crate) fn set_client_disconnected(&self, hook: SessionHook) {
        store(&self.client_disconnected, hook);
    }

    pub(crate) fn set_client_info(&self, hook: ClientInfoHook) {
        store(&self.client_info, hook);
    }

    pub(crate) fn set_frame_format_error(&self, hook: SessionErrorHook) {
        store(&self.frame_format_error, hook);
    }

    pub(crate) fn set_io_error(&self, hook: SessionErrorHook) {
        store(&self.io_error, hook);
    }

    pub(crate) fn set_execution_error(&self, hook: ExecutionHook) {
        store(&self.execution_error, hook);
    }

    pub(crate) fn new_client_connected(&self, session: &ClientSession) {
        if let Some(hook) = load(&self.new_client_connected) {
            hook(session);
        }
    }

    pub(crate) fn client_disconnected(&self, session: &ClientSession) {
        if let Some(hook) = load(&self.client_disconnected) {
            hook(session);
        }
    }

    pub(crate) fn client_info(&self, session: &ClientSession, info: &ClientInfo) {
        if let Some(hook) = load(&self.client_info) {
            hook(session, info);
        }
    }

    pub(crate) fn frame_format_error(&self, session: &ClientSession, error: &ServiceError) {
        if let Some(hook) = load(&self.frame_format_error) {
            hook(session, error);
        }
    }

    pub(crate) fn io_error(&self, session: &ClientSession, error: &ServiceError) {
        if let Some(hook) = load(&self.io_error) {
            hook(session, error);
        }
    }

    pub(crate) fn execution_error(&self, error: &ExecutionError) {
        if let Some(hook) = load(&self.execution_error) {
            hook(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_hooks_are_replaceable() {
        let hooks = Hooks::default();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = first.clone();
        hooks.set_execution_error(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let error = ExecutionError::Panicked {
            session_id: crate::SessionId::new(1),
            code: "X".to_string(),
            message: "boom".to_string(),
        };
        hooks.execution_error(&error);

        let counter = second.clone();
        hooks.set_execution_error(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        hooks.execution_error(&error);

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unset_hook_is_silent() {
        let hooks = Hooks::default();
        hooks.execution_error(&ExecutionError::Panicked {
            session_id: crate::SessionId::new(1),
            code: "X".to_string(),
            message: "boom".to_string(),
        });
    }
}
