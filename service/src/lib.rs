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


//! TCP Command Dispatch Server
//!
//! A single-listener socket server that accepts many concurrent clients, reads
//! length-prefixed, delimiter-separated command frames from each of them and
//! dispatches every frame to the handler registered for its command code.
//!
//! - One accept task, one reader task per session, one task per dispatched command
//! - Malformed frames are reported and skipped, the session stays open
//! - Handler errors and panics are isolated and reported through a hook
//! - Per-client identity, liveness and clock offset tracking
//! - Best-effort broadcast and an optional shutdown notification
//!
//! # Architecture
//!
//! ```text
//! CommandServer ── CommandRegistry
//!     ↓
//! SessionRegistry
//!     ↓
//! SessionReader → ClientSession
//!     ↓
//! CommandExecutor → CommandHandler
//! ```
//!
//! Handlers dispatched for the same session may complete out of order. A
//! handler that hangs keeps its task alive; there is no execution timeout.
//!
//! # Example
//!
//! ```no_run
//! use cmdwire_service::{CommandContext, CommandHandler, CommandServer, HandlerResult, ServerConfig};
//! use async_trait::async_trait;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl CommandHandler for Echo {
//!     async fn handle(&self, ctx: CommandContext) -> HandlerResult {
//!         ctx.reply(ctx.frame()).await?;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = CommandServer::new(ServerConfig::default());
//!     server.register_command("ECHO", Echo)?;
//!     server.on_client_disconnected(|session| println!("{} left", session.id()));
//!     server.start(4000).await?;
//!     Ok(())
//! }
//! ```

mod command;
mod config;
mod error;
mod executor;
mod handler;
mod manager;
mod server;
mod session;
mod types;
mod worker;

pub use command::CommandRegistry;
pub use config::ServerConfig;
pub use error::{ExecutionError, HandlerError, HandlerResult, Result, ServiceError};
pub use handler::{CommandContext, CommandHandler, FnHandler, handler_fn};
pub use manager::BroadcastResult;
pub use server::CommandServer;
pub use session::ClientSession;
pub use types::{ClientInfo, ClockOffset, ServerSnapshot, ServerState, SessionId, unix_millis_now};

pub use cmdwire_codec::{FieldFormat, Frame, FrameCodec, ReservedCommand};
