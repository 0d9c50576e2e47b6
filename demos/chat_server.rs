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


//! Chat Server Example
//!
//! Relays `SAY` frames to every other client and answers `WHO` with the list
//! of connected session ids. Clients are greeted with their id and told when
//! somebody joins or leaves.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --example chat_server
//! cargo run --example command_client -- 127.0.0.1 4001
//! ```

use cmdwire_service::{CommandContext, CommandServer, Frame, ServerConfig, handler_fn};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let server = Arc::new(CommandServer::new(
        ServerConfig::new(Ipv4Addr::LOCALHOST.into()).with_max_connections(Some(32)),
    ));

    server.register_command(
        "SAY",
        handler_fn(|ctx: CommandContext| async move {
            let from = ctx.session().id();
            let line = Frame::command("SAID", [from.to_string(), ctx.args().join(" ")]);
            let result = ctx.server().broadcast_except(from, &line).await;
            info!(from = %from, delivered = result.succeeded, "Relayed message");
            Ok(())
        }),
    )?;

    server.register_command(
        "WHO",
        handler_fn(|ctx: CommandContext| async move {
            let ids = ctx.server().session_ids().iter().map(ToString::to_string).collect::<Vec<_>>();
            ctx.reply(&Frame::command("USERS", ids)).await?;
            Ok(())
        }),
    )?;

    // Hooks run synchronously on server tasks, announcements are sent from their own task.
    // The hooks live inside the server, so they only hold a weak handle to it.
    let joined = Arc::downgrade(&server);
    server.on_new_client_connected(move |session| {
        let Some(server) = joined.upgrade() else {
            return;
        };
        let id = session.id();
        tokio::spawn(async move {
            server
                .broadcast_except(id, &Frame::command("JOINED", [id.to_string()]))
                .await;
        });
    });

    let left = Arc::downgrade(&server);
    server.on_client_disconnected(move |session| {
        let Some(server) = left.upgrade() else {
            return;
        };
        let id = session.id();
        tokio::spawn(async move {
            server.broadcast(&Frame::command("LEFT", [id.to_string()])).await;
        });
    });

    let addr = server.start(4001).await?;
    println!("Chat server listening on {addr}");

    tokio::signal::ctrl_c().await?;
    server.stop().await;
    println!("{}", server.snapshot());

    Ok(())
}
