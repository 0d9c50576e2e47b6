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


//! Echo Server Example
//!
//! This example demonstrates a command server that:
//! - Listens on port 4000
//! - Replies to `ECHO` frames with the same fields
//! - Logs client arrivals, departures and host details
//! - Notifies clients before shutting down on Ctrl+C
//!
//! ## Usage
//!
//! Run the server:
//! ```bash
//! RUST_LOG=debug cargo run --example echo_server
//! ```
//!
//! Connect with the demo client:
//! ```bash
//! cargo run --example command_client -- 127.0.0.1 4000
//! ```

use cmdwire_service::{CommandContext, CommandServer, Frame, ServerConfig, handler_fn};
use std::net::Ipv4Addr;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let server = CommandServer::new(ServerConfig::new(Ipv4Addr::LOCALHOST.into()));

    server.register_command(
        "ECHO",
        handler_fn(|ctx: CommandContext| async move {
            ctx.reply(&Frame::command("ECHO", ctx.args().to_vec())).await?;
            Ok(())
        }),
    )?;

    server.on_new_client_connected(|session| {
        println!("{} connected from {}", session.id(), session.peer_addr());
    });
    server.on_client_info(|session, info| {
        println!("{} runs {} as {}", session.id(), info.os_name, info.user_name);
    });
    server.on_client_disconnected(|session| {
        println!("{} disconnected", session.id());
    });
    server.on_execution_error(|error| {
        eprintln!("command failed: {error}");
    });

    let addr = server.start(4000).await?;
    println!("Echo server listening on {addr}");
    println!("Press Ctrl+C to stop the server\n");

    tokio::signal::ctrl_c().await?;
    println!("\nShutting down server...");
    server.stop().await;
    println!("Server stopped");

    Ok(())
}
