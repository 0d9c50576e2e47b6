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


//! Shared helpers for the command server integration tests
#![allow(dead_code)]

use cmdwire_client::{ClientConfig, CommandClient};
use cmdwire_service::{CommandContext, CommandHandler, CommandServer, Frame, ServerConfig, handler_fn};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Upper bound for anything the tests wait on
pub const WAIT: Duration = Duration::from_secs(5);

/// Loopback server configuration with a short shutdown timeout
pub fn local_config() -> ServerConfig {
    ServerConfig::new(Ipv4Addr::LOCALHOST.into()).with_shutdown_timeout(Duration::from_secs(1))
}

/// Start the server on an ephemeral port and return the port
pub async fn start(server: &CommandServer) -> u16 {
    server.start(0).await.unwrap().port()
}

/// Client that does not announce host details
pub async fn connect(port: u16) -> CommandClient {
    CommandClient::connect(ClientConfig::new("127.0.0.1", port).with_announce(false))
        .await
        .unwrap()
}

/// Connect and wait for the server-assigned id
pub async fn connect_with_id(port: u16) -> (CommandClient, u64) {
    let mut client = connect(port).await;
    let id = tokio::time::timeout(WAIT, client.wait_for_id())
        .await
        .unwrap()
        .unwrap();
    (client, id)
}

/// Next frame, failing the test on timeout or close
pub async fn recv(client: &mut CommandClient) -> Frame {
    client
        .recv_timeout(WAIT)
        .await
        .unwrap()
        .expect("server closed the connection")
}

/// Handler replying with the frame it received
pub fn echo() -> impl CommandHandler {
    handler_fn(|ctx: CommandContext| async move {
        let reply = Frame::command(ctx.code(), ctx.args().to_vec());
        ctx.reply(&reply).await?;
        Ok(())
    })
}

/// Poll `condition` until it holds
pub async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
