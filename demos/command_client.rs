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


//! Interactive Command Client Example
//!
//! Connects to a command server, prints every frame it receives and sends each
//! line typed on stdin as a frame. Words are separated by spaces, the first
//! word is the command code.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --example command_client -- 127.0.0.1 4000
//! > ECHO hello world
//! ```

use cmdwire_client::{ClientConfig, CommandClient, Frame, is_server_shutdown};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port = args.next().map(|port| port.parse()).transpose()?.unwrap_or(4000);

    let mut client = CommandClient::connect(ClientConfig::new(host, port)).await?;
    let id = client.wait_for_id().await?;
    println!("Connected as client {id}");
    client.report_time().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let words: Vec<&str> = line.split_whitespace().collect();
                if words.is_empty() {
                    continue;
                }
                client.send(&Frame::new(words)).await?;
            }
            frame = client.next_frame() => {
                match frame? {
                    Some(frame) if is_server_shutdown(&frame) => {
                        println!("Server is shutting down");
                        return Ok(());
                    }
                    Some(frame) => println!("< {frame}"),
                    None => {
                        println!("Server closed the connection");
                        return Ok(());
                    }
                }
            }
        }
    }

    client.close().await?;
    Ok(())
}
