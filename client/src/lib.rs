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


//! # Cmdwire Command Client
//!
//! Async client for the cmdwire command protocol: length-prefixed frames of
//! delimiter-separated fields, the first field being the command code.
//!
//! ## Quick Start
//!
//! ```no_run
//! use cmdwire_client::{ClientConfig, CommandClient, is_server_shutdown};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = CommandClient::connect(ClientConfig::new("localhost", 4000)).await?;
//!     let id = client.wait_for_id().await?;
//!     println!("connected as {id}");
//!
//!     client.send_command("ECHO", ["hello"]).await?;
//!     while let Some(frame) = client.next_frame().await? {
//!         if is_server_shutdown(&frame) {
//!             break;
//!         }
//!         println!("{frame}");
//!     }
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;

pub use client::{CommandClient, HostInfo, is_server_shutdown, local_time_millis};
pub use config::ClientConfig;
pub use error::{ClientError, Result};

pub use cmdwire_codec::{FieldFormat, Frame, ReservedCommand};
