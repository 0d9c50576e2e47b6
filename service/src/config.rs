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


//! Server configuration
//!
//! ```
//! use cmdwire_service::ServerConfig;
//! use std::net::Ipv4Addr;
//! use std::time::Duration;
//!
//! let config = ServerConfig::new(Ipv4Addr::LOCALHOST.into())
//!     .with_max_connections(Some(64))
//!     .with_shutdown_timeout(Duration::from_secs(2));
//! ```

use cmdwire_codec::FieldFormat;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Command server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to listen on; the port is chosen by `start`
    pub bind_address: IpAddr,

    /// Delimiter and escape bytes used on the wire
    pub field_format: FieldFormat,

    /// Broadcast the disconnect notification before shutting down
    pub notify_clients_on_shutdown: bool,

    /// Tell each new client its assigned id right after accept
    pub send_id_on_connect: bool,

    /// Maximum number of concurrent sessions (None for unlimited)
    pub max_connections: Option<usize>,

    /// Pause after a failed accept before trying again
    pub accept_error_backoff: Duration,

    /// How long `stop` waits for the accept loop to wind down
    pub shutdown_timeout: Duration,

    /// Upper bound for delivering one broadcast frame to one session
    pub send_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            field_format: FieldFormat::default(),
            notify_clients_on_shutdown: true,
            send_id_on_connect: true,
            max_connections: None,
            accept_error_backoff: Duration::from_millis(100),
            shutdown_timeout: Duration::from_secs(5),
            send_timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    /// Create a configuration listening on the given interface
    pub fn new(bind_address: IpAddr) -> Self {
        Self {
            bind_address,
            ..Default::default()
        }
    }

    /// Socket address for the given port on the configured interface
    pub fn socket_addr(&self, port: u16) -> SocketAddr {
        SocketAddr::new(self.bind_address, port)
    }

    /// Set the listening interface
    pub fn with_bind_address(mut self, bind_address: IpAddr) -> Self {
        self.bind_address = bind_address;
        self
    }

    /// Set the wire field format
    pub fn with_field_format(mut self, field_format: FieldFormat) -> Self {
        self.field_format = field_format;
        self
    }

    /// Enable or disable the shutdown notification broadcast
    pub fn with_notify_clients_on_shutdown(mut self, enabled: bool) -> Self {
        self.notify_clients_on_shutdown = enabled;
        self
    }

    /// Enable or disable the id notification sent on connect
    pub fn with_send_id_on_connect(mut self, enabled: bool) -> Self {
        self.send_id_on_connect = enabled;
        self
    }

    /// Set the maximum number of concurrent sessions
    pub fn with_max_connections(mut self, max: Option<usize>) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the accept error backoff
    pub fn with_accept_error_backoff(mut self, backoff: Duration) -> Self {
        self.accept_error_backoff = backoff;
        self
    }

    /// Set the shutdown timeout
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the per-session broadcast send timeout
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }
}
