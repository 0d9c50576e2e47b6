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


//! Client configuration

use cmdwire_codec::FieldFormat;
use std::time::Duration;

/// Command client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server hostname or IP address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Delimiter and escape bytes used on the wire
    pub field_format: FieldFormat,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Default wait for [`next_frame`](crate::CommandClient::next_frame) (None for no timeout)
    pub read_timeout: Option<Duration>,

    /// Send host details right after connecting
    pub announce: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 4000,
            field_format: FieldFormat::default(),
            connect_timeout: Duration::from_secs(10),
            read_timeout: None,
            announce: true,
        }
    }
}

impl ClientConfig {
    /// Create a new client configuration with the given host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Set the wire field format
    pub fn with_field_format(mut self, field_format: FieldFormat) -> Self {
        self.field_format = field_format;
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the read timeout
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Enable or disable the host details announcement
    pub fn with_announce(mut self, enabled: bool) -> Self {
        self.announce = enabled;
        self
    }

    /// Get the server address as a string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
