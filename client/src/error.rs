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


//! Client error types

use cmdwire_codec::CodecError;
use std::io;
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server could not be reached
    #[error("Failed to connect to {address}: {source}")]
    Connect {
        /// Address the client tried to reach
        address: String,
        /// Underlying socket error
        source: io::Error,
    },

    /// Connecting took longer than the configured timeout
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// No frame arrived in time
    #[error("Read timeout")]
    ReadTimeout,

    /// Connection closed by server
    #[error("Connection closed by server")]
    ConnectionClosed,

    /// The server sent something the protocol does not allow
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Frame encoding or decoding failed
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ClientError {
    /// Check if the connection is gone
    pub fn is_disconnect(&self) -> bool {
        match self {
            Self::ConnectionClosed => true,
            Self::Io(e) | Self::Codec(CodecError::Io(e)) => matches!(
                e.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

/// Client result type
pub type Result<T> = std::result::Result<T, ClientError>;
