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


//! Error types for the command server

use crate::types::SessionId;
use cmdwire_codec::CodecError;
use std::net::SocketAddr;
use thiserror::Error;

/// Result type for operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Error produced by a command handler
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result returned by a command handler
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// Command server error types
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The listening socket could not be bound
    #[error("Failed to bind {address}: {source}")]
    Bind {
        /// Address the server tried to bind
        address: SocketAddr,
        /// Underlying socket error
        source: std::io::Error,
    },

    /// Read/write streams for an accepted socket could not be set up
    #[error("Session setup failed: {0}")]
    SessionSetup(std::io::Error),

    /// A handler is already registered for the command code
    #[error("Command {0:?} is already registered")]
    DuplicateCommand(String),

    /// The command code belongs to the protocol
    #[error("Command {0:?} is reserved by the protocol")]
    ReservedCommand(String),

    /// Command codes must be non-empty
    #[error("Command code must not be empty")]
    EmptyCommandCode,

    /// A frame argument could not be interpreted
    #[error("Malformed argument for {code}: {reason}")]
    MalformedArgument {
        /// Command code of the frame
        code: String,
        /// What was wrong with the argument
        reason: String,
    },

    /// Session with the given ID was not found
    #[error("Session {0} not found")]
    SessionNotFound(SessionId),

    /// A session with the same id is already registered
    #[error("Session {0} is already registered")]
    DuplicateSession(SessionId),

    /// Session has been disconnected
    #[error("Connection closed")]
    ConnectionClosed,

    /// Server is already started
    #[error("Server already running")]
    AlreadyRunning,

    /// Server is not listening
    #[error("Server not running")]
    NotRunning,

    /// Frame encoding or decoding failed
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// I/O error from the underlying TCP stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// Check if the error leaves the session usable
    pub fn is_recoverable(&self) -> bool {
        match self {
            ServiceError::Codec(e) => e.is_recoverable(),
            ServiceError::MalformedArgument { .. } | ServiceError::SessionNotFound(_) => true,
            _ => false,
        }
    }

    /// Check if the error is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ServiceError::SessionNotFound(_)
                | ServiceError::ConnectionClosed
                | ServiceError::SessionSetup(_)
                | ServiceError::Io(_)
        ) || matches!(self, ServiceError::Codec(CodecError::Io(_)))
    }
}

/// Failure of a dispatched command, reported through the execution error hook
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The handler returned an error
    #[error("Handler for {code} on {session_id} failed: {source}")]
    Failed {
        /// Session the frame came from
        session_id: SessionId,
        /// Command code of the frame
        code: String,
        /// Error returned by the handler
        source: HandlerError,
    },

    /// The handler panicked
    #[error("Handler for {code} on {session_id} panicked: {message}")]
    Panicked {
        /// Session the frame came from
        session_id: SessionId,
        /// Command code of the frame
        code: String,
        /// Panic payload rendered as text
        message: String,
    },
}

impl ExecutionError {
    /// Session the failed command came from
    pub fn session_id(&self) -> SessionId {
        match self {
            ExecutionError::Failed { session_id, .. } | ExecutionError::Panicked { session_id, .. } => {
                *session_id
            }
        }
    }

    /// Command code of the failed command
    pub fn code(&self) -> &str {
        match self {
            ExecutionError::Failed { code, .. } | ExecutionError::Panicked { code, .. } => code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdwire_codec::FrameFormatErrorKind;

    #[test]
    fn test_error_is_recoverable() {
        let malformed = ServiceError::from(CodecError::from(FrameFormatErrorKind::DanglingEscape {
            offset: 0,
        }));
        assert!(malformed.is_recoverable());
        assert!(!ServiceError::ConnectionClosed.is_recoverable());
        assert!(!ServiceError::DuplicateCommand("ECHO".into()).is_recoverable());
    }

    #[test]
    fn test_error_is_connection_error() {
        assert!(ServiceError::SessionNotFound(SessionId::new(1)).is_connection_error());
        assert!(ServiceError::ConnectionClosed.is_connection_error());
        assert!(!ServiceError::EmptyCommandCode.is_connection_error());
    }

    #[test]
    fn test_error_display() {
        let err = ServiceError::SessionNotFound(SessionId::new(42));
        assert_eq!(err.to_string(), "Session client-42 not found");

        let err = ServiceError::DuplicateCommand("ECHO".to_string());
        assert_eq!(err.to_string(), "Command \"ECHO\" is already registered");
    }

    #[test]
    fn test_execution_error_accessors() {
        let err = ExecutionError::Panicked {
            session_id: SessionId::new(3),
            code: "BOOM".to_string(),
            message: "oops".to_string(),
        };
        assert_eq!(err.session_id(), SessionId::new(3));
        assert_eq!(err.code(), "BOOM");
        assert_eq!(err.to_string(), "Handler for BOOM on client-3 panicked: oops");
    }
}
