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


//! Error types for frame encoding and decoding

use thiserror::Error;

/// Result Type for Codec Operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while encoding or decoding command frames.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Encoded payload does not fit the two byte length prefix.
    #[error("Encoded frame is {length} bytes, maximum is {max}", max = crate::MAX_PAYLOAD_LENGTH)]
    FrameTooLong {
        /// Byte length of the encoded payload
        length: usize,
    },

    /// A frame must carry at least the command code field.
    #[error("Frame has no fields")]
    EmptyFrame,

    /// The received bytes do not form a valid frame.
    ///
    /// This is recoverable: the offending frame has already been consumed from
    /// the stream and the next frame can be read normally.
    #[error("Malformed frame: {0}")]
    FrameFormat(FrameFormatErrorKind),

    /// Delimiter and escape bytes are unusable.
    #[error("Invalid field format: {0}")]
    InvalidFormat(String),

    /// An I/O error occurred on the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Specific kinds of malformed frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameFormatErrorKind {
    /// Fewer than two bytes available for the length prefix.
    #[error("length prefix truncated, {available} byte(s) available")]
    TruncatedLength {
        /// Bytes present
        available: usize,
    },

    /// Declared payload length differs from the bytes present.
    #[error("length prefix declares {declared} bytes but {actual} follow")]
    LengthMismatch {
        /// Length from the prefix
        declared: usize,
        /// Length actually present
        actual: usize,
    },

    /// Payload is not valid UTF-8.
    #[error("payload is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidUtf8 {
        /// Offset of the first invalid byte
        valid_up_to: usize,
    },

    /// An escape byte that is neither doubled nor attached to a delimiter.
    #[error("unpaired escape byte at offset {offset}")]
    DanglingEscape {
        /// Offset of the escape run within the payload
        offset: usize,
    },
}

impl CodecError {
    /// Check if the error leaves the stream usable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CodecError::FrameFormat(_))
    }
}

impl From<FrameFormatErrorKind> for CodecError {
    fn from(kind: FrameFormatErrorKind) -> Self {
        CodecError::FrameFormat(kind)
    }
}
