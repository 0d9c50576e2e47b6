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


//! Command Frame Codec
//!
//! Encodes and decodes the messages exchanged by `cmdwire` peers. Each message
//! is a list of UTF-8 text fields, where field 0 is the command code and the
//! remaining fields are its arguments.
//!
//! # Wire Format
//!
//! ```text
//! +----------------+------------------------------------------+
//! | length: u16 BE | payload: fields joined by the delimiter  |
//! +----------------+------------------------------------------+
//! ```
//!
//! The payload is at most 65535 bytes. Literal delimiter and escape bytes
//! inside a field are escaped, see [`FieldFormat`].
//!
//! A literal delimiter is written as the delimiter followed by one escape
//! byte (`` #` ``). Unlike a delimiter-only escaping scheme, a literal escape
//! byte is also doubled (` `` `). Without that, a field ending in the escape
//! byte followed by the next field would be indistinguishable from an escaped
//! delimiter. Peers must therefore double every escape byte they send: a
//! lone escape byte that does not follow a delimiter is rejected with
//! [`FrameFormatErrorKind::DanglingEscape`].
//!
//! # Example
//!
//! ```
//! use cmdwire_codec::{decode, encode};
//!
//! let bytes = encode(&["SAY", "one#two"]).unwrap();
//! assert_eq!(decode(&bytes).unwrap(), vec!["SAY", "one#two"]);
//! ```

mod codec;
mod format;
mod frame;
mod reserved;
mod result;

pub use codec::{
    FrameCodec, LENGTH_PREFIX_SIZE, MAX_PAYLOAD_LENGTH, decode, decode_with, encode, encode_with,
};
pub use format::{DEFAULT_DELIMITER, DEFAULT_ESCAPE, FieldFormat};
pub use frame::Frame;
pub use reserved::ReservedCommand;
pub use result::{CodecError, CodecResult, FrameFormatErrorKind};
