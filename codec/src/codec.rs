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


//! Wire framing: `u16 length (big-endian) || payload`

use crate::{CodecError, CodecResult, FieldFormat, Frame, FrameFormatErrorKind};
use byteorder::{BigEndian, ByteOrder};
use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

/// Size of the length prefix in bytes
pub const LENGTH_PREFIX_SIZE: usize = 2;
/// Largest payload the length prefix can describe
pub const MAX_PAYLOAD_LENGTH: usize = u16::MAX as usize;

/// Encode fields into a complete wire frame using the default format.
///
/// Fails with [`CodecError::FrameTooLong`] when the escaped payload exceeds
/// [`MAX_PAYLOAD_LENGTH`] bytes.
pub fn encode<S: AsRef<str>>(fields: &[S]) -> CodecResult<Bytes> {
    encode_with(&FieldFormat::default(), fields)
}

/// Encode fields into a complete wire frame using `format`.
pub fn encode_with<S: AsRef<str>>(format: &FieldFormat, fields: &[S]) -> CodecResult<Bytes> {
    let payload = format.encode_payload(fields)?;
    let mut dst = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    write_frame(&payload, &mut dst)?;
    Ok(dst.freeze())
}

/// Decode one complete wire frame using the default format.
///
/// The input must hold exactly one frame: a short or inconsistent length
/// prefix is reported as [`CodecError::FrameFormat`].
pub fn decode(frame: &[u8]) -> CodecResult<Vec<String>> {
    decode_with(&FieldFormat::default(), frame)
}

/// Decode one complete wire frame using `format`.
pub fn decode_with(format: &FieldFormat, frame: &[u8]) -> CodecResult<Vec<String>> {
    if frame.len() < LENGTH_PREFIX_SIZE {
        return Err(FrameFormatErrorKind::TruncatedLength {
            available: frame.len(),
        }
        .into());
    }
    let declared = BigEndian::read_u16(&frame[..LENGTH_PREFIX_SIZE]) as usize;
    let payload = &frame[LENGTH_PREFIX_SIZE..];
    if declared != payload.len() {
        return Err(FrameFormatErrorKind::LengthMismatch {
            declared,
            actual: payload.len(),
        }
        .into());
    }
    format.decode_payload(payload)
}

fn write_frame(payload: &[u8], dst: &mut BytesMut) -> CodecResult<()> {
    if payload.len() > MAX_PAYLOAD_LENGTH {
        return Err(CodecError::FrameTooLong {
            length: payload.len(),
        });
    }
    dst.reserve(LENGTH_PREFIX_SIZE + payload.len());
    dst.put_u16(payload.len() as u16);
    dst.put_slice(payload);
    Ok(())
}

/// Streaming frame codec for use with `tokio_util::codec::Framed`.
///
/// The decoder only performs transport framing and yields raw payloads, so a
/// payload that fails to parse never poisons the stream. Call
/// [`FrameCodec::parse`] on each payload to obtain a [`Frame`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec {
    format: FieldFormat,
}

impl FrameCodec {
    /// Create a codec using the default `#` / `` ` `` format
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with a custom field format
    pub fn with_format(format: FieldFormat) -> Self {
        Self { format }
    }

    /// The field format in use
    pub fn format(&self) -> &FieldFormat {
        &self.format
    }

    /// Parse a payload produced by the decoder into a frame
    pub fn parse(&self, payload: &[u8]) -> CodecResult<Frame> {
        self.format.decode_payload(payload).map(Frame::from)
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, Self::Error> {
        if src.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }

        let length = BigEndian::read_u16(&src[..LENGTH_PREFIX_SIZE]) as usize;
        if src.len() < LENGTH_PREFIX_SIZE + length {
            src.reserve(LENGTH_PREFIX_SIZE + length - src.len());
            return Ok(None);
        }

        let _ = src.split_to(LENGTH_PREFIX_SIZE);
        let payload = src.split_to(length).freeze();
        trace!(length, "Decoded frame payload");
        Ok(Some(payload))
    }
}

impl Encoder<&Frame> for FrameCodec {
    type Error = CodecError;

    fn encode(&mut self, item: &Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = self.format.encode_payload(item.fields())?;
        write_frame(&payload, dst)
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encode(&item, dst)
    }
}
