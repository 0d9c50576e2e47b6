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


//! Integration tests for the frame codec

use bytes::BytesMut;
use cmdwire_codec::{
    CodecError, FieldFormat, Frame, FrameCodec, FrameFormatErrorKind, decode, encode,
};
use futures_util::{SinkExt, StreamExt};
use proptest::prelude::*;
use tokio::io::duplex;
use tokio_util::codec::{Decoder, FramedRead, FramedWrite};

proptest! {
    #[test]
    fn roundtrip_preserves_fields(fields in prop::collection::vec("[^\\x00]{0,24}", 1..8)) {
        let bytes = encode(&fields).unwrap();
        prop_assert_eq!(decode(&bytes).unwrap(), fields);
    }

    #[test]
    fn roundtrip_reserved_heavy(fields in prop::collection::vec("[#`a]{0,12}", 1..6)) {
        let bytes = encode(&fields).unwrap();
        prop_assert_eq!(decode(&bytes).unwrap(), fields);
    }
}

#[test]
fn decoder_recovers_after_malformed_payload() {
    let mut codec = FrameCodec::new();
    let mut buffer = BytesMut::new();

    // Invalid UTF-8, then an unpaired escape, then a valid frame
    buffer.extend_from_slice(&[0x00, 0x01, 0xFF]);
    buffer.extend_from_slice(b"\x00\x03A`B");
    buffer.extend_from_slice(&encode(&["OK", "1"]).unwrap());

    let mut parsed = Vec::new();
    while let Some(payload) = codec.decode(&mut buffer).unwrap() {
        parsed.push(codec.parse(&payload));
    }

    assert_eq!(parsed.len(), 3);
    assert!(matches!(
        parsed[0],
        Err(CodecError::FrameFormat(FrameFormatErrorKind::InvalidUtf8 { .. }))
    ));
    assert!(matches!(
        parsed[1],
        Err(CodecError::FrameFormat(FrameFormatErrorKind::DanglingEscape { offset: 1 }))
    ));
    assert_eq!(parsed[2].as_ref().unwrap(), &Frame::command("OK", ["1"]));
}

#[tokio::test]
async fn framed_stream_carries_frames() {
    let (left, right) = duplex(1024);
    let format = FieldFormat::new(b'|', b'~').unwrap();
    let mut writer = FramedWrite::new(left, FrameCodec::with_format(format));
    let mut reader = FramedRead::new(right, FrameCodec::with_format(format));

    writer.send(Frame::command("A", ["x|y"])).await.unwrap();
    writer.send(Frame::command("B", ["~"])).await.unwrap();
    drop(writer);

    let mut frames = Vec::new();
    while let Some(payload) = reader.next().await {
        let payload = payload.unwrap();
        frames.push(reader.decoder().parse(&payload).unwrap());
    }

    assert_eq!(
        frames,
        vec![Frame::command("A", ["x|y"]), Frame::command("B", ["~"])]
    );
}

#[tokio::test]
async fn oversized_frame_is_rejected_by_sink() {
    let (left, _right) = duplex(1024);
    let mut writer = FramedWrite::new(left, FrameCodec::new());

    let huge = "#".repeat(40_000);
    let result = writer.send(Frame::command("BIG", [huge])).await;
    assert!(matches!(result, Err(CodecError::FrameTooLong { length: 80_004 })));
}
