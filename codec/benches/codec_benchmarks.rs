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


use bytes::BytesMut;
use cmdwire_codec::{Frame, FrameCodec, decode, encode};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use tokio_util::codec::{Decoder, Encoder};

fn bench_encode(c: &mut Criterion) {
    let plain = ["STATUS", "host-01", "running", "1723456789"];
    let escaped = ["SAY", "a#b#c", "``quoted``", "###"];

    c.bench_function("encode_plain", |b| b.iter(|| encode(black_box(&plain)).unwrap()));
    c.bench_function("encode_escaped", |b| {
        b.iter(|| encode(black_box(&escaped)).unwrap())
    });
}

fn bench_decode(c: &mut Criterion) {
    let plain = encode(&["STATUS", "host-01", "running", "1723456789"]).unwrap();
    let escaped = encode(&["SAY", "a#b#c", "``quoted``", "###"]).unwrap();

    c.bench_function("decode_plain", |b| b.iter(|| decode(black_box(&plain)).unwrap()));
    c.bench_function("decode_escaped", |b| {
        b.iter(|| decode(black_box(&escaped)).unwrap())
    });
}

fn bench_stream(c: &mut Criterion) {
    let frame = Frame::command("ECHO", ["hello world"]);

    c.bench_function("stream_100_frames", |b| {
        b.iter(|| {
            let mut codec = FrameCodec::new();
            let mut buffer = BytesMut::new();
            for _ in 0..100 {
                codec.encode(&frame, &mut buffer).unwrap();
            }
            let mut count = 0;
            while let Some(payload) = codec.decode(&mut buffer).unwrap() {
                black_box(codec.parse(&payload).unwrap());
                count += 1;
            }
            count
        })
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_stream);
criterion_main!(benches);
