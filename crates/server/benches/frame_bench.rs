use std::hint::black_box;

use bytes::{Bytes, BytesMut};
use chatmux::codec::FrameCodec;
use chatmux::dispatch::classify;
use chatmux::protocol::Frame;
use chatmux_http::codec::RequestDecoder;
use criterion::{Criterion, criterion_group, criterion_main};
use tokio_util::codec::{Decoder, Encoder};

fn encoded_frames(count: usize, payload: &'static [u8]) -> BytesMut {
    let mut codec = FrameCodec::default();
    let mut wire = BytesMut::new();
    for _ in 0..count {
        codec.encode(Frame::new(Bytes::from_static(payload)), &mut wire).unwrap();
    }
    wire
}

fn bench_frame_codec(c: &mut Criterion) {
    let wire = encoded_frames(64, b"a short chat message of moderate length");

    c.bench_function("decode 64 frames", |b| {
        b.iter(|| {
            let mut codec = FrameCodec::default();
            let mut src = wire.clone();
            while let Some(frame) = codec.decode(&mut src).unwrap() {
                black_box(frame);
            }
        });
    });

    c.bench_function("encode frame", |b| {
        let frame = Frame::new(Bytes::from_static(b"a short chat message of moderate length"));
        b.iter(|| {
            let mut dst = BytesMut::with_capacity(64);
            FrameCodec::default().encode(black_box(frame.clone()), &mut dst).unwrap();
            black_box(dst);
        });
    });
}

fn bench_classify(c: &mut Criterion) {
    c.bench_function("classify", |b| {
        b.iter(|| {
            black_box(classify(black_box(&[0xCA, 0xFE, 0x00, 0x02])));
            black_box(classify(black_box(b"GET / HTTP/1.1\r\n")));
        });
    });
}

fn bench_request_decoder(c: &mut Criterion) {
    let request = BytesMut::from(
        "GET /index.html HTTP/1.1\r\nHost: localhost\r\nUser-Agent: bench\r\nAccept: */*\r\n\r\n",
    );

    c.bench_function("decode request head", |b| {
        b.iter(|| {
            let mut decoder = RequestDecoder::new();
            let mut src = request.clone();
            black_box(decoder.decode(&mut src).unwrap());
        });
    });
}

criterion_group!(benches, bench_frame_codec, bench_classify, bench_request_decoder);
criterion_main!(benches);
