//! Binary frame codec.
//!
//! ```
//! use bytes::BytesMut;
//! use chatmux::codec::FrameCodec;
//! use tokio_util::codec::Decoder;
//!
//! let mut codec = FrameCodec::default();
//! let mut buffer = BytesMut::from(&b"\xCA\xFE\x00\x02hi"[..]);
//! let frame = codec.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(frame.payload().as_ref(), b"hi");
//! ```

mod frame_codec;

pub use frame_codec::FrameCodec;
