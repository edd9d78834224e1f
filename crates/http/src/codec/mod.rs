//! HTTP/1.1 codec.
//!
//! - [`RequestDecoder`]: request head via the `header` module, then the body
//!   via the `body` module, as a stream of [`Message`](crate::protocol::Message)s
//! - [`ResponseEncoder`]: the mirror image for responses
//! - [`ServerCodec`]: both, for a single `tokio_util::codec::Framed`
//!
//! ```
//! use bytes::BytesMut;
//! use chatmux_http::codec::RequestDecoder;
//! use chatmux_http::protocol::Message;
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from("GET /index.html HTTP/1.1\r\nHost: localhost\r\n\r\n");
//! let message = decoder.decode(&mut buffer).unwrap();
//! assert!(matches!(message, Some(Message::Header(_))));
//! ```

mod body;
mod header;
mod request_decoder;
mod response_encoder;
mod server_codec;

pub use header::{MAX_HEADER_BYTES, MAX_HEADER_NUM};
pub use request_decoder::RequestDecoder;
pub use response_encoder::ResponseEncoder;
pub use server_codec::ServerCodec;
