//! Chunked transfer coding decoder, RFC 9112 section 7.1.
//!
//! Chunk extensions and trailer fields are consumed and discarded.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::protocol::{ParseError, PayloadItem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: State,
    remaining: u64,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: State::SizeStart, remaining: 0 }
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// first hex digit of the chunk size
    SizeStart,
    /// further hex digits of the chunk size
    Size,
    /// whitespace after the size
    SizeLws,
    /// `;ext=value` after the size
    Extension,
    SizeLf,
    Body,
    BodyCr,
    BodyLf,
    /// a trailer field line
    Trailer,
    TrailerLf,
    EndCr,
    EndLf,
    End,
}

fn invalid(reason: &str) -> ParseError {
    ParseError::invalid_body(format!("invalid chunked body: {reason}"))
}

fn hex_value(b: u8) -> Option<u64> {
    match b {
        b'0'..=b'9' => Some(u64::from(b - b'0')),
        b'a'..=b'f' => Some(u64::from(b - b'a' + 10)),
        b'A'..=b'F' => Some(u64::from(b - b'A' + 10)),
        _ => None,
    }
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if self.state == State::End {
                trace!("finished reading chunked data");
                return Ok(Some(PayloadItem::Eof));
            }

            if src.is_empty() {
                return Ok(None);
            }

            if self.state == State::Body {
                let len = usize::try_from(self.remaining).map_or(src.len(), |r| r.min(src.len()));
                let bytes = src.split_to(len).freeze();
                self.remaining -= bytes.len() as u64;
                if self.remaining == 0 {
                    self.state = State::BodyCr;
                }
                trace!(len = bytes.len(), "read chunked bytes");
                return Ok(Some(PayloadItem::Chunk(bytes)));
            }

            let b = src.get_u8();
            self.state = match (self.state, b) {
                (State::SizeStart | State::Size, b) if hex_value(b).is_some() => {
                    let digit = hex_value(b).unwrap_or_default();
                    self.remaining = self
                        .remaining
                        .checked_mul(16)
                        .and_then(|r| r.checked_add(digit))
                        .ok_or_else(|| invalid("chunk size overflow"))?;
                    State::Size
                }
                (State::Size | State::SizeLws, b'\t' | b' ') => State::SizeLws,
                (State::Size | State::SizeLws | State::Extension, b';') => State::Extension,
                (State::Size | State::SizeLws | State::Extension, b'\r') => State::SizeLf,
                (State::Extension, b'\n') => return Err(invalid("chunk extension contains newline")),
                (State::Extension, _) => State::Extension,
                (State::SizeLf, b'\n') if self.remaining == 0 => State::EndCr,
                (State::SizeLf, b'\n') => State::Body,
                (State::BodyCr, b'\r') => State::BodyLf,
                (State::BodyLf, b'\n') => State::SizeStart,
                (State::EndCr, b'\r') => State::EndLf,
                (State::EndCr | State::Trailer, b) if b != b'\r' => State::Trailer,
                (State::Trailer, b'\r') => State::TrailerLf,
                (State::TrailerLf, b'\n') => State::EndCr,
                (State::EndLf, b'\n') => State::End,
                (state, _) => return Err(invalid(&format!("unexpected byte in state {state:?}"))),
            };
        }
    }
}
