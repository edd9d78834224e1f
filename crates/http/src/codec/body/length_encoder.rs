use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Encoder;
use tracing::warn;

use crate::protocol::{PayloadItem, SendError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    length: u64,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { length }
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for LengthEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(bytes) => {
                let remaining = bytes.remaining() as u64;
                if remaining > self.length {
                    warn!(remaining, expected = self.length, "response body longer than its content-length");
                    return Err(SendError::invalid_body("body exceeds content-length"));
                }
                dst.put(bytes);
                self.length -= remaining;
                Ok(())
            }
            PayloadItem::Eof if self.length > 0 => Err(SendError::invalid_body("body shorter than content-length")),
            PayloadItem::Eof => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn writes_every_segment_of_a_chained_body() {
        let mut encoder = LengthEncoder::new(12);
        let mut dst = BytesMut::new();

        let body = Bytes::from_static(b"hello, ").chain(Bytes::from_static(b"world"));
        encoder.encode(PayloadItem::Chunk(body), &mut dst).unwrap();
        encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap();

        assert_eq!(&dst[..], b"hello, world");
    }

    #[test]
    fn rejects_short_and_long_bodies() {
        let mut dst = BytesMut::new();
        assert!(LengthEncoder::new(3).encode(PayloadItem::Chunk(Bytes::from_static(b"four")), &mut dst).is_err());

        let mut encoder = LengthEncoder::new(5);
        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"four")), &mut dst).unwrap();
        assert!(encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).is_err());
    }
}
