use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::protocol::{DEFAULT_MAX_FRAME_LENGTH, Frame, FrameError, HEADER_LEN, MAGIC};

/// Decodes and encodes [`Frame`]s, rejecting payloads above `max_length`.
///
/// `max_length` never exceeds `u16::MAX`, the largest length the header can
/// carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCodec {
    max_length: usize,
}

impl FrameCodec {
    pub fn new(max_length: usize) -> Self {
        Self { max_length: max_length.min(usize::from(u16::MAX)) }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LENGTH)
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LEN {
            src.reserve(HEADER_LEN - src.len());
            return Ok(None);
        }

        if src[..MAGIC.len()] != MAGIC {
            return Err(FrameError::bad_magic([src[0], src[1]]));
        }

        let length = usize::from(u16::from_be_bytes([src[2], src[3]]));
        if length > self.max_length {
            return Err(FrameError::too_long(length, self.max_length));
        }

        let frame_len = HEADER_LEN + length;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        let payload = src.split_to(length).freeze();
        trace!(length, "decoded frame");
        Ok(Some(Frame::from(payload)))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let length = frame.len();
        let header_length = u16::try_from(length)
            .ok()
            .filter(|_| length <= self.max_length)
            .ok_or_else(|| FrameError::too_long(length, self.max_length))?;

        dst.reserve(HEADER_LEN + length);
        dst.put_slice(&MAGIC);
        dst.put_u16(header_length);
        dst.put_slice(frame.payload());
        Ok(())
    }
}
