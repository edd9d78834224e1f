use bytes::Bytes;

/// Leading bytes of every binary frame, and of nothing else the server accepts.
pub const MAGIC: [u8; 2] = [0xCA, 0xFE];

/// Magic plus the big-endian `u16` payload length.
pub const HEADER_LEN: usize = MAGIC.len() + 2;

pub const DEFAULT_MAX_FRAME_LENGTH: usize = 16 * 1024;

/// One application message of the binary protocol.
///
/// A frame only carries its payload, the header is produced and checked by
/// [`FrameCodec`](crate::codec::FrameCodec).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    payload: Bytes,
}

impl Frame {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self { payload: payload.into() }
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl From<Bytes> for Frame {
    fn from(payload: Bytes) -> Self {
        Self { payload }
    }
}
