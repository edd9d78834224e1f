use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("bad frame magic {found:02X?}")]
    BadMagic { found: [u8; 2] },

    #[error("frame payload too long, length: {length} exceed the limit {max_length}")]
    TooLong { length: usize, max_length: usize },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl FrameError {
    pub fn bad_magic(found: [u8; 2]) -> Self {
        Self::BadMagic { found }
    }

    pub fn too_long(length: usize, max_length: usize) -> Self {
        Self::TooLong { length, max_length }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_limit() {
        assert_eq!(FrameError::too_long(20_000, 16_384).to_string(), "frame payload too long, length: 20000 exceed the limit 16384");
        assert_eq!(FrameError::bad_magic([0x47, 0x45]).to_string(), "bad frame magic [47, 45]");
    }
}
