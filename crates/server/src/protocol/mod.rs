//! The binary IM wire model.
//!
//! ```text
//! +------+------+----------------+-----------------------+
//! | 0xCA | 0xFE | length: u16 BE | payload: length bytes |
//! +------+------+----------------+-----------------------+
//! ```

mod error;
mod frame;

pub use error::FrameError;
pub use frame::{DEFAULT_MAX_FRAME_LENGTH, Frame, HEADER_LEN, MAGIC};
