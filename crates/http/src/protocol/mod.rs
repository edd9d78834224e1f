//! Core HTTP protocol types shared by the codec and the connection.
//!
//! - [`Message`], [`PayloadItem`], [`PayloadSize`]: the header/payload stream
//!   the codec produces and consumes
//! - [`RequestHeader`]: a request head awaiting its aggregated body
//! - [`ResponseHead`]: a response head before its body is attached
//! - [`HttpError`], [`ParseError`], [`SendError`]: error types

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestHeader;

mod response;
pub use response::ResponseHead;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
