//! Connection driving.
//!
//! [`HttpConnection`] reads requests off one stream, aggregates their bodies,
//! and answers them in order. Before a request reaches the handler it is
//! offered to an [`Upgrader`]; an accepted upgrade ends HTTP framing and hands
//! the stream back as [`Upgraded`], together with any bytes already read past
//! the handshake.

mod http_connection;
mod upgrade;

pub use http_connection::{DEFAULT_MAX_BODY_SIZE, HttpConnection};
pub use upgrade::{Negotiation, NoUpgrade, Processed, Upgraded, Upgrader};
