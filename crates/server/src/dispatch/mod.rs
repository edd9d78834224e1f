//! Protocol demultiplexing.
//!
//! A [`Connection`] buffers its first bytes until [`classify`] can decide
//! between the binary family and HTTP. The [`Dispatcher`] then moves the
//! socket and everything buffered so far into exactly one chain: the frame
//! codec, or the HTTP codec which may later hand the socket to WebSocket
//! framing. Nothing is re-read and nothing is lost on the way.

mod classify;
mod connection;
mod dispatcher;

pub use classify::{Protocol, classify};
pub use connection::{Connection, ConnectionId};
pub use dispatcher::Dispatcher;
