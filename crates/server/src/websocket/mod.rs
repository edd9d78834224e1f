//! The WebSocket family: the upgrade handshake on the configured path and
//! the sessions it produces.

mod session;
mod upgrade;

pub use session::{Session, SessionRegistry};
pub use upgrade::{HandshakeError, WebSocketUpgrader, accept_key};

pub use tungstenite::Message;
