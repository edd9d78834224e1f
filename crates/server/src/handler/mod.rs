//! Application seams for the binary and WebSocket families.
//!
//! Plain HTTP requests go to a [`chatmux_http::handler::Handler`]; the two
//! traits here cover the other families. Handlers are shared by every
//! connection and only see the decoded messages, never the codecs.

use std::net::SocketAddr;

use async_trait::async_trait;
use tungstenite::Message;

use crate::dispatch::ConnectionId;
use crate::error::BoxError;
use crate::protocol::Frame;
use crate::websocket::Session;

/// The connection a frame arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameContext {
    pub id: ConnectionId,
    pub peer: SocketAddr,
}

#[async_trait]
pub trait FrameHandler: Send + Sync {
    /// Handles one decoded frame. A returned frame is written back before the
    /// next frame of the connection is handled; an error closes the connection.
    async fn on_frame(&self, ctx: &FrameContext, frame: Frame) -> Result<Option<Frame>, BoxError>;
}

#[async_trait]
pub trait WebSocketHandler: Send + Sync {
    async fn on_open(&self, _session: &Session) {}

    /// Handles one text or binary message. A returned message is sent back to
    /// the same session; an error closes the session.
    async fn on_message(&self, session: &Session, message: Message) -> Result<Option<Message>, BoxError>;

    /// Called once the session is gone, whatever the reason.
    async fn on_close(&self, _session: &Session) {}
}
