use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use chatmux_http::connection::{HttpConnection, Processed};
use chatmux_http::handler::Handler;
use http_body::Body;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::Span;

use crate::codec::FrameCodec;
use crate::config::ServerConfig;
use crate::connection::{FrameConnection, WebSocketConnection};
use crate::dispatch::{Connection, Protocol};
use crate::error::ServeError;
use crate::handler::{FrameContext, FrameHandler, WebSocketHandler};
use crate::websocket::{SessionRegistry, WebSocketUpgrader};

/// Routes classified connections into their chain.
///
/// Shared by every connection task; holds only settings, handlers and the
/// session registry.
pub struct Dispatcher<H> {
    frame_handler: Arc<dyn FrameHandler>,
    http_handler: Arc<H>,
    ws_handler: Arc<dyn WebSocketHandler>,
    upgrader: WebSocketUpgrader,
    sessions: SessionRegistry,
    max_frame_length: usize,
    max_body_size: usize,
    classify_timeout: Duration,
    idle_timeout: Duration,
}

impl<H> std::fmt::Debug for Dispatcher<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("upgrader", &self.upgrader)
            .field("sessions", &self.sessions.len())
            .field("max_frame_length", &self.max_frame_length)
            .field("max_body_size", &self.max_body_size)
            .finish_non_exhaustive()
    }
}

impl<H> Dispatcher<H>
where
    H: Handler,
    H::RespBody: Body + Unpin,
    <H::RespBody as Body>::Error: Display,
{
    pub fn new(
        config: &ServerConfig,
        frame_handler: Arc<dyn FrameHandler>,
        http_handler: Arc<H>,
        ws_handler: Arc<dyn WebSocketHandler>,
        sessions: SessionRegistry,
    ) -> Self {
        Self {
            frame_handler,
            http_handler,
            ws_handler,
            upgrader: WebSocketUpgrader::new(config.ws_path.clone()),
            sessions,
            max_frame_length: config.max_frame_length,
            max_body_size: config.max_body_size,
            classify_timeout: config.classify_timeout,
            idle_timeout: config.idle_timeout,
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Classifies `connection` and serves it until it closes.
    ///
    /// Records the protocol on the current span's `protocol` field.
    pub async fn dispatch<S>(&self, mut connection: Connection<S>) -> Result<(), ServeError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let protocol = connection.classify(self.classify_timeout).await?;
        Span::current().record("protocol", protocol.as_str());

        let (id, peer) = (connection.id(), connection.peer());
        let (io, buffered) = connection.into_parts();

        match protocol {
            Protocol::Binary => {
                let ctx = FrameContext { id, peer };
                FrameConnection::with_buffered(io, buffered, FrameCodec::new(self.max_frame_length))
                    .idle_timeout(self.idle_timeout)
                    .process(self.frame_handler.as_ref(), &ctx)
                    .await
            }
            Protocol::Http => {
                let processed = HttpConnection::with_buffered(io, buffered)
                    .max_body_size(self.max_body_size)
                    .idle_timeout(self.idle_timeout)
                    .process(Arc::clone(&self.http_handler), &self.upgrader)
                    .await?;

                match processed {
                    Processed::Closed => Ok(()),
                    Processed::Upgraded(upgraded) => {
                        Span::current().record("protocol", Protocol::WebSocket.as_str());
                        WebSocketConnection::from_upgraded(upgraded, id, peer, self.max_body_size)
                            .await
                            .idle_timeout(self.idle_timeout)
                            .process(self.ws_handler.as_ref(), &self.sessions)
                            .await
                    }
                }
            }
            // classification only ever yields binary or http
            Protocol::Unclassified | Protocol::WebSocket => Err(ServeError::Unclassified),
        }
    }
}
