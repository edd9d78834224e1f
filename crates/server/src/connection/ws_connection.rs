use std::net::SocketAddr;
use std::time::Duration;

use chatmux_http::connection::Upgraded;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};
use tungstenite::Message;
use tungstenite::protocol::{Role, WebSocketConfig};

use crate::dispatch::ConnectionId;
use crate::error::ServeError;
use crate::handler::WebSocketHandler;
use crate::websocket::{Session, SessionRegistry};

/// A connection after an accepted upgrade, speaking RFC 6455 framing.
#[derive(Debug)]
pub struct WebSocketConnection<S> {
    stream: WebSocketStream<S>,
    id: ConnectionId,
    peer: SocketAddr,
    path: String,
    idle_timeout: Option<Duration>,
}

enum Event {
    Incoming(Option<Result<Message, tungstenite::Error>>),
    Outbound(Message),
}

impl<S> WebSocketConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Starts WebSocket framing on an upgraded stream, reading the bytes the
    /// HTTP codec had already buffered first.
    pub async fn from_upgraded(upgraded: Upgraded<S>, id: ConnectionId, peer: SocketAddr, max_message_size: usize) -> Self {
        let mut config = WebSocketConfig::default();
        config.max_message_size = Some(max_message_size);
        config.max_frame_size = Some(max_message_size);

        let Upgraded { io, read_buf, request } = upgraded;
        let stream = WebSocketStream::from_partially_read(io, read_buf.to_vec(), Role::Server, Some(config)).await;
        Self { stream, id, peer, path: request.uri().path().to_owned(), idle_timeout: None }
    }

    #[must_use]
    pub fn idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = Some(idle_timeout);
        self
    }

    /// Runs the session until either side closes it.
    ///
    /// The session is in `registry` from `on_open` until right after
    /// `on_close`, whichever way the loop ends.
    pub async fn process<W>(mut self, handler: &W, registry: &SessionRegistry) -> Result<(), ServeError>
    where
        W: WebSocketHandler + ?Sized,
    {
        let (outbound, mut queued) = unbounded_channel();
        let _registration = registry.register(self.id, outbound.clone());
        let session = Session::new(self.id, self.peer, self.path.clone(), outbound, registry.clone());

        info!(path = %self.path, "websocket session open");
        handler.on_open(&session).await;
        let result = self.run(handler, &session, &mut queued).await;
        handler.on_close(&session).await;
        info!(path = %self.path, "websocket session closed");

        result
    }

    async fn run<W>(&mut self, handler: &W, session: &Session, queued: &mut UnboundedReceiver<Message>) -> Result<(), ServeError>
    where
        W: WebSocketHandler + ?Sized,
    {
        loop {
            let event = match self.idle_timeout {
                Some(idle) => tokio::time::timeout(idle, next_event(&mut self.stream, queued))
                    .await
                    .map_err(|_elapsed| ServeError::IdleTimeout(idle))?,
                None => next_event(&mut self.stream, queued).await,
            };

            let message = match event {
                Event::Outbound(message) => {
                    self.stream.send(message).await?;
                    continue;
                }
                Event::Incoming(Some(Ok(message))) => message,
                Event::Incoming(Some(Err(e))) => {
                    warn!(cause = %e, "can't read websocket message, connection shutdown");
                    return Err(e.into());
                }
                Event::Incoming(None) => {
                    debug!("websocket stream finished");
                    return Ok(());
                }
            };

            match message {
                Message::Text(_) | Message::Binary(_) => match handler.on_message(session, message).await {
                    Ok(Some(reply)) => self.stream.send(reply).await?,
                    Ok(None) => {}
                    Err(e) => {
                        if let Err(close_error) = self.stream.close(None).await {
                            debug!(cause = %close_error, "failed to send close frame");
                        }
                        return Err(ServeError::handler(e));
                    }
                },
                // the close reply goes out on the next read, which then ends the stream
                Message::Close(frame) => debug!(?frame, "peer started closing handshake"),
                // pings are answered by the protocol layer
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }
}

async fn next_event<S>(stream: &mut WebSocketStream<S>, queued: &mut UnboundedReceiver<Message>) -> Event
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    tokio::select! {
        incoming = stream.next() => Event::Incoming(incoming),
        Some(message) = queued.recv() => Event::Outbound(message),
    }
}
