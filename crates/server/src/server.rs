use std::convert::Infallible;
use std::fmt::Display;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chatmux_http::handler::Handler;
use http::{Request, Response, StatusCode};
use http_body::Body;
use http_body_util::Empty;
use thiserror::Error;
use tokio::net::{TcpListener, TcpSocket};
use tracing::{Instrument, debug, error, field, info, info_span, warn};

use crate::config::ServerConfig;
use crate::dispatch::{Connection, ConnectionId, Dispatcher};
use crate::handler::{FrameHandler, WebSocketHandler};
use crate::websocket::SessionRegistry;

/// Answers every plain HTTP request with `404 Not Found`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotFound;

#[async_trait]
impl Handler for NotFound {
    type RespBody = Empty<Bytes>;
    type Error = Infallible;

    async fn call(&self, _req: Request<Bytes>) -> Result<Response<Self::RespBody>, Self::Error> {
        let mut response = Response::new(Empty::new());
        *response.status_mut() = StatusCode::NOT_FOUND;
        Ok(response)
    }
}

pub struct ServerBuilder<H = NotFound> {
    config: ServerConfig,
    frame_handler: Option<Arc<dyn FrameHandler>>,
    http_handler: H,
    ws_handler: Option<Arc<dyn WebSocketHandler>>,
    sessions: SessionRegistry,
}

impl<H> std::fmt::Debug for ServerBuilder<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("config", &self.config)
            .field("frame_handler", &self.frame_handler.is_some())
            .field("ws_handler", &self.ws_handler.is_some())
            .finish_non_exhaustive()
    }
}

impl ServerBuilder {
    fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            frame_handler: None,
            http_handler: NotFound,
            ws_handler: None,
            sessions: SessionRegistry::new(),
        }
    }
}

impl<H> ServerBuilder<H> {
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn frame_handler(mut self, frame_handler: impl FrameHandler + 'static) -> Self {
        self.frame_handler = Some(Arc::new(frame_handler));
        self
    }

    pub fn http_handler<T: Handler>(self, http_handler: T) -> ServerBuilder<T> {
        ServerBuilder {
            config: self.config,
            frame_handler: self.frame_handler,
            http_handler,
            ws_handler: self.ws_handler,
            sessions: self.sessions,
        }
    }

    pub fn websocket_handler(mut self, ws_handler: impl WebSocketHandler + 'static) -> Self {
        self.ws_handler = Some(Arc::new(ws_handler));
        self
    }

    /// Shares an existing registry, so code outside WebSocket handlers can
    /// reach the sessions.
    pub fn sessions(mut self, sessions: SessionRegistry) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn build(self) -> Result<Server<H>, ServerBuildError>
    where
        H: Handler,
        H::RespBody: Body + Unpin,
        <H::RespBody as Body>::Error: Display,
    {
        let frame_handler = self.frame_handler.ok_or(ServerBuildError::MissingFrameHandler)?;
        let ws_handler = self.ws_handler.ok_or(ServerBuildError::MissingWebSocketHandler)?;
        let dispatcher = Dispatcher::new(&self.config, frame_handler, Arc::new(self.http_handler), ws_handler, self.sessions);
        Ok(Server { config: self.config, dispatcher: Arc::new(dispatcher) })
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ServerBuildError {
    #[error("frame handler must be set")]
    MissingFrameHandler,
    #[error("websocket handler must be set")]
    MissingWebSocketHandler,
}

/// The single-port server.
///
/// Binding and serving are separate steps so the listener can be created
/// inside whatever runtime the caller built.
#[derive(Debug)]
pub struct Server<H> {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher<H>>,
}

impl Server<NotFound> {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }
}

impl<H> Server<H>
where
    H: Handler + 'static,
    H::RespBody: Body + Unpin + Send,
    <H::RespBody as Body>::Data: Send,
    <H::RespBody as Body>::Error: Display + Send,
{
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionRegistry {
        self.dispatcher.sessions()
    }

    /// Binds the configured address with `SO_REUSEADDR` and the configured backlog.
    pub fn bind(&self) -> io::Result<TcpListener> {
        let address = self.config.address;
        let socket = match address {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };
        socket.set_reuseaddr(true)?;
        socket.bind(address)?;
        let listener = socket.listen(self.config.backlog)?;
        info!(address = %listener.local_addr()?, backlog = self.config.backlog, "start listening");
        Ok(listener)
    }

    /// Accepts on `listener` with the configured number of acceptor tasks,
    /// one task per connection. Only returns if every acceptor stopped.
    pub async fn serve(self, listener: TcpListener) {
        let listener = Arc::new(listener);
        let mut acceptors = tokio::task::JoinSet::new();
        for acceptor in 0..self.config.acceptors {
            acceptors.spawn(accept_loop(acceptor, Arc::clone(&listener), Arc::clone(&self.dispatcher)));
        }

        while let Some(result) = acceptors.join_next().await {
            if let Err(e) = result {
                error!(cause = %e, "acceptor task failed");
            }
        }
    }

    pub async fn start(self) -> io::Result<()> {
        let listener = self.bind()?;
        self.serve(listener).await;
        Ok(())
    }
}

async fn accept_loop<H>(acceptor: usize, listener: Arc<TcpListener>, dispatcher: Arc<Dispatcher<H>>)
where
    H: Handler + 'static,
    H::RespBody: Body + Unpin + Send,
    <H::RespBody as Body>::Data: Send,
    <H::RespBody as Body>::Error: Display + Send,
{
    loop {
        let (tcp_stream, peer) = match listener.accept().await {
            Ok(stream_and_addr) => stream_and_addr,
            Err(e) => {
                warn!(cause = %e, acceptor, "failed to accept");
                continue;
            }
        };

        if let Err(e) = tcp_stream.set_nodelay(true) {
            debug!(cause = %e, "failed to set TCP_NODELAY");
        }

        let id = ConnectionId::next();
        let dispatcher = Arc::clone(&dispatcher);
        let span = info_span!("connection", %id, %peer, protocol = field::Empty);

        tokio::spawn(
            async move {
                match dispatcher.dispatch(Connection::new(id, peer, tcp_stream)).await {
                    Ok(()) => info!("finished process, connection shutdown"),
                    Err(e) if e.is_quiet() => debug!(cause = %e, "connection dropped"),
                    Err(e) => error!(cause = %e, "service has error, connection shutdown"),
                }
            }
            .instrument(span),
        );
    }
}
