#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chatmux::dispatch::{Connection, ConnectionId, Dispatcher};
use chatmux::handler::{FrameContext, FrameHandler, WebSocketHandler};
use chatmux::protocol::Frame;
use chatmux::websocket::{Message, Session, SessionRegistry};
use chatmux::{BoxError, ServeError, ServerConfig};
use chatmux_http::handler::Handler;
use http::{Request, Response};
use http_body_util::Full;
use tokio::io::DuplexStream;

#[derive(Default)]
pub struct Counting {
    pub frames: AtomicUsize,
    pub messages: AtomicUsize,
}

#[async_trait]
impl FrameHandler for Counting {
    async fn on_frame(&self, _ctx: &FrameContext, frame: Frame) -> Result<Option<Frame>, BoxError> {
        self.frames.fetch_add(1, Ordering::SeqCst);
        Ok(Some(frame))
    }
}

#[async_trait]
impl WebSocketHandler for Counting {
    async fn on_message(&self, _session: &Session, message: Message) -> Result<Option<Message>, BoxError> {
        self.messages.fetch_add(1, Ordering::SeqCst);
        Ok(Some(message))
    }
}

/// Answers `METHOD PATH BODY_LEN` for every request.
pub struct Describe;

#[async_trait]
impl Handler for Describe {
    type RespBody = Full<Bytes>;
    type Error = Infallible;

    async fn call(&self, request: Request<Bytes>) -> Result<Response<Self::RespBody>, Self::Error> {
        let body = format!("{} {} {}", request.method(), request.uri().path(), request.body().len());
        Ok(Response::new(Full::new(Bytes::from(body))))
    }
}

pub struct Fixture {
    pub handlers: Arc<Counting>,
    pub dispatcher: Arc<Dispatcher<Describe>>,
}

impl Fixture {
    pub fn new(config: &ServerConfig) -> Self {
        let handlers = Arc::new(Counting::default());
        let dispatcher = Dispatcher::new(
            config,
            Arc::clone(&handlers) as Arc<dyn FrameHandler>,
            Arc::new(Describe),
            Arc::clone(&handlers) as Arc<dyn WebSocketHandler>,
            SessionRegistry::new(),
        );
        Self { handlers, dispatcher: Arc::new(dispatcher) }
    }

    /// Serves the server end of a fresh duplex pipe, returning the client end.
    pub fn connect(&self) -> (DuplexStream, tokio::task::JoinHandle<Result<(), ServeError>>) {
        let (client, server) = tokio::io::duplex(128 * 1024);
        let dispatcher = Arc::clone(&self.dispatcher);
        let peer = SocketAddr::from(([127, 0, 0, 1], 50000));
        let task = tokio::spawn(async move { dispatcher.dispatch(Connection::new(ConnectionId::next(), peer, server)).await });
        (client, task)
    }

    pub fn frames(&self) -> usize {
        self.handlers.frames.load(Ordering::SeqCst)
    }

    pub fn messages(&self) -> usize {
        self.handlers.messages.load(Ordering::SeqCst)
    }
}
