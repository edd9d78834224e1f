//! One TCP port, three protocol families.
//!
//! Every accepted connection is classified by its first bytes:
//!
//! - `0xCA 0xFE` starts the binary IM protocol, length-prefixed [`protocol::Frame`]s
//!   handled by a [`handler::FrameHandler`];
//! - anything else is HTTP/1.1, served by a [`chatmux_http::handler::Handler`];
//! - an HTTP `GET` upgrade on the WebSocket path (`/im` by default) switches the
//!   connection to WebSocket, handled by a [`handler::WebSocketHandler`].
//!
//! ```no_run
//! use async_trait::async_trait;
//! use chatmux::error::BoxError;
//! use chatmux::handler::{FrameContext, FrameHandler, WebSocketHandler};
//! use chatmux::protocol::Frame;
//! use chatmux::websocket::{Message, Session};
//! use chatmux::Server;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl FrameHandler for Echo {
//!     async fn on_frame(&self, _ctx: &FrameContext, frame: Frame) -> Result<Option<Frame>, BoxError> {
//!         Ok(Some(frame))
//!     }
//! }
//!
//! #[async_trait]
//! impl WebSocketHandler for Echo {
//!     async fn on_message(&self, _session: &Session, message: Message) -> Result<Option<Message>, BoxError> {
//!         Ok(Some(message))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let server = Server::builder().frame_handler(Echo).websocket_handler(Echo).build().expect("handlers are set");
//!     server.start().await
//! }
//! ```

pub mod codec;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod websocket;

mod server;

pub use config::{ConfigBuilder, ConfigError, ServerConfig};
pub use error::{BoxError, ServeError};
pub use server::{NotFound, Server, ServerBuildError, ServerBuilder};
