//! The HTTP/1.1 half of chatmux.
//!
//! A small request/response layer built on tokio codecs: requests are decoded
//! as a head followed by payload chunks, aggregated into a `Request<Bytes>`
//! with a bounded size, and answered by a [`handler::Handler`]. Connections
//! can leave HTTP through an [`connection::Upgrader`], which is how the
//! WebSocket endpoint takes over a stream.
//!
//! # Example
//!
//! ```no_run
//! use std::convert::Infallible;
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use chatmux_http::connection::{HttpConnection, NoUpgrade};
//! use chatmux_http::handler::make_handler;
//! use http::{Request, Response};
//! use http_body_util::Full;
//! use tokio::net::TcpListener;
//!
//! async fn hello(_request: Request<Bytes>) -> Result<Response<Full<Bytes>>, Infallible> {
//!     Ok(Response::new(Full::new(Bytes::from_static(b"Hello World!\r\n"))))
//! }
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!     let handler = Arc::new(make_handler(hello));
//!     loop {
//!         let (stream, _) = listener.accept().await?;
//!         let handler = handler.clone();
//!         tokio::spawn(async move {
//!             let _ = HttpConnection::new(stream).process(handler, &NoUpgrade).await;
//!         });
//!     }
//! }
//! ```
//!
//! # Limitations
//!
//! - HTTP/1.1 responses only, requests may be HTTP/1.0 or HTTP/1.1
//! - Maximum header size: 8KB
//! - Maximum number of headers: 64
//! - Request bodies are buffered whole, 64KB by default

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
