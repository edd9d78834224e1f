//! Per-family connection loops, installed by the dispatcher once the
//! protocol is known. HTTP is driven by `chatmux_http::connection`.

mod frame_connection;
mod ws_connection;

pub use frame_connection::FrameConnection;
pub use ws_connection::WebSocketConnection;
