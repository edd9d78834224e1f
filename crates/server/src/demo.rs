//! Handlers that make the binary runnable: a frame echo, a small HTTP site
//! and a WebSocket broadcast room.

use std::convert::Infallible;

use async_trait::async_trait;
use bytes::Bytes;
use chatmux::BoxError;
use chatmux::handler::{FrameContext, FrameHandler, WebSocketHandler};
use chatmux::protocol::Frame;
use chatmux::websocket::{Message, Session, SessionRegistry};
use chatmux_http::handler::Handler;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::Full;
use tracing::{debug, info};

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>chatmux</title></head>
<body>
<ul id="log"></ul>
<input id="text" autofocus>
<script>
  const socket = new WebSocket(`ws://${location.host}/im`);
  socket.onmessage = (event) => {
    const item = document.createElement("li");
    item.textContent = event.data;
    document.getElementById("log").appendChild(item);
  };
  document.getElementById("text").onkeydown = (event) => {
    if (event.key === "Enter") { socket.send(event.target.value); event.target.value = ""; }
  };
</script>
</body>
</html>
"#;

/// Writes every frame back unchanged.
#[derive(Debug)]
pub struct Echo;

#[async_trait]
impl FrameHandler for Echo {
    async fn on_frame(&self, ctx: &FrameContext, frame: Frame) -> Result<Option<Frame>, BoxError> {
        debug!(id = %ctx.id, length = frame.len(), "echo frame");
        Ok(Some(frame))
    }
}

/// `GET /` serves the chat page, `POST /broadcast` pushes its body to every
/// WebSocket session, `GET /sessions` counts them.
#[derive(Debug)]
pub struct Pages {
    sessions: SessionRegistry,
}

impl Pages {
    pub fn new(sessions: SessionRegistry) -> Self {
        Self { sessions }
    }
}

fn respond(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

#[async_trait]
impl Handler for Pages {
    type RespBody = Full<Bytes>;
    type Error = Infallible;

    async fn call(&self, req: Request<Bytes>) -> Result<Response<Self::RespBody>, Self::Error> {
        let response = match (req.method(), req.uri().path()) {
            (&Method::GET, "/" | "/index.html") => respond(StatusCode::OK, "text/html; charset=utf-8", INDEX_HTML),
            (&Method::GET, "/sessions") => respond(StatusCode::OK, "text/plain", self.sessions.len().to_string()),
            (&Method::POST, "/broadcast") => match std::str::from_utf8(req.body()) {
                Ok(text) => {
                    let delivered = self.sessions.broadcast(&Message::text(text.to_owned()));
                    info!(delivered, "broadcast from http");
                    respond(StatusCode::OK, "text/plain", delivered.to_string())
                }
                Err(_) => respond(StatusCode::BAD_REQUEST, "text/plain", "body must be utf-8"),
            },
            _ => respond(StatusCode::NOT_FOUND, "text/plain", "not found"),
        };
        Ok(response)
    }
}

/// Relays every text message to all sessions.
#[derive(Debug)]
pub struct Room;

#[async_trait]
impl WebSocketHandler for Room {
    async fn on_open(&self, session: &Session) {
        session.registry().broadcast(&Message::text(format!("{} joined", session.peer())));
    }

    async fn on_message(&self, session: &Session, message: Message) -> Result<Option<Message>, BoxError> {
        match message {
            Message::Text(text) => {
                session.registry().broadcast(&Message::text(format!("{}: {}", session.peer(), text.as_str())));
                Ok(None)
            }
            // binary messages are only echoed to their sender
            message => Ok(Some(message)),
        }
    }

    async fn on_close(&self, session: &Session) {
        session.registry().broadcast(&Message::text(format!("{} left", session.peer())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn index_and_unknown_paths() {
        let pages = Pages::new(SessionRegistry::new());

        let index = pages.call(Request::get("/").body(Bytes::new()).unwrap()).await.unwrap();
        assert_eq!(index.status(), StatusCode::OK);
        let body = index.into_body().collect().await.unwrap().to_bytes();
        assert!(body.starts_with(b"<!DOCTYPE html>"));

        let missing = pages.call(Request::get("/nope").body(Bytes::new()).unwrap()).await.unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn broadcast_without_sessions_delivers_nothing() {
        let pages = Pages::new(SessionRegistry::new());
        let response = pages.call(Request::post("/broadcast").body(Bytes::from("hello")).unwrap()).await.unwrap();

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "0");
    }
}
