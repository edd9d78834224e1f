use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use chatmux_http::connection::{Negotiation, Upgrader};
use http::header::{CONNECTION, CONTENT_TYPE, SEC_WEBSOCKET_ACCEPT, SEC_WEBSOCKET_KEY, SEC_WEBSOCKET_VERSION, UPGRADE};
use http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::Full;
use sha1::{Digest, Sha1};
use thiserror::Error;
use tracing::debug;

use crate::error::ServeError;

/// RFC 6455 section 1.3.
const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";
const WEBSOCKET_VERSION: &str = "13";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandshakeError {
    #[error("method must be GET, found {0}")]
    Method(Method),
    #[error("missing `Connection: upgrade` header")]
    MissingConnectionUpgrade,
    #[error("missing `Upgrade: websocket` header")]
    MissingUpgradeWebsocket,
    #[error("missing or malformed Sec-WebSocket-Key header")]
    InvalidKey,
    #[error("unsupported Sec-WebSocket-Version {0:?}")]
    UnsupportedVersion(Option<String>),
}

impl HandshakeError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnsupportedVersion(_) => StatusCode::UPGRADE_REQUIRED,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Computes `Sec-WebSocket-Accept` for a client key.
pub fn accept_key(key: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key);
    hasher.update(WEBSOCKET_GUID.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// Takes requests for `path` out of HTTP when they carry a valid handshake.
///
/// Requests for other paths always pass through to the HTTP handler.
#[derive(Debug, Clone)]
pub struct WebSocketUpgrader {
    path: String,
}

impl WebSocketUpgrader {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Checks the handshake preconditions, returning the accept value.
    pub fn validate<B>(request: &Request<B>) -> Result<HeaderValue, HandshakeError> {
        if request.method() != Method::GET {
            return Err(HandshakeError::Method(request.method().clone()));
        }

        let headers = request.headers();
        if !header_contains_token(headers, CONNECTION, "upgrade") {
            return Err(HandshakeError::MissingConnectionUpgrade);
        }
        if !header_contains_token(headers, UPGRADE, "websocket") {
            return Err(HandshakeError::MissingUpgradeWebsocket);
        }

        let key = headers.get(SEC_WEBSOCKET_KEY).ok_or(HandshakeError::InvalidKey)?;
        // the key is 16 random bytes, base64 encoded
        let decoded = STANDARD.decode(key.as_bytes()).map_err(|_malformed| HandshakeError::InvalidKey)?;
        if decoded.len() != 16 {
            return Err(HandshakeError::InvalidKey);
        }

        let version = headers.get(SEC_WEBSOCKET_VERSION);
        if version.is_none_or(|v| v.as_bytes() != WEBSOCKET_VERSION.as_bytes()) {
            let found = version.map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());
            return Err(HandshakeError::UnsupportedVersion(found));
        }

        HeaderValue::try_from(accept_key(key.as_bytes())).map_err(|_invalid| HandshakeError::InvalidKey)
    }
}

impl Upgrader for WebSocketUpgrader {
    fn negotiate(&self, request: &Request<Bytes>) -> Negotiation {
        if request.uri().path() != self.path {
            return Negotiation::Pass;
        }

        match Self::validate(request) {
            Ok(accept) => Negotiation::Accept(switching_protocols(accept)),
            Err(e) => {
                let response = rejection(&e);
                let e = ServeError::from(e);
                debug!(cause = %e, status = %response.status(), "connection stays on http");
                Negotiation::Reject(response)
            }
        }
    }
}

fn header_contains_token(headers: &HeaderMap, name: http::header::HeaderName, token: &str) -> bool {
    headers
        .get_all(name)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|item| item.trim().eq_ignore_ascii_case(token))
}

fn switching_protocols(accept: HeaderValue) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
    let headers = response.headers_mut();
    headers.insert(UPGRADE, HeaderValue::from_static("websocket"));
    headers.insert(CONNECTION, HeaderValue::from_static("Upgrade"));
    headers.insert(SEC_WEBSOCKET_ACCEPT, accept);
    response
}

fn rejection(e: &HandshakeError) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(e.to_string())));
    *response.status_mut() = e.status();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    if e.status() == StatusCode::UPGRADE_REQUIRED {
        headers.insert(SEC_WEBSOCKET_VERSION, HeaderValue::from_static(WEBSOCKET_VERSION));
    }
    response
}
