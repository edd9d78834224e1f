use std::error::Error;
use std::io;
use std::time::Duration;

use chatmux_http::protocol::{HttpError, ParseError, SendError};
use thiserror::Error;

use crate::protocol::FrameError;
use crate::websocket::HandshakeError;

pub type BoxError = Box<dyn Error + Send + Sync>;

/// Why a connection task ended early.
///
/// Every variant is local to one connection, the listener keeps accepting.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("no protocol recognized within {0:?}")]
    ClassificationTimeout(Duration),

    #[error("connection closed before its protocol was recognized")]
    Unclassified,

    #[error("protocol violation: {source}")]
    ProtocolViolation { source: BoxError },

    /// Answered on the connection, which stays on HTTP.
    #[error("websocket upgrade handshake failed: {source}")]
    UpgradeHandshakeFailure {
        #[from]
        source: HandshakeError,
    },

    #[error("handler error: {source}")]
    Handler { source: BoxError },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("connection idle for more than {0:?}")]
    IdleTimeout(Duration),
}

impl ServeError {
    pub fn protocol_violation<E: Into<BoxError>>(e: E) -> Self {
        Self::ProtocolViolation { source: e.into() }
    }

    pub fn handler<E: Into<BoxError>>(e: E) -> Self {
        Self::Handler { source: e.into() }
    }

    /// Expected ends of a connection that only deserve a debug line.
    pub fn is_quiet(&self) -> bool {
        matches!(self, Self::ClassificationTimeout(_) | Self::Unclassified | Self::IdleTimeout(_))
    }
}

impl From<FrameError> for ServeError {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::Io { source } => Self::Io { source },
            e => Self::protocol_violation(e),
        }
    }
}

impl From<HttpError> for ServeError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::RequestError { source: ParseError::Io { source } }
            | HttpError::ResponseError { source: SendError::Io { source } } => Self::Io { source },
            HttpError::IdleTimeout(idle) => Self::IdleTimeout(idle),
            e => Self::protocol_violation(e),
        }
    }
}

impl From<tungstenite::Error> for ServeError {
    fn from(e: tungstenite::Error) -> Self {
        match e {
            tungstenite::Error::Io(source) => Self::Io { source },
            e => Self::protocol_violation(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_errors_are_violations_except_io() {
        assert!(matches!(ServeError::from(FrameError::too_long(20, 10)), ServeError::ProtocolViolation { .. }));
        assert!(matches!(
            ServeError::from(FrameError::io(io::Error::from(io::ErrorKind::BrokenPipe))),
            ServeError::Io { .. }
        ));
    }

    #[test]
    fn http_errors_keep_their_kind() {
        let oversize = HttpError::from(ParseError::too_large_body(100, 10));
        assert!(matches!(ServeError::from(oversize), ServeError::ProtocolViolation { .. }));

        let idle = HttpError::IdleTimeout(Duration::from_secs(1));
        assert!(ServeError::from(idle).is_quiet());

        let reset = HttpError::from(ParseError::io(io::Error::from(io::ErrorKind::ConnectionReset)));
        assert!(matches!(ServeError::from(reset), ServeError::Io { .. }));
    }
}
