use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use http::header::{CONNECTION, EXPECT};
use http::{HeaderValue, Request, Response, StatusCode};
use http_body::Body;
use http_body_util::{BodyExt, Empty};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Framed, FramedParts};
use tracing::{debug, error, info, warn};

use crate::codec::ServerCodec;
use crate::connection::{Negotiation, Processed, Upgraded, Upgrader};
use crate::handler::Handler;
use crate::protocol::{HttpError, Message, ParseError, PayloadItem, PayloadSize, RequestHeader, ResponseHead, SendError};

/// Default limit for an aggregated request body.
pub const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024;

type RequestMessage = Message<(RequestHeader, PayloadSize)>;

/// An HTTP/1.1 server connection.
///
/// Each request is aggregated into a `Request<Bytes>` bounded by
/// `max_body_size`, offered to the [`Upgrader`], and otherwise passed to the
/// [`Handler`]. The response is fully written and flushed before the next
/// request is read.
#[derive(Debug)]
pub struct HttpConnection<S> {
    framed: Framed<S, ServerCodec>,
    max_body_size: usize,
    idle_timeout: Option<Duration>,
}

impl<S> HttpConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(io: S) -> Self {
        Self::with_buffered(io, BytesMut::new())
    }

    /// Creates a connection whose first reads are served from `buffered`,
    /// bytes that were already taken off `io` by the caller.
    pub fn with_buffered(io: S, buffered: BytesMut) -> Self {
        let mut parts = FramedParts::new::<Message<(ResponseHead, PayloadSize)>>(io, ServerCodec::new());
        parts.read_buf = buffered;
        Self { framed: Framed::from_parts(parts), max_body_size: DEFAULT_MAX_BODY_SIZE, idle_timeout: None }
    }

    #[must_use]
    pub fn max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    /// Closes the connection when no request byte arrives for `idle_timeout`.
    #[must_use]
    pub fn idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = Some(idle_timeout);
        self
    }

    pub async fn process<H, U>(mut self, handler: Arc<H>, upgrader: &U) -> Result<Processed<S>, HttpError>
    where
        H: Handler,
        H::RespBody: Body + Unpin,
        <H::RespBody as Body>::Error: Display,
        U: Upgrader + ?Sized,
    {
        loop {
            let (header, payload_size) = match self.next_message().await? {
                Some(Message::Header(head)) => head,
                Some(Message::Payload(_)) => {
                    let e = ParseError::invalid_body("need header while receive body");
                    self.reject(&e).await;
                    return Err(e.into());
                }
                None => {
                    debug!("cant read more request, break this connection down");
                    return Ok(Processed::Closed);
                }
            };

            let keep_alive = header.keep_alive();
            let request = self.aggregate(header, payload_size).await?;

            match upgrader.negotiate(&request) {
                Negotiation::Accept(response) => {
                    self.do_send_response(response).await?;
                    let FramedParts { io, read_buf, .. } = self.framed.into_parts();
                    info!(path = request.uri().path(), buffered = read_buf.len(), "connection upgraded");
                    return Ok(Processed::Upgraded(Upgraded { io, read_buf, request }));
                }
                Negotiation::Reject(response) => {
                    debug!(path = request.uri().path(), status = %response.status(), "upgrade handshake rejected");
                    self.do_send_response(response).await?;
                }
                Negotiation::Pass => {
                    let response = handler.call(request).await;
                    self.send_response(response).await?;
                }
            }

            if !keep_alive {
                debug!("request asked to close, connection shutdown");
                return Ok(Processed::Closed);
            }
        }
    }

    async fn next_message(&mut self) -> Result<Option<RequestMessage>, HttpError> {
        let next = match self.idle_timeout {
            Some(idle) => tokio::time::timeout(idle, self.framed.next()).await.map_err(|_elapsed| HttpError::IdleTimeout(idle))?,
            None => self.framed.next().await,
        };

        match next {
            Some(Ok(message)) => Ok(Some(message)),
            Some(Err(e)) => {
                self.reject(&e).await;
                Err(e.into())
            }
            None => Ok(None),
        }
    }

    /// Reads the payload belonging to `header` into one buffer.
    async fn aggregate(&mut self, header: RequestHeader, payload_size: PayloadSize) -> Result<Request<Bytes>, HttpError> {
        let declared = payload_size.declared_length();
        if let Some(length) = declared.filter(|length| *length > self.max_body_size as u64) {
            let e = ParseError::too_large_body(length, self.max_body_size);
            self.reject(&e).await;
            return Err(e.into());
        }

        self.continue_if_expected(&header).await?;

        let capacity = declared.map_or(0, |length| usize::try_from(length).unwrap_or(self.max_body_size));
        let mut body = BytesMut::with_capacity(capacity);
        loop {
            match self.next_message().await? {
                Some(Message::Payload(PayloadItem::Chunk(bytes))) => {
                    let size = body.len() + bytes.len();
                    if size > self.max_body_size {
                        let e = ParseError::too_large_body(size as u64, self.max_body_size);
                        self.reject(&e).await;
                        return Err(e.into());
                    }
                    body.extend_from_slice(&bytes);
                }
                Some(Message::Payload(PayloadItem::Eof)) => break,
                Some(Message::Header(_)) => {
                    let e = ParseError::invalid_body("receive header while reading body");
                    self.reject(&e).await;
                    return Err(e.into());
                }
                None => return Err(ParseError::invalid_body("connection closed before body completed").into()),
            }
        }

        Ok(header.body(body.freeze()))
    }

    async fn continue_if_expected(&mut self, header: &RequestHeader) -> Result<(), HttpError> {
        let expect_continue =
            header.headers().get(EXPECT).is_some_and(|value| value.as_bytes().eq_ignore_ascii_case(b"100-continue"));

        if expect_continue {
            // the framed write buffer is always flushed between responses
            let io = self.framed.get_mut();
            io.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await.map_err(SendError::io)?;
            io.flush().await.map_err(SendError::io)?;
            info!("receive expect request header, sent continue response");
        }
        Ok(())
    }

    async fn reject(&mut self, e: &ParseError) {
        error!(cause = %e, "can't receive next request");
        if let Some(status) = e.response_status() {
            if let Err(send_error) = self.do_send_response(build_error_response(status)).await {
                warn!(cause = %send_error, "failed to send error response");
            }
        }
    }

    async fn send_response<T, E>(&mut self, response_result: Result<Response<T>, E>) -> Result<(), HttpError>
    where
        T: Body + Unpin,
        T::Error: Display,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        match response_result {
            Ok(response) => self.do_send_response(response).await,
            Err(e) => {
                let e: Box<dyn std::error::Error + Send + Sync> = e.into();
                error!(cause = %e, "handle response error");
                self.do_send_response(build_error_response(StatusCode::INTERNAL_SERVER_ERROR)).await
            }
        }
    }

    async fn do_send_response<T>(&mut self, response: Response<T>) -> Result<(), HttpError>
    where
        T: Body + Unpin,
        T::Error: Display,
    {
        let (header_parts, mut body) = response.into_parts();

        let payload_size = match body.size_hint().exact() {
            Some(0) => PayloadSize::Empty,
            Some(length) => PayloadSize::Length(length),
            None => PayloadSize::Chunked,
        };

        let header = Message::<_, T::Data>::Header((ResponseHead::from_parts(header_parts, ()), payload_size));
        self.framed.feed(header).await?;

        loop {
            match body.frame().await {
                Some(Ok(frame)) => {
                    // trailers are not supported, only data frames are written
                    if let Ok(data) = frame.into_data() {
                        self.framed.send(Message::<(ResponseHead, PayloadSize), _>::Payload(PayloadItem::Chunk(data))).await?;
                    }
                }
                Some(Err(e)) => return Err(SendError::invalid_body(format!("resolve response body error: {e}")).into()),
                None => {
                    self.framed.feed(Message::<(ResponseHead, PayloadSize), T::Data>::Payload(PayloadItem::Eof)).await?;
                    break;
                }
            }
        }

        SinkExt::<Message<(ResponseHead, PayloadSize), T::Data>>::flush(&mut self.framed).await?;
        Ok(())
    }
}

fn build_error_response(status_code: StatusCode) -> Response<Empty<Bytes>> {
    let mut response = Response::new(Empty::new());
    *response.status_mut() = status_code;
    response.headers_mut().insert(CONNECTION, HeaderValue::from_static("close"));
    response
}
