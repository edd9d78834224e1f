use std::time::Duration;

use bytes::BytesMut;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, FramedParts};
use tracing::{debug, warn};

use crate::codec::FrameCodec;
use crate::error::ServeError;
use crate::handler::{FrameContext, FrameHandler};
use crate::protocol::Frame;

/// Drives the binary protocol: one frame in, at most one frame out, in order.
#[derive(Debug)]
pub struct FrameConnection<S> {
    framed: Framed<S, FrameCodec>,
    idle_timeout: Option<Duration>,
}

impl<S> FrameConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(io: S, codec: FrameCodec) -> Self {
        Self::with_buffered(io, BytesMut::new(), codec)
    }

    /// The codec sees `buffered` before anything still unread on `io`.
    pub fn with_buffered(io: S, buffered: BytesMut, codec: FrameCodec) -> Self {
        let mut parts = FramedParts::new::<Frame>(io, codec);
        parts.read_buf = buffered;
        Self { framed: Framed::from_parts(parts), idle_timeout: None }
    }

    #[must_use]
    pub fn idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = Some(idle_timeout);
        self
    }

    pub async fn process<F>(mut self, handler: &F, ctx: &FrameContext) -> Result<(), ServeError>
    where
        F: FrameHandler + ?Sized,
    {
        loop {
            let next = match self.idle_timeout {
                Some(idle) => tokio::time::timeout(idle, self.framed.next())
                    .await
                    .map_err(|_elapsed| ServeError::IdleTimeout(idle))?,
                None => self.framed.next().await,
            };

            let frame = match next {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    warn!(cause = %e, "can't decode frame, connection shutdown");
                    return Err(e.into());
                }
                None => {
                    debug!("peer closed, no more frames");
                    return Ok(());
                }
            };

            let reply = handler.on_frame(ctx, frame).await.map_err(ServeError::handler)?;
            if let Some(reply) = reply {
                self.framed.send(reply).await?;
            }
        }
    }
}
