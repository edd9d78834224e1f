use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::Instant;
use tracing::debug;

use crate::dispatch::{Protocol, classify};
use crate::error::ServeError;

const INITIAL_BUFFER_SIZE: usize = 4 * 1024;

/// Process-unique, increasing id of an accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

impl ConnectionId {
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An accepted socket and the bytes read from it before classification.
#[derive(Debug)]
pub struct Connection<S> {
    id: ConnectionId,
    peer: SocketAddr,
    io: S,
    buffer: BytesMut,
    protocol: Protocol,
}

impl<S> Connection<S>
where
    S: AsyncRead + Unpin,
{
    pub fn new(id: ConnectionId, peer: SocketAddr, io: S) -> Self {
        Self { id, peer, io, buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE), protocol: Protocol::Unclassified }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Bytes read so far and not yet handed to a codec.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Reads until the protocol is known, at most once per connection.
    ///
    /// Fails with [`ServeError::Unclassified`] on EOF and with
    /// [`ServeError::ClassificationTimeout`] once `within` has elapsed, in
    /// both cases while the input is still a prefix of the binary magic.
    pub async fn classify(&mut self, within: Duration) -> Result<Protocol, ServeError> {
        if self.protocol != Protocol::Unclassified {
            return Ok(self.protocol);
        }

        let deadline = Instant::now() + within;
        loop {
            if let Some(protocol) = classify(&self.buffer) {
                debug!(%protocol, buffered = self.buffer.len(), "connection classified");
                self.protocol = protocol;
                return Ok(protocol);
            }

            let read = tokio::time::timeout_at(deadline, self.io.read_buf(&mut self.buffer))
                .await
                .map_err(|_elapsed| ServeError::ClassificationTimeout(within))??;
            if read == 0 {
                return Err(ServeError::Unclassified);
            }
        }
    }

    /// Gives up the socket together with every byte already read from it.
    pub fn into_parts(self) -> (S, BytesMut) {
        (self.io, self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncWriteExt, duplex};

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    #[test]
    fn ids_increase() {
        let first = ConnectionId::next();
        let second = ConnectionId::next();
        assert!(second > first);
    }

    #[tokio::test]
    async fn byte_at_a_time_binary_keeps_every_byte() {
        let (mut client, server) = duplex(64);
        let mut connection = Connection::new(ConnectionId::next(), peer(), server);

        let writer = tokio::spawn(async move {
            for byte in [0xCA, 0xFE, 0x00, 0x01] {
                client.write_all(&[byte]).await.unwrap();
                tokio::task::yield_now().await;
            }
            client
        });

        assert_eq!(connection.classify(Duration::from_secs(5)).await.unwrap(), Protocol::Binary);
        let _client = writer.await.unwrap();
        let (_io, buffered) = connection.into_parts();
        assert!(buffered.starts_with(&[0xCA, 0xFE]));
    }

    #[tokio::test]
    async fn first_mismatch_is_http() {
        let (mut client, server) = duplex(64);
        let mut connection = Connection::new(ConnectionId::next(), peer(), server);

        client.write_all(b"G").await.unwrap();
        assert_eq!(connection.classify(Duration::from_secs(5)).await.unwrap(), Protocol::Http);
        assert_eq!(connection.buffered(), b"G");
        assert_eq!(connection.protocol(), Protocol::Http);
    }

    #[tokio::test]
    async fn eof_on_magic_prefix_is_unclassified() {
        let (mut client, server) = duplex(64);
        let mut connection = Connection::new(ConnectionId::next(), peer(), server);

        client.write_all(&[0xCA]).await.unwrap();
        drop(client);
        assert!(matches!(connection.classify(Duration::from_secs(5)).await, Err(ServeError::Unclassified)));
        assert_eq!(connection.protocol(), Protocol::Unclassified);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_peer_times_out() {
        let (_client, server) = duplex(64);
        let mut connection = Connection::new(ConnectionId::next(), peer(), server);

        let result = connection.classify(Duration::from_secs(10)).await;
        assert!(matches!(result, Err(ServeError::ClassificationTimeout(within)) if within == Duration::from_secs(10)));
    }
}
