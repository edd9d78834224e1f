use bytes::{Bytes, BytesMut};
use http::{Request, Response};
use http_body_util::Full;

/// Decides, per fully aggregated request, whether the connection leaves HTTP.
///
/// Implementations only inspect the request and build the answer; the
/// connection writes it and, on [`Negotiation::Accept`], hands the raw stream
/// back to the caller.
pub trait Upgrader: Send + Sync {
    fn negotiate(&self, request: &Request<Bytes>) -> Negotiation;
}

#[derive(Debug)]
pub enum Negotiation {
    /// Not an upgrade target, the request goes to the handler.
    Pass,
    /// Handshake accepted: the response is written and HTTP framing ends.
    Accept(Response<Full<Bytes>>),
    /// Handshake refused: the response is written and HTTP continues.
    Reject(Response<Full<Bytes>>),
}

/// Never upgrades.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoUpgrade;

impl Upgrader for NoUpgrade {
    fn negotiate(&self, _request: &Request<Bytes>) -> Negotiation {
        Negotiation::Pass
    }
}

/// How an HTTP connection ended without error.
#[derive(Debug)]
pub enum Processed<S> {
    /// The peer closed or the last request asked for `Connection: close`.
    Closed,
    Upgraded(Upgraded<S>),
}

/// A connection whose upgrade handshake has been answered.
#[derive(Debug)]
pub struct Upgraded<S> {
    /// The raw stream, positioned right after the handshake request.
    pub io: S,
    /// Bytes the peer sent after the handshake request that were already read.
    pub read_buf: BytesMut,
    /// The handshake request itself.
    pub request: Request<Bytes>,
}
