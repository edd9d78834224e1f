use http::Response;

/// The header portion of a response, with the body attached separately
/// as a stream of [`PayloadItem`](super::PayloadItem)s.
pub type ResponseHead = Response<()>;
