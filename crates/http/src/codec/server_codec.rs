use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::protocol::{Message, ParseError, PayloadSize, RequestHeader, ResponseHead, SendError};

/// Request decoder and response encoder on one duplex stream, so a connection
/// can be driven by a single `Framed` and taken apart again on upgrade.
#[derive(Debug, Default)]
pub struct ServerCodec {
    decoder: RequestDecoder,
    encoder: ResponseEncoder,
}

impl ServerCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for ServerCodec {
    type Item = Message<(RequestHeader, PayloadSize)>;
    type Error = ParseError;

    #[inline]
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.decoder.decode(src)
    }
}

impl<D: Buf> Encoder<Message<(ResponseHead, PayloadSize), D>> for ServerCodec {
    type Error = SendError;

    #[inline]
    fn encode(&mut self, item: Message<(ResponseHead, PayloadSize), D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encoder.encode(item, dst)
    }
}
