use std::fmt;

use crate::protocol::MAGIC;

/// The family a connection speaks, decided once per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Unclassified,
    Binary,
    Http,
    /// An HTTP connection after a successful upgrade.
    WebSocket,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unclassified => "unclassified",
            Self::Binary => "binary",
            Self::Http => "http",
            Self::WebSocket => "websocket",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a connection from the bytes it sent first.
///
/// Returns `None` while `prefix` is still a prefix of [`MAGIC`], the only case
/// where more input is needed. A full magic match is [`Protocol::Binary`];
/// any mismatching byte is [`Protocol::Http`].
pub fn classify(prefix: &[u8]) -> Option<Protocol> {
    let compared = prefix.len().min(MAGIC.len());
    if prefix[..compared] != MAGIC[..compared] {
        Some(Protocol::Http)
    } else if compared == MAGIC.len() {
        Some(Protocol::Binary)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_is_binary() {
        assert_eq!(classify(&[0xCA, 0xFE]), Some(Protocol::Binary));
        assert_eq!(classify(&[0xCA, 0xFE, 0x00, 0x02, b'h', b'i']), Some(Protocol::Binary));
    }

    #[test]
    fn anything_else_is_http() {
        assert_eq!(classify(b"GET / HTTP/1.1\r\n"), Some(Protocol::Http));
        assert_eq!(classify(&[0xCA, 0xFF]), Some(Protocol::Http));
        assert_eq!(classify(&[0x00]), Some(Protocol::Http));
    }

    #[test]
    fn magic_prefix_needs_more() {
        assert_eq!(classify(&[]), None);
        assert_eq!(classify(&[0xCA]), None);
    }

    #[test]
    fn independent_of_chunking() {
        for wire in [&b"\xCA\xFE\x00\x00"[..], &b"POST /x HTTP/1.1\r\n"[..], &b"\xCA\x01"[..]] {
            let whole = classify(wire);
            let byte_by_byte = (1..=wire.len()).find_map(|end| classify(&wire[..end]));
            assert_eq!(whole, byte_by_byte);
        }
    }
}
