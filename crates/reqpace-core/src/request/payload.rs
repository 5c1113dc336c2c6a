//! Decoded response payload.

/// Body of a finished attempt: text for ordinary requests, raw bytes for binary ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    /// Decode a response body. Text decoding is lossy (invalid UTF-8 becomes U+FFFD).
    pub fn decode(body: Vec<u8>, binary: bool) -> Self {
        if binary {
            Payload::Binary(body)
        } else {
            match String::from_utf8(body) {
                Ok(s) => Payload::Text(s),
                Err(e) => Payload::Text(String::from_utf8_lossy(e.as_bytes()).into_owned()),
            }
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(s) => s.as_bytes(),
            Payload::Binary(b) => b,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            Payload::Binary(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empty, or text that is only whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            Payload::Text(s) => s.trim().is_empty(),
            Payload::Binary(b) => b.is_empty(),
        }
    }
}
