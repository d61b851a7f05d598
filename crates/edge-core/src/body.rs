//! Response bodies: buffered or streamed.

use std::fmt;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};

use crate::error::Failure;

/// A boxed stream of body chunks.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, Failure>> + Send>>;

/// Response body.
///
/// Buffered bodies clone cheaply. A streamed body can be read exactly once,
/// so it cannot be cloned; call [`Body::collect`] first when a copy is needed.
pub enum Body {
    /// Fully buffered bytes.
    Full(Bytes),
    /// Chunks produced on demand.
    Stream(BodyStream),
}

impl Body {
    /// An empty buffered body.
    pub fn empty() -> Self {
        Self::Full(Bytes::new())
    }

    /// Wrap a chunk stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, Failure>> + Send + 'static,
    {
        Self::Stream(Box::pin(stream))
    }

    /// Buffered bytes, if the body is not streamed.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Full(bytes) => Some(bytes),
            Self::Stream(_) => None,
        }
    }

    /// Whether the body is a stream.
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }

    /// Clone a buffered body. Streams cannot be cloned.
    pub fn try_clone(&self) -> Option<Self> {
        self.as_bytes().map(|bytes| Self::Full(bytes.clone()))
    }

    /// Read the whole body into memory.
    pub async fn collect(self) -> Result<Bytes, Failure> {
        match self {
            Self::Full(bytes) => Ok(bytes),
            Self::Stream(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::Full(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Full(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::Full(Bytes::from(text))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::Full(Bytes::from_static(text.as_bytes()))
    }
}
