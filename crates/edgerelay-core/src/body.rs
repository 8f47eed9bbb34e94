use std::fmt;

use bytes::{Bytes, BytesMut};
use futures_util::stream::{LocalBoxStream, Stream, StreamExt, TryStreamExt};
use serde::Serialize;

/// HTTP body shared by requests, responses and proxied exchanges.
///
/// `Once` holds a fully buffered payload. `Stream` forwards chunks as they arrive and is boxed as a
/// `LocalBoxStream` because Cloudflare Workers run on `wasm32` without threads.
pub enum Body {
    Once(Bytes),
    Stream(LocalBoxStream<'static, Result<Bytes, anyhow::Error>>),
}

impl Body {
    pub fn empty() -> Self {
        Self::from_bytes(Bytes::new())
    }

    pub fn from_bytes<B>(bytes: B) -> Self
    where
        B: Into<Bytes>,
    {
        Self::Once(bytes.into())
    }

    pub fn from_stream<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + 'static,
        E: 'static,
        anyhow::Error: From<E>,
    {
        Self::Stream(stream.map_err(anyhow::Error::from).boxed_local())
    }

    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Bytes> + 'static,
    {
        Self::Stream(stream.map(Ok::<Bytes, anyhow::Error>).boxed_local())
    }

    pub fn json<T>(value: &T) -> Result<Self, serde_json::Error>
    where
        T: Serialize,
    {
        serde_json::to_vec(value).map(Self::from_bytes)
    }

    /// Buffered bytes. Panics for streaming bodies; call [`Body::collect`] for those.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Body::Once(bytes) => bytes.as_ref(),
            Body::Stream(_) => panic!("streaming body does not expose in-memory bytes"),
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Body::Stream(_))
    }

    /// A buffered empty body stands for "no body". A stream always counts as present because its
    /// length is unknown until it has been read.
    pub fn is_absent(&self) -> bool {
        matches!(self, Body::Once(bytes) if bytes.is_empty())
    }

    /// Drain the body into a single buffer.
    pub async fn collect(self) -> Result<Bytes, anyhow::Error> {
        match self {
            Body::Once(bytes) => Ok(bytes),
            Body::Stream(mut stream) => {
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
            Body::Once(bytes) => f
                .debug_struct("Body::Once")
                .field("len", &bytes.len())
                .finish(),
            Body::Stream(_) => f.debug_tuple("Body::Stream").finish(),
        }
    }
}

impl From<Bytes> for Body {
    fn from(value: Bytes) -> Self {
        Body::Once(value)
    }
}

impl From<Vec<u8>> for Body {
    fn from(value: Vec<u8>) -> Self {
        Body::from_bytes(value)
    }
}

impl From<&'static [u8]> for Body {
    fn from(value: &'static [u8]) -> Self {
        Body::from_bytes(Bytes::from_static(value))
    }
}

impl From<&str> for Body {
    fn from(value: &str) -> Self {
        Body::from_bytes(value.to_owned())
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Body::from_bytes(value)
    }
}
