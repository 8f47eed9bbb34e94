//! Streaming decoders for compressed upstream bodies.
//!
//! Adapters forward the caller's `Accept-Encoding` unchanged, so an upstream may answer with a
//! compressed payload that the platform client did not unwrap. Handlers read plain bytes.

use std::io;

use async_compression::futures::bufread::{BrotliDecoder, GzipDecoder};
use async_stream::try_stream;
use bytes::Bytes;
use futures::io::{AsyncRead, AsyncReadExt, BufReader};
use futures_util::stream::{LocalBoxStream, Stream, StreamExt, TryStreamExt};

use crate::http::{header::CONTENT_ENCODING, HeaderMap};

const BUFFER_SIZE: usize = 8 * 1024;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentEncoding {
    Identity,
    Gzip,
    Brotli,
}

impl ContentEncoding {
    /// Unknown codings are passed through untouched.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "gzip" | "x-gzip" => Self::Gzip,
            "br" => Self::Brotli,
            _ => Self::Identity,
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(CONTENT_ENCODING)
            .and_then(|value| value.to_str().ok())
            .map(Self::parse)
            .unwrap_or(Self::Identity)
    }

    pub fn is_identity(self) -> bool {
        self == Self::Identity
    }

    /// Wrap a chunk stream so it yields decoded bytes.
    pub fn decode<S>(self, stream: S) -> LocalBoxStream<'static, Result<Bytes, io::Error>>
    where
        S: Stream<Item = Result<Vec<u8>, io::Error>> + Unpin + 'static,
    {
        match self {
            Self::Identity => stream.map_ok(Bytes::from).boxed_local(),
            Self::Gzip => {
                let reader = BufReader::new(stream.into_async_read());
                read_decoded(GzipDecoder::new(reader)).boxed_local()
            }
            Self::Brotli => {
                let reader = BufReader::new(stream.into_async_read());
                read_decoded(BrotliDecoder::new(reader)).boxed_local()
            }
        }
    }
}

fn read_decoded<R>(mut decoder: R) -> impl Stream<Item = Result<Bytes, io::Error>>
where
    R: AsyncRead + Unpin + 'static,
{
    try_stream! {
        let mut buffer = vec![0u8; BUFFER_SIZE];
        loop {
            let read = decoder.read(&mut buffer).await?;
            if read == 0 {
                break;
            }
            yield Bytes::copy_from_slice(&buffer[..read]);
        }
    }
}
