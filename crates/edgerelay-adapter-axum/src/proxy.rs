use std::io;
use std::time::Duration;

use async_trait::async_trait;
use edgerelay_core::body::Body;
use edgerelay_core::encoding::ContentEncoding;
use edgerelay_core::error::EdgeError;
use edgerelay_core::http::{header, HeaderName, Method};
use edgerelay_core::proxy::{ProxyClient, ProxyRequest, ProxyResponse};
use futures_util::stream::{self, TryStreamExt};
use reqwest::Client;
use thiserror::Error;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

// Framing headers belong to each hop; reqwest computes its own.
const HOP_HEADERS: [HeaderName; 3] = [
    header::CONNECTION,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
];

#[derive(Debug, Error)]
pub enum AxumProxyError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("unsupported method {0}")]
    Method(String),
    #[error("failed to read request body: {0}")]
    RequestBody(anyhow::Error),
    #[error("could not connect to upstream: {0}")]
    Connect(#[source] reqwest::Error),
    #[error("upstream timed out after {}s", UPSTREAM_TIMEOUT.as_secs())]
    Timeout(#[source] reqwest::Error),
    #[error("upstream request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("failed to decode upstream body: {0}")]
    Decode(#[source] io::Error),
}

impl From<reqwest::Error> for AxumProxyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::Connect(err)
        } else if err.is_timeout() {
            Self::Timeout(err)
        } else {
            Self::Request(err)
        }
    }
}

/// Outbound client used by the dev server, backed by `reqwest`.
#[derive(Clone)]
pub struct AxumProxyClient {
    client: Client,
}

impl AxumProxyClient {
    pub fn new() -> Result<Self, AxumProxyError> {
        let client = Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()
            .map_err(AxumProxyError::Build)?;
        Ok(Self { client })
    }

    async fn forward(&self, request: ProxyRequest) -> Result<ProxyResponse, AxumProxyError> {
        let (method, uri, headers, body) = request.into_parts();
        let mut builder = self
            .client
            .request(reqwest_method(&method)?, uri.to_string());

        for (name, value) in headers.iter() {
            if HOP_HEADERS.contains(name) {
                continue;
            }
            builder = builder.header(name.clone(), value.clone());
        }

        // reqwest bodies must be `Send`, so streamed payloads are buffered first.
        if !body.is_absent() {
            let bytes = body.collect().await.map_err(AxumProxyError::RequestBody)?;
            builder = builder.body(bytes);
        }

        let response = builder.send().await?;
        let mut proxy_response = ProxyResponse::new(response.status(), Body::empty());
        for (name, value) in response.headers().iter() {
            proxy_response
                .headers_mut()
                .append(name.clone(), value.clone());
        }

        let encoding = ContentEncoding::from_headers(proxy_response.headers());
        let bytes = response.bytes().await?;
        let body = if encoding.is_identity() {
            Body::from(bytes)
        } else {
            let chunks = stream::iter([Ok::<Vec<u8>, io::Error>(bytes.to_vec())]);
            let decoded: Vec<bytes::Bytes> = encoding
                .decode(chunks)
                .try_collect()
                .await
                .map_err(AxumProxyError::Decode)?;
            let headers = proxy_response.headers_mut();
            headers.remove(header::CONTENT_ENCODING);
            headers.remove(header::CONTENT_LENGTH);
            Body::from(decoded.concat())
        };
        *proxy_response.body_mut() = body;

        Ok(proxy_response)
    }
}

#[async_trait(?Send)]
impl ProxyClient for AxumProxyClient {
    async fn send(&self, request: ProxyRequest) -> Result<ProxyResponse, EdgeError> {
        self.forward(request).await.map_err(EdgeError::internal)
    }
}

fn reqwest_method(method: &Method) -> Result<reqwest::Method, AxumProxyError> {
    reqwest::Method::from_bytes(method.as_str().as_bytes())
        .map_err(|_| AxumProxyError::Method(method.to_string()))
}
