//! Outbound HTTP capability.
//!
//! Handlers never talk to a platform HTTP client directly. Each adapter inserts a [`ProxyHandle`]
//! into the request extensions and handlers send [`ProxyRequest`]s through it, which keeps them
//! testable with an in-memory [`ProxyClient`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::body::Body;
use crate::error::EdgeError;
use crate::http::{HeaderMap, Method, Request, StatusCode, Uri};

/// Outbound request description.
pub struct ProxyRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
}

impl ProxyRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Body::empty(),
        }
    }

    /// Reuse method, headers and body of an inbound request, aimed at `uri`.
    pub fn from_request(request: Request, uri: Uri) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            method: parts.method,
            uri,
            headers: parts.headers,
            body,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    pub fn into_parts(self) -> (Method, Uri, HeaderMap, Body) {
        (self.method, self.uri, self.headers, self.body)
    }
}

impl fmt::Debug for ProxyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyRequest")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("headers", &self.headers)
            .finish()
    }
}

/// Response returned by a [`ProxyClient`].
pub struct ProxyResponse {
    status: StatusCode,
    status_text: Option<String>,
    headers: HeaderMap,
    body: Body,
}

impl ProxyResponse {
    pub fn new(status: StatusCode, body: Body) -> Self {
        Self {
            status,
            status_text: None,
            headers: HeaderMap::new(),
            body,
        }
    }

    /// Record the reason phrase the upstream actually sent.
    pub fn with_status_text(mut self, text: impl Into<String>) -> Self {
        self.status_text = Some(text.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Reason phrase sent by the upstream, else the canonical one for the status code. Empty
    /// phrases and unregistered codes yield `None`.
    pub fn status_text(&self) -> Option<&str> {
        match self.status_text.as_deref() {
            Some(text) if !text.is_empty() => Some(text),
            Some(_) => None,
            None => self.status.canonical_reason(),
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    pub fn into_body(self) -> Body {
        self.body
    }
}

impl fmt::Debug for ProxyResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyResponse")
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .finish()
    }
}

/// Cloneable handle stored in request extensions.
#[derive(Clone)]
pub struct ProxyHandle {
    client: Arc<dyn ProxyClient>,
}

impl ProxyHandle {
    pub fn new(client: Arc<dyn ProxyClient>) -> Self {
        Self { client }
    }

    pub fn with_client<C>(client: C) -> Self
    where
        C: ProxyClient + 'static,
    {
        Self {
            client: Arc::new(client),
        }
    }

    pub async fn send(&self, request: ProxyRequest) -> Result<ProxyResponse, EdgeError> {
        self.client.send(request).await
    }
}

impl fmt::Debug for ProxyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyHandle").finish_non_exhaustive()
    }
}

#[async_trait(?Send)]
pub trait ProxyClient: Send + Sync {
    async fn send(&self, request: ProxyRequest) -> Result<ProxyResponse, EdgeError>;
}
