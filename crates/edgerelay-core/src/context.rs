use serde::de::DeserializeOwned;

use crate::error::EdgeError;
use crate::http::Request;
use crate::proxy::ProxyHandle;

/// Request context exposed to handlers and middleware.
pub struct RequestContext {
    request: Request,
}

impl RequestContext {
    pub fn new(request: Request) -> Self {
        Self { request }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn into_request(self) -> Request {
        self.request
    }

    /// Deserialize the query string. A missing query behaves like an empty one.
    pub fn query<T>(&self) -> Result<T, EdgeError>
    where
        T: DeserializeOwned,
    {
        let query = self.request.uri().query().unwrap_or("");
        serde_urlencoded::from_str(query)
            .map_err(|err| EdgeError::bad_request(format!("invalid query string: {}", err)))
    }

    /// Outbound HTTP capability installed by the platform adapter.
    pub fn proxy_handle(&self) -> Option<ProxyHandle> {
        self.request.extensions().get::<ProxyHandle>().cloned()
    }
}
