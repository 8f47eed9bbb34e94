//! Where and how a request is forwarded.

use edgerelay_core::context::RequestContext;
use edgerelay_core::body::Body;
use edgerelay_core::http::{header::HOST, Method, Request, Uri};
use edgerelay_core::proxy::ProxyRequest;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::RelayError;

/// The existing data worker every request is relayed to.
pub const UPSTREAM_BASE_URL: &str = "https://rustwasm-fullstack-app.sumitomo0210.workers.dev/";

/// The only inbound query parameter that is forwarded.
pub const CODES_PARAM: &str = "codes";

// Everything except ALPHA / DIGIT / - _ . ! ~ * ' ( ) is escaped, the same set JavaScript's
// `encodeURIComponent` leaves alone.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_uri_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// Upstream target, with `?codes=` appended when a value is given.
pub fn upstream_uri(codes: Option<&str>) -> Result<Uri, RelayError> {
    let target = match codes {
        Some(codes) => format!(
            "{}?{}={}",
            UPSTREAM_BASE_URL,
            CODES_PARAM,
            encode_uri_component(codes)
        ),
        None => UPSTREAM_BASE_URL.to_string(),
    };
    Ok(target.parse()?)
}

/// First `codes` value of the query string. An empty value counts as missing.
pub fn codes_param(ctx: &RequestContext) -> Result<Option<String>, RelayError> {
    let pairs: Vec<(String, String)> = ctx.query().map_err(RelayError::Query)?;
    Ok(pairs
        .into_iter()
        .find(|(name, _)| name == CODES_PARAM)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty()))
}

/// Reuse the inbound request for the upstream call: same method and headers minus `Host`,
/// body only for non-GET methods.
pub fn prepare_upstream_request(request: Request, target: Uri) -> ProxyRequest {
    let mut upstream = ProxyRequest::from_request(request, target);
    upstream.headers_mut().remove(HOST);
    if upstream.method() == Method::GET {
        *upstream.body_mut() = Body::empty();
    }
    upstream
}
