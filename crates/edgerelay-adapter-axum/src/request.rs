use axum::body::Body as AxumBody;
use axum::http::Request;
use edgerelay_core::body::Body;
use edgerelay_core::error::EdgeError;
use edgerelay_core::http::Request as CoreRequest;
use edgerelay_core::proxy::ProxyHandle;
use http::header::CONTENT_TYPE;
use http::HeaderValue;

/// Convert an axum request into a core request and install `proxy` as its outbound client.
///
/// JSON payloads are buffered; everything else keeps streaming.
pub async fn into_core_request(
    request: Request<AxumBody>,
    proxy: ProxyHandle,
) -> Result<CoreRequest, EdgeError> {
    let (parts, body) = request.into_parts();

    let body = match parts.headers.get(CONTENT_TYPE) {
        Some(value) if is_json_content_type(value) => {
            let bytes = axum::body::to_bytes(body, usize::MAX)
                .await
                .map_err(|err| EdgeError::bad_request(format!("failed to read body: {}", err)))?;
            Body::from_bytes(bytes)
        }
        _ if is_bodyless(&parts.headers) => Body::empty(),
        _ => Body::from_stream(body.into_data_stream()),
    };

    let mut core_request = CoreRequest::from_parts(parts, body);
    core_request.extensions_mut().insert(proxy);
    Ok(core_request)
}

// Without a length or chunked framing, HTTP/1 requests carry no payload.
fn is_bodyless(headers: &http::HeaderMap) -> bool {
    let declared_empty = headers
        .get(http::header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim() == "0");
    match declared_empty {
        Some(empty) => empty,
        None => !headers.contains_key(http::header::TRANSFER_ENCODING),
    }
}

fn is_json_content_type(value: &HeaderValue) -> bool {
    let Ok(raw) = value.to_str() else {
        return false;
    };

    let media_type = raw.split(';').next().map(str::trim).unwrap_or("");
    let Some((ty, subtype)) = media_type.split_once('/') else {
        return false;
    };
    if !ty.eq_ignore_ascii_case("application") {
        return false;
    }

    let subtype = subtype.trim().to_ascii_lowercase();
    subtype == "json" || subtype.ends_with("+json")
}
