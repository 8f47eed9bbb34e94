use axum::body::Body as AxumBody;
use axum::http::{header, HeaderValue, Response, StatusCode};
use tracing::error;

use edgerelay_core::body::Body;
use edgerelay_core::http::Response as CoreResponse;

/// Convert a core response into one hyper can serve.
///
/// Core streams are not `Send`, so streaming bodies are drained here while still on the thread
/// that runs the router. A stream that fails midway becomes a plain 500.
pub async fn into_axum_response(response: CoreResponse) -> Response<AxumBody> {
    let (parts, body) = response.into_parts();
    let body = match body {
        Body::Once(bytes) => AxumBody::from(bytes),
        stream @ Body::Stream(_) => match stream.collect().await {
            Ok(bytes) => AxumBody::from(bytes),
            Err(err) => {
                error!("streaming response error: {err}");
                return streaming_failure();
            }
        },
    };

    Response::from_parts(parts, body)
}

fn streaming_failure() -> Response<AxumBody> {
    let mut response = Response::new(AxumBody::from("streaming response error"));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
