use serde::Serialize;

use crate::body::Body;
use crate::error::build_or_internal;
use crate::http::{
    header::{CONTENT_LENGTH, CONTENT_TYPE},
    response_builder, HeaderValue, Response, StatusCode,
};

/// Convert common return types into `Response`.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        response_with_body(StatusCode::OK, Body::from(self))
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        response_with_body(StatusCode::OK, Body::from(self))
    }
}

impl<T> IntoResponse for (StatusCode, T)
where
    T: IntoResponse,
{
    fn into_response(self) -> Response {
        let (status, inner) = self;
        let mut response = inner.into_response();
        *response.status_mut() = status;
        response
    }
}

/// Serialize the wrapped value as an `application/json` response with status 200.
///
/// Pair it with a status code, `(StatusCode::NOT_FOUND, Json(value))`, to mirror another status.
pub struct Json<T>(pub T);

impl<T> IntoResponse for Json<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        match Body::json(&self.0) {
            Ok(body) => {
                let builder = response_builder()
                    .status(StatusCode::OK)
                    .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                build_or_internal(builder, body)
            }
            Err(err) => crate::error::EdgeError::internal(err).into_response(),
        }
    }
}

/// Plain-text response with `Content-Length` set for non-empty buffered bodies.
pub fn response_with_body(status: StatusCode, body: Body) -> Response {
    let mut builder = response_builder().status(status);

    if let Body::Once(ref bytes) = body {
        if !bytes.is_empty() {
            builder = builder
                .header(CONTENT_LENGTH, bytes.len().to_string())
                .header(
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; charset=utf-8"),
                );
        }
    }

    build_or_internal(builder, body)
}
