use anyhow::Error as AnyError;
use serde_json::json;
use thiserror::Error;

use crate::body::Body;
use crate::http::{header::CONTENT_TYPE, HeaderValue, Response, ResponseBuilder, StatusCode};
use crate::response::IntoResponse;

/// Framework-level error that carries an HTTP status code.
#[derive(Debug, Error)]
pub enum EdgeError {
    #[error("{message}")]
    BadRequest { message: String },
    #[error("no route matched path: {path}")]
    NotFound { path: String },
    #[error("internal error: {source}")]
    Internal {
        #[from]
        source: AnyError,
    },
}

impl EdgeError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        EdgeError::BadRequest {
            message: message.into(),
        }
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        EdgeError::NotFound { path: path.into() }
    }

    pub fn internal<E>(error: E) -> Self
    where
        E: Into<AnyError>,
    {
        EdgeError::Internal {
            source: error.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            EdgeError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            EdgeError::NotFound { .. } => StatusCode::NOT_FOUND,
            EdgeError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl IntoResponse for EdgeError {
    fn into_response(self) -> Response {
        let status = self.status();
        let payload = json!({
            "error": {
                "status": status.as_u16(),
                "message": self.message(),
            }
        });

        let body = Body::json(&payload).unwrap_or_else(|_| Body::from("internal error"));
        let mut response = Response::new(body);
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

/// Build a response or fall back to a bare 500 when the builder rejects its input.
pub(crate) fn build_or_internal(builder: ResponseBuilder, body: Body) -> Response {
    builder.body(body).unwrap_or_else(|err| {
        log::error!("failed to build response: {err}");
        let mut fallback = Response::new(Body::empty());
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_sets_status_and_message() {
        let err = EdgeError::bad_request("oops");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "oops");
    }

    #[test]
    fn internal_wraps_source_error() {
        let err = EdgeError::internal(anyhow::anyhow!("dns lookup failed"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "internal error: dns lookup failed");
    }

    #[test]
    fn into_response_renders_json_error() {
        let response = EdgeError::not_found("/missing").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(CONTENT_TYPE),
            Some(&HeaderValue::from_static("application/json"))
        );
        let payload: serde_json::Value =
            serde_json::from_slice(response.body().as_bytes()).expect("json");
        assert_eq!(payload["error"]["status"], 404);
        assert_eq!(payload["error"]["message"], "no route matched path: /missing");
    }
}
