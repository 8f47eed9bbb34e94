use edgerelay_core::body::Body;
use edgerelay_core::error::EdgeError;
use edgerelay_core::http::Response;
use futures_util::StreamExt;
use worker::{Error as WorkerError, Response as CfResponse};

pub fn from_core_response(response: Response) -> Result<CfResponse, EdgeError> {
    let (parts, body) = response.into_parts();

    let cf_response = match body {
        Body::Once(bytes) if bytes.is_empty() => CfResponse::empty().map_err(EdgeError::internal)?,
        Body::Once(bytes) => CfResponse::from_bytes(bytes.to_vec()).map_err(EdgeError::internal)?,
        Body::Stream(stream) => {
            let worker_stream = stream
                .map(|chunk| {
                    chunk
                        .map(|bytes| bytes.to_vec())
                        .map_err(|err| WorkerError::RustError(err.to_string()))
                })
                .boxed_local();
            CfResponse::from_stream(worker_stream).map_err(EdgeError::internal)?
        }
    };

    let mut cf_response = cf_response.with_status(parts.status.as_u16());
    let headers = cf_response.headers_mut();
    for (name, value) in parts.headers.iter() {
        // Workers headers are strings; opaque byte values cannot be represented.
        if let Ok(value) = value.to_str() {
            headers
                .append(name.as_str(), value)
                .map_err(EdgeError::internal)?;
        }
    }
    Ok(cf_response)
}
