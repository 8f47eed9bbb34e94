use edgerelay_core::error::EdgeError;
use thiserror::Error;

/// Everything that turns a relay into the uniform 500 reply.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{0}")]
    Query(#[source] EdgeError),
    #[error("invalid upstream URL: {0}")]
    Uri(#[from] http::uri::InvalidUri),
    #[error("no HTTP client is available for this request")]
    MissingClient,
    #[error("upstream request failed: {0}")]
    Upstream(#[source] EdgeError),
    #[error("failed to read upstream body: {0}")]
    Body(anyhow::Error),
    #[error("upstream body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
