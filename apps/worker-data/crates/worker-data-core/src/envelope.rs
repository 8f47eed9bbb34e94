use edgerelay_core::http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::error::RelayError;

/// Value of `source` on every relayed reply.
pub const SOURCE: &str = "existing-worker";

pub const SUCCESS_MESSAGE: &str = "データ取得成功";
pub const UPSTREAM_ERROR_PREFIX: &str = "既存Workerからのエラー: ";
pub const UNKNOWN_ERROR: &str = "不明なエラー";
pub const INTERNAL_ERROR_PREFIX: &str = "Pages Function内部エラー: ";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Success,
    Error,
}

/// JSON reply body. Fields serialize in declaration order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Envelope {
    pub status: EnvelopeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<&'static str>,
    pub message: String,
}

impl Envelope {
    /// Wrap an upstream JSON payload. `status_text` only shows up in error messages.
    pub fn from_upstream(status: StatusCode, status_text: Option<&str>, data: Value) -> Self {
        let (status, message) = if status.is_success() {
            (EnvelopeStatus::Success, SUCCESS_MESSAGE.to_string())
        } else {
            let text = status_text.filter(|text| !text.is_empty()).unwrap_or(UNKNOWN_ERROR);
            (EnvelopeStatus::Error, format!("{}{}", UPSTREAM_ERROR_PREFIX, text))
        };
        Self {
            status,
            data: Some(data),
            source: Some(SOURCE),
            message,
        }
    }

    /// Reply for a relay that never produced upstream data.
    pub fn failure(error: &RelayError) -> Self {
        Self {
            status: EnvelopeStatus::Error,
            data: None,
            source: None,
            message: format!("{}{}", INTERNAL_ERROR_PREFIX, error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == EnvelopeStatus::Success
    }
}
