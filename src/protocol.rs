//! JSON-lines messages exchanged with the host.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterRequest {
    #[serde(default)]
    pub request_id: Option<String>,
    /// Path of the page being rendered.
    pub path: String,
    pub page_info: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterResponse {
    pub request_id: String,
    pub page_info: Value,
    /// Set when the page info was passed through without filtering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
}

impl ErrorResponse {
    pub fn new<M: Into<String>>(request_id: Option<String>, kind: &str, message: M) -> Self {
        Self {
            request_id,
            error: ErrorDetail {
                message: message.into(),
                r#type: kind.to_string(),
            },
        }
    }
}
