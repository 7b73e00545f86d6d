use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Structured error reported by the service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// What the service answered for one request.
///
/// At most one of `data` and `error` is populated.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceResponse {
    pub status: u16,
    pub data: Option<JsonValue>,
    pub error: Option<ServiceError>,
}

impl ServiceResponse {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Number of rows when the payload is a JSON array.
    pub fn row_count(&self) -> Option<usize> {
        self.data.as_ref()?.as_array().map(Vec::len)
    }
}
