use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use capstone_core::ApiError;
use serde::{Deserialize, Serialize};

/// Uniform response envelope for operation calls.
///
/// Success: `{success: true, data, message?}`. Failure:
/// `{success: false, error: {code, message}}` with the matching HTTP status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallResponse {
    /// Whether the call succeeded.
    pub success: bool,
    /// Result data (if successful).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Human-readable result message (if any).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Error information (if failed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    /// Request id for tracing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl CallResponse {
    /// Create a successful response.
    pub fn success(data: serde_json::Value, message: Option<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message,
            error: None,
            request_id: None,
        }
    }

    /// Create an error response.
    pub fn error(error: ErrorBody) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(error),
            request_id: None,
        }
    }

    /// Add a request id to the response.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

impl IntoResponse for CallResponse {
    fn into_response(self) -> Response {
        let status = if self.success {
            StatusCode::OK
        } else {
            self.error
                .as_ref()
                .map(|e| e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        };

        (status, Json(self)).into_response()
    }
}

/// Structured error surfaced to callers: one of the five fixed codes plus
/// a human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// HTTP status for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self.code.as_str() {
            "unauthenticated" => StatusCode::UNAUTHORIZED,
            "permission-denied" => StatusCode::FORBIDDEN,
            "not-found" => StatusCode::NOT_FOUND,
            "invalid-argument" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ApiError> for ErrorBody {
    fn from(err: ApiError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}
