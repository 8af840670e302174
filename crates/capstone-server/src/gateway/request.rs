use serde::{Deserialize, Serialize};

/// Request body for operation calls on `POST /call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRequest {
    /// Operation name to invoke.
    pub operation: String,
    /// Operation arguments as JSON.
    #[serde(default)]
    pub args: serde_json::Value,
}

impl CallRequest {
    /// Create a new call request.
    pub fn new(operation: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            operation: operation.into(),
            args,
        }
    }
}
