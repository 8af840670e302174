use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use capstone_core::{ApiError, AuthContext};

use super::request::CallRequest;
use super::response::{CallResponse, ErrorBody};
use super::trace::TracingState;
use crate::context::{AppState, OpContext, RequestMetadata};
use crate::registry::OperationRegistry;

/// Dispatches named operation calls against the registry.
#[derive(Clone)]
pub struct CallHandler {
    registry: Arc<OperationRegistry>,
    state: Arc<AppState>,
}

impl CallHandler {
    /// Create a new call handler.
    pub fn new(registry: OperationRegistry, state: Arc<AppState>) -> Self {
        Self {
            registry: Arc::new(registry),
            state,
        }
    }

    /// Handle one operation call.
    ///
    /// This is the single catch-all boundary of the failure policy: every
    /// error leaving an operation is one of the five taxonomy codes, and
    /// unexpected internals are logged here then re-surfaced with a generic
    /// message so the original cause never reaches the caller.
    pub async fn handle(
        &self,
        operation: &str,
        args: serde_json::Value,
        auth: AuthContext,
        meta: RequestMetadata,
    ) -> CallResponse {
        let request_id = meta.request_id.to_string();

        let Some(entry) = self.registry.get(operation) else {
            return CallResponse::error(ErrorBody::new(
                "not-found",
                format!("Operation '{}' not found", operation),
            ))
            .with_request_id(request_id);
        };

        if entry.info().requires_auth && !auth.is_authenticated() {
            return CallResponse::error(ErrorBody::new(
                "unauthenticated",
                "Authentication required",
            ))
            .with_request_id(request_id);
        }

        let trace_id = meta.trace_id.clone();
        let ctx = OpContext::new(self.state.clone(), auth, meta);

        match entry.invoke(&ctx, args).await {
            Ok(reply) => {
                CallResponse::success(reply.data, reply.message).with_request_id(request_id)
            }
            Err(err) => {
                let surfaced = match err {
                    ApiError::Internal(original) => {
                        tracing::error!(
                            operation = operation,
                            trace_id = %trace_id,
                            error = %original,
                            "Operation failed unexpectedly"
                        );
                        ApiError::Internal("An internal error occurred".into())
                    }
                    other => other,
                };
                CallResponse::error(surfaced.into()).with_request_id(request_id)
            }
        }
    }
}

fn metadata_from_trace(tracing: &TracingState) -> RequestMetadata {
    let mut meta = RequestMetadata::with_trace_id(tracing.trace_id.clone());
    if let Ok(id) = uuid::Uuid::parse_str(&tracing.request_id) {
        meta.request_id = id;
    }
    meta
}

/// Axum handler for `POST /call`.
pub async fn call_handler(
    State(handler): State<Arc<CallHandler>>,
    Extension(auth): Extension<AuthContext>,
    Extension(tracing): Extension<TracingState>,
    Json(request): Json<CallRequest>,
) -> CallResponse {
    let meta = metadata_from_trace(&tracing);
    handler
        .handle(&request.operation, request.args, auth, meta)
        .await
}

/// Axum handler for `POST /call/{operation}` (REST-style).
pub async fn call_operation_handler(
    State(handler): State<Arc<CallHandler>>,
    Extension(auth): Extension<AuthContext>,
    Extension(tracing): Extension<TracingState>,
    axum::extract::Path(operation): axum::extract::Path<String>,
    Json(args): Json<serde_json::Value>,
) -> CallResponse {
    let meta = metadata_from_trace(&tracing);
    handler.handle(&operation, args, auth, meta).await
}
