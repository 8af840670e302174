//! Named operation registry.
//!
//! Every callable operation is a unit struct implementing [`Operation`]
//! with typed arguments and output; the registry erases the types behind a
//! JSON boundary and routes by name.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use capstone_core::{ApiError, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::context::OpContext;

/// Information about a registered operation.
#[derive(Debug, Clone)]
pub struct OperationInfo {
    /// Operation name (used for routing).
    pub name: &'static str,
    /// Human-readable description.
    pub description: Option<&'static str>,
    /// Kind of operation.
    pub kind: OperationKind,
    /// Whether authentication is required. Everything except health-style
    /// surfaces requires it.
    pub requires_auth: bool,
}

/// The kind of operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Query => write!(f, "query"),
            OperationKind::Mutation => write!(f, "mutation"),
        }
    }
}

/// Typed operation result: output data plus an optional human-readable
/// message surfaced in the response envelope.
#[derive(Debug, Clone)]
pub struct Reply<T> {
    pub data: T,
    pub message: Option<String>,
}

impl<T> Reply<T> {
    /// A reply with data only.
    pub fn new(data: T) -> Self {
        Self {
            data,
            message: None,
        }
    }

    /// Attach a message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Type-erased reply after serialization.
#[derive(Debug, Clone)]
pub struct RawReply {
    pub data: Value,
    pub message: Option<String>,
}

/// A callable operation with typed arguments and output.
pub trait Operation: Send + Sync + 'static {
    /// The input arguments type.
    type Args: DeserializeOwned + Send + Sync;
    /// The output type.
    type Output: Serialize + Send;

    /// Operation metadata.
    fn info() -> OperationInfo;

    /// Execute the operation.
    fn execute(
        ctx: &OpContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Reply<Self::Output>>> + Send + '_>>;
}

/// Type alias for a boxed operation handler over JSON values.
pub type BoxedOpFn = Arc<
    dyn Fn(&OpContext, Value) -> Pin<Box<dyn Future<Output = Result<RawReply>> + Send + '_>>
        + Send
        + Sync,
>;

/// Entry in the operation registry.
#[derive(Clone)]
pub struct OperationEntry {
    info: OperationInfo,
    handler: BoxedOpFn,
}

impl OperationEntry {
    pub fn info(&self) -> &OperationInfo {
        &self.info
    }

    /// Invoke the handler with raw JSON arguments.
    pub async fn invoke(&self, ctx: &OpContext, args: Value) -> Result<RawReply> {
        (self.handler)(ctx, args).await
    }
}

/// Registry of all callable operations.
#[derive(Clone, Default)]
pub struct OperationRegistry {
    operations: HashMap<String, OperationEntry>,
}

impl OperationRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            operations: HashMap::new(),
        }
    }

    /// Register an operation.
    pub fn register<O: Operation>(&mut self) {
        let info = O::info();
        let name = info.name.to_string();

        let handler: BoxedOpFn = Arc::new(move |ctx, args| {
            Box::pin(async move {
                // Calls with no args arrive as JSON null; operations with
                // all-optional argument structs accept an empty object.
                let args = if args.is_null() {
                    Value::Object(Default::default())
                } else {
                    args
                };
                let parsed: O::Args = serde_json::from_value(args)
                    .map_err(|e| ApiError::InvalidArgument(e.to_string()))?;
                let reply = O::execute(ctx, parsed).await?;
                let data = serde_json::to_value(reply.data)
                    .map_err(|e| ApiError::Internal(e.to_string()))?;
                Ok(RawReply {
                    data,
                    message: reply.message,
                })
            })
        });

        self.operations
            .insert(name, OperationEntry { info, handler });
    }

    /// Get an operation by name.
    pub fn get(&self, name: &str) -> Option<&OperationEntry> {
        self.operations.get(name)
    }

    /// All registered operation names.
    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(|s| s.as_str())
    }

    /// Number of registered operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_registry() {
        let registry = OperationRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_operation_kind_display() {
        assert_eq!(format!("{}", OperationKind::Query), "query");
        assert_eq!(format!("{}", OperationKind::Mutation), "mutation");
    }

    #[test]
    fn test_reply_with_message() {
        let reply = Reply::new(42).with_message("done");
        assert_eq!(reply.data, 42);
        assert_eq!(reply.message.as_deref(), Some("done"));
    }
}
