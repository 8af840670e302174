pub mod blob;
pub mod context;
pub mod gateway;
pub mod ops;
pub mod registry;
pub mod store;

pub use context::{AppState, OpContext, RequestMetadata};
pub use registry::{Operation, OperationInfo, OperationKind, OperationRegistry, Reply};
