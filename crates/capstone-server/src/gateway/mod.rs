pub mod auth;
pub mod blobs;
pub mod call;
pub mod request;
pub mod response;
pub mod server;
pub mod trace;

pub use call::CallHandler;
pub use response::{CallResponse, ErrorBody};
pub use server::GatewayServer;
