mod claims;
mod context;

pub use claims::{Claims, ClaimsBuilder};
pub use context::AuthContext;
