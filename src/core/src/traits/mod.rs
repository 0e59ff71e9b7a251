//! Collaborator traits implemented by the router

pub mod peer;
pub mod upstream;

// Re-export commonly used traits
pub use peer::Peer;
pub use upstream::{CallResult, Procedure, ProcedureRegistry, UpstreamClient};
