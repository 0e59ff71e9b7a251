//! # Relaygate Core
//!
//! Router-facing vocabulary shared by the relaygate authentication and
//! authorization pipeline: sessions, protocol messages, handshake frames,
//! welcome details, and the collaborator traits a router implements
//! (`Peer`, `UpstreamClient`, `ProcedureRegistry`).

pub mod types;
pub mod traits;
pub mod error;

// Re-export commonly used types
pub use error::{CallError, PeerError};
pub use types::{
    Action, Dict, Frame, Handshake, Message, Session, SessionId, TransportInfo, Value, Welcome,
};
pub use traits::{CallResult, Peer, Procedure, ProcedureRegistry, UpstreamClient};
