//! Shared types for the relaygate pipeline

pub mod value;
pub mod session;
pub mod message;
pub mod welcome;
pub mod frame;

// Re-export commonly used types
pub use value::{Dict, Value};
pub use session::{Session, SessionId};
pub use message::{Action, Message};
pub use welcome::Welcome;
pub use frame::{Frame, Handshake, TransportInfo};
