//! Relaygate Node Library
//!
//! Configuration, logging setup and the realm bootstrap that turns a
//! [`BrokerConfig`] into the authentication, authorization and publish
//! filtering hooks a router calls.

pub mod bootstrap;
pub mod config;
pub mod logging;

pub use bootstrap::RealmHooks;
pub use config::BrokerConfig;
pub use logging::LogFormat;
