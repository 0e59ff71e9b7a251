//! # Relaygate Authorization Pipeline
//!
//! Authentication, authorization and publish filtering for a pub/sub and RPC
//! router.
//!
//! ## Features
//!
//! - **Authenticators** for anonymous, TLS client certificate, upstream
//!   verified ticket and single-use resume token logins
//! - **Authorizers** delegating to an upstream procedure or to a locally
//!   cached feature matrix, with a trusted-role fast path
//! - **Composition** of authorizers under all-of or one-of consent
//! - **Publish filters** over session ids and attributes with `all`, `any`
//!   and `not` combinators
//! - **Metrics** counters shared by every component
//!
//! ## Example
//!
//! ```rust
//! use relaygate_authz::filter::PublishFilter;
//! use relaygate_core::{Dict, Session};
//! use serde_json::json;
//!
//! let options = json!({"eligible_authrole": ["admin"]});
//! let filter = PublishFilter::from_options(options.as_object().unwrap()).unwrap();
//!
//! let admin = Session::new(1, Dict::new()).with_detail("authrole", json!("admin"));
//! let guest = Session::new(2, Dict::new()).with_detail("authrole", json!("guest"));
//! assert!(filter.allowed(&admin));
//! assert!(!filter.allowed(&guest));
//! ```

pub mod authn;
pub mod authorizer;
pub mod env;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod procedures;
pub mod roles;

// Re-export commonly used types
pub use authn::{
    AnonymousAuth, Authenticator, ClientCa, DynamicTicketAuth, ResumeAuth, SharedSecretResolver,
    TlsAuth, TokenStore,
};
pub use authorizer::{
    Authorizer, ConsentMode, DynamicAuthorizer, FailurePolicy, FeatureAuthorizer,
    MultiAuthorizer, TrustedRoleAuthorizer, UpstreamFailure,
};
pub use env::RuntimeEnv;
pub use error::{AuthError, AuthzError, CertificateError, Result};
pub use filter::{build_publish_filter, PublishFilter};
pub use metrics::{Metrics, MetricsSnapshot};
pub use roles::{RoleSet, TrustedRoles};
