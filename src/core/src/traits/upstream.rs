//! Remote procedure calls into the router's own namespace

use crate::error::CallError;
use crate::types::{Dict, Value};
use async_trait::async_trait;
use std::sync::Arc;

/// Positional and keyword results of a call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallResult {
    pub args: Vec<Value>,
    pub kwargs: Dict,
}

impl CallResult {
    /// Result with positional arguments only
    pub fn with_args(args: Vec<Value>) -> Self {
        Self {
            args,
            kwargs: Dict::new(),
        }
    }

    /// First positional argument, if any
    pub fn first(&self) -> Option<&Value> {
        self.args.first()
    }
}

/// In-process client that calls procedures registered on the router
///
/// Deadlines and cancellation are the caller's business: wrap the returned
/// future in `tokio::time::timeout` or drop it.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn call(
        &self,
        procedure: &str,
        args: Vec<Value>,
        kwargs: Dict,
    ) -> Result<CallResult, CallError>;
}

/// A procedure this pipeline exposes back to the router
#[async_trait]
pub trait Procedure: Send + Sync {
    async fn invoke(&self, args: Vec<Value>, kwargs: Dict) -> Result<CallResult, CallError>;
}

/// Where procedures get registered
#[async_trait]
pub trait ProcedureRegistry: Send + Sync {
    async fn register(&self, uri: &str, procedure: Arc<dyn Procedure>) -> Result<(), CallError>;
}
