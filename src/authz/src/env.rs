//! Runtime environment shared by the pipeline components

use std::sync::Arc;

use relaygate_core::{CallError, CallResult, Dict, UpstreamClient, Value};

use crate::metrics::Metrics;

/// Realm name, upstream client and metrics sink
///
/// Cheap to clone; every component holds its own copy.
#[derive(Clone)]
pub struct RuntimeEnv {
    pub realm: String,
    pub client: Arc<dyn UpstreamClient>,
    pub metrics: Arc<Metrics>,
}

impl RuntimeEnv {
    pub fn new(realm: impl Into<String>, client: Arc<dyn UpstreamClient>) -> Self {
        Self {
            realm: realm.into(),
            client,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Share an existing metrics sink
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Call an upstream procedure with positional arguments only
    pub async fn call(&self, procedure: &str, args: Vec<Value>) -> Result<CallResult, CallError> {
        self.client.call(procedure, args, Dict::new()).await
    }
}

impl std::fmt::Debug for RuntimeEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeEnv")
            .field("realm", &self.realm)
            .finish_non_exhaustive()
    }
}
