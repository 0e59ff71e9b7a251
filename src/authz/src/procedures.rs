//! Housekeeping procedures exposed to the router

use async_trait::async_trait;
use std::sync::Arc;

use relaygate_core::{CallError, CallResult, Dict, Procedure, Value};
use tracing::debug;

use crate::metrics::Metrics;

/// Default URI of the keep-alive procedure
pub const DEFAULT_PING_PROCEDURE: &str = "ee.ping";

/// Default URI of the metrics procedure
pub const DEFAULT_METRICS_PROCEDURE: &str = "ee.metrics";

/// Keep-alive for idle clients; only counts invocations
pub struct PingProcedure {
    metrics: Arc<Metrics>,
}

impl PingProcedure {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }
}

#[async_trait]
impl Procedure for PingProcedure {
    async fn invoke(&self, _args: Vec<Value>, _kwargs: Dict) -> Result<CallResult, CallError> {
        self.metrics.record_ping();
        Ok(CallResult::default())
    }
}

/// Returns the current metrics snapshot as a dict
pub struct MetricsProcedure {
    metrics: Arc<Metrics>,
}

impl MetricsProcedure {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }
}

#[async_trait]
impl Procedure for MetricsProcedure {
    async fn invoke(&self, _args: Vec<Value>, _kwargs: Dict) -> Result<CallResult, CallError> {
        let snapshot = serde_json::to_value(self.metrics.snapshot())
            .map_err(|e| CallError::internal(e.to_string()))?;
        debug!("Serving metrics snapshot");
        Ok(CallResult::with_args(vec![snapshot]))
    }
}
