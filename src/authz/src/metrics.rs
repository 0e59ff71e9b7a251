//! Counters for authentication and authorization outcomes

use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Success and rejection counts for one authentication method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MethodCounters {
    pub succeeded: u64,
    pub rejected: u64,
}

/// Point-in-time copy of all counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub authorization_succeeded: u64,
    pub authorization_rejected: u64,
    pub authentication: BTreeMap<String, MethodCounters>,
    pub roles: BTreeMap<String, u64>,
    pub pings: u64,
}

/// Shared metrics sink
///
/// All operations are safe to call from any task.
#[derive(Debug, Default)]
pub struct Metrics {
    authorization_succeeded: AtomicU64,
    authorization_rejected: AtomicU64,
    authentication: DashMap<String, MethodCounters>,
    roles: DashMap<String, u64>,
    pings: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an authorization decision
    pub fn record_authorization(&self, permitted: bool) {
        let counter = if permitted {
            &self.authorization_succeeded
        } else {
            &self.authorization_rejected
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of an authentication attempt
    pub fn record_authentication(&self, method: &str, succeeded: bool) {
        let mut counters = self.authentication.entry(method.to_string()).or_default();
        if succeeded {
            counters.succeeded += 1;
        } else {
            counters.rejected += 1;
        }
    }

    /// Count one authenticated client per role
    pub fn record_roles<S: AsRef<str>>(&self, roles: &[S]) {
        for role in roles {
            *self.roles.entry(role.as_ref().to_string()).or_default() += 1;
        }
    }

    pub fn record_ping(&self) {
        self.pings.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy out the current counter values
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            authorization_succeeded: self.authorization_succeeded.load(Ordering::Relaxed),
            authorization_rejected: self.authorization_rejected.load(Ordering::Relaxed),
            authentication: self
                .authentication
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
            roles: self
                .roles
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
            pings: self.pings.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_authentication_counters_per_method() {
        let metrics = Metrics::new();
        metrics.record_authentication("ticket", true);
        metrics.record_authentication("ticket", false);
        metrics.record_authentication("ticket", true);
        metrics.record_authentication("tls", false);

        let snapshot = metrics.snapshot();
        assert_eq!(
            snapshot.authentication["ticket"],
            MethodCounters { succeeded: 2, rejected: 1 }
        );
        assert_eq!(snapshot.authentication["tls"].rejected, 1);
    }

    #[test]
    fn test_roles_and_pings() {
        let metrics = Metrics::new();
        metrics.record_roles(&["user", "admin"]);
        metrics.record_roles(&["user"]);
        metrics.record_ping();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.roles["user"], 2);
        assert_eq!(snapshot.roles["admin"], 1);
        assert_eq!(snapshot.pings, 1);
    }

    #[tokio::test]
    async fn test_concurrent_updates() {
        let metrics = Arc::new(Metrics::new());
        let mut handles = Vec::new();

        for i in 0..8 {
            let metrics = Arc::clone(&metrics);
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    metrics.record_authorization(i % 2 == 0);
                    metrics.record_authentication("anonymous", true);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.authorization_succeeded, 400);
        assert_eq!(snapshot.authorization_rejected, 400);
        assert_eq!(snapshot.authentication["anonymous"].succeeded, 800);
    }
}
