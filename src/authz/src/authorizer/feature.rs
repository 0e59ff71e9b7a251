//! Feature-matrix authorization with atomic snapshot refresh

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use relaygate_core::{CallError, CallResult, Dict, Message, Procedure, Session, Value};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{Authorizer, FailurePolicy};
use crate::env::RuntimeEnv;
use crate::error::{AuthzError, Result};
use crate::roles::{RoleSet, TrustedRoles};

/// Default upstream procedure returning the feature matrix
pub const DEFAULT_MATRIX_PROCEDURE: &str = "ee.featureauth.matrix";

/// Default upstream procedure returning the feature mapping
pub const DEFAULT_MAPPING_PROCEDURE: &str = "ee.featureauth.mapping";

/// Default URI of the refresh procedure
pub const DEFAULT_UPDATE_PROCEDURE: &str = "ee.featureauth.update";

/// Feature URI to role to allowed
pub type FeatureMatrix = HashMap<String, HashMap<String, bool>>;

/// Endpoint URI to feature URI
pub type FeatureMapping = HashMap<String, String>;

/// Matrix and mapping from one refresh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSnapshot {
    pub matrix: FeatureMatrix,
    pub mapping: FeatureMapping,
}

impl FeatureSnapshot {
    /// Feature guarding an endpoint, empty when unmapped
    pub fn feature_for(&self, endpoint: &str) -> &str {
        self.mapping.get(endpoint).map(String::as_str).unwrap_or("")
    }

    /// True if `role` is granted `feature`
    pub fn grants(&self, feature: &str, role: &str) -> bool {
        self.matrix
            .get(feature)
            .and_then(|roles| roles.get(role))
            .copied()
            .unwrap_or(false)
    }
}

/// Parse a `{feature: {role: bool}}` reply
///
/// Non-boolean grants read as `false`; a non-dict row rejects the reply.
pub fn parse_matrix(procedure: &str, reply: &CallResult) -> Result<FeatureMatrix> {
    let rows = reply
        .first()
        .and_then(Value::as_object)
        .ok_or_else(|| AuthzError::invalid_reply(procedure, "expected a dict of features"))?;

    let mut matrix = FeatureMatrix::with_capacity(rows.len());
    for (feature, row) in rows {
        let row = row.as_object().ok_or_else(|| {
            AuthzError::invalid_reply(procedure, format!("roles of `{feature}` are not a dict"))
        })?;
        let grants = row
            .iter()
            .map(|(role, allowed)| (role.clone(), allowed.as_bool().unwrap_or(false)))
            .collect();
        matrix.insert(feature.clone(), grants);
    }
    Ok(matrix)
}

/// Parse a `{feature: [endpoint, ...]}` reply into endpoint to feature
pub fn parse_mapping(procedure: &str, reply: &CallResult) -> Result<FeatureMapping> {
    let features = reply
        .first()
        .and_then(Value::as_object)
        .ok_or_else(|| AuthzError::invalid_reply(procedure, "expected a dict of features"))?;

    let mut mapping = FeatureMapping::new();
    for (feature, endpoints) in features {
        let endpoints = endpoints.as_array().ok_or_else(|| {
            AuthzError::invalid_reply(procedure, format!("endpoints of `{feature}` are not a list"))
        })?;
        for endpoint in endpoints {
            let endpoint = endpoint.as_str().ok_or_else(|| {
                AuthzError::invalid_reply(procedure, format!("endpoint of `{feature}` is not a string"))
            })?;
            mapping.insert(endpoint.to_string(), feature.clone());
        }
    }
    Ok(mapping)
}

/// Authorizes against a locally cached feature matrix
///
/// Until the first successful [`update`](Self::update) every non-trusted
/// decision is the failure policy outcome. Refreshes replace the whole
/// snapshot at once; in-flight decisions keep the snapshot they loaded.
pub struct FeatureAuthorizer {
    env: RuntimeEnv,
    matrix_procedure: String,
    mapping_procedure: String,
    trusted: TrustedRoles,
    on_failure: FailurePolicy,
    snapshot: ArcSwapOption<FeatureSnapshot>,
}

impl FeatureAuthorizer {
    pub fn new(
        env: RuntimeEnv,
        matrix_procedure: impl Into<String>,
        mapping_procedure: impl Into<String>,
        trusted: TrustedRoles,
        on_failure: FailurePolicy,
    ) -> Self {
        Self {
            env,
            matrix_procedure: matrix_procedure.into(),
            mapping_procedure: mapping_procedure.into(),
            trusted,
            on_failure,
            snapshot: ArcSwapOption::empty(),
        }
    }

    /// Currently installed snapshot
    pub fn snapshot(&self) -> Option<Arc<FeatureSnapshot>> {
        self.snapshot.load_full()
    }

    /// Install a snapshot directly
    pub fn install(&self, snapshot: FeatureSnapshot) {
        self.snapshot.store(Some(Arc::new(snapshot)));
    }

    /// Fetch matrix and mapping and swap them in together
    ///
    /// Any failure leaves the previous snapshot in place.
    pub async fn update(&self) -> Result<()> {
        let matrix_reply = self.fetch(&self.matrix_procedure).await?;
        let matrix = parse_matrix(&self.matrix_procedure, &matrix_reply)?;

        let mapping_reply = self.fetch(&self.mapping_procedure).await?;
        let mapping = parse_mapping(&self.mapping_procedure, &mapping_reply)?;

        info!(
            features = matrix.len(),
            endpoints = mapping.len(),
            "Feature matrix updated"
        );
        self.install(FeatureSnapshot { matrix, mapping });
        Ok(())
    }

    async fn fetch(&self, procedure: &str) -> Result<CallResult> {
        self.env
            .call(procedure, Vec::new())
            .await
            .map_err(|source| AuthzError::Upstream {
                procedure: procedure.to_string(),
                source,
            })
    }

    /// Procedure that triggers [`update`](Self::update)
    pub fn update_procedure(self: &Arc<Self>) -> Arc<dyn Procedure> {
        Arc::new(UpdateProcedure {
            authorizer: Arc::clone(self),
        })
    }

    /// Refresh on a fixed interval until the handle is aborted
    ///
    /// The first tick fires immediately.
    pub fn spawn_refresh(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let authorizer = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                if let Err(err) = authorizer.update().await {
                    warn!(error = %err, "Periodic feature refresh failed");
                }
            }
        })
    }

    fn decide(&self, permit: bool) -> bool {
        self.env.metrics.record_authorization(permit);
        permit
    }
}

#[async_trait]
impl Authorizer for FeatureAuthorizer {
    async fn authorize(&self, session: &Session, message: &Message) -> Result<bool> {
        let Some((action, uri)) = message.action_target() else {
            return Ok(true);
        };
        let fallback = self.on_failure.permits();

        let roles = match RoleSet::from_session(session) {
            Ok(roles) => roles,
            Err(err) => {
                warn!(session = %session.id, error = %err, "Falling back to default decision");
                return Ok(self.decide(fallback));
            }
        };
        if roles.is_trusted(&self.trusted) {
            return Ok(self.decide(true));
        }

        let Some(snapshot) = self.snapshot.load_full() else {
            warn!(session = %session.id, "Feature matrix not loaded yet");
            return Ok(self.decide(fallback));
        };

        let feature = snapshot.feature_for(uri);
        let permit = roles.iter().any(|role| snapshot.grants(feature, role));
        debug!(session = %session.id, %action, uri, feature, permit, "Feature authorization");
        Ok(self.decide(permit || fallback))
    }
}

/// Registerable trigger for a feature refresh
pub struct UpdateProcedure {
    authorizer: Arc<FeatureAuthorizer>,
}

#[async_trait]
impl Procedure for UpdateProcedure {
    async fn invoke(&self, _args: Vec<Value>, _kwargs: Dict) -> std::result::Result<CallResult, CallError> {
        self.authorizer.update().await.map_err(|err| {
            warn!(error = %err, "Feature refresh failed");
            CallError::internal(err.to_string())
        })?;
        Ok(CallResult::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_matrix() {
        let reply = CallResult::with_args(vec![json!({
            "feature.a": {"admin": true, "user": "yes"},
            "feature.b": {}
        })]);
        let matrix = parse_matrix("m", &reply).unwrap();
        assert_eq!(matrix["feature.a"]["admin"], true);
        assert_eq!(matrix["feature.a"]["user"], false);
        assert!(matrix["feature.b"].is_empty());
    }

    #[test]
    fn test_parse_matrix_rejects_bad_rows() {
        let reply = CallResult::with_args(vec![json!({"feature.a": ["admin"]})]);
        assert!(matches!(
            parse_matrix("m", &reply),
            Err(AuthzError::InvalidReply { .. })
        ));
        assert!(parse_matrix("m", &CallResult::default()).is_err());
    }

    #[test]
    fn test_parse_mapping_inverts() {
        let reply = CallResult::with_args(vec![json!({
            "feature.a": ["com.app.p1", "com.app.p2"],
            "feature.b": ["com.app.t1"]
        })]);
        let mapping = parse_mapping("m", &reply).unwrap();
        assert_eq!(mapping["com.app.p1"], "feature.a");
        assert_eq!(mapping["com.app.p2"], "feature.a");
        assert_eq!(mapping["com.app.t1"], "feature.b");
    }

    #[test]
    fn test_parse_mapping_rejects_non_string_endpoint() {
        let reply = CallResult::with_args(vec![json!({"feature.a": ["ok", 5]})]);
        assert!(parse_mapping("m", &reply).is_err());
    }

    #[test]
    fn test_snapshot_lookup() {
        let mut snapshot = FeatureSnapshot::default();
        snapshot.mapping.insert("p".into(), "f".into());
        snapshot
            .matrix
            .insert("f".into(), HashMap::from([("r".to_string(), true)]));

        assert_eq!(snapshot.feature_for("p"), "f");
        assert_eq!(snapshot.feature_for("q"), "");
        assert!(snapshot.grants("f", "r"));
        assert!(!snapshot.grants("f", "s"));
        assert!(!snapshot.grants("", "r"));
    }
}
