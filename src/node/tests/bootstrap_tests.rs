//! Realm bootstrap tests
//!
//! Builds `RealmHooks` from configuration against a scripted upstream and
//! checks the resulting wiring end to end.

use async_trait::async_trait;
use relaygate_core::{
    CallError, CallResult, Dict, Frame, Handshake, Message, Peer, PeerError, Procedure,
    ProcedureRegistry, Session, SessionId, UpstreamClient, Value,
};
use relaygate_authz::Authenticator;
use relaygate_node::{BrokerConfig, RealmHooks};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Upstream with fixed replies per procedure
#[derive(Default)]
struct ScriptedUpstream {
    replies: Mutex<HashMap<String, Vec<Value>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedUpstream {
    fn reply(&self, procedure: &str, args: Vec<Value>) {
        self.replies.lock().unwrap().insert(procedure.to_string(), args);
    }

    fn count(&self, procedure: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|p| *p == procedure).count()
    }
}

#[async_trait]
impl UpstreamClient for ScriptedUpstream {
    async fn call(&self, procedure: &str, _args: Vec<Value>, _kwargs: Dict) -> Result<CallResult, CallError> {
        self.calls.lock().unwrap().push(procedure.to_string());
        match self.replies.lock().unwrap().get(procedure) {
            Some(args) => Ok(CallResult::with_args(args.clone())),
            None => Err(CallError::internal(format!("unscripted {procedure}"))),
        }
    }
}

/// Registry that keeps what it is given
#[derive(Default)]
struct RecordingRegistry {
    procedures: Mutex<HashMap<String, Arc<dyn Procedure>>>,
}

impl RecordingRegistry {
    fn get(&self, uri: &str) -> Arc<dyn Procedure> {
        Arc::clone(self.procedures.lock().unwrap().get(uri).expect("procedure registered"))
    }
}

#[async_trait]
impl ProcedureRegistry for RecordingRegistry {
    async fn register(&self, uri: &str, procedure: Arc<dyn Procedure>) -> Result<(), CallError> {
        self.procedures.lock().unwrap().insert(uri.to_string(), procedure);
        Ok(())
    }
}

struct OneShotPeer(Mutex<Option<Frame>>);

#[async_trait]
impl Peer for OneShotPeer {
    async fn send(&self, _frame: Frame) -> Result<(), PeerError> {
        Ok(())
    }

    async fn recv(&self) -> Result<Frame, PeerError> {
        let frame = self.0.lock().unwrap().take();
        frame.ok_or(PeerError::Closed)
    }
}

fn session(roles: Value) -> Session {
    Session::new(9, Dict::new()).with_detail("authrole", roles)
}

// ============================================================================
// WIRING
// ============================================================================

#[tokio::test]
async fn test_default_wiring() {
    let hooks = RealmHooks::build(&BrokerConfig::new("realm1"), Arc::new(ScriptedUpstream::default())).unwrap();

    assert_eq!(hooks.realm(), "realm1");
    assert_eq!(hooks.auth_methods(), vec!["ticket", "resume", "anonymous"]);
    assert_eq!(
        hooks.procedure_uris(),
        vec!["ee.auth.create-token", "ee.ping", "ee.metrics"]
    );

    // No authorizer configured: everything passes
    let permit = hooks.authorize(&session(json!("anyone")), &Message::call("p")).await.unwrap();
    assert!(permit);
}

#[tokio::test]
async fn test_combined_authorizers_require_all() {
    let upstream = Arc::new(ScriptedUpstream::default());
    upstream.reply("ee.featureauth.matrix", vec![json!({"f": {"analyst": true}})]);
    upstream.reply("ee.featureauth.mapping", vec![json!({"f": ["com.app.report"]})]);
    upstream.reply("ee.auth.authorize", vec![json!({"allow": false})]);

    let mut config = BrokerConfig::new("realm1");
    config.authorization.feature.enabled = true;
    config.authorization.dynamic.enabled = true;
    let hooks = RealmHooks::build(&config, upstream.clone()).unwrap();
    assert!(hooks.procedure_uris().contains(&"ee.featureauth.update"));

    let registry = RecordingRegistry::default();
    hooks.register_procedures(&registry).await.unwrap();
    registry
        .get("ee.featureauth.update")
        .invoke(vec![], Dict::new())
        .await
        .unwrap();

    let analyst = session(json!(["analyst"]));
    let permit = hooks.authorize(&analyst, &Message::call("com.app.report")).await.unwrap();
    assert!(!permit, "Dynamic denial must win under require-all");
    assert_eq!(upstream.count("ee.auth.authorize"), 1);

    let trusted = session(json!(["trusted"]));
    assert!(hooks.authorize(&trusted, &Message::call("com.app.report")).await.unwrap());
}

#[tokio::test]
async fn test_publish_filter_toggle() {
    let options = json!({"exclude": [9]}).as_object().cloned().unwrap();
    let message = Message::publish("com.app.news", options);

    let hooks = RealmHooks::build(&BrokerConfig::new("realm1"), Arc::new(ScriptedUpstream::default())).unwrap();
    let filter = hooks.publish_filter(&message).expect("filter enabled by default");
    assert!(!filter.allowed(&session(json!("user"))));

    let mut config = BrokerConfig::new("realm1");
    config.filter.enabled = false;
    let hooks = RealmHooks::build(&config, Arc::new(ScriptedUpstream::default())).unwrap();
    assert!(hooks.publish_filter(&message).is_none());
}

#[tokio::test]
async fn test_resume_token_via_registered_procedure() {
    let upstream = Arc::new(ScriptedUpstream::default());
    upstream.reply("ee.auth.get-roles", vec![json!(["user", "trusted"])]);

    let mut config = BrokerConfig::new("realm1");
    config.resolver.excluded_roles = vec!["trusted".to_string()];
    let hooks = RealmHooks::build(&config, upstream).unwrap();

    let registry = RecordingRegistry::default();
    hooks.register_procedures(&registry).await.unwrap();
    let token = registry
        .get("ee.auth.create-token")
        .invoke(vec![json!("alice")], Dict::new())
        .await
        .unwrap();
    let secret = token.first().and_then(Value::as_str).unwrap().to_string();

    let peer = OneShotPeer(Mutex::new(Some(Frame::authenticate(secret, Dict::new()))));
    let handshake = Handshake::new(json!({"authid": "resume"}).as_object().cloned().unwrap());
    let welcome = hooks
        .authenticator("resume")
        .expect("resume enabled")
        .authenticate(SessionId(1), &handshake, &peer)
        .await
        .unwrap();

    assert_eq!(welcome.authid(), "alice");
    assert_eq!(welcome.authroles(), vec!["user".to_string()]);

    let metrics = registry
        .get("ee.metrics")
        .invoke(vec![], Dict::new())
        .await
        .unwrap();
    assert_eq!(metrics.first().unwrap()["authentication"]["resume"]["succeeded"], 1);
}

#[tokio::test(start_paused = true)]
async fn test_start_refreshes_feature_matrix() {
    let upstream = Arc::new(ScriptedUpstream::default());
    upstream.reply("ee.featureauth.matrix", vec![json!({})]);
    upstream.reply("ee.featureauth.mapping", vec![json!({})]);

    let mut config = BrokerConfig::new("realm1");
    config.authorization.feature.enabled = true;
    config.authorization.feature.refresh_interval_secs = 10;
    config.resume.enabled = false;
    let hooks = RealmHooks::build(&config, upstream.clone()).unwrap();

    let handles = hooks.start();
    assert_eq!(handles.len(), 1);
    tokio::time::sleep(Duration::from_secs(25)).await;
    for handle in handles {
        handle.abort();
    }

    assert_eq!(upstream.count("ee.featureauth.matrix"), 3);
}

#[test]
fn test_build_fails_on_unreadable_ca() {
    let mut config = BrokerConfig::new("realm1");
    config.tls.client_cas = vec![relaygate_node::config::ClientCaEntry::Spec(
        "device;/nonexistent/ca.pem".to_string(),
    )];
    assert!(RealmHooks::build(&config, Arc::new(ScriptedUpstream::default())).is_err());
}

#[test]
fn test_build_rejects_out_of_range_token_ttl() {
    let mut config = BrokerConfig::new("realm1");
    config.resume.token_ttl_secs = i64::MAX;
    assert!(RealmHooks::build(&config, Arc::new(ScriptedUpstream::default())).is_err());
}
