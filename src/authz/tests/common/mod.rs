//! Scripted collaborators shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use relaygate_authz::RuntimeEnv;
use relaygate_core::error::uri;
use relaygate_core::{
    CallError, CallResult, Dict, Frame, Handshake, Peer, PeerError, Session, UpstreamClient, Value,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub const REALM: &str = "realm1";

/// Peer that replays scripted frames and records what it was sent
///
/// Once the script is exhausted `recv` never completes.
#[derive(Default)]
pub struct MockPeer {
    incoming: Mutex<VecDeque<Frame>>,
    sent: Mutex<Vec<Frame>>,
}

impl MockPeer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replying(frame: Frame) -> Self {
        let peer = Self::new();
        peer.push(frame);
        peer
    }

    pub fn push(&self, frame: Frame) {
        self.incoming.lock().unwrap().push_back(frame);
    }

    pub fn sent(&self) -> Vec<Frame> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Peer for MockPeer {
    async fn send(&self, frame: Frame) -> Result<(), PeerError> {
        self.sent.lock().unwrap().push(frame);
        Ok(())
    }

    async fn recv(&self) -> Result<Frame, PeerError> {
        let next = self.incoming.lock().unwrap().pop_front();
        match next {
            Some(frame) => Ok(frame),
            None => std::future::pending().await,
        }
    }
}

type Handler = Box<dyn Fn(&[Value]) -> Result<CallResult, CallError> + Send + Sync>;

/// Upstream client with per-procedure scripted handlers and a call log
#[derive(Default)]
pub struct MockUpstream {
    handlers: Mutex<HashMap<String, Handler>>,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
}

impl MockUpstream {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on<F>(&self, procedure: &str, handler: F)
    where
        F: Fn(&[Value]) -> Result<CallResult, CallError> + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .unwrap()
            .insert(procedure.to_string(), Box::new(handler));
    }

    /// Always reply with the given positional arguments
    pub fn reply(&self, procedure: &str, args: Vec<Value>) {
        self.on(procedure, move |_| Ok(CallResult::with_args(args.clone())));
    }

    /// Always fail with the given error
    pub fn fail(&self, procedure: &str, error: CallError) {
        self.on(procedure, move |_| Err(error.clone()));
    }

    /// Arguments of every call made to `procedure`, oldest first
    pub fn calls(&self, procedure: &str) -> Vec<Vec<Value>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == procedure)
            .map(|(_, args)| args.clone())
            .collect()
    }

    pub fn call_count(&self, procedure: &str) -> usize {
        self.calls(procedure).len()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl UpstreamClient for MockUpstream {
    async fn call(
        &self,
        procedure: &str,
        args: Vec<Value>,
        _kwargs: Dict,
    ) -> Result<CallResult, CallError> {
        self.calls
            .lock()
            .unwrap()
            .push((procedure.to_string(), args.clone()));

        let handlers = self.handlers.lock().unwrap();
        match handlers.get(procedure) {
            Some(handler) => handler(&args),
            None => Err(CallError::new(
                uri::NO_SUCH_PROCEDURE,
                format!("no handler for {procedure}"),
            )),
        }
    }
}

pub fn env(upstream: &Arc<MockUpstream>) -> RuntimeEnv {
    RuntimeEnv::new(REALM, Arc::clone(upstream) as Arc<dyn UpstreamClient>)
}

pub fn dict(value: Value) -> Dict {
    value.as_object().cloned().unwrap_or_default()
}

pub fn handshake(authid: &str) -> Handshake {
    Handshake::new(dict(serde_json::json!({ "authid": authid })))
}

/// Session carrying the given `authrole` detail
pub fn session_with_roles(id: u64, roles: Value) -> Session {
    Session::new(id, Dict::new())
        .with_detail("authid", format!("user-{id}"))
        .with_detail("authrole", roles)
        .with_detail("authprovider", "dynamic")
        .with_detail("authmethod", "ticket")
}
