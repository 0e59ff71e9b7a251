//! Result of a successful authentication

use serde::{Deserialize, Serialize};

use super::value::{Dict, Value};

/// Welcome details handed to the router after a successful handshake
///
/// Always carries `authid`, `authrole` (a list), `authprovider` and
/// `authmethod`; `authextra` is present when an authenticator supplied it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Welcome {
    details: Dict,
}

impl Welcome {
    pub const AUTHID: &'static str = "authid";
    pub const AUTHROLE: &'static str = "authrole";
    pub const AUTHPROVIDER: &'static str = "authprovider";
    pub const AUTHMETHOD: &'static str = "authmethod";
    pub const AUTHEXTRA: &'static str = "authextra";

    /// Build a welcome from identity fields
    pub fn new(
        authid: impl Into<String>,
        authroles: Vec<String>,
        authprovider: impl Into<String>,
        authmethod: impl Into<String>,
    ) -> Self {
        Self::from_base(Dict::new(), authid, authroles, authprovider, authmethod)
    }

    /// Build a welcome on top of pre-existing details
    ///
    /// The identity fields always overwrite same-named keys in `base`.
    pub fn from_base(
        mut base: Dict,
        authid: impl Into<String>,
        authroles: Vec<String>,
        authprovider: impl Into<String>,
        authmethod: impl Into<String>,
    ) -> Self {
        base.insert(Self::AUTHID.into(), Value::String(authid.into()));
        base.insert(
            Self::AUTHROLE.into(),
            Value::Array(authroles.into_iter().map(Value::String).collect()),
        );
        base.insert(Self::AUTHPROVIDER.into(), Value::String(authprovider.into()));
        base.insert(Self::AUTHMETHOD.into(), Value::String(authmethod.into()));
        Self { details: base }
    }

    /// Attach `authextra`, replacing any previous value
    pub fn with_extra(mut self, extra: Dict) -> Self {
        self.details
            .insert(Self::AUTHEXTRA.into(), Value::Object(extra));
        self
    }

    pub fn details(&self) -> &Dict {
        &self.details
    }

    pub fn into_details(self) -> Dict {
        self.details
    }

    pub fn authid(&self) -> &str {
        self.details
            .get(Self::AUTHID)
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    pub fn authmethod(&self) -> &str {
        self.details
            .get(Self::AUTHMETHOD)
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    pub fn authprovider(&self) -> &str {
        self.details
            .get(Self::AUTHPROVIDER)
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    pub fn authroles(&self) -> Vec<String> {
        match self.details.get(Self::AUTHROLE) {
            Some(Value::Array(roles)) => roles
                .iter()
                .filter_map(|r| r.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(role)) => vec![role.clone()],
            _ => Vec::new(),
        }
    }

    pub fn authextra(&self) -> Option<&Dict> {
        self.details.get(Self::AUTHEXTRA).and_then(Value::as_object)
    }

    /// Set one `authextra` entry, creating the dictionary when missing
    pub fn insert_extra(&mut self, key: impl Into<String>, value: Value) {
        let mut extra = match self.details.remove(Self::AUTHEXTRA) {
            Some(Value::Object(extra)) => extra,
            _ => Dict::new(),
        };
        extra.insert(key.into(), value);
        self.details
            .insert(Self::AUTHEXTRA.into(), Value::Object(extra));
    }
}
