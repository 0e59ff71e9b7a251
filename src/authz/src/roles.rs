//! Role sets and the trusted role configuration

use std::collections::HashSet;

use relaygate_core::types::value::as_string_list;
use relaygate_core::{Session, Value};

use crate::error::{AuthzError, Result};

/// Ordered list of role names held by a session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(Vec<String>);

impl RoleSet {
    pub fn new(roles: Vec<String>) -> Self {
        Self(roles)
    }

    /// Interpret a raw `authrole` detail
    ///
    /// A string yields a one-element set, a list yields its string members
    /// in order. Absent or any other shape is an error, which is distinct
    /// from an empty list.
    pub fn extract(raw: Option<&Value>) -> Result<Self> {
        raw.and_then(as_string_list)
            .map(Self)
            .ok_or(AuthzError::RoleExtraction)
    }

    /// Roles carried by a session's `authrole` detail
    pub fn from_session(session: &Session) -> Result<Self> {
        Self::extract(session.authrole())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, role: &str) -> bool {
        self.0.iter().any(|r| r == role)
    }

    /// True if any held role is trusted
    pub fn is_trusted(&self, trusted: &TrustedRoles) -> bool {
        self.iter().any(|role| trusted.contains(role))
    }

    /// Roles as a list value
    pub fn to_value(&self) -> Value {
        Value::Array(self.0.iter().cloned().map(Value::String).collect())
    }
}

impl From<Vec<String>> for RoleSet {
    fn from(roles: Vec<String>) -> Self {
        Self(roles)
    }
}

/// Roles that bypass authorization checks
///
/// The internal role `trusted` is always a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedRoles(HashSet<String>);

impl TrustedRoles {
    /// Role held by the router's own sessions
    pub const INTERNAL: &'static str = "trusted";

    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set: HashSet<String> = roles.into_iter().map(Into::into).collect();
        set.insert(Self::INTERNAL.to_string());
        Self(set)
    }

    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for TrustedRoles {
    fn default() -> Self {
        Self::new(std::iter::empty::<String>())
    }
}
