//! Blacklist and whitelist filtering on session ids and attributes

use std::collections::BTreeMap;

use relaygate_core::types::value::{as_id, as_string_list};
use relaygate_core::{Dict, Session, SessionId, Value};

/// Option key listing excluded session ids
pub const EXCLUDE_KEY: &str = "exclude";

/// Option key listing eligible session ids
pub const ELIGIBLE_KEY: &str = "eligible";

/// Prefix of attribute blacklist keys, e.g. `exclude_authrole`
pub const EXCLUDE_PREFIX: &str = "exclude_";

/// Prefix of attribute whitelist keys, e.g. `eligible_authid`
pub const ELIGIBLE_PREFIX: &str = "eligible_";

/// Id and attribute black/white lists
///
/// Whitelisted attributes are conjunctive across attribute names and
/// disjunctive within one attribute's values. A subscriber lacking a
/// whitelisted attribute is denied; one lacking a blacklisted attribute is
/// not affected by that rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleFilter {
    pub blacklist_ids: Vec<SessionId>,
    pub whitelist_ids: Vec<SessionId>,
    pub blacklist_attrs: BTreeMap<String, Vec<String>>,
    pub whitelist_attrs: BTreeMap<String, Vec<String>>,
}

impl SimpleFilter {
    /// Read the well-known keys; `None` when they yield no constraint
    pub fn from_options(options: &Dict) -> Option<Self> {
        let mut filter = SimpleFilter {
            blacklist_ids: options.get(EXCLUDE_KEY).map(ids).unwrap_or_default(),
            whitelist_ids: options.get(ELIGIBLE_KEY).map(ids).unwrap_or_default(),
            ..Default::default()
        };

        for (key, value) in options {
            if let Some(attr) = key.strip_prefix(EXCLUDE_PREFIX) {
                if let Some(values) = attr_values(value) {
                    filter.blacklist_attrs.insert(attr.to_string(), values);
                }
            } else if let Some(attr) = key.strip_prefix(ELIGIBLE_PREFIX) {
                if let Some(values) = attr_values(value) {
                    filter.whitelist_attrs.insert(attr.to_string(), values);
                }
            }
        }

        (!filter.is_empty()).then_some(filter)
    }

    /// True when no rule is set
    pub fn is_empty(&self) -> bool {
        self.blacklist_ids.is_empty()
            && self.whitelist_ids.is_empty()
            && self.blacklist_attrs.is_empty()
            && self.whitelist_attrs.is_empty()
    }

    pub fn allowed(&self, subscriber: &Session) -> bool {
        if self.blacklist_ids.contains(&subscriber.id) {
            return false;
        }
        if !self.whitelist_ids.is_empty() && !self.whitelist_ids.contains(&subscriber.id) {
            return false;
        }

        for (attr, denied) in &self.blacklist_attrs {
            if let Some(held) = subscriber_values(subscriber, attr) {
                if held.iter().any(|value| denied.contains(value)) {
                    return false;
                }
            }
        }

        self.whitelist_attrs.iter().all(|(attr, eligible)| {
            subscriber_values(subscriber, attr)
                .map(|held| held.iter().any(|value| eligible.contains(value)))
                .unwrap_or(false)
        })
    }
}

/// A single id or a list of ids; non-id entries are skipped
fn ids(value: &Value) -> Vec<SessionId> {
    match value {
        Value::Array(items) => items.iter().filter_map(as_id).map(SessionId).collect(),
        other => as_id(other).map(SessionId).into_iter().collect(),
    }
}

/// A single string, or the non-empty strings of a list
fn attr_values(value: &Value) -> Option<Vec<String>> {
    let values: Vec<String> = match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => return None,
    };
    (!values.is_empty()).then_some(values)
}

fn subscriber_values(subscriber: &Session, attr: &str) -> Option<Vec<String>> {
    subscriber.detail(attr).and_then(as_string_list)
}
