//! Identity resolution through the upstream roles procedure

use std::collections::HashSet;

use relaygate_core::{Dict, Value, Welcome};
use tracing::{debug, warn};

use super::DYNAMIC_PROVIDER;
use crate::env::RuntimeEnv;
use crate::error::AuthError;

/// Default upstream procedure that returns roles for an authid
pub const DEFAULT_ROLES_PROCEDURE: &str = "ee.auth.get-roles";

/// Resolves an authid into a [`Welcome`] by asking upstream for its roles
///
/// The roles procedure is called with `[realm, authid]` and must reply with
/// either a list of role names or a dict carrying `authroles` plus arbitrary
/// user data. An optional second reply argument is a dict of base welcome
/// details; the resolved identity fields overwrite same-named keys in it.
#[derive(Debug, Clone)]
pub struct SharedSecretResolver {
    env: RuntimeEnv,
    roles_procedure: String,
    excluded_roles: HashSet<String>,
    auth_method: String,
}

impl SharedSecretResolver {
    pub fn new(
        env: RuntimeEnv,
        roles_procedure: impl Into<String>,
        auth_method: impl Into<String>,
    ) -> Self {
        Self {
            env,
            roles_procedure: roles_procedure.into(),
            excluded_roles: HashSet::new(),
            auth_method: auth_method.into(),
        }
    }

    /// Roles that may never be granted through this resolver
    pub fn with_excluded_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Same resolver reporting a different auth method
    pub fn for_method(&self, auth_method: impl Into<String>) -> Self {
        Self {
            auth_method: auth_method.into(),
            ..self.clone()
        }
    }

    pub fn env(&self) -> &RuntimeEnv {
        &self.env
    }

    pub fn auth_method(&self) -> &str {
        &self.auth_method
    }

    pub async fn resolve(&self, authid: &str) -> Result<Welcome, AuthError> {
        let reply = self
            .env
            .call(
                &self.roles_procedure,
                vec![
                    Value::String(self.env.realm.clone()),
                    Value::String(authid.to_string()),
                ],
            )
            .await
            .map_err(|err| {
                warn!(authid, procedure = %self.roles_procedure, error = %err, "Unable to fetch roles");
                AuthError::Unauthorized(format!("unable to fetch roles for {authid}"))
            })?;

        let mut args = reply.args.into_iter();
        let (roles, user_data) = match args.next() {
            Some(Value::Array(roles)) => (roles, Dict::new()),
            Some(Value::Object(data)) => {
                let roles = match data.get("authroles") {
                    Some(Value::Array(roles)) => roles.clone(),
                    _ => {
                        warn!(authid, "Roles reply dict has no authroles list");
                        return Err(AuthError::Unauthorized("invalid roles reply".to_string()));
                    }
                };
                (roles, data)
            }
            Some(other) => {
                warn!(authid, reply = %other, "Unexpected roles reply");
                return Err(AuthError::Unauthorized("invalid roles reply".to_string()));
            }
            None => {
                warn!(authid, "Empty roles reply");
                return Err(AuthError::Unauthorized("invalid roles reply".to_string()));
            }
        };
        let base = match args.next() {
            Some(Value::Object(base)) => base,
            _ => Dict::new(),
        };

        let roles = self.filter_roles(roles);
        debug!(authid, roles = ?roles, "Resolved roles");

        Ok(
            Welcome::from_base(base, authid, roles, DYNAMIC_PROVIDER, self.auth_method.as_str())
                .with_extra(user_data),
        )
    }

    /// Keep string roles, drop excluded ones and collapse duplicates
    fn filter_roles(&self, roles: Vec<Value>) -> Vec<String> {
        let mut seen = HashSet::new();
        roles
            .into_iter()
            .filter_map(|role| match role {
                Value::String(role) => Some(role),
                _ => None,
            })
            .filter(|role| !self.excluded_roles.contains(role))
            .filter(|role| seen.insert(role.clone()))
            .collect()
    }
}
