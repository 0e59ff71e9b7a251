//! Wiring of the pipeline for one realm

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use relaygate_authz::authn::method;
use relaygate_authz::procedures::{MetricsProcedure, PingProcedure};
use relaygate_authz::{
    AnonymousAuth, Authenticator, Authorizer, DynamicAuthorizer, DynamicTicketAuth,
    FeatureAuthorizer, Metrics, MultiAuthorizer, PublishFilter, ResumeAuth, RuntimeEnv,
    SharedSecretResolver, TlsAuth, TokenStore, TrustedRoles,
};
use relaygate_core::{CallError, Message, Procedure, ProcedureRegistry, Session, UpstreamClient};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BrokerConfig;

/// How often expired resume tokens are purged
pub const TOKEN_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Everything a router needs to authenticate, authorize and filter on one
/// realm
pub struct RealmHooks {
    realm: String,
    metrics: Arc<Metrics>,
    authenticators: Vec<Arc<dyn Authenticator>>,
    authorizer: Option<Arc<dyn Authorizer>>,
    feature: Option<Arc<FeatureAuthorizer>>,
    tokens: Option<Arc<TokenStore>>,
    procedures: Vec<(String, Arc<dyn Procedure>)>,
    filter_publish: bool,
    refresh_interval: Option<Duration>,
}

impl RealmHooks {
    /// Build from a validated configuration
    pub fn build(config: &BrokerConfig, client: Arc<dyn UpstreamClient>) -> Result<Self> {
        let metrics = Arc::new(Metrics::new());
        let env = RuntimeEnv::new(config.realm.name.clone(), client).with_metrics(Arc::clone(&metrics));
        let trusted = TrustedRoles::new(config.authorization.trusted_roles.iter().cloned());

        let mut authenticators: Vec<Arc<dyn Authenticator>> = Vec::new();
        let mut procedures: Vec<(String, Arc<dyn Procedure>)> = Vec::new();
        let mut tokens = None;

        if !config.tls.client_cas.is_empty() {
            let client_cas = config
                .tls
                .client_cas
                .iter()
                .map(|entry| entry.load())
                .collect::<Result<Vec<_>>>()?;
            for ca in &client_cas {
                info!(role = ca.role(), subject = ca.subject(), "Trusting client CA");
            }
            authenticators.push(Arc::new(TlsAuth::new(client_cas, Arc::clone(&metrics))));
        }

        let resolver = SharedSecretResolver::new(
            env.clone(),
            config.resolver.roles_procedure.clone(),
            method::TICKET,
        )
        .with_excluded_roles(config.resolver.excluded_roles.iter().cloned());

        if config.ticket.enabled {
            let mut ticket = DynamicTicketAuth::new(resolver.clone(), config.ticket.verify_procedure.clone());
            if config.resume.enabled {
                ticket = ticket.with_resume(config.resume.create_token_procedure.clone());
            }
            authenticators.push(Arc::new(ticket));
        }

        if config.resume.enabled {
            let ttl = chrono::Duration::try_seconds(config.resume.token_ttl_secs).ok_or_else(|| {
                anyhow::anyhow!(
                    "Resume token TTL of {} seconds is out of range",
                    config.resume.token_ttl_secs
                )
            })?;
            let store = Arc::new(TokenStore::new(ttl));
            let resume = ResumeAuth::new(resolver, Arc::clone(&store));
            procedures.push((
                config.resume.create_token_procedure.clone(),
                resume.create_token_procedure(),
            ));
            authenticators.push(Arc::new(resume));
            tokens = Some(store);
        }

        if config.anonymous.enabled {
            authenticators.push(Arc::new(AnonymousAuth::new(
                config.anonymous.role.clone(),
                Arc::clone(&metrics),
            )));
        }

        let authz = &config.authorization;
        let feature = authz.feature.enabled.then(|| {
            Arc::new(FeatureAuthorizer::new(
                env.clone(),
                authz.feature.matrix_procedure.clone(),
                authz.feature.mapping_procedure.clone(),
                trusted.clone(),
                authz.fallback,
            ))
        });
        if let Some(feature) = &feature {
            procedures.push((authz.feature.update_procedure.clone(), feature.update_procedure()));
        }

        let dynamic: Option<Arc<dyn Authorizer>> = authz.dynamic.enabled.then(|| {
            Arc::new(
                DynamicAuthorizer::new(
                    env.clone(),
                    authz.dynamic.procedure.clone(),
                    trusted.clone(),
                    authz.fallback,
                )
                .with_upstream_failure(authz.on_upstream_error),
            ) as Arc<dyn Authorizer>
        });

        let authorizer: Option<Arc<dyn Authorizer>> = match (feature.clone(), dynamic) {
            (Some(feature), Some(dynamic)) => Some(Arc::new(
                MultiAuthorizer::new(authz.consent)
                    .with_default(authz.fallback.permits())
                    .push("feature", feature)
                    .push("dynamic", dynamic),
            ) as Arc<dyn Authorizer>),
            (Some(feature), None) => Some(feature as Arc<dyn Authorizer>),
            (None, dynamic) => dynamic,
        };

        procedures.push((
            config.procedures.ping.clone(),
            Arc::new(PingProcedure::new(Arc::clone(&metrics))),
        ));
        procedures.push((
            config.procedures.metrics.clone(),
            Arc::new(MetricsProcedure::new(Arc::clone(&metrics))),
        ));

        info!(
            realm = %config.realm.name,
            authenticators = authenticators.len(),
            authorizer = authorizer.is_some(),
            "Realm hooks ready"
        );

        Ok(Self {
            realm: config.realm.name.clone(),
            metrics,
            authenticators,
            authorizer,
            feature,
            tokens,
            procedures,
            filter_publish: config.filter.enabled,
            refresh_interval: config.feature_refresh_interval(),
        })
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Enabled authentication methods in preference order
    pub fn auth_methods(&self) -> Vec<&str> {
        self.authenticators.iter().map(|a| a.auth_method()).collect()
    }

    /// Authenticator for the method a client selected
    pub fn authenticator(&self, auth_method: &str) -> Option<&Arc<dyn Authenticator>> {
        self.authenticators
            .iter()
            .find(|a| a.auth_method() == auth_method)
    }

    /// Authorize a message; permitted when no authorizer is configured
    pub async fn authorize(&self, session: &Session, message: &Message) -> relaygate_authz::Result<bool> {
        match &self.authorizer {
            Some(authorizer) => authorizer.authorize(session, message).await,
            None => Ok(true),
        }
    }

    /// Publish filter for a message, if filtering is enabled
    pub fn publish_filter(&self, message: &Message) -> Option<PublishFilter> {
        if !self.filter_publish {
            return None;
        }
        relaygate_authz::build_publish_filter(message)
    }

    /// URIs of the procedures this realm exposes
    pub fn procedure_uris(&self) -> Vec<&str> {
        self.procedures.iter().map(|(uri, _)| uri.as_str()).collect()
    }

    /// Register every exposed procedure with the router
    pub async fn register_procedures(&self, registry: &dyn ProcedureRegistry) -> Result<(), CallError> {
        for (uri, procedure) in &self.procedures {
            registry.register(uri, Arc::clone(procedure)).await?;
            debug!(uri = %uri, "Registered procedure");
        }
        Ok(())
    }

    /// Spawn background maintenance
    ///
    /// With a refresh interval the feature matrix is refreshed periodically,
    /// otherwise it is loaded once. Expired resume tokens are purged hourly.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        if let Some(feature) = &self.feature {
            match self.refresh_interval {
                Some(every) => handles.push(feature.spawn_refresh(every)),
                None => {
                    let feature = Arc::clone(feature);
                    handles.push(tokio::spawn(async move {
                        if let Err(err) = feature.update().await {
                            warn!(error = %err, "Initial feature matrix load failed");
                        }
                    }));
                }
            }
        }

        if let Some(tokens) = &self.tokens {
            let tokens = Arc::clone(tokens);
            handles.push(tokio::spawn(async move {
                let mut interval = tokio::time::interval(TOKEN_PURGE_INTERVAL);
                loop {
                    interval.tick().await;
                    let purged = tokens.purge_expired();
                    if purged > 0 {
                        debug!(purged, "Purged expired resume tokens");
                    }
                }
            }));
        }

        handles
    }
}
