//! Broker configuration loading and validation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use relaygate_authz::authn::anonymous::DEFAULT_ANONYMOUS_ROLE;
use relaygate_authz::authn::resolver::DEFAULT_ROLES_PROCEDURE;
use relaygate_authz::authn::resume::DEFAULT_CREATE_TOKEN_PROCEDURE;
use relaygate_authz::authn::ticket::DEFAULT_VERIFY_PROCEDURE;
use relaygate_authz::authn::token::{DEFAULT_TOKEN_TTL_SECS, MAX_TOKEN_TTL_SECS};
use relaygate_authz::authorizer::dynamic::DEFAULT_AUTHORIZE_PROCEDURE;
use relaygate_authz::authorizer::feature::{
    DEFAULT_MAPPING_PROCEDURE, DEFAULT_MATRIX_PROCEDURE, DEFAULT_UPDATE_PROCEDURE,
};
use relaygate_authz::procedures::{DEFAULT_METRICS_PROCEDURE, DEFAULT_PING_PROCEDURE};
use relaygate_authz::{ClientCa, ConsentMode, FailurePolicy, UpstreamFailure};

use crate::logging::LogFormat;

/// Complete broker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrokerConfig {
    pub realm: RealmSection,

    #[serde(default)]
    pub logging: LoggingSection,

    #[serde(default)]
    pub anonymous: AnonymousSection,

    #[serde(default)]
    pub resolver: ResolverSection,

    #[serde(default)]
    pub ticket: TicketSection,

    #[serde(default)]
    pub resume: ResumeSection,

    #[serde(default)]
    pub tls: TlsSection,

    #[serde(default)]
    pub authorization: AuthorizationSection,

    #[serde(default)]
    pub filter: FilterSection,

    #[serde(default)]
    pub procedures: ProceduresSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RealmSection {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnonymousSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_anonymous_role")]
    pub role: String,
}

/// Upstream identity resolution shared by ticket and resume logins
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverSection {
    #[serde(default = "default_roles_procedure")]
    pub roles_procedure: String,
    /// Roles never granted through upstream resolution
    #[serde(default)]
    pub excluded_roles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TicketSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_verify_procedure")]
    pub verify_procedure: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResumeSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: i64,
    #[serde(default = "default_create_token_procedure")]
    pub create_token_procedure: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TlsSection {
    #[serde(default)]
    pub client_cas: Vec<ClientCaEntry>,
}

/// A client CA, either as `"role;path"` or as a table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ClientCaEntry {
    Spec(String),
    Table { role: String, ca_file: PathBuf },
}

impl ClientCaEntry {
    /// Role and certificate path
    pub fn parts(&self) -> Result<(String, PathBuf)> {
        match self {
            ClientCaEntry::Spec(spec) => {
                let Some((role, path)) = spec.split_once(';') else {
                    anyhow::bail!("Client CA entry `{}` must have the form role;path", spec);
                };
                Ok((role.trim().to_string(), PathBuf::from(path.trim())))
            }
            ClientCaEntry::Table { role, ca_file } => Ok((role.clone(), ca_file.clone())),
        }
    }

    /// Parse and load the CA certificate
    pub fn load(&self) -> Result<ClientCa> {
        let (role, path) = self.parts()?;
        if role.is_empty() {
            anyhow::bail!("Client CA {:?} has an empty role", path);
        }
        ClientCa::load(role, &path)
            .with_context(|| format!("Failed to load client CA {:?}", path))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthorizationSection {
    /// Roles that bypass authorization, in addition to `trusted`
    #[serde(default)]
    pub trusted_roles: Vec<String>,
    #[serde(default)]
    pub fallback: FailurePolicy,
    #[serde(default)]
    pub consent: ConsentMode,
    #[serde(default)]
    pub on_upstream_error: UpstreamFailure,
    #[serde(default)]
    pub dynamic: DynamicSection,
    #[serde(default)]
    pub feature: FeatureSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DynamicSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_authorize_procedure")]
    pub procedure: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeatureSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_matrix_procedure")]
    pub matrix_procedure: String,
    #[serde(default = "default_mapping_procedure")]
    pub mapping_procedure: String,
    #[serde(default = "default_update_procedure")]
    pub update_procedure: String,
    /// Periodic refresh, disabled when zero
    #[serde(default)]
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilterSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProceduresSection {
    #[serde(default = "default_ping_procedure")]
    pub ping: String,
    #[serde(default = "default_metrics_procedure")]
    pub metrics: String,
}

// Default value functions
fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_anonymous_role() -> String { DEFAULT_ANONYMOUS_ROLE.to_string() }
fn default_roles_procedure() -> String { DEFAULT_ROLES_PROCEDURE.to_string() }
fn default_verify_procedure() -> String { DEFAULT_VERIFY_PROCEDURE.to_string() }
fn default_token_ttl() -> i64 { DEFAULT_TOKEN_TTL_SECS }
fn default_create_token_procedure() -> String { DEFAULT_CREATE_TOKEN_PROCEDURE.to_string() }
fn default_authorize_procedure() -> String { DEFAULT_AUTHORIZE_PROCEDURE.to_string() }
fn default_matrix_procedure() -> String { DEFAULT_MATRIX_PROCEDURE.to_string() }
fn default_mapping_procedure() -> String { DEFAULT_MAPPING_PROCEDURE.to_string() }
fn default_update_procedure() -> String { DEFAULT_UPDATE_PROCEDURE.to_string() }
fn default_ping_procedure() -> String { DEFAULT_PING_PROCEDURE.to_string() }
fn default_metrics_procedure() -> String { DEFAULT_METRICS_PROCEDURE.to_string() }

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Default for AnonymousSection {
    fn default() -> Self {
        Self {
            enabled: true,
            role: default_anonymous_role(),
        }
    }
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self {
            roles_procedure: default_roles_procedure(),
            excluded_roles: Vec::new(),
        }
    }
}

impl Default for TicketSection {
    fn default() -> Self {
        Self {
            enabled: true,
            verify_procedure: default_verify_procedure(),
        }
    }
}

impl Default for ResumeSection {
    fn default() -> Self {
        Self {
            enabled: true,
            token_ttl_secs: default_token_ttl(),
            create_token_procedure: default_create_token_procedure(),
        }
    }
}

impl Default for AuthorizationSection {
    fn default() -> Self {
        Self {
            trusted_roles: Vec::new(),
            fallback: FailurePolicy::default(),
            consent: ConsentMode::default(),
            on_upstream_error: UpstreamFailure::default(),
            dynamic: DynamicSection::default(),
            feature: FeatureSection::default(),
        }
    }
}

impl Default for DynamicSection {
    fn default() -> Self {
        Self {
            enabled: false,
            procedure: default_authorize_procedure(),
        }
    }
}

impl Default for FeatureSection {
    fn default() -> Self {
        Self {
            enabled: false,
            matrix_procedure: default_matrix_procedure(),
            mapping_procedure: default_mapping_procedure(),
            update_procedure: default_update_procedure(),
            refresh_interval_secs: 0,
        }
    }
}

impl Default for FilterSection {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for ProceduresSection {
    fn default() -> Self {
        Self {
            ping: default_ping_procedure(),
            metrics: default_metrics_procedure(),
        }
    }
}

impl BrokerConfig {
    /// Configuration with every section at its default
    pub fn new(realm: impl Into<String>) -> Self {
        Self {
            realm: RealmSection { name: realm.into() },
            logging: LoggingSection::default(),
            anonymous: AnonymousSection::default(),
            resolver: ResolverSection::default(),
            ticket: TicketSection::default(),
            resume: ResumeSection::default(),
            tls: TlsSection::default(),
            authorization: AuthorizationSection::default(),
            filter: FilterSection::default(),
            procedures: ProceduresSection::default(),
        }
    }

    /// Load configuration from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {:?}", path))?;

        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse configuration file")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.realm.name.trim().is_empty() {
            anyhow::bail!("Realm name must not be empty");
        }

        if self.anonymous.enabled && self.anonymous.role.is_empty() {
            anyhow::bail!("Anonymous role must not be empty when anonymous login is enabled");
        }

        if self.ticket.enabled && self.ticket.verify_procedure.is_empty() {
            anyhow::bail!("Ticket verification procedure must be set when ticket login is enabled");
        }

        if (self.ticket.enabled || self.resume.enabled) && self.resolver.roles_procedure.is_empty() {
            anyhow::bail!("Roles procedure must be set when ticket or resume login is enabled");
        }

        if self.resume.enabled {
            if self.resume.token_ttl_secs <= 0 || self.resume.token_ttl_secs > MAX_TOKEN_TTL_SECS {
                anyhow::bail!(
                    "Resume token TTL must be between 1 and {} seconds",
                    MAX_TOKEN_TTL_SECS
                );
            }
            if self.resume.create_token_procedure.is_empty() {
                anyhow::bail!("Create-token procedure must be set when resume login is enabled");
            }
        }

        for entry in &self.tls.client_cas {
            entry.load()?;
        }

        let authz = &self.authorization;
        if authz.dynamic.enabled && authz.dynamic.procedure.is_empty() {
            anyhow::bail!("Dynamic authorizer procedure must be set when it is enabled");
        }

        if authz.feature.enabled
            && (authz.feature.matrix_procedure.is_empty()
                || authz.feature.mapping_procedure.is_empty()
                || authz.feature.update_procedure.is_empty())
        {
            anyhow::bail!("Feature matrix, mapping and update procedures must be set when the feature authorizer is enabled");
        }

        if !self.anonymous.enabled
            && !self.ticket.enabled
            && !self.resume.enabled
            && self.tls.client_cas.is_empty()
        {
            anyhow::bail!("At least one authentication method must be enabled");
        }

        Ok(())
    }

    /// Periodic feature refresh interval, if enabled
    pub fn feature_refresh_interval(&self) -> Option<std::time::Duration> {
        let feature = &self.authorization.feature;
        (feature.enabled && feature.refresh_interval_secs > 0)
            .then(|| std::time::Duration::from_secs(feature.refresh_interval_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_ca_file() -> NamedTempFile {
        let mut params = rcgen::CertificateParams::new(Vec::<String>::new());
        params
            .distinguished_name
            .push(rcgen::DnType::CommonName, "Config Test CA");
        params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        let ca = rcgen::Certificate::from_params(params).unwrap();

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(ca.serialize_pem().unwrap().as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = BrokerConfig::from_toml("[realm]\nname = \"realm1\"\n").unwrap();

        assert_eq!(config.realm.name, "realm1");
        assert!(config.anonymous.enabled);
        assert_eq!(config.anonymous.role, "anonymous");
        assert!(config.ticket.enabled);
        assert!(config.resume.enabled);
        assert_eq!(config.resume.token_ttl_secs, 7 * 24 * 60 * 60);
        assert_eq!(config.resume.create_token_procedure, "ee.auth.create-token");
        assert_eq!(config.authorization.fallback, FailurePolicy::Reject);
        assert_eq!(config.authorization.consent, ConsentMode::All);
        assert_eq!(config.authorization.feature.update_procedure, "ee.featureauth.update");
        assert_eq!(config.procedures.ping, "ee.ping");
        assert!(config.feature_refresh_interval().is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_realm_is_a_parse_error() {
        assert!(BrokerConfig::from_toml("[anonymous]\nenabled = true\n").is_err());
    }

    #[test]
    fn test_fallback_accepts_legacy_spelling() {
        let config = BrokerConfig::from_toml(
            r#"
            [realm]
            name = "realm1"

            [authorization]
            fallback = "accept"
            consent = "one"
            on_upstream_error = "propagate"
            "#,
        )
        .unwrap();

        assert_eq!(config.authorization.fallback, FailurePolicy::Permit);
        assert_eq!(config.authorization.consent, ConsentMode::One);
        assert_eq!(config.authorization.on_upstream_error, UpstreamFailure::Propagate);
    }

    #[test]
    fn test_validate_rejects_misconfiguration() {
        let mut config = BrokerConfig::new(" ");
        assert!(config.validate().is_err());

        config = BrokerConfig::new("realm1");
        config.anonymous.role.clear();
        assert!(config.validate().is_err());

        config = BrokerConfig::new("realm1");
        config.resume.token_ttl_secs = 0;
        assert!(config.validate().is_err());

        config = BrokerConfig::new("realm1");
        config.resume.token_ttl_secs = MAX_TOKEN_TTL_SECS + 1;
        assert!(config.validate().is_err());

        config = BrokerConfig::new("realm1");
        config.resume.token_ttl_secs = i64::MAX;
        assert!(config.validate().is_err());

        config = BrokerConfig::new("realm1");
        config.resolver.roles_procedure.clear();
        assert!(config.validate().is_err());

        config = BrokerConfig::new("realm1");
        config.authorization.dynamic.enabled = true;
        config.authorization.dynamic.procedure.clear();
        assert!(config.validate().is_err());

        config = BrokerConfig::new("realm1");
        config.authorization.feature.enabled = true;
        config.authorization.feature.mapping_procedure.clear();
        assert!(config.validate().is_err());

        config = BrokerConfig::new("realm1");
        config.anonymous.enabled = false;
        config.ticket.enabled = false;
        config.resume.enabled = false;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_client_ca_entry_forms() {
        let ca_file = write_ca_file();
        let path = ca_file.path().display().to_string();

        let contents = format!(
            r#"
            [realm]
            name = "realm1"

            [tls]
            client_cas = [
                "device;{path}",
                {{ role = "user", ca_file = "{path}" }},
            ]
            "#
        );
        let config = BrokerConfig::from_toml(&contents).unwrap();
        assert_eq!(config.tls.client_cas.len(), 2);

        let (role, parsed) = config.tls.client_cas[0].parts().unwrap();
        assert_eq!(role, "device");
        assert_eq!(parsed, ca_file.path());
        assert_eq!(config.tls.client_cas[1].load().unwrap().role(), "user");
        config.validate().unwrap();
    }

    #[test]
    fn test_client_ca_entry_errors() {
        assert!(ClientCaEntry::Spec("no-separator".into()).parts().is_err());
        assert!(ClientCaEntry::Spec("device;/nonexistent/ca.pem".into()).load().is_err());

        let ca_file = write_ca_file();
        let entry = ClientCaEntry::Table {
            role: String::new(),
            ca_file: ca_file.path().to_path_buf(),
        };
        assert!(entry.load().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[realm]\nname = \"files\"\n\n[authorization.feature]\nenabled = true\nrefresh_interval_secs = 30"
        )
        .unwrap();

        let config = BrokerConfig::load(file.path()).unwrap();
        assert_eq!(config.realm.name, "files");
        assert_eq!(
            config.feature_refresh_interval(),
            Some(std::time::Duration::from_secs(30))
        );

        assert!(BrokerConfig::load("/nonexistent/relaygate.toml").is_err());
    }

    #[test]
    fn test_example_config_is_valid() {
        let config = BrokerConfig::from_toml(include_str!("../../../config/relaygate.toml")).unwrap();
        config.validate().unwrap();
    }
}
