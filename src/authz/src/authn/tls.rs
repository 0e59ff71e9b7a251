//! TLS client certificate authentication

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use relaygate_core::{Handshake, Peer, SessionId, Welcome};
use tracing::{debug, warn};
use x509_parser::certificate::X509Certificate;
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::FromDer;

use super::{method, record_outcome, Authenticator, STATIC_PROVIDER};
use crate::error::{AuthError, CertificateError};
use crate::metrics::Metrics;

/// A trusted client CA and the role it grants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCa {
    role: String,
    subject: String,
    raw_subject: Vec<u8>,
}

impl ClientCa {
    /// Build from a DER encoded CA certificate
    pub fn from_der(role: impl Into<String>, der: &[u8]) -> Result<Self, CertificateError> {
        let (_, cert) =
            X509Certificate::from_der(der).map_err(|e| CertificateError::Der(e.to_string()))?;
        Ok(Self {
            role: role.into(),
            subject: cert.subject().to_string(),
            raw_subject: cert.subject().as_raw().to_vec(),
        })
    }

    /// Build from the first certificate in PEM data
    pub fn from_pem(role: impl Into<String>, pem: &[u8]) -> Result<Self, CertificateError> {
        let (_, pem) = parse_x509_pem(pem).map_err(|e| CertificateError::Pem(e.to_string()))?;
        Self::from_der(role, &pem.contents)
    }

    /// Load a PEM file from disk
    pub fn load(role: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, CertificateError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| CertificateError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_pem(role, &data)
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    /// Distinguished name of the CA, for logging
    pub fn subject(&self) -> &str {
        &self.subject
    }

    fn issued(&self, cert: &X509Certificate<'_>) -> bool {
        cert.issuer().as_raw() == self.raw_subject.as_slice()
    }
}

/// Maps client certificates to roles by their issuing CA
///
/// The first non-CA certificate issued by a configured CA wins; its subject
/// common name becomes the authid. Chain signatures are verified by the TLS
/// layer, this only matches issuer names.
pub struct TlsAuth {
    client_cas: Vec<ClientCa>,
    metrics: Arc<Metrics>,
}

impl TlsAuth {
    pub fn new(client_cas: Vec<ClientCa>, metrics: Arc<Metrics>) -> Self {
        Self {
            client_cas,
            metrics,
        }
    }

    pub fn client_cas(&self) -> &[ClientCa] {
        &self.client_cas
    }

    fn identify(&self, handshake: &Handshake) -> Result<Welcome, AuthError> {
        let transport = handshake
            .transport
            .as_ref()
            .ok_or_else(|| AuthError::Unauthorized("not a TLS connection".to_string()))?;

        for der in &transport.peer_certificates {
            let cert = match X509Certificate::from_der(der) {
                Ok((_, cert)) => cert,
                Err(err) => {
                    warn!(error = %err, "Skipping unparsable peer certificate");
                    continue;
                }
            };
            if cert.is_ca() {
                continue;
            }

            if let Some(ca) = self.client_cas.iter().find(|ca| ca.issued(&cert)) {
                let common_name = cert
                    .subject()
                    .iter_common_name()
                    .next()
                    .and_then(|cn| cn.as_str().ok())
                    .unwrap_or_default();
                debug!(ca = ca.subject(), common_name, "Matched client certificate");
                return Ok(Welcome::new(
                    common_name,
                    vec![ca.role.clone()],
                    STATIC_PROVIDER,
                    method::TLS,
                ));
            }
        }

        Err(AuthError::Unauthorized(
            "no client certificate issued by a trusted CA".to_string(),
        ))
    }
}

#[async_trait]
impl Authenticator for TlsAuth {
    fn auth_method(&self) -> &str {
        method::TLS
    }

    async fn authenticate(
        &self,
        session_id: SessionId,
        handshake: &Handshake,
        _peer: &dyn Peer,
    ) -> Result<Welcome, AuthError> {
        let result = self.identify(handshake);
        record_outcome(&self.metrics, method::TLS, session_id, result)
    }
}
