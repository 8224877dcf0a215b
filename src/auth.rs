//! Authentication and TLS resolution.
//!
//! Translates the flat auth/TLS configuration into client-side credentials.
//! Passwords are held write-only: redacted in `Debug`/`Display` output and
//! serialized back out as a redaction marker, so they never leak into logs
//! or config dumps.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{Error, Result};

/// A write-only secret string.
#[derive(Clone)]
pub struct Sensitive(SecretString);

impl Sensitive {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::new(value.into().into_boxed_str()))
    }

    /// Exposes the secret value. Use only at the authentication boundary.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for Sensitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for Sensitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl From<&str> for Sensitive {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Serialize for Sensitive {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str("***REDACTED***")
    }
}

impl<'de> Deserialize<'de> for Sensitive {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::new(value))
    }
}

/// Raw authentication config. The populated fields determine the variant:
/// Kerberos fields win, then SASL fields, else no authentication.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    pub mechanism: Option<String>,
    pub username: Option<String>,
    pub password: Option<Sensitive>,
    pub kerberos_principal: Option<String>,
    pub kerberos_keytab_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaslMechanism {
    Plain,
    ScramSha256,
    ScramSha512,
}

impl SaslMechanism {
    /// Value for the Kafka `sasl.mechanism` property.
    pub fn kafka_value(&self) -> &'static str {
        match self {
            SaslMechanism::Plain => "PLAIN",
            SaslMechanism::ScramSha256 => "SCRAM-SHA-256",
            SaslMechanism::ScramSha512 => "SCRAM-SHA-512",
        }
    }
}

/// Resolved connection credentials.
#[derive(Debug, Clone)]
pub enum Credentials {
    None,
    Plain {
        mechanism: SaslMechanism,
        username: String,
        password: Sensitive,
    },
    Kerberos {
        principal: String,
        keytab_file: PathBuf,
    },
}

/// Resolves the raw auth config into [`Credentials`].
///
/// Fails with [`Error::UnsupportedAuthMechanism`] when SASL fields are
/// present but the mechanism is not one of `plain`, `scram_sha_256`,
/// `scram_sha_512`.
pub fn resolve_credentials(auth: &AuthConfig) -> Result<Credentials> {
    if let Some(principal) = &auth.kerberos_principal {
        let keytab_file = auth.kerberos_keytab_file.clone().unwrap_or_default();
        return Ok(Credentials::Kerberos {
            principal: principal.clone(),
            keytab_file,
        });
    }

    if auth.mechanism.is_some() || auth.username.is_some() {
        let mechanism = match auth.mechanism.as_deref().unwrap_or("plain") {
            "plain" => SaslMechanism::Plain,
            "scram_sha_256" => SaslMechanism::ScramSha256,
            "scram_sha_512" => SaslMechanism::ScramSha512,
            other => return Err(Error::UnsupportedAuthMechanism(other.to_string())),
        };
        return Ok(Credentials::Plain {
            mechanism,
            username: auth.username.clone().unwrap_or_default(),
            password: auth.password.clone().unwrap_or_else(|| Sensitive::new("")),
        });
    }

    Ok(Credentials::None)
}

/// Raw TLS config.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    #[serde(default)]
    pub enable: bool,
    pub ca_file: Option<PathBuf>,
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    #[serde(default = "default_verify")]
    pub verify: bool,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enable: false,
            ca_file: None,
            cert_file: None,
            key_file: None,
            verify: true,
        }
    }
}

fn default_verify() -> bool {
    true
}

/// Client-side TLS options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsOptions {
    pub ca_file: Option<PathBuf>,
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    pub verify: bool,
}

/// Empty when TLS is disabled, else the translated client options.
pub fn resolve_tls(tls: &TlsConfig) -> Option<TlsOptions> {
    if !tls.enable {
        return None;
    }
    Some(TlsOptions {
        ca_file: tls.ca_file.clone(),
        cert_file: tls.cert_file.clone(),
        key_file: tls.key_file.clone(),
        verify: tls.verify,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_resolves_to_none() {
        let creds = resolve_credentials(&AuthConfig::default()).unwrap();
        assert!(matches!(creds, Credentials::None));
    }

    #[test]
    fn test_plain_credentials() {
        let auth = AuthConfig {
            mechanism: Some("plain".to_string()),
            username: Some("alice".to_string()),
            password: Some(Sensitive::new("hunter2")),
            ..Default::default()
        };
        match resolve_credentials(&auth).unwrap() {
            Credentials::Plain {
                mechanism,
                username,
                password,
            } => {
                assert_eq!(mechanism, SaslMechanism::Plain);
                assert_eq!(username, "alice");
                assert_eq!(password.expose_secret(), "hunter2");
            }
            other => panic!("unexpected credentials: {:?}", other),
        }
    }

    #[test]
    fn test_scram_mechanisms() {
        for (raw, expected) in [
            ("scram_sha_256", SaslMechanism::ScramSha256),
            ("scram_sha_512", SaslMechanism::ScramSha512),
        ] {
            let auth = AuthConfig {
                mechanism: Some(raw.to_string()),
                username: Some("alice".to_string()),
                ..Default::default()
            };
            match resolve_credentials(&auth).unwrap() {
                Credentials::Plain { mechanism, .. } => assert_eq!(mechanism, expected),
                other => panic!("unexpected credentials: {:?}", other),
            }
        }
    }

    #[test]
    fn test_unknown_mechanism_fails() {
        let auth = AuthConfig {
            mechanism: Some("oauthbearer".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            resolve_credentials(&auth),
            Err(Error::UnsupportedAuthMechanism(m)) if m == "oauthbearer"
        ));
    }

    #[test]
    fn test_kerberos_shape_wins() {
        let auth = AuthConfig {
            kerberos_principal: Some("bridge/host@REALM".to_string()),
            kerberos_keytab_file: Some(PathBuf::from("/etc/krb5.keytab")),
            ..Default::default()
        };
        match resolve_credentials(&auth).unwrap() {
            Credentials::Kerberos {
                principal,
                keytab_file,
            } => {
                assert_eq!(principal, "bridge/host@REALM");
                assert_eq!(keytab_file, PathBuf::from("/etc/krb5.keytab"));
            }
            other => panic!("unexpected credentials: {:?}", other),
        }
    }

    #[test]
    fn test_password_never_leaks() {
        let secret = Sensitive::new("hunter2");
        assert_eq!(format!("{:?}", secret), "[REDACTED]");
        assert_eq!(format!("{}", secret), "[REDACTED]");
        let serialized = serde_json::to_string(&secret).unwrap();
        assert!(!serialized.contains("hunter2"));
    }

    #[test]
    fn test_tls_disabled_resolves_empty() {
        assert_eq!(resolve_tls(&TlsConfig::default()), None);
    }

    #[test]
    fn test_tls_enabled_translates_paths() {
        let tls = TlsConfig {
            enable: true,
            ca_file: Some(PathBuf::from("/certs/ca.pem")),
            cert_file: Some(PathBuf::from("/certs/client.pem")),
            key_file: Some(PathBuf::from("/certs/client.key")),
            verify: false,
        };
        let opts = resolve_tls(&tls).unwrap();
        assert_eq!(opts.ca_file, Some(PathBuf::from("/certs/ca.pem")));
        assert!(!opts.verify);
    }
}
