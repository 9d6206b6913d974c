//! Secure credential handling for the generative API.
//!
//! Credentials are wrapped in [`secrecy::SecretString`] the moment they are
//! read, so they:
//!
//! - never appear in `Debug`/`Display` output
//! - are zeroed on drop
//! - must be explicitly exposed with `.expose()` at the point of use

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

use crate::config::ConfigError;

/// Where a credential was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Loaded from environment variable
    Environment,
    /// Provided programmatically
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// A securely-stored API credential.
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl ApiCredential {
    /// Wrap a credential value.
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// Load credential through a variable lookup.
    ///
    /// An unset or blank variable is a [`ConfigError::MissingCredential`].
    pub fn from_lookup<F>(env_var: &str, name: &'static str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(env_var) {
            Some(value) if !value.trim().is_empty() => Ok(Self::new(
                value.trim().to_string(),
                CredentialSource::Environment,
                name,
            )),
            _ => Err(ConfigError::MissingCredential {
                var: env_var.to_string(),
                name: name.to_string(),
            }),
        }
    }

    /// Expose the credential value for use in a request header.
    ///
    /// Only call this where the value is sent. Never store the result.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    /// Check if the credential is empty.
    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().is_empty()
    }

    /// Get the source of this credential.
    pub fn source(&self) -> CredentialSource {
        self.source
    }

    /// Get the human-readable name of this credential.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_redacted_in_debug() {
        let secret = "AIza-super-secret-key-12345";
        let cred = ApiCredential::new(secret, CredentialSource::Programmatic, "Gemini API key");

        let debug = format!("{:?}", cred);
        assert!(!debug.contains(secret), "Secret exposed in Debug!");
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_credential_redacted_in_display() {
        let secret = "AIza-super-secret-key-12345";
        let cred = ApiCredential::new(secret, CredentialSource::Environment, "Gemini API key");

        let display = format!("{}", cred);
        assert!(!display.contains(secret), "Secret exposed in Display!");
        assert!(display.contains("[REDACTED]"));
        assert!(display.contains("Gemini API key"));
        assert!(display.contains("environment"));
    }

    #[test]
    fn test_credential_expose() {
        let cred = ApiCredential::new("key-1", CredentialSource::Programmatic, "Test");
        assert_eq!(cred.expose(), "key-1");
        assert!(!cred.is_empty());
        assert_eq!(cred.source(), CredentialSource::Programmatic);
        assert_eq!(cred.name(), "Test");
    }

    #[test]
    fn test_from_lookup_trims_value() {
        let cred = ApiCredential::from_lookup("KEY", "Test key", |_| Some("  abc \n".to_string()))
            .unwrap();
        assert_eq!(cred.expose(), "abc");
        assert_eq!(cred.source(), CredentialSource::Environment);
    }

    #[test]
    fn test_from_lookup_blank_is_missing() {
        let result = ApiCredential::from_lookup("KEY", "Test key", |_| Some("   ".to_string()));
        assert!(matches!(result, Err(ConfigError::MissingCredential { .. })));
    }

    #[test]
    fn test_missing_error_names_variable() {
        let err = ApiCredential::from_lookup("GEMINI_API_KEY", "Test key", |_| None).unwrap_err();
        assert!(err.to_string().contains("Test key"));
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }
}
