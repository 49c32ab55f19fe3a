use std::fmt;

use crate::error::CredentialError;

/// Login identity for a source that requires an account
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub password: String,
}

// Password is redacted
impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Something that can hand out an identity on demand
pub trait CredentialProvider: Send + Sync {
    fn get(&self) -> Result<Identity, CredentialError>;
}

impl CredentialProvider for Identity {
    fn get(&self) -> Result<Identity, CredentialError> {
        Ok(self.clone())
    }
}

/// Reads `<SERVICE>_USERNAME` and `<SERVICE>_PASSWORD` from the environment
pub struct EnvCredentials {
    service: String,
    lookup: fn(&str) -> Option<String>,
}

impl EnvCredentials {
    pub fn new(service: &str) -> Self {
        Self::with_lookup(service, |key| std::env::var(key).ok())
    }

    /// Use a custom variable lookup instead of the process environment
    pub fn with_lookup(service: &str, lookup: fn(&str) -> Option<String>) -> Self {
        Self {
            service: service.to_uppercase(),
            lookup,
        }
    }

    fn var(&self, suffix: &str) -> Result<String, CredentialError> {
        let var = format!("{}_{}", self.service, suffix);
        match (self.lookup)(&var) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(CredentialError::Missing { var }),
        }
    }
}

impl CredentialProvider for EnvCredentials {
    fn get(&self) -> Result<Identity, CredentialError> {
        Ok(Identity {
            username: self.var("USERNAME")?,
            password: self.var("PASSWORD")?,
        })
    }
}
