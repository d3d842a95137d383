//! Client credential seam for status queries
//!
//! Handlers never read credential state from globals; the orchestration run
//! is handed a [`CredentialProvider`] and re-reads it on every polling
//! attempt, so an externally rotated credential is picked up within one
//! attempt.

use std::sync::RwLock;

/// Client token presented to the status endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
}

impl Credential {
    /// Create a credential from a raw client token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// The raw token value sent on the wire
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Token values never end up in logs.
        f.debug_struct("Credential").field("token", &"<redacted>").finish()
    }
}

/// Supplies the current client credential, consulted once per attempt
pub trait CredentialProvider: Send + Sync {
    /// The credential to use for the next status query, if any
    fn current(&self) -> Option<Credential>;
}

/// Provider for the common fixed-token case
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    credential: Credential,
}

impl StaticCredentialProvider {
    /// Create a provider that always returns the given credential
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn current(&self) -> Option<Credential> {
        Some(self.credential.clone())
    }
}

/// Provider whose credential can be rotated or revoked while sessions run
#[derive(Debug, Default)]
pub struct SharedCredentialProvider {
    credential: RwLock<Option<Credential>>,
}

impl SharedCredentialProvider {
    /// Create a provider with an optional initial credential
    pub fn new(credential: Option<Credential>) -> Self {
        Self {
            credential: RwLock::new(credential),
        }
    }

    /// Replace the credential; in-flight sessions see it on their next attempt
    pub fn set(&self, credential: Credential) {
        let mut guard = self
            .credential
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(credential);
    }

    /// Drop the credential entirely
    pub fn clear(&self) {
        let mut guard = self
            .credential
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = None;
    }
}

impl CredentialProvider for SharedCredentialProvider {
    fn current(&self) -> Option<Credential> {
        self.credential
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_provider() {
        let provider = StaticCredentialProvider::new(Credential::new("tok-1"));
        assert_eq!(provider.current(), Some(Credential::new("tok-1")));
        assert_eq!(provider.current(), Some(Credential::new("tok-1")));
    }

    #[test]
    fn test_shared_provider_rotation() {
        let provider = SharedCredentialProvider::new(Some(Credential::new("tok-1")));
        assert_eq!(provider.current(), Some(Credential::new("tok-1")));

        provider.set(Credential::new("tok-2"));
        assert_eq!(provider.current(), Some(Credential::new("tok-2")));

        provider.clear();
        assert_eq!(provider.current(), None);
    }

    #[test]
    fn test_debug_redacts_token() {
        let credential = Credential::new("very-secret");
        let formatted = format!("{:?}", credential);
        assert!(!formatted.contains("very-secret"));
        assert!(formatted.contains("<redacted>"));
    }
}
