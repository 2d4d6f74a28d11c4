//! Identity collaborator.
//!
//! Answers "who is signed in?" for the persistence layer. Failures here
//! are always `BracketError::Unauthorized` so callers can tell a missing
//! sign-in apart from a broken backend.

use async_trait::async_trait;
use tracing::debug;

use crate::types::{BracketError, Principal};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The authenticated principal, or `Unauthorized`.
    async fn current_principal(&self) -> Result<Principal, BracketError>;
}

/// A principal fixed at startup (from config or the environment).
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    principal: Option<Principal>,
}

impl StaticIdentity {
    pub fn new(principal: Option<Principal>) -> Self {
        Self { principal }
    }

    pub fn signed_in(id: impl Into<String>) -> Self {
        Self::new(Some(Principal::new(id)))
    }

    pub fn anonymous() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_principal(&self) -> Result<Principal, BracketError> {
        match &self.principal {
            Some(p) => {
                debug!(principal = %p, "Principal resolved");
                Ok(p.clone())
            }
            None => Err(BracketError::Unauthorized(
                "No authenticated user".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signed_in() {
        let id = StaticIdentity::signed_in("user-1");
        assert_eq!(id.current_principal().await.unwrap(), Principal::new("user-1"));
    }

    #[tokio::test]
    async fn test_anonymous_is_unauthorized() {
        let err = StaticIdentity::anonymous().current_principal().await.unwrap_err();
        assert!(matches!(err, BracketError::Unauthorized(_)));
    }
}
