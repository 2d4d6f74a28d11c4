//! Persistence layer.
//!
//! `BracketStore` is the create/list contract of the backend that keeps
//! saved brackets. Two backends ship here: a local JSON file and a remote
//! REST service. `BracketService` sits in front of either one, gating
//! every call on the signed-in principal and ordering listings.

pub mod file;
pub mod remote;

use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::{info, warn};

use crate::engine::BracketSession;
use crate::identity::IdentityProvider;
use crate::types::{BracketError, BracketRecord, NewBracket, Principal};

pub use file::JsonFileStore;
pub use remote::HttpBracketStore;

/// Abstraction over the bracket backend.
///
/// Implementors scope records to their owner. `list` makes no ordering
/// promise.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BracketStore: Send + Sync {
    /// Persist a new bracket; the store assigns the id.
    async fn create(&self, owner: &Principal, bracket: NewBracket)
        -> Result<BracketRecord, BracketError>;

    /// All brackets owned by `owner`, in no particular order.
    async fn list(&self, owner: &Principal) -> Result<Vec<BracketRecord>, BracketError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Newest first by `created_at`; records without a timestamp sort last.
pub fn sort_newest_first(records: &mut [BracketRecord]) {
    records.sort_by_key(|r| Reverse(r.created_at.map(|t| t.timestamp_millis()).unwrap_or(0)));
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Identity-gated access to a `BracketStore`.
#[derive(Clone)]
pub struct BracketService {
    store: Arc<dyn BracketStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl BracketService {
    pub fn new(store: Arc<dyn BracketStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    /// Save the session as it stands now, finished or not.
    pub async fn save(&self, session: &BracketSession) -> Result<BracketRecord, BracketError> {
        let bracket = session.to_new_bracket(Utc::now())?;
        let owner = self.identity.current_principal().await?;

        let record = self.store.create(&owner, bracket).await.inspect_err(|e| {
            warn!(store = self.store.name(), owner = %owner, error = %e, "Failed to save bracket");
        })?;

        info!(
            store = self.store_name(),
            id = %record.id,
            owner = %owner,
            record = %record,
            "Bracket saved"
        );
        Ok(record)
    }

    /// The signed-in user's brackets, newest first.
    pub async fn list_recent(&self) -> Result<Vec<BracketRecord>, BracketError> {
        let owner = self.identity.current_principal().await?;
        let mut records = self.store.list(&owner).await.inspect_err(|e| {
            warn!(store = self.store.name(), owner = %owner, error = %e, "Failed to list brackets");
        })?;
        sort_newest_first(&mut records);
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
