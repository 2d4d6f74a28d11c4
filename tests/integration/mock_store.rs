//! In-memory bracket store for integration testing.
//!
//! Provides a deterministic `BracketStore` implementation that assigns
//! sequential ids, keeps records in insertion order and can be forced to
//! fail, with no external dependencies.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex};

use goal_bracket::storage::BracketStore;
use goal_bracket::types::{BracketError, BracketRecord, NewBracket, Principal};

/// A mock bracket store for deterministic testing.
///
/// All state is in-memory and inspectable from test code.
#[derive(Clone, Default)]
pub struct MockStore {
    records: Arc<Mutex<Vec<BracketRecord>>>,
    /// If set, every call returns this error.
    force_error: Arc<Mutex<Option<BracketError>>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-load records (e.g. from another owner).
    pub fn with_records(records: Vec<BracketRecord>) -> Self {
        let store = Self::new();
        *store.records.lock().unwrap() = records;
        store
    }

    /// Force all subsequent operations to return `error`.
    pub fn set_error(&self, error: BracketError) {
        *self.force_error.lock().unwrap() = Some(error);
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    /// Every record written so far, all owners.
    pub fn all_records(&self) -> Vec<BracketRecord> {
        self.records.lock().unwrap().clone()
    }

    fn check_error(&self) -> Result<(), BracketError> {
        match self.force_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BracketStore for MockStore {
    async fn create(
        &self,
        owner: &Principal,
        bracket: NewBracket,
    ) -> Result<BracketRecord, BracketError> {
        self.check_error()?;
        let mut records = self.records.lock().unwrap();
        let record = BracketRecord::from_new(format!("MOCK-{:03}", records.len() + 1), owner, bracket);
        records.push(record.clone());
        Ok(record)
    }

    async fn list(&self, owner: &Principal) -> Result<Vec<BracketRecord>, BracketError> {
        self.check_error()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.owner == owner.id)
            .cloned()
            .collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A stored record with a fixed creation time, for ordering tests.
pub fn record_at(id: &str, owner: &str, minutes_ago: Option<i64>) -> BracketRecord {
    BracketRecord {
        id: id.to_string(),
        owner: owner.to_string(),
        title: format!("Bracket {id}"),
        category: None,
        goals: vec!["a".into(), "b".into()],
        matchups: Vec::new(),
        winner: None,
        round: Some(1),
        status: goal_bracket::types::BracketStatus::InProgress,
        created_at: minutes_ago.map(|m| Utc::now() - chrono::Duration::minutes(m)),
        updated_at: None,
    }
}
