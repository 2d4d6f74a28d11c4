//! Local JSON-file backend.
//!
//! All owners' brackets live in one pretty-printed JSON array. Reads filter
//! by owner. A missing file is an empty store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::BracketStore;
use crate::types::{BracketError, BracketRecord, NewBracket, Principal};

/// Default store file path.
pub const DEFAULT_STORE_FILE: &str = "brackets.json";

pub struct JsonFileStore {
    path: PathBuf,
    // serialises read-modify-write cycles
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: Option<&str>) -> Self {
        let path = PathBuf::from(path.unwrap_or(DEFAULT_STORE_FILE));
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file that a write lands in before being renamed over `path`.
    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn load_all(&self) -> Result<Vec<BracketRecord>> {
        let json = match fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No store file yet");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read brackets from {}", self.path.display()));
            }
        };
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse brackets from {}", self.path.display()))
    }

    /// Replace the store file. Readers see the old or the new contents, never a partial write.
    async fn save_all(&self, records: &[BracketRecord]) -> Result<()> {
        let json = serde_json::to_string_pretty(records).context("Failed to serialise brackets")?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let tmp = self.temp_path();
        fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write brackets to {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

fn storage_failure(e: anyhow::Error) -> BracketError {
    BracketError::RemoteFailure(format!("{e:#}"))
}

#[async_trait]
impl BracketStore for JsonFileStore {
    async fn create(
        &self,
        owner: &Principal,
        bracket: NewBracket,
    ) -> Result<BracketRecord, BracketError> {
        let _guard = self.lock.lock().await;

        let mut records = self.load_all().await.map_err(storage_failure)?;
        let record = BracketRecord::from_new(Uuid::new_v4().to_string(), owner, bracket);
        records.push(record.clone());
        self.save_all(&records).await.map_err(storage_failure)?;

        info!(
            path = %self.path.display(),
            id = %record.id,
            total = records.len(),
            "Bracket written to store file"
        );
        Ok(record)
    }

    async fn list(&self, owner: &Principal) -> Result<Vec<BracketRecord>, BracketError> {
        let _guard = self.lock.lock().await;

        let records: Vec<BracketRecord> = self
            .load_all()
            .await
            .map_err(storage_failure)?
            .into_iter()
            .filter(|r| r.owner == owner.id)
            .collect();

        debug!(owner = %owner, count = records.len(), "Brackets loaded from store file");
        Ok(records)
    }

    fn name(&self) -> &str {
        "file"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
