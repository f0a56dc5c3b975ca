//! JSON file document store.
//!
//! Persists summary and governance-session documents as pretty-printed
//! JSON. Writes go to a temporary sibling file first and are renamed into
//! place, so a concurrent reader never observes a partial document.

use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::fs;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::governance::SESSION_SCHEMA_VERSION;
use crate::domain::models::{migrate_summary, BatchSummary, GovernanceSession};
use crate::domain::ports::DocumentStore;

/// Atomic write-then-rename JSON store.
#[derive(Debug, Clone, Default)]
pub struct JsonFileStore;

impl JsonFileStore {
    pub fn new() -> Self {
        Self
    }

    async fn write_atomic<T: Serialize + Sync>(&self, path: &Path, document: &T) -> DomainResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(document)?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp_path = Path::new(&tmp);

        fs::write(tmp_path, json).await?;
        fs::rename(tmp_path, path).await?;
        debug!(path = %path.display(), "document persisted");
        Ok(())
    }

    async fn read_value(&self, path: &Path) -> DomainResult<Value> {
        let raw = fs::read_to_string(path).await?;
        let value: Value = serde_json::from_str(&raw)?;
        Ok(value)
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn save_summary(&self, path: &Path, summary: &BatchSummary) -> DomainResult<()> {
        self.write_atomic(path, summary).await
    }

    async fn load_summary(&self, path: &Path) -> DomainResult<BatchSummary> {
        let value = self.read_value(path).await?;
        migrate_summary(value)
    }

    async fn save_session(&self, path: &Path, session: &GovernanceSession) -> DomainResult<()> {
        self.write_atomic(path, session).await
    }

    async fn load_session(&self, path: &Path) -> DomainResult<GovernanceSession> {
        let value = self.read_value(path).await?;
        let version = value
            .get("schema_version")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32;
        if version > SESSION_SCHEMA_VERSION {
            return Err(DomainError::UnsupportedSchemaVersion {
                found: version,
                supported: SESSION_SCHEMA_VERSION,
            });
        }
        let session: GovernanceSession = serde_json::from_value(value)?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{
        GateProfile, GovernanceSession, PolicySnapshot, RetryStrategy, RiskLevel,
        SchedulingStrategy,
    };

    fn session() -> GovernanceSession {
        GovernanceSession::new(PolicySnapshot {
            target_risk: RiskLevel::Medium,
            max_rounds: 3,
            max_minutes: 60,
            gate_profile: GateProfile::Standard,
            scheduling_strategy: SchedulingStrategy::Fifo,
            retry_strategy: RetryStrategy::Adaptive,
            agent_budget: Some(2),
            batch_parallel: 2,
        })
    }

    #[tokio::test]
    async fn test_session_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = JsonFileStore::new();
        let original = session();

        store.save_session(&path, &original).await.unwrap();
        let restored = store.load_session(&path).await.unwrap();
        assert_eq!(restored, original);
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = JsonFileStore::new();

        store.save_session(&path, &session()).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("session.json")]);
    }

    #[tokio::test]
    async fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/session.json");
        let store = JsonFileStore::new();

        store.save_session(&path, &session()).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_load_missing_file_is_store_error() {
        let store = JsonFileStore::new();
        let err = store
            .load_session(Path::new("/nonexistent/session.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::StoreError(_)));
    }

    #[tokio::test]
    async fn test_future_session_schema_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = JsonFileStore::new();

        let mut value = serde_json::to_value(session()).unwrap();
        value["schema_version"] = serde_json::Value::from(99);
        std::fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

        let err = store.load_session(&path).await.unwrap_err();
        assert!(matches!(err, DomainError::UnsupportedSchemaVersion { found: 99, .. }));
    }
}
