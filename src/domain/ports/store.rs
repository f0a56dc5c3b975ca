//! Document store port - durable summary and session persistence.
//!
//! Writes must be atomic (write-then-rename or equivalent) so a concurrent
//! reader never observes a partial document.

use std::path::Path;

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::governance::GovernanceSession;
use crate::domain::models::summary::BatchSummary;

/// Trait for durable document storage.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist a batch summary atomically.
    async fn save_summary(&self, path: &Path, summary: &BatchSummary) -> DomainResult<()>;

    /// Load and migrate a persisted batch summary.
    async fn load_summary(&self, path: &Path) -> DomainResult<BatchSummary>;

    /// Persist a governance session atomically.
    async fn save_session(&self, path: &Path, session: &GovernanceSession) -> DomainResult<()>;

    /// Load and migrate a persisted governance session.
    async fn load_session(&self, path: &Path) -> DomainResult<GovernanceSession>;
}
