use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Contest, ContestStatus, PostSummary};

pub mod contest;
pub mod memory;
pub mod post;

pub use contest::PgContestStore;
pub use memory::{MemoryContestStore, MemoryPostDirectory};
pub use post::PgPostDirectory;

/// Persistence boundary for contests. A contest and everything nested in it
/// (entries, votes, winners) is read and written as one document.
#[async_trait]
pub trait ContestStore: Send + Sync {
    async fn create(&self, contest: &Contest) -> Result<Contest>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Contest>>;

    async fn find_all(&self) -> Result<Vec<Contest>>;

    async fn find_by_statuses(&self, statuses: &[ContestStatus]) -> Result<Vec<Contest>>;

    /// Contests holding an entry submitted by `user_id`.
    async fn find_by_entrant(&self, user_id: &str) -> Result<Vec<Contest>>;

    /// Contests whose stored status is behind `now`.
    async fn find_due_for_refresh(&self, now: DateTime<Utc>) -> Result<Vec<Contest>>;

    /// Replace the stored document. Fails with `VersionConflict` when
    /// `contest.version` no longer matches the stored version, and returns
    /// the document with its version bumped otherwise.
    async fn update(&self, contest: &Contest) -> Result<Contest>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Read-only lookup of posts owned by the wider application.
#[async_trait]
pub trait PostDirectory: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<PostSummary>>;

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<PostSummary>>;
}
