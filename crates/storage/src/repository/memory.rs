use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{Contest, ContestStatus, PostSummary};
use crate::services::lifecycle;

use super::{ContestStore, PostDirectory};

/// Process-local contest store with the same write semantics as the
/// PostgreSQL one, including version checks. Used by tests and by local runs
/// without `DATABASE_URL`.
#[derive(Default)]
pub struct MemoryContestStore {
    contests: RwLock<HashMap<Uuid, Contest>>,
}

impl MemoryContestStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn select<F>(&self, predicate: F) -> Vec<Contest>
    where
        F: Fn(&Contest) -> bool,
    {
        let contests = self.contests.read().await;
        let mut selected: Vec<Contest> = contests
            .values()
            .filter(|c| predicate(c))
            .cloned()
            .collect();
        selected.sort_by_key(|c| c.created_at);
        selected
    }
}

#[async_trait]
impl ContestStore for MemoryContestStore {
    async fn create(&self, contest: &Contest) -> Result<Contest> {
        let mut contests = self.contests.write().await;
        if contests.contains_key(&contest.id) {
            return Err(StorageError::ConstraintViolation(
                "Contest already exists".to_string(),
            ));
        }
        contests.insert(contest.id, contest.clone());
        Ok(contest.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Contest>> {
        Ok(self.contests.read().await.get(&id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Contest>> {
        Ok(self.select(|_| true).await)
    }

    async fn find_by_statuses(&self, statuses: &[ContestStatus]) -> Result<Vec<Contest>> {
        Ok(self.select(|c| statuses.contains(&c.status)).await)
    }

    async fn find_by_entrant(&self, user_id: &str) -> Result<Vec<Contest>> {
        Ok(self.select(|c| c.entry_by_user(user_id).is_some()).await)
    }

    async fn find_due_for_refresh(&self, now: DateTime<Utc>) -> Result<Vec<Contest>> {
        Ok(self
            .select(|c| lifecycle::is_due_for_refresh(c, now))
            .await)
    }

    async fn update(&self, contest: &Contest) -> Result<Contest> {
        let mut contests = self.contests.write().await;
        let stored = contests.get_mut(&contest.id).ok_or(StorageError::NotFound)?;

        if stored.version != contest.version {
            return Err(StorageError::VersionConflict(contest.id));
        }

        let mut updated = contest.clone();
        updated.version += 1;
        *stored = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.contests
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}

#[derive(Default)]
pub struct MemoryPostDirectory {
    posts: RwLock<HashMap<Uuid, PostSummary>>,
}

impl MemoryPostDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, post: PostSummary) {
        self.posts.write().await.insert(post.id, post);
    }
}

#[async_trait]
impl PostDirectory for MemoryPostDirectory {
    async fn find(&self, id: Uuid) -> Result<Option<PostSummary>> {
        Ok(self.posts.read().await.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<PostSummary>> {
        let posts = self.posts.read().await;
        Ok(ids.iter().filter_map(|id| posts.get(id).cloned()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Entry;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 1, 18, 0, 0).unwrap()
    }

    fn contest(title: &str, created: DateTime<Utc>) -> Contest {
        Contest::new(
            title.into(),
            "desc".into(),
            "theme".into(),
            t0(),
            t0() + Duration::hours(1),
            created,
        )
    }

    #[tokio::test]
    async fn stale_write_is_rejected_and_store_untouched() {
        let store = MemoryContestStore::new();
        let created = store
            .create(&contest("Race", t0() - Duration::hours(1)))
            .await
            .unwrap();

        let mut first = created.clone();
        first
            .entries
            .push(Entry::new("alice".into(), "Alice".into(), Uuid::new_v4(), t0()));
        let mut second = created.clone();
        second
            .entries
            .push(Entry::new("bob".into(), "Bob".into(), Uuid::new_v4(), t0()));

        let saved = store.update(&first).await.unwrap();
        assert_eq!(saved.version, created.version + 1);

        let err = store.update(&second).await.unwrap_err();
        assert!(matches!(err, StorageError::VersionConflict(id) if id == created.id));

        let stored = store.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.entries.len(), 1);
        assert_eq!(stored.entries[0].user_id, "alice");
        assert_eq!(stored.version, saved.version);
    }

    #[tokio::test]
    async fn queries_filter_by_status_entrant_and_due_date() {
        let store = MemoryContestStore::new();
        let upcoming = store
            .create(&contest("Upcoming", t0() - Duration::hours(2)))
            .await
            .unwrap();
        let mut active = contest("Active", t0() + Duration::minutes(5));
        active
            .entries
            .push(Entry::new("carol".into(), "Carol".into(), Uuid::new_v4(), t0()));
        let active = store.create(&active).await.unwrap();

        let open = store
            .find_by_statuses(&[ContestStatus::Active, ContestStatus::Upcoming])
            .await
            .unwrap();
        assert_eq!(open.len(), 2);

        let entered = store.find_by_entrant("carol").await.unwrap();
        assert_eq!(entered.iter().map(|c| c.id).collect::<Vec<_>>(), vec![active.id]);
        assert!(store.find_by_entrant("dave").await.unwrap().is_empty());

        let due = store.find_due_for_refresh(t0()).await.unwrap();
        assert_eq!(due.iter().map(|c| c.id).collect::<Vec<_>>(), vec![upcoming.id]);
    }

    #[tokio::test]
    async fn update_and_delete_missing_contest() {
        let store = MemoryContestStore::new();
        let ghost = contest("Ghost", t0());

        assert!(matches!(
            store.update(&ghost).await,
            Err(StorageError::NotFound)
        ));
        assert!(matches!(
            store.delete(ghost.id).await,
            Err(StorageError::NotFound)
        ));
    }
}
