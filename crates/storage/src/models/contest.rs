use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::services::{lifecycle, scoring};

/// Lifecycle status of a contest.
///
/// The value is stored alongside the contest and only moves forward when a
/// status refresh runs (or when an admin edits the contest dates), so it can
/// lag behind the wall clock between refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContestStatus {
    Upcoming,
    Active,
    Completed,
}

impl ContestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    /// Status computed from the wall clock, ignoring the stored value.
    ///
    /// May disagree with `Contest::status` until the next refresh.
    pub fn current(contest: &Contest, now: DateTime<Utc>) -> Self {
        lifecycle::derive_status(now, contest.start_date, contest.end_date)
    }
}

impl fmt::Display for ContestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upcoming" => Ok(Self::Upcoming),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown contest status '{other}'")),
        }
    }
}

/// A single voter's score on an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub user_id: String,
    pub score: u8,
}

/// A user's submission to a contest. Owned by its contest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: Uuid,
    pub user_id: String,
    pub username: String,
    pub post_id: Uuid,
    pub relevancy_score: f64,
    pub voters: Vec<Vote>,
    pub submitted_at: DateTime<Utc>,
}

impl Entry {
    pub fn new(user_id: String, username: String, post_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            username,
            post_id,
            relevancy_score: 0.0,
            voters: Vec::new(),
            submitted_at: now,
        }
    }

    /// Record `score` for `user_id`, replacing any earlier score from the same
    /// voter, and recompute the relevancy score. Returns the new score.
    pub fn upsert_vote(&mut self, user_id: &str, score: u8) -> f64 {
        match self.voters.iter_mut().find(|v| v.user_id == user_id) {
            Some(existing) => existing.score = score,
            None => self.voters.push(Vote {
                user_id: user_id.to_string(),
                score,
            }),
        }

        self.relevancy_score = scoring::compute_relevancy(&self.voters);
        self.relevancy_score
    }

    pub fn voter_count(&self) -> usize {
        self.voters.len()
    }
}

/// Immutable snapshot of a top-ranked entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Winner {
    pub rank: u32,
    pub user_id: String,
    pub username: String,
    pub post_id: Uuid,
    pub relevancy_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Contest {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub theme: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: ContestStatus,
    pub entries: Vec<Entry>,
    pub winners: Vec<Winner>,
    pub created_at: DateTime<Utc>,
    /// Incremented on every successful write; used to reject stale updates.
    pub version: i64,
}

impl Contest {
    pub fn new(
        title: String,
        description: String,
        theme: String,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            description,
            theme,
            start_date,
            end_date,
            status: lifecycle::derive_status(now, start_date, end_date),
            entries: Vec::new(),
            winners: Vec::new(),
            created_at: now,
            version: 1,
        }
    }

    pub fn entry(&self, entry_id: Uuid) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == entry_id)
    }

    pub fn entry_mut(&mut self, entry_id: Uuid) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.id == entry_id)
    }

    pub fn entry_by_user(&self, user_id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.user_id == user_id)
    }

    /// Remove an entry by id. Remaining entries keep their ids and order.
    pub fn remove_entry(&mut self, entry_id: Uuid) -> Option<Entry> {
        let index = self.entries.iter().position(|e| e.id == entry_id)?;
        Some(self.entries.remove(index))
    }

    pub fn has_valid_dates(&self) -> bool {
        self.end_date > self.start_date
    }
}
