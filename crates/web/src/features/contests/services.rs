use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use storage::{
    dto::contest::{
        ContestDetailResponse, CreateContestRequest, EntryView, LeaderboardEntry, PostRef,
        RefreshSummary, StatusChange, UpdateContestRequest, UserEntrySummary, VoteResponse,
        WinnerView,
    },
    error::StorageError,
    models::{Contest, ContestStatus, Entry, PostSummary},
    repository::{ContestStore, PostDirectory},
    services::{lifecycle, listing, ranking},
};
use uuid::Uuid;

use crate::error::{WebError, WebResult};
use crate::events::{ContestEvent, EventBus};

pub const MIN_SCORE: i64 = 1;
pub const MAX_SCORE: i64 = 10;

fn contest_not_found() -> WebError {
    WebError::NotFound("Contest not found".into())
}

fn entry_not_found() -> WebError {
    WebError::NotFound("Entry not found".into())
}

/// Rejects anything but an active contest, telling callers which side of the
/// window they are on.
fn require_active(contest: &Contest) -> WebResult<()> {
    match contest.status {
        ContestStatus::Active => Ok(()),
        ContestStatus::Upcoming => Err(WebError::InvalidState(
            "Contest has not started yet".into(),
        )),
        ContestStatus::Completed => Err(WebError::InvalidState(
            "Contest has already ended".into(),
        )),
    }
}

pub fn score_out_of_range() -> WebError {
    WebError::Validation(format!(
        "Score must be a whole number between {MIN_SCORE} and {MAX_SCORE}"
    ))
}

fn validate_score(score: i64) -> WebResult<u8> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(score_out_of_range());
    }
    Ok(score as u8)
}

/// Parse a path id. Anything that is not a UUID cannot name a stored record,
/// so it is reported as not found.
pub fn parse_id(raw: &str, resource: &str) -> WebResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| WebError::NotFound(format!("{resource} not found")))
}

/// Contest use cases. Every business rule is checked before the contest is
/// written back, and each write replaces the whole contest document.
#[derive(Clone)]
pub struct ContestService {
    store: Arc<dyn ContestStore>,
    posts: Arc<dyn PostDirectory>,
    events: EventBus,
}

impl ContestService {
    pub fn new(
        store: Arc<dyn ContestStore>,
        posts: Arc<dyn PostDirectory>,
        events: EventBus,
    ) -> Self {
        Self {
            store,
            posts,
            events,
        }
    }

    async fn load(&self, contest_id: Uuid) -> WebResult<Contest> {
        self.store
            .find_by_id(contest_id)
            .await?
            .ok_or_else(contest_not_found)
    }

    async fn posts_by_id(&self, ids: &[Uuid]) -> WebResult<HashMap<Uuid, PostSummary>> {
        let posts = self.posts.find_many(ids).await?;
        Ok(posts.into_iter().map(|p| (p.id, p)).collect())
    }

    fn resolve(posts: &HashMap<Uuid, PostSummary>, id: Uuid) -> PostRef {
        posts
            .get(&id)
            .cloned()
            .map_or(PostRef::Reference(id), PostRef::Expanded)
    }

    /// Active and upcoming contests, active first.
    pub async fn list_open(&self) -> WebResult<Vec<Contest>> {
        let mut contests = self
            .store
            .find_by_statuses(&[ContestStatus::Active, ContestStatus::Upcoming])
            .await?;
        listing::sort_for_listing(&mut contests);
        Ok(contests)
    }

    pub async fn list_all(&self) -> WebResult<Vec<Contest>> {
        let mut contests = self.store.find_all().await?;
        listing::sort_for_listing(&mut contests);
        Ok(contests)
    }

    /// Contest with entry posts expanded, and winner posts too once the
    /// contest is completed.
    pub async fn get_detail(&self, contest_id: Uuid) -> WebResult<ContestDetailResponse> {
        let contest = self.load(contest_id).await?;
        let completed = contest.status == ContestStatus::Completed;

        let mut post_ids: Vec<Uuid> = contest.entries.iter().map(|e| e.post_id).collect();
        if completed {
            post_ids.extend(contest.winners.iter().map(|w| w.post_id));
        }
        post_ids.sort_unstable();
        post_ids.dedup();
        let posts = self.posts_by_id(&post_ids).await?;

        let entries = contest
            .entries
            .into_iter()
            .map(|entry| {
                let post = Self::resolve(&posts, entry.post_id);
                EntryView::new(entry, post)
            })
            .collect();

        let winners = contest
            .winners
            .into_iter()
            .map(|winner| {
                let post = if completed {
                    Self::resolve(&posts, winner.post_id)
                } else {
                    PostRef::Reference(winner.post_id)
                };
                WinnerView::new(winner, post)
            })
            .collect();

        Ok(ContestDetailResponse {
            id: contest.id,
            title: contest.title,
            description: contest.description,
            theme: contest.theme,
            start_date: contest.start_date,
            end_date: contest.end_date,
            status: contest.status,
            entries,
            winners,
            created_at: contest.created_at,
        })
    }

    pub async fn create(
        &self,
        request: CreateContestRequest,
        now: DateTime<Utc>,
    ) -> WebResult<Contest> {
        request
            .validate_dates()
            .map_err(|e| WebError::Validation(e.to_string()))?;

        let contest = self.store.create(&request.into_contest(now)).await?;
        tracing::info!(
            contest_id = %contest.id,
            status = %contest.status,
            "Contest created"
        );

        Ok(contest)
    }

    /// Apply an admin edit and recompute the status from the new window.
    pub async fn update(
        &self,
        contest_id: Uuid,
        request: &UpdateContestRequest,
        now: DateTime<Utc>,
    ) -> WebResult<Contest> {
        let mut contest = self.load(contest_id).await?;

        request
            .apply_to(&mut contest)
            .map_err(|e| WebError::Validation(e.to_string()))?;
        contest.status = lifecycle::derive_status(now, contest.start_date, contest.end_date);

        let updated = self.store.update(&contest).await?;
        tracing::info!(contest_id = %updated.id, status = %updated.status, "Contest updated");

        Ok(updated)
    }

    pub async fn delete(&self, contest_id: Uuid) -> WebResult<()> {
        self.store.delete(contest_id).await.map_err(|e| match e {
            StorageError::NotFound => contest_not_found(),
            other => other.into(),
        })?;
        tracing::info!(contest_id = %contest_id, "Contest deleted");

        Ok(())
    }

    pub async fn submit(
        &self,
        contest_id: Uuid,
        user_id: &str,
        username: &str,
        post_id: Uuid,
        now: DateTime<Utc>,
    ) -> WebResult<Entry> {
        let mut contest = self.load(contest_id).await?;
        require_active(&contest)?;

        if contest.entry_by_user(user_id).is_some() {
            return Err(WebError::Conflict(
                "You have already submitted an entry to this contest".into(),
            ));
        }

        let post = self
            .posts
            .find(post_id)
            .await?
            .ok_or_else(|| WebError::NotFound("Post not found".into()))?;
        if post.user_id != user_id {
            return Err(WebError::Forbidden("You can only submit your own posts".into()));
        }

        let entry = Entry::new(user_id.to_string(), username.to_string(), post_id, now);
        contest.entries.push(entry.clone());
        self.store.update(&contest).await?;

        tracing::info!(contest_id = %contest_id, entry_id = %entry.id, user_id, "Entry submitted");
        self.events.publish(ContestEvent::EntrySubmitted {
            contest_id,
            entry_id: entry.id,
            user_id: entry.user_id.clone(),
        });

        Ok(entry)
    }

    pub async fn vote(
        &self,
        contest_id: Uuid,
        entry_id: Uuid,
        voter_id: &str,
        score: i64,
    ) -> WebResult<VoteResponse> {
        let score = validate_score(score)?;

        let mut contest = self.load(contest_id).await?;
        require_active(&contest)?;

        let entry = contest.entry_mut(entry_id).ok_or_else(entry_not_found)?;
        if entry.user_id == voter_id {
            return Err(WebError::Forbidden("You cannot vote on your own entry".into()));
        }

        let new_score = entry.upsert_vote(voter_id, score);
        let entry_owner = entry.user_id.clone();
        self.store.update(&contest).await?;

        tracing::debug!(contest_id = %contest_id, entry_id = %entry_id, new_score, "Vote recorded");
        self.events.publish(ContestEvent::VoteCast {
            contest_id,
            entry_id,
            entry_owner,
            voter_id: voter_id.to_string(),
            new_score,
        });

        Ok(VoteResponse {
            entry_id,
            new_score,
        })
    }

    pub async fn user_entries(&self, user_id: &str) -> WebResult<Vec<UserEntrySummary>> {
        let contests = self.store.find_by_entrant(user_id).await?;

        let summaries = contests
            .into_iter()
            .filter_map(|contest| {
                let entry = contest.entry_by_user(user_id)?.clone();
                Some(UserEntrySummary {
                    contest_id: contest.id,
                    contest_title: contest.title,
                    contest_theme: contest.theme,
                    contest_status: contest.status,
                    entry,
                })
            })
            .collect();

        Ok(summaries)
    }

    pub async fn remove_entry(
        &self,
        contest_id: Uuid,
        entry_id: Uuid,
        requester_id: &str,
    ) -> WebResult<()> {
        let mut contest = self.load(contest_id).await?;

        let entry = contest.entry(entry_id).ok_or_else(entry_not_found)?;
        if entry.user_id != requester_id {
            return Err(WebError::Forbidden("You can only remove your own entries".into()));
        }
        if contest.status == ContestStatus::Completed {
            return Err(WebError::InvalidState(
                "Cannot remove entries from completed contests".into(),
            ));
        }

        contest.remove_entry(entry_id);
        self.store.update(&contest).await?;
        tracing::info!(contest_id = %contest_id, entry_id = %entry_id, "Entry removed");

        Ok(())
    }

    pub async fn leaderboard(&self, contest_id: Uuid) -> WebResult<Vec<LeaderboardEntry>> {
        let contest = self.load(contest_id).await?;
        let post_ids: Vec<Uuid> = contest.entries.iter().map(|e| e.post_id).collect();
        let posts = self.posts_by_id(&post_ids).await?;

        let board = ranking::ranked_entries(&contest.entries)
            .into_iter()
            .zip(1..)
            .map(|(entry, rank)| LeaderboardEntry {
                rank,
                entry_id: entry.id,
                user_id: entry.user_id.clone(),
                username: entry.username.clone(),
                post_id: Self::resolve(&posts, entry.post_id),
                relevancy_score: entry.relevancy_score,
                voter_count: entry.voter_count(),
            })
            .collect();

        Ok(board)
    }

    /// Rank the entries of a completed contest and store the top three.
    /// Recomputes from scratch on every call.
    pub async fn calculate_winners(&self, contest_id: Uuid) -> WebResult<Contest> {
        let mut contest = self.load(contest_id).await?;
        if contest.status != ContestStatus::Completed {
            return Err(WebError::InvalidState(
                "Winners can only be calculated for completed contests".into(),
            ));
        }

        contest.winners = ranking::rank_winners(&contest.entries);
        let updated = self.store.update(&contest).await?;

        tracing::info!(
            contest_id = %contest_id,
            winners = updated.winners.len(),
            "Contest winners calculated"
        );
        self.events.publish(ContestEvent::WinnersAnnounced {
            contest_id,
            winners: updated.winners.iter().map(|w| w.user_id.clone()).collect(),
        });

        Ok(updated)
    }

    /// Advance every contest whose stored status is behind `now`.
    ///
    /// Contests that lose a write race are skipped and left for the next run.
    pub async fn refresh_statuses(&self, now: DateTime<Utc>) -> WebResult<RefreshSummary> {
        let due = self.store.find_due_for_refresh(now).await?;
        let mut summary = RefreshSummary::default();

        for mut contest in due {
            let Some(from) = lifecycle::refresh(&mut contest, now) else {
                continue;
            };

            match self.store.update(&contest).await {
                Ok(saved) => {
                    tracing::info!(
                        contest_id = %saved.id,
                        from = %from,
                        to = %saved.status,
                        "Contest status advanced"
                    );
                    self.events.publish(ContestEvent::StatusChanged {
                        contest_id: saved.id,
                        title: saved.title.clone(),
                        from,
                        to: saved.status,
                    });
                    summary.record(StatusChange {
                        contest_id: saved.id,
                        title: saved.title,
                        from,
                        to: saved.status,
                    });
                }
                Err(StorageError::VersionConflict(id)) => {
                    tracing::warn!(contest_id = %id, "Skipping status refresh after concurrent write");
                    summary.skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(summary)
    }
}
