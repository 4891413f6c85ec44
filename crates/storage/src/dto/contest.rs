use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{Contest, ContestStatus, Entry, PostSummary, Vote, Winner};

/// Request payload for creating a new contest
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateContestRequest {
    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    #[validate(custom(function = "validate_not_blank", message = "Title is required"))]
    pub title: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    #[validate(custom(function = "validate_not_blank", message = "Description is required"))]
    pub description: String,

    #[validate(length(max = 200, message = "Theme must be at most 200 characters"))]
    #[validate(custom(function = "validate_not_blank", message = "Theme is required"))]
    pub theme: String,

    pub start_date: DateTime<Utc>,

    pub end_date: DateTime<Utc>,
}

/// Request payload for editing a contest; omitted fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContestRequest {
    #[validate(length(max = 200))]
    #[validate(custom(function = "validate_not_blank", message = "Title cannot be empty"))]
    pub title: Option<String>,

    #[validate(length(max = 5000))]
    #[validate(custom(function = "validate_not_blank", message = "Description cannot be empty"))]
    pub description: Option<String>,

    #[validate(length(max = 200))]
    #[validate(custom(function = "validate_not_blank", message = "Theme cannot be empty"))]
    pub theme: Option<String>,

    pub start_date: Option<DateTime<Utc>>,

    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitEntryRequest {
    pub post_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub entry_id: Uuid,
    /// Whole number from 1 to 10. Kept as a JSON number so fractional values
    /// reach validation instead of failing deserialization.
    #[schema(value_type = i64, minimum = 1, maximum = 10, example = 8)]
    pub score: serde_json::Number,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub entry_id: Uuid,
    pub new_score: f64,
}

/// A post reference that may or may not have been resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum PostRef {
    Expanded(PostSummary),
    Reference(Uuid),
}

impl PostRef {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Expanded(post) => post.id,
            Self::Reference(id) => *id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntryView {
    pub id: Uuid,
    pub user_id: String,
    pub username: String,
    pub post_id: PostRef,
    pub relevancy_score: f64,
    pub voters: Vec<Vote>,
    pub submitted_at: DateTime<Utc>,
}

impl EntryView {
    pub fn new(entry: Entry, post: PostRef) -> Self {
        Self {
            id: entry.id,
            user_id: entry.user_id,
            username: entry.username,
            post_id: post,
            relevancy_score: entry.relevancy_score,
            voters: entry.voters,
            submitted_at: entry.submitted_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WinnerView {
    pub rank: u32,
    pub user_id: String,
    pub username: String,
    pub post_id: PostRef,
    pub relevancy_score: f64,
}

impl WinnerView {
    pub fn new(winner: Winner, post: PostRef) -> Self {
        Self {
            rank: winner.rank,
            user_id: winner.user_id,
            username: winner.username,
            post_id: post,
            relevancy_score: winner.relevancy_score,
        }
    }
}

/// Contest with entry (and, once completed, winner) posts expanded
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContestDetailResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub theme: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: ContestStatus,
    pub entries: Vec<EntryView>,
    pub winners: Vec<WinnerView>,
    pub created_at: DateTime<Utc>,
}

/// One of the caller's entries together with the contest it belongs to
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserEntrySummary {
    pub contest_id: Uuid,
    pub contest_title: String,
    pub contest_theme: String,
    pub contest_status: ContestStatus,
    pub entry: Entry,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub entry_id: Uuid,
    pub user_id: String,
    pub username: String,
    pub post_id: PostRef,
    pub relevancy_score: f64,
    pub voter_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub contest_id: Uuid,
    pub title: String,
    pub from: ContestStatus,
    pub to: ContestStatus,
}

/// Result of a status refresh run
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub activated: usize,
    pub completed: usize,
    /// Contests that were due but lost a concurrent write; retried next run.
    pub skipped: usize,
    pub changes: Vec<StatusChange>,
}

impl RefreshSummary {
    pub fn record(&mut self, change: StatusChange) {
        match change.to {
            ContestStatus::Active => self.activated += 1,
            ContestStatus::Completed => self.completed += 1,
            ContestStatus::Upcoming => {}
        }
        self.changes.push(change);
    }
}

// Validation helpers
fn validate_not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        Err(validator::ValidationError::new("blank"))
    } else {
        Ok(())
    }
}

fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), &'static str> {
    if end <= start {
        return Err("End date must be after start date");
    }
    Ok(())
}

impl CreateContestRequest {
    /// Additional validation that requires multiple fields
    pub fn validate_dates(&self) -> Result<(), &'static str> {
        validate_window(self.start_date, self.end_date)
    }

    pub fn into_contest(self, now: DateTime<Utc>) -> Contest {
        Contest::new(
            self.title.trim().to_string(),
            self.description.trim().to_string(),
            self.theme.trim().to_string(),
            self.start_date,
            self.end_date,
            now,
        )
    }
}

impl UpdateContestRequest {
    /// Overlay the provided fields onto `contest`, rejecting a resulting
    /// window whose end is not after its start. `contest` is untouched on
    /// error.
    pub fn apply_to(&self, contest: &mut Contest) -> Result<(), &'static str> {
        let start = self.start_date.unwrap_or(contest.start_date);
        let end = self.end_date.unwrap_or(contest.end_date);
        validate_window(start, end)?;

        if let Some(title) = &self.title {
            contest.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            contest.description = description.trim().to_string();
        }
        if let Some(theme) = &self.theme {
            contest.theme = theme.trim().to_string();
        }
        contest.start_date = start;
        contest.end_date = end;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap()
    }

    fn create_request() -> CreateContestRequest {
        CreateContestRequest {
            title: "  Ocean Myths ".into(),
            description: "Creatures of the deep".into(),
            theme: "ocean".into(),
            start_date: start(),
            end_date: start() + Duration::days(7),
        }
    }

    #[test]
    fn blank_fields_fail_validation() {
        let mut req = create_request();
        req.title = "   ".into();

        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));
    }

    #[test]
    fn end_must_follow_start() {
        let mut req = create_request();
        assert!(req.validate_dates().is_ok());

        req.end_date = req.start_date;
        assert!(req.validate_dates().is_err());
    }

    #[test]
    fn into_contest_trims_text() {
        let contest = create_request().into_contest(start() - Duration::days(1));
        assert_eq!(contest.title, "Ocean Myths");
        assert_eq!(contest.status, ContestStatus::Upcoming);
    }

    #[test]
    fn partial_update_checks_merged_window() {
        let mut contest = create_request().into_contest(start());
        let update = UpdateContestRequest {
            end_date: Some(start() - Duration::hours(1)),
            title: Some("Changed".into()),
            ..Default::default()
        };

        assert!(update.apply_to(&mut contest).is_err());
        assert_eq!(contest.title, "Ocean Myths");

        let update = UpdateContestRequest {
            theme: Some(" abyss ".into()),
            ..Default::default()
        };
        update.apply_to(&mut contest).unwrap();
        assert_eq!(contest.theme, "abyss");
        assert_eq!(contest.end_date, start() + Duration::days(7));
    }

    #[test]
    fn post_ref_serializes_as_id_or_object() {
        let id = Uuid::new_v4();
        assert_eq!(
            serde_json::to_value(PostRef::Reference(id)).unwrap(),
            json!(id.to_string())
        );

        let post = PostSummary {
            id,
            user_id: "auth0|1".into(),
            image_url: "https://img.example/1.png".into(),
            prompt: None,
            created_at: start(),
        };
        let value = serde_json::to_value(PostRef::Expanded(post)).unwrap();
        assert_eq!(value["imageUrl"], "https://img.example/1.png");
        assert_eq!(value["id"], id.to_string());
    }
}
