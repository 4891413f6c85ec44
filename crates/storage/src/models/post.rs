use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// The subset of a post that contests need. Posts are owned by the wider
/// application; contests only hold references to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: Uuid,
    pub user_id: String,
    pub image_url: String,
    pub prompt: Option<String>,
    pub created_at: DateTime<Utc>,
}
