use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{Contest, ContestStatus, Entry, Winner};

use super::ContestStore;

const CONTEST_COLUMNS: &str = r#"
    id, title, description, theme, start_date, end_date, status,
    entries, winners, created_at, version
"#;

#[derive(FromRow)]
struct ContestRow {
    id: Uuid,
    title: String,
    description: String,
    theme: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    status: String,
    entries: Json<Vec<Entry>>,
    winners: Json<Vec<Winner>>,
    created_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<ContestRow> for Contest {
    type Error = StorageError;

    fn try_from(row: ContestRow) -> Result<Self> {
        let status = row
            .status
            .parse::<ContestStatus>()
            .map_err(StorageError::ConstraintViolation)?;

        Ok(Self {
            id: row.id,
            title: row.title,
            description: row.description,
            theme: row.theme,
            start_date: row.start_date,
            end_date: row.end_date,
            status,
            entries: row.entries.0,
            winners: row.winners.0,
            created_at: row.created_at,
            version: row.version,
        })
    }
}

fn into_contests(rows: Vec<ContestRow>) -> Result<Vec<Contest>> {
    rows.into_iter().map(Contest::try_from).collect()
}

/// PostgreSQL-backed contest store. Entries and winners live in JSONB
/// columns of the contest row.
#[derive(Clone)]
pub struct PgContestStore {
    pool: PgPool,
}

impl PgContestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        let found = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM contests WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(found)
    }
}

#[async_trait]
impl ContestStore for PgContestStore {
    async fn create(&self, contest: &Contest) -> Result<Contest> {
        let sql = format!(
            r#"
            INSERT INTO contests (
                id, title, description, theme, start_date, end_date, status,
                entries, winners, created_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {CONTEST_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, ContestRow>(&sql)
            .bind(contest.id)
            .bind(&contest.title)
            .bind(&contest.description)
            .bind(&contest.theme)
            .bind(contest.start_date)
            .bind(contest.end_date)
            .bind(contest.status.as_str())
            .bind(Json(&contest.entries))
            .bind(Json(&contest.winners))
            .bind(contest.created_at)
            .bind(contest.version)
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::from)
            .map_err(|e| {
                if e.is_unique_violation() {
                    StorageError::ConstraintViolation("Contest already exists".to_string())
                } else {
                    e
                }
            })?;

        row.try_into()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Contest>> {
        let sql = format!("SELECT {CONTEST_COLUMNS} FROM contests WHERE id = $1");

        sqlx::query_as::<_, ContestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Contest::try_from)
            .transpose()
    }

    async fn find_all(&self) -> Result<Vec<Contest>> {
        let sql = format!("SELECT {CONTEST_COLUMNS} FROM contests ORDER BY created_at");

        let rows = sqlx::query_as::<_, ContestRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        into_contests(rows)
    }

    async fn find_by_statuses(&self, statuses: &[ContestStatus]) -> Result<Vec<Contest>> {
        let sql = format!(
            "SELECT {CONTEST_COLUMNS} FROM contests WHERE status = ANY($1) ORDER BY created_at"
        );
        let statuses: Vec<&str> = statuses.iter().map(ContestStatus::as_str).collect();

        let rows = sqlx::query_as::<_, ContestRow>(&sql)
            .bind(statuses)
            .fetch_all(&self.pool)
            .await?;

        into_contests(rows)
    }

    async fn find_by_entrant(&self, user_id: &str) -> Result<Vec<Contest>> {
        // Served by the GIN index on `entries`.
        let sql = format!(
            "SELECT {CONTEST_COLUMNS} FROM contests WHERE entries @> $1 ORDER BY created_at"
        );

        let rows = sqlx::query_as::<_, ContestRow>(&sql)
            .bind(Json(json!([{ "userId": user_id }])))
            .fetch_all(&self.pool)
            .await?;

        into_contests(rows)
    }

    async fn find_due_for_refresh(&self, now: DateTime<Utc>) -> Result<Vec<Contest>> {
        let sql = format!(
            r#"
            SELECT {CONTEST_COLUMNS}
            FROM contests
            WHERE (status = 'upcoming' AND start_date <= $1)
               OR (status = 'active' AND end_date <= $1)
            ORDER BY start_date
            "#
        );

        let rows = sqlx::query_as::<_, ContestRow>(&sql)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;

        into_contests(rows)
    }

    async fn update(&self, contest: &Contest) -> Result<Contest> {
        let sql = format!(
            r#"
            UPDATE contests
            SET
                title = $3,
                description = $4,
                theme = $5,
                start_date = $6,
                end_date = $7,
                status = $8,
                entries = $9,
                winners = $10,
                version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING {CONTEST_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, ContestRow>(&sql)
            .bind(contest.id)
            .bind(contest.version)
            .bind(&contest.title)
            .bind(&contest.description)
            .bind(&contest.theme)
            .bind(contest.start_date)
            .bind(contest.end_date)
            .bind(contest.status.as_str())
            .bind(Json(&contest.entries))
            .bind(Json(&contest.winners))
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            return row.try_into();
        }

        if self.exists(contest.id).await? {
            tracing::debug!(
                contest_id = %contest.id,
                version = contest.version,
                "Contest update lost version check"
            );
            Err(StorageError::VersionConflict(contest.id))
        } else {
            Err(StorageError::NotFound)
        }
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM contests
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        Ok(())
    }
}
