use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::PostSummary;

use super::PostDirectory;

/// Reads posts from the application's `posts` table.
#[derive(Clone)]
pub struct PgPostDirectory {
    pool: PgPool,
}

impl PgPostDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostDirectory for PgPostDirectory {
    async fn find(&self, id: Uuid) -> Result<Option<PostSummary>> {
        let post = sqlx::query_as::<_, PostSummary>(
            r#"
            SELECT id, user_id, image_url, prompt, created_at
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(post)
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<PostSummary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let posts = sqlx::query_as::<_, PostSummary>(
            r#"
            SELECT id, user_id, image_url, prompt, created_at
            FROM posts
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }
}
