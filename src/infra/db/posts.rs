use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{PostsRepo, RepoError},
    domain::entities::PostRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    category_id: Uuid,
    slug: String,
    title: String,
    is_published: bool,
    created_at: OffsetDateTime,
    modified_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            category_id: row.category_id,
            slug: row.slug,
            title: row.title,
            is_published: row.is_published,
            created_at: row.created_at,
            modified_at: row.modified_at,
        }
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn count_published_for_category(&self, category_id: Uuid) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM posts WHERE category_id = $1 AND is_published",
        )
        .bind(category_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn count_for_category(&self, category_id: Uuid) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE category_id = $1")
            .bind(category_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }
}

impl PostgresRepositories {
    /// Posts of every category in `category_ids`, grouped by category, in one query.
    pub(super) async fn prefetch_posts(
        &self,
        category_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<PostRecord>>, RepoError> {
        if category_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, category_id, slug, title, is_published, created_at, modified_at
            FROM posts
            WHERE category_id = ANY($1)
            ORDER BY created_at, id
            "#,
        )
        .bind(category_ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let mut grouped: HashMap<Uuid, Vec<PostRecord>> = HashMap::new();
        for row in rows {
            grouped
                .entry(row.category_id)
                .or_default()
                .push(PostRecord::from(row));
        }
        Ok(grouped)
    }
}
