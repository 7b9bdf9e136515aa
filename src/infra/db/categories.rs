use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::{OffsetDateTime, PrimitiveDateTime};
use uuid::Uuid;

use crate::{
    application::admin::descriptor::{ListOrdering, OrderField},
    application::pagination::{CategoryCursor, CategorySortKey, CursorPage, PaginationError},
    application::repos::{
        CategoriesRepo, CategoriesWriteRepo, CategoryListQuery, CategoryQueryFilter, CategoryRow,
        CreateCategoryParams, PostsPrefetch, RepoError, UpdateCategoryParams,
    },
    domain::categories::{DateBucket, DateLevel, PostsStatus},
    domain::entities::CategoryRecord,
};

use super::{PostgresRepositories, map_sqlx_error, util::like_pattern};

const CATEGORY_COLUMNS: &str = "c.id, c.slug, c.title, c.is_published, c.created_at, c.modified_at";
const MAX_LIST_LIMIT: u32 = 500;

#[derive(sqlx::FromRow)]
struct CategoryDbRow {
    id: Uuid,
    slug: String,
    title: String,
    is_published: bool,
    created_at: OffsetDateTime,
    modified_at: OffsetDateTime,
}

impl From<CategoryDbRow> for CategoryRecord {
    fn from(row: CategoryDbRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            is_published: row.is_published,
            created_at: row.created_at,
            modified_at: row.modified_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BucketRow {
    bucket: PrimitiveDateTime,
    count: i64,
}

#[async_trait]
impl CategoriesRepo for PostgresRepositories {
    async fn list_categories(
        &self,
        query: &CategoryListQuery,
        prefetch: PostsPrefetch,
    ) -> Result<CursorPage<CategoryRow>, RepoError> {
        let limit = i64::from(query.page.limit.clamp(1, MAX_LIST_LIMIT));

        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(CATEGORY_COLUMNS);
        qb.push(" FROM categories c WHERE 1=1 ");
        Self::apply_category_filter(&mut qb, &query.filter);

        if let Some(cursor) = query.page.cursor.as_ref() {
            Self::apply_category_cursor(&mut qb, query.ordering, cursor)?;
        }

        let direction = if query.ordering.descending {
            "DESC"
        } else {
            "ASC"
        };
        qb.push(format_args!(
            " ORDER BY {} {direction}, c.id {direction} ",
            order_column(query.ordering.field)
        ));
        qb.push(" LIMIT ");
        qb.push_bind(limit + 1);

        let mut rows = qb
            .build_query_as::<CategoryDbRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let has_more = (rows.len() as i64) > limit;
        if has_more {
            rows.pop();
        }

        let next_cursor = match (has_more, rows.last()) {
            (true, Some(last)) => {
                Some(CategoryCursor::new(sort_key(query.ordering.field, last), last.id).encode())
            }
            _ => None,
        };

        let records: Vec<CategoryRecord> = rows.into_iter().map(CategoryRecord::from).collect();

        let items = match prefetch {
            PostsPrefetch::None => records
                .into_iter()
                .map(|record| CategoryRow {
                    record,
                    posts: None,
                })
                .collect(),
            PostsPrefetch::Posts => {
                let ids: Vec<Uuid> = records.iter().map(|record| record.id).collect();
                let mut grouped = self.prefetch_posts(&ids).await?;
                records
                    .into_iter()
                    .map(|record| {
                        let posts = grouped.remove(&record.id).unwrap_or_default();
                        CategoryRow {
                            record,
                            posts: Some(posts),
                        }
                    })
                    .collect()
            }
        };

        Ok(CursorPage::new(items, next_cursor))
    }

    async fn count_categories(&self, filter: &CategoryQueryFilter) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM categories c WHERE 1=1 ");
        Self::apply_category_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn date_buckets(
        &self,
        filter: &CategoryQueryFilter,
        level: DateLevel,
    ) -> Result<Vec<DateBucket>, RepoError> {
        let unit = match level {
            DateLevel::Year => "year",
            DateLevel::Month => "month",
            DateLevel::Day => "day",
        };

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT date_trunc('{unit}', c.created_at AT TIME ZONE 'UTC') AS bucket, \
             COUNT(*) AS count FROM categories c WHERE 1=1 "
        ));
        Self::apply_category_filter(&mut qb, filter);
        qb.push(" GROUP BY bucket ORDER BY bucket ");

        let rows = qb
            .build_query_as::<BucketRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(DateBucket::at(
                    level,
                    row.bucket.date(),
                    Self::convert_count(row.count)?,
                ))
            })
            .collect()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
        let row = sqlx::query_as::<_, CategoryDbRow>(
            r#"
            SELECT c.id, c.slug, c.title, c.is_published, c.created_at, c.modified_at
            FROM categories c
            WHERE c.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(CategoryRecord::from))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError> {
        let row = sqlx::query_as::<_, CategoryDbRow>(
            r#"
            SELECT c.id, c.slug, c.title, c.is_published, c.created_at, c.modified_at
            FROM categories c
            WHERE c.slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(CategoryRecord::from))
    }
}

#[async_trait]
impl CategoriesWriteRepo for PostgresRepositories {
    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let CreateCategoryParams {
            slug,
            title,
            is_published,
        } = params;

        let row = sqlx::query_as::<_, CategoryDbRow>(
            r#"
            INSERT INTO categories (id, slug, title, is_published, created_at, modified_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id, slug, title, is_published, created_at, modified_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(slug)
        .bind(title)
        .bind(is_published)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(CategoryRecord::from(row))
    }

    async fn update_category(
        &self,
        params: UpdateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let UpdateCategoryParams {
            id,
            title,
            is_published,
        } = params;

        let row = sqlx::query_as::<_, CategoryDbRow>(
            r#"
            UPDATE categories
            SET title = $2,
                is_published = $3,
                modified_at = now()
            WHERE id = $1
            RETURNING id, slug, title, is_published, created_at, modified_at
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(is_published)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(CategoryRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_category(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

impl PostgresRepositories {
    fn apply_category_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &CategoryQueryFilter) {
        if let Some(search) = filter.search.as_deref() {
            // every whitespace-separated term must match
            for term in search.split_whitespace() {
                qb.push(" AND c.title ILIKE ");
                qb.push_bind(like_pattern(term));
                qb.push(" ESCAPE '\\' ");
            }
        }

        if let Some(is_published) = filter.is_published {
            qb.push(" AND c.is_published = ");
            qb.push_bind(is_published);
            qb.push(" ");
        }

        match filter.posts_status {
            Some(PostsStatus::Published) => {
                qb.push(
                    " AND EXISTS (SELECT 1 FROM posts p \
                     WHERE p.category_id = c.id AND p.is_published) ",
                );
            }
            Some(PostsStatus::DraftOnly) => {
                qb.push(
                    " AND EXISTS (SELECT 1 FROM posts p WHERE p.category_id = c.id) \
                     AND NOT EXISTS (SELECT 1 FROM posts p \
                     WHERE p.category_id = c.id AND p.is_published) ",
                );
            }
            Some(PostsStatus::Empty) => {
                qb.push(" AND NOT EXISTS (SELECT 1 FROM posts p WHERE p.category_id = c.id) ");
            }
            None => {}
        }

        if let Some((start, end)) = filter.created.bounds() {
            qb.push(" AND c.created_at >= ");
            qb.push_bind(start);
            if let Some(end) = end {
                qb.push(" AND c.created_at < ");
                qb.push_bind(end);
            }
            qb.push(" ");
        }
    }

    fn apply_category_cursor(
        qb: &mut QueryBuilder<'_, Postgres>,
        ordering: ListOrdering,
        cursor: &CategoryCursor,
    ) -> Result<(), RepoError> {
        let comparator = if ordering.descending { "<" } else { ">" };
        qb.push(format_args!(
            " AND ({}, c.id) {comparator} (",
            order_column(ordering.field)
        ));

        match (ordering.field, cursor.key()) {
            (OrderField::Title, CategorySortKey::Title { title }) => {
                qb.push_bind(title.clone());
            }
            (OrderField::CreatedAt, CategorySortKey::CreatedAt { at })
            | (OrderField::ModifiedAt, CategorySortKey::ModifiedAt { at }) => {
                qb.push_bind(*at);
            }
            _ => {
                return Err(RepoError::Pagination(PaginationError::InvalidCursor(
                    "cursor does not match the requested ordering".to_string(),
                )));
            }
        }

        qb.push(", ");
        qb.push_bind(cursor.id());
        qb.push(") ");
        Ok(())
    }
}

fn order_column(field: OrderField) -> &'static str {
    match field {
        OrderField::Title => "c.title",
        OrderField::CreatedAt => "c.created_at",
        OrderField::ModifiedAt => "c.modified_at",
    }
}

fn sort_key(field: OrderField, row: &CategoryDbRow) -> CategorySortKey {
    match field {
        OrderField::Title => CategorySortKey::Title {
            title: row.title.clone(),
        },
        OrderField::CreatedAt => CategorySortKey::CreatedAt { at: row.created_at },
        OrderField::ModifiedAt => CategorySortKey::ModifiedAt {
            at: row.modified_at,
        },
    }
}
