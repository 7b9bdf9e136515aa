//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::admin::descriptor::ListOrdering;
use crate::application::pagination::{CategoryCursor, CursorPage, PageRequest, PaginationError};
use crate::domain::categories::{DateBucket, DateHierarchy, DateLevel, PostsStatus};
use crate::domain::entities::{AuditLogRecord, CategoryRecord, PostRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
    #[error(transparent)]
    Pagination(#[from] PaginationError),
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Filters the change list applies before ordering and pagination.
#[derive(Debug, Clone, Default)]
pub struct CategoryQueryFilter {
    /// Case-insensitive substring match on `title`.
    pub search: Option<String>,
    pub is_published: Option<bool>,
    pub posts_status: Option<PostsStatus>,
    pub created: DateHierarchy,
}

/// Eager-load instruction for the related posts of listed categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostsPrefetch {
    #[default]
    None,
    /// Load every listed category's posts in one extra round trip.
    Posts,
}

#[derive(Debug, Clone)]
pub struct CategoryListQuery {
    pub filter: CategoryQueryFilter,
    pub ordering: ListOrdering,
    pub page: PageRequest<CategoryCursor>,
}

/// A listed category together with its posts when they were pre-fetched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRow {
    pub record: CategoryRecord,
    #[serde(skip)]
    pub posts: Option<Vec<PostRecord>>,
}

#[derive(Debug, Clone)]
pub struct CreateCategoryParams {
    pub slug: String,
    pub title: String,
    pub is_published: bool,
}

/// Columns an edit may write. `slug` and the timestamps are never written here.
#[derive(Debug, Clone)]
pub struct UpdateCategoryParams {
    pub id: Uuid,
    pub title: String,
    pub is_published: bool,
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    async fn list_categories(
        &self,
        query: &CategoryListQuery,
        prefetch: PostsPrefetch,
    ) -> Result<CursorPage<CategoryRow>, RepoError>;

    async fn count_categories(&self, filter: &CategoryQueryFilter) -> Result<u64, RepoError>;

    /// Bucket counts of `created_at` at `level` for categories matching `filter`.
    async fn date_buckets(
        &self,
        filter: &CategoryQueryFilter,
        level: DateLevel,
    ) -> Result<Vec<DateBucket>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError>;
}

#[async_trait]
pub trait CategoriesWriteRepo: Send + Sync {
    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError>;

    async fn update_category(
        &self,
        params: UpdateCategoryParams,
    ) -> Result<CategoryRecord, RepoError>;

    async fn delete_category(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn count_published_for_category(&self, category_id: Uuid) -> Result<u64, RepoError>;

    async fn count_for_category(&self, category_id: Uuid) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait AuditRepo: Send + Sync {
    async fn append_log(&self, record: AuditLogRecord) -> Result<(), RepoError>;
}
