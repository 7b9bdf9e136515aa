use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::admin::audit::AdminAuditService;
use crate::application::admin::descriptor::{CATEGORY_ADMIN, ListOrdering};
use crate::application::pagination::{CategoryCursor, CursorPage, PageRequest};
use crate::application::repos::{
    CategoriesRepo, CategoriesWriteRepo, CategoryListQuery, CategoryQueryFilter, CategoryRow,
    CreateCategoryParams, PostsPrefetch, PostsRepo, RepoError, UpdateCategoryParams,
};
use crate::domain::categories::{
    DateBucket, DateHierarchy, DateLevel, PostsStatus, published_posts_count,
};
use crate::domain::entities::CategoryRecord;
use crate::domain::slug::{SlugAsyncError, SlugError, generate_unique_slug_async};

pub const DEFAULT_PAGE_SIZE: u32 = 100;
const MAX_PAGE_SIZE: u32 = 500;

#[derive(Debug, Error)]
pub enum AdminCategoryError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error("read-only fields cannot be submitted: {}", .0.join(", "))]
    ReadOnlyField(Vec<String>),
    #[error("unknown field `{0}`")]
    UnknownField(String),
    #[error("invalid value for `{field}`")]
    InvalidValue { field: &'static str },
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    #[error("cannot order by `{0}`")]
    InvalidOrdering(String),
    #[error("category not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Raw change-list parameters as received from the admin host.
#[derive(Debug, Clone, Default)]
pub struct ChangeListParams {
    pub search: Option<String>,
    /// Boolish flag: `1`/`true`/`yes`/`on` or `0`/`false`/`no`/`off`.
    pub is_published: Option<String>,
    pub posts_status: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u8>,
    pub day: Option<u8>,
    pub ordering: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

/// One rendered change-list row, columns as declared by the descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryListItem {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub is_published: bool,
    pub published_posts_count: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub modified_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterChoice {
    pub parameter: &'static str,
    pub value: &'static str,
    pub label: &'static str,
    pub count: u64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeList {
    pub items: Vec<CategoryListItem>,
    pub next_cursor: Option<String>,
    pub total: u64,
    pub ordering: ListOrdering,
    pub filter_choices: Vec<FilterChoice>,
    pub date_level: Option<DateLevel>,
    pub date_buckets: Vec<DateBucket>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryDetail {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub is_published: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub modified_at: OffsetDateTime,
    pub published_posts_count: u64,
    pub readonly_fields: &'static [&'static str],
}

/// Values accepted from an add/change form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryForm {
    pub title: Option<String>,
    pub is_published: Option<bool>,
}

impl CategoryForm {
    /// Validate a submitted JSON object against the descriptor: read-only
    /// fields are refused, unknown fields are refused, the rest are typed.
    pub fn from_submission(submission: &Map<String, Value>) -> Result<Self, AdminCategoryError> {
        let readonly = CATEGORY_ADMIN.reject_readonly(submission.keys().map(String::as_str));
        if !readonly.is_empty() {
            return Err(AdminCategoryError::ReadOnlyField(readonly));
        }

        let mut form = CategoryForm::default();
        for (field, value) in submission {
            match field.as_str() {
                "title" => {
                    let title = value
                        .as_str()
                        .ok_or(AdminCategoryError::InvalidValue { field: "title" })?;
                    form.title = Some(title.to_string());
                }
                "is_published" => {
                    let flag = value.as_bool().ok_or(AdminCategoryError::InvalidValue {
                        field: "is_published",
                    })?;
                    form.is_published = Some(flag);
                }
                other => return Err(AdminCategoryError::UnknownField(other.to_string())),
            }
        }

        Ok(form)
    }
}

#[derive(Clone)]
pub struct AdminCategoryService {
    reader: Arc<dyn CategoriesRepo>,
    writer: Arc<dyn CategoriesWriteRepo>,
    posts: Arc<dyn PostsRepo>,
    audit: AdminAuditService,
    default_page_size: u32,
}

impl AdminCategoryService {
    pub fn new(
        reader: Arc<dyn CategoriesRepo>,
        writer: Arc<dyn CategoriesWriteRepo>,
        posts: Arc<dyn PostsRepo>,
        audit: AdminAuditService,
    ) -> Self {
        Self {
            reader,
            writer,
            posts,
            audit,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_default_page_size(mut self, page_size: u32) -> Self {
        self.default_page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Categories for a change list, with their posts eagerly loaded so the
    /// per-row count needs no further storage round trip.
    pub async fn queryset(
        &self,
        query: &CategoryListQuery,
    ) -> Result<CursorPage<CategoryRow>, AdminCategoryError> {
        self.reader
            .list_categories(query, PostsPrefetch::Posts)
            .await
            .map_err(AdminCategoryError::from)
    }

    /// Published posts of a listed category. Uses the pre-fetched posts when
    /// present and otherwise counts in storage.
    pub async fn published_posts_count(&self, row: &CategoryRow) -> Result<u64, AdminCategoryError> {
        match row.posts.as_deref() {
            Some(posts) => Ok(published_posts_count(posts)),
            None => {
                counter!("sage_blog_published_count_fallback_total").increment(1);
                debug!(
                    target = "sage_blog::admin::categories",
                    category = %row.record.id,
                    "posts not pre-fetched; counting in storage"
                );
                self.posts
                    .count_published_for_category(row.record.id)
                    .await
                    .map_err(AdminCategoryError::from)
            }
        }
    }

    pub async fn changelist(
        &self,
        params: ChangeListParams,
    ) -> Result<ChangeList, AdminCategoryError> {
        counter!("sage_blog_admin_category_list_total").increment(1);

        let ordering = match params.ordering.as_deref() {
            None | Some("") => ListOrdering::default(),
            Some(value) => ListOrdering::parse(value)
                .ok_or_else(|| AdminCategoryError::InvalidOrdering(value.to_string()))?,
        };

        let posts_status = params
            .posts_status
            .as_deref()
            .filter(|value| !value.is_empty())
            .map(PostsStatus::try_from)
            .transpose()
            .map_err(|err| AdminCategoryError::InvalidFilter(err.to_string()))?;

        let is_published = params
            .is_published
            .as_deref()
            .filter(|value| !value.is_empty())
            .map(|value| {
                parse_flag(value).ok_or_else(|| {
                    AdminCategoryError::InvalidFilter(format!("`{value}` is not a boolean flag"))
                })
            })
            .transpose()?;

        let created = DateHierarchy::from_parts(params.year, params.month, params.day)
            .map_err(|err| AdminCategoryError::InvalidFilter(err.to_string()))?;

        let search = params
            .search
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let cursor = params
            .cursor
            .as_deref()
            .map(CategoryCursor::decode)
            .transpose()
            .map_err(RepoError::from)?;

        let limit = params
            .limit
            .unwrap_or(self.default_page_size)
            .clamp(1, MAX_PAGE_SIZE);

        let filter = CategoryQueryFilter {
            search,
            is_published,
            posts_status,
            created,
        };

        let query = CategoryListQuery {
            filter,
            ordering,
            page: PageRequest::new(limit, cursor),
        };

        let page = self.queryset(&query).await?;

        let mut items = Vec::with_capacity(page.items.len());
        for row in &page.items {
            let published_posts_count = self.published_posts_count(row).await?;
            let record = &row.record;
            items.push(CategoryListItem {
                id: record.id,
                title: record.title.clone(),
                slug: record.slug.clone(),
                is_published: record.is_published,
                published_posts_count,
                modified_at: record.modified_at,
            });
        }

        let total = self.reader.count_categories(&query.filter).await?;
        let filter_choices = self.filter_choices(&query.filter).await?;

        let date_level = query.filter.created.next_level();
        let date_buckets = match date_level {
            Some(level) => self.reader.date_buckets(&query.filter, level).await?,
            None => Vec::new(),
        };

        Ok(ChangeList {
            items,
            next_cursor: page.next_cursor,
            total,
            ordering,
            filter_choices,
            date_level,
            date_buckets,
        })
    }

    /// Choices for both list filters, each counted with the other active
    /// filters applied and its own parameter replaced.
    async fn filter_choices(
        &self,
        filter: &CategoryQueryFilter,
    ) -> Result<Vec<FilterChoice>, AdminCategoryError> {
        let mut choices = Vec::new();

        for status in PostsStatus::ALL {
            let scoped = CategoryQueryFilter {
                posts_status: Some(status),
                ..filter.clone()
            };
            choices.push(FilterChoice {
                parameter: PostsStatus::PARAMETER,
                value: status.as_str(),
                label: status.label(),
                count: self.reader.count_categories(&scoped).await?,
                is_active: filter.posts_status == Some(status),
            });
        }

        for (flag, value, label) in [(true, "true", "Yes"), (false, "false", "No")] {
            let scoped = CategoryQueryFilter {
                is_published: Some(flag),
                ..filter.clone()
            };
            choices.push(FilterChoice {
                parameter: "is_published",
                value,
                label,
                count: self.reader.count_categories(&scoped).await?,
                is_active: filter.is_published == Some(flag),
            });
        }

        Ok(choices)
    }

    pub async fn detail(&self, id: Uuid) -> Result<CategoryDetail, AdminCategoryError> {
        let record = self
            .reader
            .find_by_id(id)
            .await?
            .ok_or(AdminCategoryError::NotFound)?;

        let published_posts_count = self.posts.count_published_for_category(record.id).await?;

        Ok(CategoryDetail {
            id: record.id,
            title: record.title,
            slug: record.slug,
            is_published: record.is_published,
            created_at: record.created_at,
            modified_at: record.modified_at,
            published_posts_count,
            readonly_fields: CATEGORY_ADMIN.readonly_fields,
        })
    }

    pub async fn create_category(
        &self,
        actor: &str,
        form: CategoryForm,
    ) -> Result<CategoryRecord, AdminCategoryError> {
        let title = required_title(form.title.as_deref())?;

        let reader = self.reader.clone();
        let slug = match generate_unique_slug_async(&title, move |candidate| {
            let reader = reader.clone();
            let candidate = candidate.to_string();
            async move {
                reader
                    .find_by_slug(&candidate)
                    .await
                    .map(|existing| existing.is_none())
            }
        })
        .await
        {
            Ok(slug) => slug,
            Err(SlugAsyncError::Slug(SlugError::EmptyInput | SlugError::Unrepresentable { .. })) => {
                return Err(AdminCategoryError::ConstraintViolation("title"));
            }
            Err(SlugAsyncError::Slug(SlugError::Exhausted { .. })) => {
                return Err(AdminCategoryError::ConstraintViolation("slug"));
            }
            Err(SlugAsyncError::Predicate(err)) => return Err(AdminCategoryError::Repo(err)),
        };

        let params = CreateCategoryParams {
            slug,
            title,
            is_published: form.is_published.unwrap_or(false),
        };

        let category = self.writer.create_category(params).await?;
        counter!("sage_blog_admin_category_write_total", "action" => "create").increment(1);
        info!(
            target = "sage_blog::admin::categories",
            actor,
            category = %category.id,
            slug = %category.slug,
            "category created"
        );
        self.audit
            .record(
                actor,
                "category.create",
                "category",
                Some(category.id.to_string().as_str()),
                Some(&CategorySnapshot::from(&category)),
            )
            .await?;
        Ok(category)
    }

    pub async fn update_category(
        &self,
        actor: &str,
        id: Uuid,
        form: CategoryForm,
    ) -> Result<CategoryRecord, AdminCategoryError> {
        let existing = self
            .reader
            .find_by_id(id)
            .await?
            .ok_or(AdminCategoryError::NotFound)?;

        let title = match form.title.as_deref() {
            Some(value) => required_title(Some(value))?,
            None => existing.title.clone(),
        };

        let params = UpdateCategoryParams {
            id,
            title,
            is_published: form.is_published.unwrap_or(existing.is_published),
        };

        let category = self.writer.update_category(params).await?;
        counter!("sage_blog_admin_category_write_total", "action" => "update").increment(1);
        info!(
            target = "sage_blog::admin::categories",
            actor,
            category = %category.id,
            "category updated"
        );
        self.audit
            .record(
                actor,
                "category.update",
                "category",
                Some(category.id.to_string().as_str()),
                Some(&CategorySnapshot::from(&category)),
            )
            .await?;
        Ok(category)
    }

    pub async fn delete_category(&self, actor: &str, id: Uuid) -> Result<(), AdminCategoryError> {
        let existing = self
            .reader
            .find_by_id(id)
            .await?
            .ok_or(AdminCategoryError::NotFound)?;

        let posts = self.posts.count_for_category(id).await?;
        self.writer.delete_category(id).await?;
        counter!("sage_blog_admin_category_write_total", "action" => "delete").increment(1);
        info!(
            target = "sage_blog::admin::categories",
            actor,
            category = %id,
            cascaded_posts = posts,
            "category deleted"
        );
        self.audit
            .record(
                actor,
                "category.delete",
                "category",
                Some(id.to_string().as_str()),
                Some(&CategorySnapshot::from(&existing)),
            )
            .await?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct CategorySnapshot<'a> {
    slug: &'a str,
    title: &'a str,
    is_published: bool,
}

impl<'a> From<&'a CategoryRecord> for CategorySnapshot<'a> {
    fn from(record: &'a CategoryRecord) -> Self {
        Self {
            slug: &record.slug,
            title: &record.title,
            is_published: record.is_published,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn required_title(value: Option<&str>) -> Result<String, AdminCategoryError> {
    match value.map(str::trim) {
        Some(title) if !title.is_empty() => Ok(title.to_string()),
        _ => Err(AdminCategoryError::ConstraintViolation("title")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    use crate::application::repos::AuditRepo;
    use crate::domain::entities::{AuditLogRecord, PostRecord};

    #[derive(Default)]
    struct StubStore {
        categories: Mutex<Vec<CategoryRecord>>,
        posts: Vec<PostRecord>,
        prefetch_seen: Mutex<Vec<PostsPrefetch>>,
        fallback_counts: Mutex<u32>,
    }

    impl StubStore {
        fn with(categories: Vec<CategoryRecord>, posts: Vec<PostRecord>) -> Arc<Self> {
            Arc::new(Self {
                categories: Mutex::new(categories),
                posts,
                ..Default::default()
            })
        }

        fn posts_of(&self, id: Uuid) -> Vec<PostRecord> {
            self.posts
                .iter()
                .filter(|post| post.category_id == id)
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl CategoriesRepo for StubStore {
        async fn list_categories(
            &self,
            query: &CategoryListQuery,
            prefetch: PostsPrefetch,
        ) -> Result<CursorPage<CategoryRow>, RepoError> {
            self.prefetch_seen.lock().unwrap().push(prefetch);
            let mut records = self.categories.lock().unwrap().clone();
            records.retain(|record| {
                query
                    .filter
                    .is_published
                    .is_none_or(|flag| record.is_published == flag)
            });
            records.sort_by(|a, b| a.title.cmp(&b.title));
            let rows = records
                .into_iter()
                .map(|record| {
                    let posts = (prefetch == PostsPrefetch::Posts).then(|| self.posts_of(record.id));
                    CategoryRow { record, posts }
                })
                .collect();
            Ok(CursorPage::new(rows, None))
        }

        async fn count_categories(&self, _filter: &CategoryQueryFilter) -> Result<u64, RepoError> {
            Ok(self.categories.lock().unwrap().len() as u64)
        }

        async fn date_buckets(
            &self,
            _filter: &CategoryQueryFilter,
            _level: DateLevel,
        ) -> Result<Vec<DateBucket>, RepoError> {
            Ok(Vec::new())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
            let categories = self.categories.lock().unwrap();
            Ok(categories.iter().find(|record| record.id == id).cloned())
        }

        async fn find_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError> {
            let categories = self.categories.lock().unwrap();
            Ok(categories.iter().find(|record| record.slug == slug).cloned())
        }
    }

    #[async_trait]
    impl CategoriesWriteRepo for StubStore {
        async fn create_category(
            &self,
            params: CreateCategoryParams,
        ) -> Result<CategoryRecord, RepoError> {
            let record = category(&params.title, &params.slug, params.is_published);
            self.categories.lock().unwrap().push(record.clone());
            Ok(record)
        }

        async fn update_category(
            &self,
            params: UpdateCategoryParams,
        ) -> Result<CategoryRecord, RepoError> {
            let mut categories = self.categories.lock().unwrap();
            let record = categories
                .iter_mut()
                .find(|record| record.id == params.id)
                .ok_or(RepoError::NotFound)?;
            record.title = params.title;
            record.is_published = params.is_published;
            record.modified_at = OffsetDateTime::now_utc();
            Ok(record.clone())
        }

        async fn delete_category(&self, id: Uuid) -> Result<(), RepoError> {
            self.categories.lock().unwrap().retain(|record| record.id != id);
            Ok(())
        }
    }

    #[async_trait]
    impl PostsRepo for StubStore {
        async fn count_published_for_category(&self, category_id: Uuid) -> Result<u64, RepoError> {
            *self.fallback_counts.lock().unwrap() += 1;
            Ok(published_posts_count(&self.posts_of(category_id)))
        }

        async fn count_for_category(&self, category_id: Uuid) -> Result<u64, RepoError> {
            Ok(self.posts_of(category_id).len() as u64)
        }
    }

    #[derive(Default)]
    struct RecordingAuditRepo {
        actions: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AuditRepo for RecordingAuditRepo {
        async fn append_log(&self, record: AuditLogRecord) -> Result<(), RepoError> {
            self.actions.lock().unwrap().push(record.action);
            Ok(())
        }
    }

    struct FailingPostsRepo;

    #[async_trait]
    impl PostsRepo for FailingPostsRepo {
        async fn count_published_for_category(&self, _id: Uuid) -> Result<u64, RepoError> {
            Err(RepoError::Timeout)
        }

        async fn count_for_category(&self, _id: Uuid) -> Result<u64, RepoError> {
            Err(RepoError::Timeout)
        }
    }

    fn category(title: &str, slug: &str, is_published: bool) -> CategoryRecord {
        let now = OffsetDateTime::now_utc();
        CategoryRecord {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            title: title.to_string(),
            is_published,
            created_at: now,
            modified_at: now,
        }
    }

    fn post(category_id: Uuid, is_published: bool) -> PostRecord {
        let now = OffsetDateTime::now_utc();
        PostRecord {
            id: Uuid::new_v4(),
            category_id,
            slug: format!("post-{}", Uuid::new_v4()),
            title: "Post".into(),
            is_published,
            created_at: now,
            modified_at: now,
        }
    }

    fn service(store: &Arc<StubStore>) -> (AdminCategoryService, Arc<RecordingAuditRepo>) {
        let audit_repo = Arc::new(RecordingAuditRepo::default());
        let service = AdminCategoryService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            AdminAuditService::new(audit_repo.clone()),
        );
        (service, audit_repo)
    }

    #[tokio::test]
    async fn changelist_counts_only_published_posts() {
        let tech = category("Tech", "tech", true);
        let news = category("News", "news", false);
        let posts = vec![
            post(tech.id, true),
            post(tech.id, true),
            post(tech.id, false),
        ];
        let store = StubStore::with(vec![tech.clone(), news.clone()], posts);
        let (service, _) = service(&store);

        let list = service
            .changelist(ChangeListParams::default())
            .await
            .expect("changelist");

        let titles: Vec<_> = list.items.iter().map(|item| item.title.as_str()).collect();
        assert_eq!(titles, vec!["News", "Tech"]);
        assert_eq!(list.items[0].published_posts_count, 0);
        assert_eq!(list.items[1].published_posts_count, 2);
        assert_eq!(list.ordering, ListOrdering::default());
        assert_eq!(list.date_level, Some(DateLevel::Year));
    }

    #[tokio::test]
    async fn changelist_always_prefetches_posts() {
        let tech = category("Tech", "tech", true);
        let store = StubStore::with(vec![tech.clone()], vec![post(tech.id, true)]);
        let (service, _) = service(&store);

        service
            .changelist(ChangeListParams::default())
            .await
            .expect("changelist");

        assert_eq!(
            store.prefetch_seen.lock().unwrap().as_slice(),
            &[PostsPrefetch::Posts]
        );
        assert_eq!(*store.fallback_counts.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn count_falls_back_to_storage_without_prefetch() {
        let tech = category("Tech", "tech", true);
        let posts = vec![post(tech.id, true), post(tech.id, false)];
        let store = StubStore::with(vec![tech.clone()], posts);
        let (service, _) = service(&store);

        let row = CategoryRow {
            record: tech,
            posts: None,
        };
        let count = service.published_posts_count(&row).await.expect("count");

        assert_eq!(count, 1);
        assert_eq!(*store.fallback_counts.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn storage_errors_propagate_from_count() {
        let store = StubStore::with(Vec::new(), Vec::new());
        let audit_repo: Arc<dyn AuditRepo> = Arc::new(RecordingAuditRepo::default());
        let service = AdminCategoryService::new(
            store.clone(),
            store.clone(),
            Arc::new(FailingPostsRepo),
            AdminAuditService::new(audit_repo),
        );

        let row = CategoryRow {
            record: category("Tech", "tech", true),
            posts: None,
        };
        let result = service.published_posts_count(&row).await;
        assert!(matches!(
            result,
            Err(AdminCategoryError::Repo(RepoError::Timeout))
        ));
    }

    #[tokio::test]
    async fn changelist_accepts_boolish_published_flag() {
        let tech = category("Tech", "tech", true);
        let news = category("News", "news", false);
        let store = StubStore::with(vec![tech, news], Vec::new());
        let (service, _) = service(&store);

        for (value, expected) in [("1", "Tech"), ("on", "Tech"), ("0", "News"), ("False", "News")] {
            let list = service
                .changelist(ChangeListParams {
                    is_published: Some(value.into()),
                    ..Default::default()
                })
                .await
                .expect("changelist");
            let titles: Vec<_> = list.items.iter().map(|item| item.title.as_str()).collect();
            assert_eq!(titles, vec![expected], "flag `{value}`");
        }

        let invalid = service
            .changelist(ChangeListParams {
                is_published: Some("maybe".into()),
                ..Default::default()
            })
            .await;
        assert!(matches!(invalid, Err(AdminCategoryError::InvalidFilter(_))));
    }

    #[tokio::test]
    async fn changelist_rejects_unknown_ordering_and_filters() {
        let store = StubStore::with(Vec::new(), Vec::new());
        let (service, _) = service(&store);

        let ordering = service
            .changelist(ChangeListParams {
                ordering: Some("slug".into()),
                ..Default::default()
            })
            .await;
        assert!(matches!(ordering, Err(AdminCategoryError::InvalidOrdering(value)) if value == "slug"));

        let status = service
            .changelist(ChangeListParams {
                posts_status: Some("archived".into()),
                ..Default::default()
            })
            .await;
        assert!(matches!(status, Err(AdminCategoryError::InvalidFilter(_))));

        let hierarchy = service
            .changelist(ChangeListParams {
                month: Some(4),
                ..Default::default()
            })
            .await;
        assert!(matches!(hierarchy, Err(AdminCategoryError::InvalidFilter(_))));

        let year = service
            .changelist(ChangeListParams {
                year: Some(20000),
                ..Default::default()
            })
            .await;
        assert!(matches!(year, Err(AdminCategoryError::InvalidFilter(_))));
    }

    #[tokio::test]
    async fn create_derives_slug_from_title() {
        let store = StubStore::with(Vec::new(), Vec::new());
        let (service, audit) = service(&store);

        let form = CategoryForm {
            title: Some("  News ".into()),
            is_published: None,
        };
        let created = service
            .create_category("tester", form)
            .await
            .expect("create");

        assert_eq!(created.title, "News");
        assert_eq!(created.slug, "news");
        assert!(!created.is_published);

        let detail = service.detail(created.id).await.expect("detail");
        assert_eq!(detail.published_posts_count, 0);
        assert_eq!(
            audit.actions.lock().unwrap().as_slice(),
            &["category.create".to_string()]
        );
    }

    #[tokio::test]
    async fn create_suffixes_colliding_slugs() {
        let store = StubStore::with(vec![category("News", "news", true)], Vec::new());
        let (service, _) = service(&store);

        let created = service
            .create_category(
                "tester",
                CategoryForm {
                    title: Some("news".into()),
                    is_published: Some(true),
                },
            )
            .await
            .expect("create");

        assert_eq!(created.slug, "news-2");
    }

    #[tokio::test]
    async fn create_requires_title() {
        let store = StubStore::with(Vec::new(), Vec::new());
        let (service, _) = service(&store);

        let result = service
            .create_category("tester", CategoryForm::default())
            .await;
        assert!(matches!(
            result,
            Err(AdminCategoryError::ConstraintViolation("title"))
        ));
    }

    #[tokio::test]
    async fn update_keeps_slug_when_title_changes() {
        let tech = category("Tech", "tech", false);
        let store = StubStore::with(vec![tech.clone()], Vec::new());
        let (service, audit) = service(&store);

        let updated = service
            .update_category(
                "tester",
                tech.id,
                CategoryForm {
                    title: Some("Technology".into()),
                    is_published: Some(true),
                },
            )
            .await
            .expect("update");

        assert_eq!(updated.title, "Technology");
        assert_eq!(updated.slug, "tech");
        assert!(updated.is_published);
        assert_eq!(
            audit.actions.lock().unwrap().as_slice(),
            &["category.update".to_string()]
        );
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_category() {
        let store = StubStore::with(Vec::new(), Vec::new());
        let (service, _) = service(&store);

        let update = service
            .update_category("tester", Uuid::new_v4(), CategoryForm::default())
            .await;
        assert!(matches!(update, Err(AdminCategoryError::NotFound)));

        let delete = service.delete_category("tester", Uuid::new_v4()).await;
        assert!(matches!(delete, Err(AdminCategoryError::NotFound)));
    }

    #[tokio::test]
    async fn delete_removes_category_and_audits() {
        let tech = category("Tech", "tech", true);
        let store = StubStore::with(vec![tech.clone()], Vec::new());
        let (service, audit) = service(&store);

        service
            .delete_category("tester", tech.id)
            .await
            .expect("delete");

        assert!(store.categories.lock().unwrap().is_empty());
        assert_eq!(
            audit.actions.lock().unwrap().as_slice(),
            &["category.delete".to_string()]
        );
    }

    #[test]
    fn form_refuses_readonly_and_unknown_fields() {
        let submission = json!({ "title": "Tech", "slug": "hand-made", "created_at": "2025-01-01" });
        let Value::Object(map) = submission else {
            unreachable!()
        };
        match CategoryForm::from_submission(&map) {
            Err(AdminCategoryError::ReadOnlyField(fields)) => {
                assert!(fields.contains(&"slug".to_string()));
                assert!(fields.contains(&"created_at".to_string()));
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let Value::Object(map) = json!({ "colour": "red" }) else {
            unreachable!()
        };
        assert!(matches!(
            CategoryForm::from_submission(&map),
            Err(AdminCategoryError::UnknownField(field)) if field == "colour"
        ));

        let Value::Object(map) = json!({ "is_published": "yes" }) else {
            unreachable!()
        };
        assert!(matches!(
            CategoryForm::from_submission(&map),
            Err(AdminCategoryError::InvalidValue {
                field: "is_published"
            })
        ));
    }

    #[test]
    fn form_accepts_editable_fields() {
        let Value::Object(map) = json!({ "title": "Tech", "is_published": true }) else {
            unreachable!()
        };
        let form = CategoryForm::from_submission(&map).expect("form");
        assert_eq!(
            form,
            CategoryForm {
                title: Some("Tech".into()),
                is_published: Some(true),
            }
        );
    }
}
