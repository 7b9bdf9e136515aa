use std::sync::Arc;

use async_trait::async_trait;

use crate::application::admin::categories::AdminCategoryService;
use crate::infra::db::PostgresRepositories;

/// Liveness probe for the backing store.
#[async_trait]
pub trait DatabaseHealth: Send + Sync {
    async fn health_check(&self) -> Result<(), sqlx::Error>;
}

#[async_trait]
impl DatabaseHealth for PostgresRepositories {
    async fn health_check(&self) -> Result<(), sqlx::Error> {
        PostgresRepositories::health_check(self).await
    }
}

#[derive(Clone)]
pub struct AdminState {
    pub categories: Arc<AdminCategoryService>,
    pub db: Arc<dyn DatabaseHealth>,
}

impl AdminState {
    /// Actor recorded in audit entries for admin writes.
    pub const ACTOR: &'static str = "admin";
}
