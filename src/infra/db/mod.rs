//! Postgres-backed repository implementations.

mod audit;
mod categories;
mod posts;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::application::repos::RepoError;

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(pool).await
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    fn convert_count(value: i64) -> Result<u64, RepoError> {
        value
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }
}
