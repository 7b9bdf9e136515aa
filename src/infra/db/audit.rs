use async_trait::async_trait;

use crate::{
    application::repos::{AuditRepo, RepoError},
    domain::entities::AuditLogRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl AuditRepo for PostgresRepositories {
    async fn append_log(&self, record: AuditLogRecord) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, actor, action, entity_type, entity_id, payload_text, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(record.actor)
        .bind(record.action)
        .bind(record.entity_type)
        .bind(record.entity_id)
        .bind(record.payload_text)
        .bind(record.created_at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}
