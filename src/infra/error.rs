use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("failed to bind admin listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("admin server failed: {0}")]
    Serve(#[source] std::io::Error),
    #[error("database error: {message}")]
    Database { message: String },
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl InfraError {
    pub fn database(err: impl std::fmt::Display) -> Self {
        Self::Database {
            message: err.to_string(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
