use std::{process, sync::Arc, time::Duration};

use sage_blog::{
    application::{
        admin::{audit::AdminAuditService, categories::AdminCategoryService},
        error::AppError,
        repos::{AuditRepo, CategoriesRepo, CategoriesWriteRepo, PostsRepo},
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AdminState},
        telemetry,
    },
};
use sqlx::PgPool;
use tokio::signal;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(config::ServeArgs::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect_and_migrate(&settings).await?;
    let repositories = Arc::new(PostgresRepositories::new(pool));
    let admin_state = build_admin_state(repositories, &settings);

    serve_admin(&settings, admin_state).await
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    connect_and_migrate(&settings).await?;
    info!(target = "sage_blog::migrate", "database schema is up to date");
    Ok(())
}

async fn connect_and_migrate(settings: &config::Settings) -> Result<PgPool, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(InfraError::database)?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::from)?;

    Ok(pool)
}

fn build_admin_state(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> AdminState {
    let categories_repo: Arc<dyn CategoriesRepo> = repositories.clone();
    let categories_write_repo: Arc<dyn CategoriesWriteRepo> = repositories.clone();
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let audit_repo: Arc<dyn AuditRepo> = repositories.clone();

    let categories = AdminCategoryService::new(
        categories_repo,
        categories_write_repo,
        posts_repo,
        AdminAuditService::new(audit_repo),
    )
    .with_default_page_size(settings.admin.page_size.get());

    AdminState {
        categories: Arc::new(categories),
        db: repositories,
    }
}

async fn serve_admin(settings: &config::Settings, admin_state: AdminState) -> Result<(), AppError> {
    let admin_router = http::build_admin_router(admin_state);

    let addr = settings.server.admin_addr;
    let admin_listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| InfraError::Bind { addr, source })?;

    info!(target = "sage_blog::serve", %addr, "admin listener ready");

    axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(settings.server.graceful_shutdown))
        .await
        .map_err(InfraError::Serve)?;

    Ok(())
}

/// Resolves on ctrl-c or SIGTERM, then arms a hard deadline for draining.
async fn shutdown_signal(grace: Duration) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(target = "sage_blog::serve", error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(target = "sage_blog::serve", error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!(
        target = "sage_blog::serve",
        grace_seconds = grace.as_secs(),
        "shutdown requested; draining in-flight requests"
    );

    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!(target = "sage_blog::serve", "graceful shutdown deadline exceeded");
        process::exit(1);
    });
}
