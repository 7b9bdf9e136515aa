mod error;
mod handlers;
mod middleware;
mod state;

pub use error::{ApiError, codes};
pub use state::{AdminState, DatabaseHealth};

use axum::{
    Router,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use sqlx::Error as SqlxError;

use crate::application::error::ErrorReport;

use middleware::{log_responses, set_request_context};

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route(
            "/admin/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/admin/categories/descriptor",
            get(handlers::category_descriptor),
        )
        .route(
            "/admin/categories/{id}",
            get(handlers::get_category)
                .patch(handlers::update_category)
                .delete(handlers::delete_category),
        )
        .route("/_health/db", get(handlers::db_health))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

fn db_health_response(result: Result<(), SqlxError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
