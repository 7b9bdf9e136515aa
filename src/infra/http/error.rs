use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::admin::categories::AdminCategoryError;
use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const NOT_FOUND: &str = "not_found";
    pub const DUPLICATE: &str = "duplicate";
    pub const INVALID_CURSOR: &str = "invalid_cursor";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const INVALID_FILTER: &str = "invalid_filter";
    pub const INVALID_ORDERING: &str = "invalid_ordering";
    pub const READ_ONLY_FIELD: &str = "read_only_field";
    pub const UNKNOWN_FIELD: &str = "unknown_field";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
        }
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let hint = self.hint.clone();
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message(
            "infra::http::admin",
            self.status,
            format!("{}: {}", self.code, hint.as_deref().unwrap_or(self.message)),
        )
        .attach(&mut response);
        response
    }
}

pub fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Duplicate record",
            Some(constraint),
        ),
        RepoError::Pagination(p) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_CURSOR,
            "Invalid cursor",
            Some(p.to_string()),
        ),
        RepoError::NotFound => ApiError::not_found("resource not found"),
        RepoError::InvalidInput { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(message),
        ),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "Database timeout",
            None,
        ),
        RepoError::Persistence(msg) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "Persistence error",
            Some(msg),
        ),
    }
}

pub fn category_to_api(err: AdminCategoryError) -> ApiError {
    match err {
        AdminCategoryError::ConstraintViolation(field) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid category",
            Some(field.to_string()),
        ),
        AdminCategoryError::ReadOnlyField(fields) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::READ_ONLY_FIELD,
            "Read-only fields cannot be submitted",
            Some(fields.join(", ")),
        ),
        AdminCategoryError::UnknownField(field) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::UNKNOWN_FIELD,
            "Unknown field",
            Some(field),
        ),
        AdminCategoryError::InvalidValue { field } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid field value",
            Some(field.to_string()),
        ),
        AdminCategoryError::InvalidFilter(message) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_FILTER,
            "Invalid filter",
            Some(message),
        ),
        AdminCategoryError::InvalidOrdering(value) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_ORDERING,
            "Invalid ordering",
            Some(value),
        ),
        AdminCategoryError::NotFound => ApiError::not_found("category not found"),
        AdminCategoryError::Repo(repo) => repo_to_api(repo),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::pagination::PaginationError;

    #[test]
    fn readonly_submission_is_a_client_error() {
        let err = category_to_api(AdminCategoryError::ReadOnlyField(vec!["slug".into()]));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), codes::READ_ONLY_FIELD);
    }

    #[test]
    fn repo_failures_keep_their_status() {
        let cursor = category_to_api(AdminCategoryError::Repo(RepoError::Pagination(
            PaginationError::InvalidCursor("bad".into()),
        )));
        assert_eq!(cursor.status(), StatusCode::BAD_REQUEST);
        assert_eq!(cursor.code(), codes::INVALID_CURSOR);

        let timeout = category_to_api(AdminCategoryError::Repo(RepoError::Timeout));
        assert_eq!(timeout.status(), StatusCode::SERVICE_UNAVAILABLE);

        let duplicate = repo_to_api(RepoError::Duplicate {
            constraint: "categories_slug_key".into(),
        });
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn error_response_carries_report() {
        let response = ApiError::not_found("category not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("error report attached");
        assert_eq!(report.source, "infra::http::admin");
    }
}
