//! Category admin handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::application::admin::categories::{CategoryForm, ChangeListParams};
use crate::application::admin::descriptor::CATEGORY_ADMIN;

use super::db_health_response;
use super::error::{ApiError, category_to_api};
use super::state::AdminState;

/// Query string of the change list, named the way the admin host sends it.
#[derive(Debug, Default, Deserialize)]
pub struct ChangeListQuery {
    pub q: Option<String>,
    pub is_published: Option<String>,
    pub posts_status: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u8>,
    pub day: Option<u8>,
    pub o: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

impl From<ChangeListQuery> for ChangeListParams {
    fn from(query: ChangeListQuery) -> Self {
        Self {
            search: query.q,
            is_published: query.is_published,
            posts_status: query.posts_status,
            year: query.year,
            month: query.month,
            day: query.day,
            ordering: query.o,
            cursor: query.cursor,
            limit: query.limit,
        }
    }
}

pub async fn list_categories(
    State(state): State<AdminState>,
    Query(query): Query<ChangeListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let list = state
        .categories
        .changelist(query.into())
        .await
        .map_err(category_to_api)?;

    Ok(Json(list))
}

pub async fn category_descriptor() -> impl IntoResponse {
    Json(CATEGORY_ADMIN)
}

pub async fn get_category(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state.categories.detail(id).await.map_err(category_to_api)?;
    Ok(Json(detail))
}

pub async fn create_category(
    State(state): State<AdminState>,
    Json(payload): Json<Map<String, Value>>,
) -> Result<impl IntoResponse, ApiError> {
    let form = CategoryForm::from_submission(&payload).map_err(category_to_api)?;

    let category = state
        .categories
        .create_category(AdminState::ACTOR, form)
        .await
        .map_err(category_to_api)?;

    let detail = state
        .categories
        .detail(category.id)
        .await
        .map_err(category_to_api)?;

    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn update_category(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<Map<String, Value>>,
) -> Result<impl IntoResponse, ApiError> {
    let form = CategoryForm::from_submission(&payload).map_err(category_to_api)?;

    let category = state
        .categories
        .update_category(AdminState::ACTOR, id, form)
        .await
        .map_err(category_to_api)?;

    let detail = state
        .categories
        .detail(category.id)
        .await
        .map_err(category_to_api)?;

    Ok(Json(detail))
}

pub async fn delete_category(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .categories
        .delete_category(AdminState::ACTOR, id)
        .await
        .map_err(category_to_api)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn db_health(State(state): State<AdminState>) -> Response {
    db_health_response(state.db.health_check().await)
}
