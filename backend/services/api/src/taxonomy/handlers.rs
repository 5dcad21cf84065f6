use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use helpdesk_common::error::HelpdeskError;
use helpdesk_db::taxonomy::models::{Category, CategoryInput, Label, LabelInput};
use helpdesk_db::taxonomy::repositories::TaxonomyRepository;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extractors::{AdminUser, CurrentUser};
use crate::AppState;

fn repo(state: &AppState) -> Result<Arc<dyn TaxonomyRepository>, ApiError> {
    state.taxonomy.clone().ok_or_else(|| {
        ApiError(HelpdeskError::Validation(
            "categories and labels require the postgres backend".to_owned(),
        ))
    })
}

pub async fn list_categories(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(repo(&state)?.list_categories().await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<CategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    let category = repo(&state)?.create_category(body).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<CategoryInput>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(repo(&state)?.update_category(id, body).await?))
}

pub async fn delete_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    repo(&state)?.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_labels(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<Label>>, ApiError> {
    Ok(Json(repo(&state)?.list_labels().await?))
}

pub async fn create_label(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<LabelInput>,
) -> Result<impl IntoResponse, ApiError> {
    let label = repo(&state)?.create_label(body).await?;
    Ok((StatusCode::CREATED, Json(label)))
}

pub async fn update_label(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<LabelInput>,
) -> Result<Json<Label>, ApiError> {
    Ok(Json(repo(&state)?.update_label(id, body).await?))
}

pub async fn delete_label(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    repo(&state)?.delete_label(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
