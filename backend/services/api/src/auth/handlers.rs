use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use helpdesk_common::error::HelpdeskError;
use helpdesk_db::users::models::{hash_password, PublicUser, Role, User, UserUpdate};
use serde_json::{json, Value};

use crate::auth::requests::{
    ChangePasswordRequest, CreateUserRequest, LoginRequest, UpdateUserRequest,
};
use crate::error::ApiError;
use crate::extractors::{AdminUser, CurrentUser};
use crate::session::clear_cookie;
use crate::AppState;

fn success() -> Json<Value> {
    Json(json!({ "status": "success" }))
}

fn parse_role(raw: &str) -> Result<Role, ApiError> {
    raw.parse().map_err(|e| ApiError(HelpdeskError::Validation(e)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = body.username.trim();
    let user = state
        .users
        .get(username)
        .await?
        .filter(|u| u.verify_password(&body.password))
        .ok_or_else(|| {
            tracing::warn!(username, "failed login");
            ApiError(HelpdeskError::Unauthorized("Invalid credentials".to_owned()))
        })?;

    let public = user.public();
    let session = state.sessions.issue(&public);
    tracing::info!(username = %public.username, role = %public.role, "login");
    Ok((
        [(header::SET_COOKIE, state.sessions.set_cookie(&session))],
        Json(json!({ "status": "success", "user": public })),
    ))
}

pub async fn logout() -> impl IntoResponse {
    ([(header::SET_COOKIE, clear_cookie())], success())
}

pub async fn me(CurrentUser(session): CurrentUser) -> Json<PublicUser> {
    Json(session.user())
}

pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    if body.new_password.is_empty() {
        return Err(ApiError(HelpdeskError::Validation(
            "New password required".to_owned(),
        )));
    }
    let user = state
        .users
        .get(&session.username)
        .await?
        .ok_or_else(|| ApiError(HelpdeskError::NotFound("User not found".to_owned())))?;
    if !user.verify_password(&body.current_password) {
        return Err(ApiError(HelpdeskError::Unauthorized(
            "Current password incorrect".to_owned(),
        )));
    }

    let update = UserUpdate {
        password_hash: Some(hash_password(&body.new_password)),
        ..UserUpdate::default()
    };
    state.users.update(&session.username, update).await?;
    Ok(success())
}

pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<PublicUser>>, ApiError> {
    let users = state.users.list().await?;
    Ok(Json(users.iter().map(User::public).collect()))
}

pub async fn create_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if body.username.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError(HelpdeskError::Validation(
            "Username and password required".to_owned(),
        )));
    }
    let role = match body.role.as_deref() {
        Some(raw) => parse_role(raw)?,
        None => Role::Viewer,
    };

    let user = User::new(
        &body.username,
        &body.password,
        role,
        body.display_name.as_deref(),
    );
    state.users.create(user).await?;
    Ok((StatusCode::CREATED, success()))
}

pub async fn update_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(username): Path<String>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<Value>, ApiError> {
    let update = UserUpdate {
        role: body.role.as_deref().map(parse_role).transpose()?,
        display_name: body.display_name,
        password_hash: body
            .password
            .filter(|p| !p.is_empty())
            .map(|p| hash_password(&p)),
    };
    state.users.update(&username, update).await?;
    Ok(success())
}

pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(username): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.users.delete(&username).await?;
    tracing::info!(username, by = %admin.username, "user removed");
    Ok(success())
}
