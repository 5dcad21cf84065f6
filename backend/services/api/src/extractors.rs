use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use helpdesk_common::error::HelpdeskError;

use crate::error::ApiError;
use crate::session::Session;
use crate::AppState;

/// Any signed-in user.
pub struct CurrentUser(pub Session);

/// A signed-in user with the admin role.
pub struct AdminUser(pub Session);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        state
            .sessions
            .read_session(&parts.headers)
            .map(CurrentUser)
            .ok_or_else(|| ApiError(HelpdeskError::Unauthorized("Not authenticated".to_owned())))
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(session) = CurrentUser::from_request_parts(parts, state).await?;
        if !session.is_admin() {
            return Err(ApiError(HelpdeskError::Forbidden(
                "Admin access required".to_owned(),
            )));
        }
        Ok(AdminUser(session))
    }
}
