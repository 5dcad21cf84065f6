use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use helpdesk_common::error::HelpdeskError;
use helpdesk_db::sheet::layout::{export_workbook, tickets_from_xlsx_bytes, to_xlsx_bytes};
use serde_json::{json, Value};

use crate::attachments::handlers::file_part;
use crate::error::ApiError;
use crate::extractors::{AdminUser, CurrentUser};
use crate::{today, AppState};

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

async fn blocking<R, F>(work: F) -> Result<R, ApiError>
where
    F: FnOnce() -> Result<R, HelpdeskError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError(HelpdeskError::Internal(e.to_string())))?
        .map_err(ApiError)
}

pub async fn export_xlsx(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let date = today();
    let tickets = state.tickets.list(date).await?;
    let sheet_name = state.config.sheet_name.clone();
    let bytes = blocking(move || to_xlsx_bytes(&export_workbook(&tickets, &sheet_name)?)).await?;

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"tickets-{date}.xlsx\""),
            ),
        ],
        bytes,
    ))
}

pub async fn import_xlsx(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let db = state.pg_tickets.clone().ok_or_else(|| {
        ApiError(HelpdeskError::Validation(
            "import requires the postgres backend".to_owned(),
        ))
    })?;
    let (_, _, bytes) = file_part(&mut multipart, state.config.max_upload_bytes).await?;
    let sheet_name = state.config.sheet_name.clone();
    let date = today();
    let tickets = blocking(move || tickets_from_xlsx_bytes(&bytes, &sheet_name, date)).await?;

    let imported = db.upsert_many(&tickets).await?;
    tracing::info!(imported, by = %admin.username, "workbook imported");
    Ok(Json(json!({ "imported": imported })))
}
