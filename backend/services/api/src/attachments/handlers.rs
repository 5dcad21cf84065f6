use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use helpdesk_common::error::HelpdeskError;
use helpdesk_db::attachments::models::{Attachment, NewAttachment};
use helpdesk_db::attachments::repositories::AttachmentRepository;
use helpdesk_db::attachments::store::sanitize_filename;
use helpdesk_tickets::TicketId;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extractors::CurrentUser;
use crate::{today, AppState};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

fn repo(state: &AppState) -> Result<Arc<dyn AttachmentRepository>, ApiError> {
    state.attachments.clone().ok_or_else(|| {
        ApiError(HelpdeskError::Validation(
            "attachments require the postgres backend".to_owned(),
        ))
    })
}

/// The uploaded `file` part of a multipart body: name, content type, bytes.
pub(crate) async fn file_part(
    multipart: &mut Multipart,
    max_bytes: usize,
) -> Result<(String, String, Vec<u8>), ApiError> {
    let bad = |msg: String| ApiError(HelpdeskError::Validation(msg));
    while let Some(field) = multipart.next_field().await.map_err(|e| bad(e.to_string()))? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = sanitize_filename(field.file_name().unwrap_or_default());
        let content_type = field
            .content_type()
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_owned();
        let bytes = field.bytes().await.map_err(|e| bad(e.to_string()))?;
        if bytes.len() > max_bytes {
            return Err(bad(format!("file exceeds {max_bytes} bytes")));
        }
        return Ok((filename, content_type, bytes.to_vec()));
    }
    Err(bad("multipart field 'file' is required".to_owned()))
}

pub async fn list_attachments(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(ticket_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let data = repo(&state)?.list_for_ticket(ticket_id.trim()).await?;
    let count = data.len();
    Ok(Json(json!({ "data": data, "count": count })))
}

pub async fn upload_attachment(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(ticket_id): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let repo = repo(&state)?;
    let ticket_id = TicketId::from(ticket_id);
    if state.tickets.get(&ticket_id, today()).await?.is_none() {
        return Err(ApiError(HelpdeskError::NotFound(
            "Ticket not found".to_owned(),
        )));
    }

    let (filename, content_type, bytes) =
        file_part(&mut multipart, state.config.max_upload_bytes).await?;
    let id = Uuid::new_v4();
    let storage_path = state.store.save(id, &bytes).await?;

    let created = repo
        .create(NewAttachment {
            id,
            ticket_id: ticket_id.as_str().to_owned(),
            filename,
            content_type,
            size_bytes: bytes.len() as i64,
            storage_path: storage_path.clone(),
            uploaded_by: session.username.clone(),
        })
        .await;
    let attachment = match created {
        Ok(attachment) => attachment,
        Err(e) => {
            let _ = state.store.remove(&storage_path).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        attachment_id = %attachment.id,
        ticket_id = %ticket_id,
        size = attachment.size_bytes,
        by = %session.username,
        "attachment stored"
    );
    Ok((StatusCode::CREATED, Json(attachment)))
}

fn content_disposition(attachment: &Attachment) -> String {
    let name: String = attachment
        .filename
        .chars()
        .map(|c| if c == '"' || !c.is_ascii() { '_' } else { c })
        .collect();
    format!("attachment; filename=\"{name}\"")
}

pub async fn download_attachment(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let attachment = repo(&state)?
        .get(id)
        .await?
        .ok_or_else(|| ApiError(HelpdeskError::NotFound("Attachment not found".to_owned())))?;
    let bytes = state.store.read(&attachment.storage_path).await?;

    Ok((
        [
            (header::CONTENT_TYPE, attachment.content_type.clone()),
            (header::CONTENT_DISPOSITION, content_disposition(&attachment)),
        ],
        bytes,
    ))
}

pub async fn delete_attachment(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let attachment = repo(&state)?.delete(id).await?;
    state.store.remove(&attachment.storage_path).await?;
    tracing::info!(attachment_id = %id, by = %session.username, "attachment deleted");
    Ok(StatusCode::NO_CONTENT)
}
