use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use helpdesk_common::error::HelpdeskError;
use helpdesk_tickets::{
    calculate_stats, dropdown_options, encode_create, encode_update, sort_newest_first,
    DropdownOptions, FieldMap, Ticket, TicketFilter, TicketId, TicketStats,
};

use crate::error::ApiError;
use crate::extractors::CurrentUser;
use crate::tickets::responses::{
    CreateTicketResponse, ListTicketsResponse, RefreshResponse, UpdateTicketResponse,
};
use crate::{today, AppState};

async fn find_ticket(state: &AppState, id: &TicketId) -> Result<Ticket, ApiError> {
    state
        .tickets
        .get(id, today())
        .await?
        .ok_or_else(|| ApiError(HelpdeskError::NotFound("Ticket not found".to_owned())))
}

pub async fn list_tickets(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(filter): Query<TicketFilter>,
) -> Result<Json<ListTicketsResponse>, ApiError> {
    let mut data = filter.apply(state.tickets.list(today()).await?);
    sort_newest_first(&mut data);
    let count = data.len();
    Ok(Json(ListTicketsResponse { data, count }))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    Ok(Json(find_ticket(&state, &TicketId::from(id)).await?))
}

pub async fn create_ticket(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(body): Json<FieldMap>,
) -> Result<impl IntoResponse, ApiError> {
    let encoded = encode_create(&body)?;
    let ticket_id = state.tickets.create(encoded.ticket, today()).await?;
    tracing::info!(%ticket_id, by = %session.username, "ticket created");

    Ok((
        StatusCode::CREATED,
        Json(CreateTicketResponse {
            status: "success",
            ticket_id,
            ignored_fields: encoded.ignored,
        }),
    ))
}

pub async fn update_ticket(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<FieldMap>,
) -> Result<Json<UpdateTicketResponse>, ApiError> {
    let id = TicketId::from(id);
    let encoded = encode_update(&body)?;
    state.tickets.update(&id, &encoded.patch).await?;
    tracing::info!(ticket_id = %id, by = %session.username, "ticket updated");

    Ok(Json(UpdateTicketResponse {
        data: find_ticket(&state, &id).await?,
        ignored_fields: encoded.ignored,
    }))
}

pub async fn delete_ticket(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = TicketId::from(id);
    let blobs = match &state.attachments {
        Some(repo) => repo.list_for_ticket(id.as_str()).await?,
        None => Vec::new(),
    };

    state.tickets.delete(&id).await?;
    for attachment in blobs {
        if let Err(e) = state.store.remove(&attachment.storage_path).await {
            tracing::warn!(attachment_id = %attachment.id, error = %e, "orphaned attachment blob");
        }
    }
    tracing::info!(ticket_id = %id, by = %session.username, "ticket deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn stats(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<TicketStats>, ApiError> {
    let tickets = state.tickets.list(today()).await?;
    Ok(Json(calculate_stats(&tickets)))
}

pub async fn options(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<DropdownOptions>, ApiError> {
    let tickets = state.tickets.list(today()).await?;
    Ok(Json(dropdown_options(&tickets)))
}

pub async fn refresh(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Json<RefreshResponse> {
    Json(RefreshResponse {
        status: "success",
        message: format!("Data refreshed from {}", state.tickets.backend_name()),
    })
}
