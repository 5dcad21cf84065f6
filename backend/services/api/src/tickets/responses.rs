use helpdesk_tickets::{ReadOnlyField, Ticket, TicketId};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ListTicketsResponse {
    pub data: Vec<Ticket>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct CreateTicketResponse {
    pub status: &'static str,
    pub ticket_id: TicketId,
    pub ignored_fields: Vec<ReadOnlyField>,
}

#[derive(Debug, Serialize)]
pub struct UpdateTicketResponse {
    pub data: Ticket,
    pub ignored_fields: Vec<ReadOnlyField>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub status: &'static str,
    pub message: String,
}
