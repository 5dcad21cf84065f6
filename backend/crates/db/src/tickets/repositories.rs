use async_trait::async_trait;
use chrono::NaiveDate;
use helpdesk_common::error::HelpdeskResult;
use helpdesk_tickets::{NewTicket, Ticket, TicketId, TicketPatch};

/// Storage-agnostic ticket store. Both adapters decode through
/// `helpdesk_tickets::decode_row`, so `days_open` is always derived from the
/// `today` passed in.
#[async_trait]
pub trait TicketRepository: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn list(&self, today: NaiveDate) -> HelpdeskResult<Vec<Ticket>>;

    async fn get(&self, id: &TicketId, today: NaiveDate) -> HelpdeskResult<Option<Ticket>> {
        Ok(self
            .list(today)
            .await?
            .into_iter()
            .find(|t| &t.ticket_id == id))
    }

    /// Store a new ticket opened on `date_opened`; returns its assigned id.
    async fn create(&self, ticket: NewTicket, date_opened: NaiveDate) -> HelpdeskResult<TicketId>;

    /// Apply a partial update. `NotFound` when the id does not resolve.
    async fn update(&self, id: &TicketId, patch: &TicketPatch) -> HelpdeskResult<()>;

    async fn delete(&self, id: &TicketId) -> HelpdeskResult<()>;
}
