use async_trait::async_trait;
use uuid::Uuid;

use crate::attachments::models::{Attachment, NewAttachment};
use helpdesk_common::error::HelpdeskResult;

#[async_trait]
pub trait AttachmentRepository: Send + Sync {
    async fn list_for_ticket(&self, ticket_id: &str) -> HelpdeskResult<Vec<Attachment>>;
    async fn get(&self, id: Uuid) -> HelpdeskResult<Option<Attachment>>;
    /// `Validation` when the ticket does not exist.
    async fn create(&self, attachment: NewAttachment) -> HelpdeskResult<Attachment>;
    /// Removes the metadata row and returns it so the caller can drop the blob.
    async fn delete(&self, id: Uuid) -> HelpdeskResult<Attachment>;
}
