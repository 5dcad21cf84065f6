use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::attachments::models::{Attachment, NewAttachment};
use crate::attachments::repositories::AttachmentRepository;
use crate::{db_error, write_error};
use helpdesk_common::error::{HelpdeskError, HelpdeskResult};

const COLUMNS: &str =
    "id, ticket_id, filename, content_type, size_bytes, storage_path, uploaded_by, created_at";

#[derive(Clone)]
pub struct PgAttachmentRepository {
    pool: PgPool,
}

impl PgAttachmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: PgRow) -> Attachment {
        Attachment {
            id: row.get("id"),
            ticket_id: row.get("ticket_id"),
            filename: row.get("filename"),
            content_type: row.get("content_type"),
            size_bytes: row.get("size_bytes"),
            storage_path: row.get("storage_path"),
            uploaded_by: row.get("uploaded_by"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl AttachmentRepository for PgAttachmentRepository {
    async fn list_for_ticket(&self, ticket_id: &str) -> HelpdeskResult<Vec<Attachment>> {
        let rows = sqlx::query(&format!(
            "select {COLUMNS} from attachments where ticket_id = $1 order by created_at"
        ))
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Self::map_row).collect())
    }

    async fn get(&self, id: Uuid) -> HelpdeskResult<Option<Attachment>> {
        let row = sqlx::query(&format!("select {COLUMNS} from attachments where id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.map(Self::map_row))
    }

    async fn create(&self, attachment: NewAttachment) -> HelpdeskResult<Attachment> {
        let row = sqlx::query(&format!(
            "insert into attachments \
             (id, ticket_id, filename, content_type, size_bytes, storage_path, uploaded_by) \
             values ($1, $2, $3, $4, $5, $6, $7) returning {COLUMNS}"
        ))
        .bind(attachment.id)
        .bind(&attachment.ticket_id)
        .bind(&attachment.filename)
        .bind(&attachment.content_type)
        .bind(attachment.size_bytes)
        .bind(&attachment.storage_path)
        .bind(&attachment.uploaded_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, "attachment"))?;
        Ok(Self::map_row(row))
    }

    async fn delete(&self, id: Uuid) -> HelpdeskResult<Attachment> {
        let row = sqlx::query(&format!(
            "delete from attachments where id = $1 returning {COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| HelpdeskError::NotFound(format!("attachment {id}")))?;
        Ok(Self::map_row(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_pool;
    use crate::tickets::pg_repository::PgTicketRepository;
    use crate::tickets::repositories::TicketRepository;
    use chrono::NaiveDate;
    use helpdesk_tickets::NewTicket;

    fn new_attachment(ticket_id: &str) -> NewAttachment {
        let id = Uuid::new_v4();
        NewAttachment {
            id,
            ticket_id: ticket_id.to_owned(),
            filename: "screenshot.png".to_owned(),
            content_type: "image/png".to_owned(),
            size_bytes: 42,
            storage_path: id.to_string(),
            uploaded_by: "admin".to_owned(),
        }
    }

    #[tokio::test]
    async fn attachments_follow_their_ticket() {
        let Some((pool, _guard)) = test_pool().await else {
            return;
        };
        let tickets = PgTicketRepository::new(pool.clone());
        let repo = PgAttachmentRepository::new(pool);
        let today = NaiveDate::from_ymd_opt(2025, 6, 20).expect("valid date");
        let id = tickets
            .create(NewTicket::new("Monitor flicker"), today)
            .await
            .expect("ticket");

        let stored = repo
            .create(new_attachment(id.as_str()))
            .await
            .expect("attach");
        assert_eq!(repo.list_for_ticket(id.as_str()).await.expect("list").len(), 1);
        assert_eq!(repo.get(stored.id).await.expect("get"), Some(stored.clone()));

        tickets.delete(&id).await.expect("delete ticket");
        assert_eq!(repo.get(stored.id).await.expect("get"), None);
    }

    #[tokio::test]
    async fn unknown_ticket_is_rejected() {
        let Some((pool, _guard)) = test_pool().await else {
            return;
        };
        let repo = PgAttachmentRepository::new(pool);
        assert!(matches!(
            repo.create(new_attachment("IT-20259999")).await,
            Err(HelpdeskError::Validation(_))
        ));
        assert!(matches!(
            repo.delete(Uuid::new_v4()).await,
            Err(HelpdeskError::NotFound(_))
        ));
    }
}
