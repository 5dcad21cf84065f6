use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{postgres::PgRow, PgPool, Postgres, QueryBuilder, Row, Transaction};
use uuid::Uuid;

use crate::tickets::repositories::TicketRepository;
use crate::{db_error, write_error};
use helpdesk_common::error::{HelpdeskError, HelpdeskResult};
use helpdesk_tickets::{
    decode_row, next_ticket_id, CellValue, LabelRef, NewTicket, RawRow, RowDecode, RowIdentity,
    Ticket, TicketId, TicketPatch,
};

/// Advisory lock key serialising id allocation across API workers.
const TICKET_ID_LOCK_KEY: i64 = 0x4954_5f49_44;

const SELECT_TICKETS: &str = "select t.ticket_id, t.title, t.status, t.priority, \
     coalesce(c.name, t.request_type) as request_type, t.category_id, t.staff_assigned, \
     t.requester, t.date_opened, t.description, t.resolution_notes \
     from tickets t left join categories c on c.id = t.category_id";

#[derive(Clone)]
pub struct PgTicketRepository {
    pool: PgPool,
}

impl PgTicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn raw_row(row: &PgRow) -> RawRow {
        let text = |col: &str| CellValue::Text(row.get::<String, _>(col));
        RawRow {
            title: text("title"),
            status: text("status"),
            priority: text("priority"),
            request_type: text("request_type"),
            staff_assigned: text("staff_assigned"),
            requester: text("requester"),
            date_opened: row.get::<Option<NaiveDate>, _>("date_opened").into(),
            description: text("description"),
            resolution_notes: text("resolution_notes"),
        }
    }

    fn map_row(row: PgRow, today: NaiveDate) -> Option<Ticket> {
        let id = TicketId::from(row.get::<String, _>("ticket_id"));
        match decode_row(&Self::raw_row(&row), RowIdentity::Stored(id.clone()), today) {
            RowDecode::Ticket(mut ticket) => {
                ticket.category_id = row.get("category_id");
                Some(ticket)
            }
            RowDecode::EndOfData => {
                tracing::debug!(ticket_id = %id, "skipping ticket row with empty title");
                None
            }
        }
    }

    async fn attach_labels(&self, tickets: &mut [Ticket]) -> HelpdeskResult<()> {
        if tickets.is_empty() {
            return Ok(());
        }
        let ids: Vec<String> = tickets
            .iter()
            .map(|t| t.ticket_id.as_str().to_owned())
            .collect();

        let rows = sqlx::query(
            "select tl.ticket_id, l.id, l.name, l.color from ticket_labels tl \
             join labels l on l.id = tl.label_id \
             where tl.ticket_id = any($1) order by l.name",
        )
        .bind(ids.as_slice())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let mut by_ticket: HashMap<String, Vec<LabelRef>> = HashMap::new();
        for row in rows {
            by_ticket
                .entry(row.get("ticket_id"))
                .or_default()
                .push(LabelRef {
                    id: row.get("id"),
                    name: row.get("name"),
                    color: row.get("color"),
                });
        }
        for ticket in tickets.iter_mut() {
            ticket.labels = by_ticket.remove(ticket.ticket_id.as_str()).unwrap_or_default();
        }
        Ok(())
    }

    async fn replace_labels(
        tx: &mut Transaction<'_, Postgres>,
        id: &TicketId,
        label_ids: &[Uuid],
    ) -> HelpdeskResult<()> {
        sqlx::query("delete from ticket_labels where ticket_id = $1")
            .bind(id.as_str())
            .execute(&mut **tx)
            .await
            .map_err(db_error)?;

        for label_id in label_ids {
            sqlx::query(
                "insert into ticket_labels (ticket_id, label_id) values ($1, $2) \
                 on conflict do nothing",
            )
            .bind(id.as_str())
            .bind(label_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| write_error(e, "label"))?;
        }
        Ok(())
    }

    /// Insert or refresh a ticket under its stored id. An existing
    /// `date_opened` is never overwritten and the category link is kept.
    async fn upsert_one(tx: &mut Transaction<'_, Postgres>, ticket: &Ticket) -> HelpdeskResult<()> {
        sqlx::query(
            "insert into tickets \
             (ticket_id, title, status, priority, request_type, staff_assigned, requester, \
              date_opened, description, resolution_notes) \
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             on conflict (ticket_id) do update set \
               title = excluded.title, status = excluded.status, priority = excluded.priority, \
               request_type = excluded.request_type, staff_assigned = excluded.staff_assigned, \
               requester = excluded.requester, \
               date_opened = coalesce(tickets.date_opened, excluded.date_opened), \
               description = excluded.description, resolution_notes = excluded.resolution_notes, \
               updated_at = now()",
        )
        .bind(ticket.ticket_id.as_str())
        .bind(&ticket.title)
        .bind(&ticket.status)
        .bind(&ticket.priority)
        .bind(&ticket.request_type)
        .bind(&ticket.staff_assigned)
        .bind(&ticket.requester)
        .bind(ticket.date_opened)
        .bind(&ticket.description)
        .bind(&ticket.resolution_notes)
        .execute(&mut **tx)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    /// Upsert every ticket in one transaction. Returns the number written.
    pub async fn upsert_many(&self, tickets: &[Ticket]) -> HelpdeskResult<usize> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        for ticket in tickets {
            Self::upsert_one(&mut tx, ticket).await?;
        }
        tx.commit().await.map_err(db_error)?;
        Ok(tickets.len())
    }

    /// Make the table mirror `tickets`: upsert all of them and delete every
    /// other row. Attachment rows of deleted tickets cascade; their storage
    /// keys are returned so the caller can drop the blobs.
    pub async fn replace_all(&self, tickets: &[Ticket]) -> HelpdeskResult<ReplaceOutcome> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        for ticket in tickets {
            Self::upsert_one(&mut tx, ticket).await?;
        }

        let keep: Vec<String> = tickets
            .iter()
            .map(|t| t.ticket_id.as_str().to_owned())
            .collect();
        let orphaned_blobs: Vec<String> = sqlx::query_scalar(
            "select storage_path from attachments where not (ticket_id = any($1))",
        )
        .bind(keep.as_slice())
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error)?;
        let removed = sqlx::query("delete from tickets where not (ticket_id = any($1))")
            .bind(keep.as_slice())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?
            .rows_affected();

        tx.commit().await.map_err(db_error)?;
        Ok(ReplaceOutcome {
            upserted: tickets.len(),
            removed,
            orphaned_blobs,
        })
    }
}

/// What [`PgTicketRepository::replace_all`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub upserted: usize,
    pub removed: u64,
    /// Storage keys of attachments deleted along with their tickets.
    pub orphaned_blobs: Vec<String>,
}

#[async_trait]
impl TicketRepository for PgTicketRepository {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn list(&self, today: NaiveDate) -> HelpdeskResult<Vec<Ticket>> {
        let rows = sqlx::query(SELECT_TICKETS)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        let mut tickets: Vec<Ticket> = rows
            .into_iter()
            .filter_map(|row| Self::map_row(row, today))
            .collect();
        self.attach_labels(&mut tickets).await?;
        Ok(tickets)
    }

    async fn get(&self, id: &TicketId, today: NaiveDate) -> HelpdeskResult<Option<Ticket>> {
        let row = sqlx::query(&format!("{SELECT_TICKETS} where t.ticket_id = $1"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        let Some(mut ticket) = row.and_then(|r| Self::map_row(r, today)) else {
            return Ok(None);
        };
        self.attach_labels(std::slice::from_mut(&mut ticket)).await?;
        Ok(Some(ticket))
    }

    async fn create(&self, ticket: NewTicket, date_opened: NaiveDate) -> HelpdeskResult<TicketId> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query("select pg_advisory_xact_lock($1)")
            .bind(TICKET_ID_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        let existing: Vec<TicketId> = sqlx::query_scalar::<_, String>("select ticket_id from tickets")
            .fetch_all(&mut *tx)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(TicketId::from)
            .collect();
        let id = next_ticket_id(&existing);

        sqlx::query(
            "insert into tickets \
             (ticket_id, title, status, priority, request_type, category_id, staff_assigned, \
              requester, date_opened, description, resolution_notes) \
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(id.as_str())
        .bind(&ticket.title)
        .bind(&ticket.status)
        .bind(&ticket.priority)
        .bind(&ticket.request_type)
        .bind(ticket.category_id)
        .bind(&ticket.staff_assigned)
        .bind(&ticket.requester)
        .bind(date_opened)
        .bind(&ticket.description)
        .bind(&ticket.resolution_notes)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error(e, "ticket category"))?;

        if !ticket.label_ids.is_empty() {
            Self::replace_labels(&mut tx, &id, &ticket.label_ids).await?;
        }

        tx.commit().await.map_err(db_error)?;
        tracing::info!(ticket_id = %id, "ticket created");
        Ok(id)
    }

    async fn update(&self, id: &TicketId, patch: &TicketPatch) -> HelpdeskResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let mut qb = QueryBuilder::<Postgres>::new("update tickets set updated_at = now()");
        for (field, value) in &patch.fields {
            // column names come from the closed TicketField set
            qb.push(", ").push(field.as_str()).push(" = ");
            qb.push_bind(value.clone());
        }
        if let Some(category_id) = patch.category_id {
            qb.push(", category_id = ").push_bind(category_id);
        }
        qb.push(" where ticket_id = ").push_bind(id.as_str().to_owned());

        let result = qb
            .build()
            .execute(&mut *tx)
            .await
            .map_err(|e| write_error(e, "ticket category"))?;

        if result.rows_affected() == 0 {
            return Err(HelpdeskError::NotFound(format!("ticket not found: {id}")));
        }

        if let Some(label_ids) = &patch.label_ids {
            Self::replace_labels(&mut tx, id, label_ids).await?;
        }

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn delete(&self, id: &TicketId) -> HelpdeskResult<()> {
        let result = sqlx::query("delete from tickets where ticket_id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(HelpdeskError::NotFound(format!("ticket not found: {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_pool;
    use helpdesk_tickets::{DaysOpen, TicketField};
    use tokio::sync::MutexGuard;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 20).expect("valid date")
    }

    async fn test_repo() -> Option<(PgTicketRepository, MutexGuard<'static, ()>)> {
        let (pool, guard) = test_pool().await?;
        Some((PgTicketRepository::new(pool), guard))
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids() {
        let Some((repo, _guard)) = test_repo().await else {
            return;
        };
        let first = repo
            .create(NewTicket::new("first"), today())
            .await
            .expect("create");
        let second = repo
            .create(NewTicket::new("second"), today())
            .await
            .expect("create");
        assert_eq!(first.as_str(), "IT-20250001");
        assert_eq!(second.as_str(), "IT-20250002");
    }

    #[tokio::test]
    async fn get_derives_days_open() {
        let Some((repo, _guard)) = test_repo().await else {
            return;
        };
        let opened = today() - chrono::Duration::days(5);
        let id = repo
            .create(NewTicket::new("printer"), opened)
            .await
            .expect("create");

        let ticket = repo.get(&id, today()).await.expect("get").expect("exists");
        assert_eq!(ticket.days_open, DaysOpen::Days(5));
        assert_eq!(ticket.status, "Open");
        assert_eq!(ticket.date_opened, Some(opened));
    }

    #[tokio::test]
    async fn update_changes_only_named_fields() {
        let Some((repo, _guard)) = test_repo().await else {
            return;
        };
        let id = repo
            .create(NewTicket::new("mouse"), today())
            .await
            .expect("create");

        let mut patch = TicketPatch::default();
        patch.set(TicketField::Priority, "High");
        repo.update(&id, &patch).await.expect("update");

        let ticket = repo.get(&id, today()).await.expect("get").expect("exists");
        assert_eq!(ticket.priority, "High");
        assert_eq!(ticket.title, "mouse");
        assert_eq!(ticket.ticket_id, id);
    }

    #[tokio::test]
    async fn update_unknown_ticket_is_not_found() {
        let Some((repo, _guard)) = test_repo().await else {
            return;
        };
        let mut patch = TicketPatch::default();
        patch.set(TicketField::Status, "Closed");
        let result = repo.update(&TicketId::from("IT-00000404"), &patch).await;
        assert!(matches!(result, Err(HelpdeskError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let Some((repo, _guard)) = test_repo().await else {
            return;
        };
        let id = repo
            .create(NewTicket::new("gone"), today())
            .await
            .expect("create");
        repo.delete(&id).await.expect("delete");
        assert!(repo.get(&id, today()).await.expect("get").is_none());
        assert!(matches!(
            repo.delete(&id).await,
            Err(HelpdeskError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn replace_all_mirrors_source_and_keeps_open_date() {
        let Some((repo, _guard)) = test_repo().await else {
            return;
        };
        let original = today() - chrono::Duration::days(30);
        let id = repo
            .create(NewTicket::new("stale"), original)
            .await
            .expect("create");

        let mut same = repo.get(&id, today()).await.expect("get").expect("exists");
        same.title = "synced".to_owned();
        same.date_opened = Some(today());
        let mut fresh = same.clone();
        fresh.ticket_id = TicketId::from("IT-20250010");

        let outcome = repo
            .replace_all(&[same, fresh.clone()])
            .await
            .expect("replace");
        assert_eq!((outcome.upserted, outcome.removed), (2, 0));

        let kept = repo.get(&id, today()).await.expect("get").expect("exists");
        assert_eq!(kept.title, "synced");
        assert_eq!(kept.date_opened, Some(original));

        let outcome = repo.replace_all(&[fresh]).await.expect("replace");
        assert_eq!(outcome.removed, 1);
        assert!(outcome.orphaned_blobs.is_empty());
        assert_eq!(repo.list(today()).await.expect("list").len(), 1);
    }
}
