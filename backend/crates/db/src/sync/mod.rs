//! One-way copy of the workbook into Postgres.

pub mod models;

use chrono::NaiveDate;
use helpdesk_common::error::HelpdeskResult;

use crate::attachments::store::AttachmentStore;
use crate::sheet::XlsxTicketRepository;
use crate::sync::models::SyncResult;
use crate::tickets::pg_repository::PgTicketRepository;
use crate::tickets::repositories::TicketRepository;

/// Mirror every workbook ticket into the database: rows are upserted by id
/// and database tickets missing from the workbook are removed together with
/// their attachment blobs.
pub async fn sync_sheet_to_db(
    sheet: &XlsxTicketRepository,
    db: &PgTicketRepository,
    store: &AttachmentStore,
    today: NaiveDate,
) -> HelpdeskResult<SyncResult> {
    let tickets = sheet.list(today).await?;
    let outcome = db.replace_all(&tickets).await?;

    let mut blobs_removed = 0;
    for key in &outcome.orphaned_blobs {
        match store.remove(key).await {
            Ok(()) => blobs_removed += 1,
            Err(e) => tracing::warn!(storage_key = %key, error = %e, "failed to remove attachment blob"),
        }
    }

    let result = SyncResult {
        source: sheet.path().display().to_string(),
        upserted: outcome.upserted,
        removed: outcome.removed,
        blobs_removed,
    };
    tracing::info!(
        source = %result.source,
        upserted = result.upserted,
        removed = result.removed,
        blobs_removed = result.blobs_removed,
        "workbook synced to database"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachments::models::NewAttachment;
    use crate::attachments::pg_repository::PgAttachmentRepository;
    use crate::attachments::repositories::AttachmentRepository;
    use crate::test_support::test_pool;
    use helpdesk_tickets::{NewTicket, TicketField, TicketPatch};
    use uuid::Uuid;

    #[tokio::test]
    async fn sync_mirrors_workbook() {
        let Some((pool, _guard)) = test_pool().await else {
            return;
        };
        let today = NaiveDate::from_ymd_opt(2025, 6, 20).expect("valid date");
        let dir = tempfile::tempdir().expect("tempdir");
        let sheet = XlsxTicketRepository::new(dir.path().join("t.xlsx"), "IT Service Tickets");
        sheet.init_if_missing().await.expect("init");
        let store = AttachmentStore::new(dir.path().join("blobs"));
        let attachments = PgAttachmentRepository::new(pool.clone());
        let db = PgTicketRepository::new(pool);

        let keep = sheet
            .create(NewTicket::new("Keyboard"), today)
            .await
            .expect("create");
        let gone = sheet
            .create(NewTicket::new("Mouse"), today)
            .await
            .expect("create");
        let first = sync_sheet_to_db(&sheet, &db, &store, today)
            .await
            .expect("sync");
        assert_eq!((first.upserted, first.removed), (2, 0));

        let blob_id = Uuid::new_v4();
        let key = store.save(blob_id, b"scan").await.expect("save blob");
        attachments
            .create(NewAttachment {
                id: blob_id,
                ticket_id: gone.as_str().to_owned(),
                filename: "scan.pdf".to_owned(),
                content_type: "application/pdf".to_owned(),
                size_bytes: 4,
                storage_path: key.clone(),
                uploaded_by: "admin".to_owned(),
            })
            .await
            .expect("attach");

        let mut patch = TicketPatch::default();
        patch.set(TicketField::Status, "Closed");
        sheet.update(&keep, &patch).await.expect("update");
        sheet.delete(&gone).await.expect("delete");

        let second = sync_sheet_to_db(&sheet, &db, &store, today)
            .await
            .expect("sync");
        assert_eq!((second.upserted, second.removed), (1, 1));
        assert_eq!(second.blobs_removed, 1);
        assert!(!store.root().join(&key).exists());
        assert_eq!(attachments.get(blob_id).await.expect("get"), None);
        let stored = db.list(today).await.expect("list");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].ticket_id, keep);
        assert_eq!(stored[0].status, "Closed");
    }
}
