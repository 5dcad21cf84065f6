use std::time::Duration;

use helpdesk_config::{init_tracing, AppConfig};
use helpdesk_db::attachments::store::AttachmentStore;
use helpdesk_db::sheet::XlsxTicketRepository;
use helpdesk_db::sync::models::SyncResult;
use helpdesk_db::sync::sync_sheet_to_db;
use helpdesk_db::tickets::pg_repository::PgTicketRepository;

/// One sync pass. A missing workbook skips the round; failures are logged
/// and retried on the next tick.
async fn sync_round(
    sheet: &XlsxTicketRepository,
    db: &PgTicketRepository,
    store: &AttachmentStore,
) -> Option<SyncResult> {
    if !sheet.exists() {
        tracing::warn!(path = %sheet.path().display(), "workbook not found, skipping sync");
        return None;
    }
    let today = chrono::Local::now().date_naive();
    match sync_sheet_to_db(sheet, db, store, today).await {
        Ok(result) => Some(result),
        Err(e) => {
            tracing::error!(error = %e, "workbook sync failed");
            None
        }
    }
}

#[tokio::main]
async fn main() {
    let config = AppConfig::from_env().expect("failed to load config");
    init_tracing(&config.log_level);
    tracing::info!(service = "helpdesk-scheduler", "starting");

    let database_url = config
        .require_database_url("the sync scheduler")
        .expect("DATABASE_URL must be set");
    let pool = helpdesk_db::create_pool(database_url)
        .await
        .expect("failed to connect to database");
    helpdesk_db::ensure_schema(&pool)
        .await
        .expect("failed to apply schema");

    let sheet = XlsxTicketRepository::new(&config.excel_file, &config.sheet_name);
    let db = PgTicketRepository::new(pool);
    let store = AttachmentStore::new(&config.attachments_dir);
    let period = Duration::from_secs(config.sync_interval_secs.max(1));
    tracing::info!(
        path = %sheet.path().display(),
        interval_secs = period.as_secs(),
        "workbook sync scheduled"
    );

    // first tick fires immediately
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                sync_round(&sheet, &db, &store).await;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    tracing::info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpdesk_db::test_support::test_pool;
    use helpdesk_db::tickets::repositories::TicketRepository;
    use helpdesk_tickets::{NewTicket, TicketId};

    const SHEET: &str = "IT Service Tickets";

    #[tokio::test]
    async fn missing_workbook_skips_the_round() {
        let Some((pool, _guard)) = test_pool().await else {
            return;
        };
        let db = PgTicketRepository::new(pool);
        let dir = tempfile::tempdir().expect("tempdir");
        let store = AttachmentStore::new(dir.path().join("blobs"));
        let sheet = XlsxTicketRepository::new(dir.path().join("absent.xlsx"), SHEET);
        assert_eq!(sync_round(&sheet, &db, &store).await, None);
    }

    #[tokio::test]
    async fn round_reports_counts() {
        let Some((pool, _guard)) = test_pool().await else {
            return;
        };
        let db = PgTicketRepository::new(pool);
        let today = chrono::Local::now().date_naive();
        for title in ["Stale one", "Stale two"] {
            db.create(NewTicket::new(title), today).await.expect("seed");
        }

        let dir = tempfile::tempdir().expect("tempdir");
        let store = AttachmentStore::new(dir.path().join("blobs"));
        let sheet = XlsxTicketRepository::new(dir.path().join("t.xlsx"), SHEET);
        sheet.init_if_missing().await.expect("init");
        sheet
            .create(NewTicket::new("Scanner"), today)
            .await
            .expect("create");

        let result = sync_round(&sheet, &db, &store).await.expect("synced");
        assert_eq!((result.upserted, result.removed), (1, 1));
        assert_eq!(result.blobs_removed, 0);
        assert!(result.source.ends_with("t.xlsx"));

        let stored = db.list(today).await.expect("list");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].ticket_id, TicketId::from("IT-20250001"));
        assert_eq!(stored[0].title, "Scanner");
    }
}
