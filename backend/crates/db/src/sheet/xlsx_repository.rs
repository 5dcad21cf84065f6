use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;
use umya_spreadsheet::Spreadsheet;

use crate::sheet::layout::{self, IdSource};
use crate::tickets::repositories::TicketRepository;
use helpdesk_common::error::{HelpdeskError, HelpdeskResult};
use helpdesk_tickets::{NewTicket, Ticket, TicketId, TicketPatch};

/// Tickets stored in one worksheet of an `.xlsx` workbook. Every operation
/// re-reads the file, so edits made in Excel between requests are picked up.
#[derive(Clone)]
pub struct XlsxTicketRepository {
    path: PathBuf,
    sheet_name: String,
    lock: Arc<Mutex<()>>,
}

impl XlsxTicketRepository {
    pub fn new(path: impl Into<PathBuf>, sheet_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sheet_name: sheet_name.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create the workbook with its header row unless the file already exists.
    pub async fn init_if_missing(&self) -> HelpdeskResult<bool> {
        self.run(|path, sheet| {
            if path.exists() {
                return Ok(false);
            }
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|e| HelpdeskError::Spreadsheet(e.to_string()))?;
            }
            save(&layout::new_workbook(sheet)?, path)?;
            tracing::info!(path = %path.display(), "created ticket workbook");
            Ok(true)
        })
        .await
    }

    /// Serialise access to the file and run `work` off the async runtime.
    async fn run<R, F>(&self, work: F) -> HelpdeskResult<R>
    where
        F: FnOnce(&Path, &str) -> HelpdeskResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        let sheet = self.sheet_name.clone();
        tokio::task::spawn_blocking(move || work(&path, &sheet))
            .await
            .map_err(|e| HelpdeskError::Internal(format!("workbook task failed: {e}")))?
    }
}

fn load(path: &Path) -> HelpdeskResult<Spreadsheet> {
    if !path.exists() {
        return Err(HelpdeskError::Spreadsheet(format!(
            "workbook not found: {}",
            path.display()
        )));
    }
    umya_spreadsheet::reader::xlsx::read(path)
        .map_err(|e| HelpdeskError::Spreadsheet(format!("failed to read {}: {e}", path.display())))
}

/// Write to a sibling temp file, then rename over the original.
fn save(book: &Spreadsheet, path: &Path) -> HelpdeskResult<()> {
    let tmp = path.with_extension("xlsx.tmp");
    let bytes = layout::to_xlsx_bytes(book)?;
    std::fs::write(&tmp, bytes)
        .map_err(|e| HelpdeskError::Spreadsheet(format!("failed to write workbook: {e}")))?;
    std::fs::rename(&tmp, path).map_err(|e| HelpdeskError::Spreadsheet(e.to_string()))
}

#[async_trait]
impl TicketRepository for XlsxTicketRepository {
    fn backend_name(&self) -> &'static str {
        "excel"
    }

    async fn list(&self, today: NaiveDate) -> HelpdeskResult<Vec<Ticket>> {
        self.run(move |path, sheet| {
            let book = load(path)?;
            let ws = layout::find_sheet(&book, sheet)?;
            Ok(layout::scan(ws, today, IdSource::Positional))
        })
        .await
    }

    async fn create(&self, ticket: NewTicket, date_opened: NaiveDate) -> HelpdeskResult<TicketId> {
        self.run(move |path, sheet| {
            let mut book = load(path)?;
            let ws = layout::find_sheet_mut(&mut book, sheet)?;
            let row = layout::first_empty_row(ws);
            layout::write_new_row(ws, row, &ticket, date_opened);
            save(&book, path)?;
            let id = TicketId::positional(row);
            tracing::info!(ticket_id = %id, row, "ticket row written");
            Ok(id)
        })
        .await
    }

    async fn update(&self, id: &TicketId, patch: &TicketPatch) -> HelpdeskResult<()> {
        if patch.has_taxonomy_changes() {
            tracing::debug!(ticket_id = %id, "workbook has no category or label columns; ignoring");
        }
        let id = id.clone();
        let patch = patch.clone();
        self.run(move |path, sheet| {
            let mut book = load(path)?;
            let ws = layout::find_sheet_mut(&mut book, sheet)?;
            let row = layout::ticket_row(ws, &id)
                .ok_or_else(|| HelpdeskError::NotFound(format!("ticket not found: {id}")))?;
            if patch.fields.is_empty() {
                return Ok(());
            }
            layout::write_patch(ws, row, &patch);
            save(&book, path)
        })
        .await
    }

    async fn delete(&self, id: &TicketId) -> HelpdeskResult<()> {
        let id = id.clone();
        self.run(move |path, sheet| {
            let mut book = load(path)?;
            let ws = layout::find_sheet_mut(&mut book, sheet)?;
            let row = layout::ticket_row(ws, &id)
                .ok_or_else(|| HelpdeskError::NotFound(format!("ticket not found: {id}")))?;
            layout::clear_row(ws, row);
            save(&book, path)?;
            tracing::info!(ticket_id = %id, row, "ticket row cleared");
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpdesk_tickets::{DaysOpen, TicketField};

    const SHEET: &str = "IT Service Tickets";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 20).expect("valid date")
    }

    async fn repo(dir: &tempfile::TempDir) -> XlsxTicketRepository {
        let repo = XlsxTicketRepository::new(dir.path().join("tickets.xlsx"), SHEET);
        assert!(repo.init_if_missing().await.expect("init"));
        repo
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = repo(&dir).await;
        assert!(!repo.init_if_missing().await.expect("second init"));
        assert!(repo.list(today()).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn missing_workbook_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = XlsxTicketRepository::new(dir.path().join("absent.xlsx"), SHEET);
        assert!(matches!(
            repo.list(today()).await,
            Err(HelpdeskError::Spreadsheet(_))
        ));
    }

    #[tokio::test]
    async fn create_list_update_delete() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = repo(&dir).await;

        let mut printer = NewTicket::new("Printer jam");
        printer.priority = "High".to_owned();
        let first = repo.create(printer, today()).await.expect("create");
        let second = repo
            .create(NewTicket::new("VPN"), today())
            .await
            .expect("create");
        assert_eq!(first.as_str(), "IT-20250001");
        assert_eq!(second.as_str(), "IT-20250002");

        let mut patch = TicketPatch::default();
        patch.set(TicketField::Status, "Resolved");
        repo.update(&first, &patch).await.expect("update");

        let ticket = repo
            .get(&first, today())
            .await
            .expect("get")
            .expect("present");
        assert_eq!(ticket.status, "Resolved");
        assert_eq!(ticket.priority, "High");
        assert_eq!(ticket.days_open, DaysOpen::Closed);

        repo.delete(&second).await.expect("delete");
        let ids: Vec<_> = repo
            .list(today())
            .await
            .expect("list")
            .into_iter()
            .map(|t| t.ticket_id)
            .collect();
        assert_eq!(ids, vec![first]);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = repo(&dir).await;
        let ghost = TicketId::from("IT-20250009");

        assert!(matches!(
            repo.update(&ghost, &TicketPatch::default()).await,
            Err(HelpdeskError::NotFound(_))
        ));
        assert!(matches!(
            repo.delete(&ghost).await,
            Err(HelpdeskError::NotFound(_))
        ));
        assert!(matches!(
            repo.delete(&TicketId::from("garbage")).await,
            Err(HelpdeskError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn foreign_ids_do_not_touch_matching_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = repo(&dir).await;
        for title in ["one", "two"] {
            repo.create(NewTicket::new(title), today())
                .await
                .expect("create");
        }
        let foreign = TicketId::from("IT-99990002");

        let mut patch = TicketPatch::default();
        patch.set(TicketField::Title, "hijacked");
        assert!(matches!(
            repo.update(&foreign, &patch).await,
            Err(HelpdeskError::NotFound(_))
        ));
        assert!(matches!(
            repo.delete(&foreign).await,
            Err(HelpdeskError::NotFound(_))
        ));

        let two = repo
            .get(&TicketId::from("IT-20250002"), today())
            .await
            .expect("get")
            .expect("present");
        assert_eq!(two.title, "two");
    }

    #[tokio::test]
    async fn deleted_row_hides_later_rows_until_reused() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = repo(&dir).await;
        for title in ["one", "two", "three"] {
            repo.create(NewTicket::new(title), today())
                .await
                .expect("create");
        }

        repo.delete(&TicketId::from("IT-20250002"))
            .await
            .expect("delete");
        assert_eq!(repo.list(today()).await.expect("list").len(), 1);

        let reused = repo
            .create(NewTicket::new("four"), today())
            .await
            .expect("create");
        assert_eq!(reused.as_str(), "IT-20250002");
        let titles: Vec<_> = repo
            .list(today())
            .await
            .expect("list")
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["one", "four", "three"]);
    }

    #[tokio::test]
    async fn no_temp_file_left_behind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = repo(&dir).await;
        repo.create(NewTicket::new("x"), today())
            .await
            .expect("create");
        assert!(!dir.path().join("tickets.xlsx.tmp").exists());
    }
}
