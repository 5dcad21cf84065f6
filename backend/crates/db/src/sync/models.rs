use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    /// Workbook path the tickets were read from.
    pub source: String,
    pub upserted: usize,
    pub removed: u64,
    /// Attachment blobs deleted with the removed tickets.
    pub blobs_removed: usize,
}
