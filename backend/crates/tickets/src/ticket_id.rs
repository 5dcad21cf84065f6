use std::fmt;

use serde::{Deserialize, Serialize};

pub const TICKET_ID_PREFIX: &str = "IT-";

/// Number handed out when no valid id exists yet (`IT-20250001`).
pub const FIRST_TICKET_NUMBER: u64 = 2025_0001;

/// Year block used by position-derived ids: `IT-2025` + 4-digit slot.
const POSITIONAL_BLOCK: &str = "2025";

/// Display identifier of a ticket, `IT-<8 digits>`.
///
/// The wrapped string is kept verbatim: storage may hold ids that do not
/// follow the format, and those must round-trip untouched. Only
/// [`TicketId::number`] and [`TicketId::sheet_row`] interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(String);

impl TicketId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_owned())
    }

    pub fn from_number(number: u64) -> Self {
        Self(format!("{TICKET_ID_PREFIX}{number:08}"))
    }

    /// Id of the spreadsheet row at `row_index` (1-based, header on row 1).
    pub fn positional(row_index: u32) -> Self {
        Self(format!(
            "{TICKET_ID_PREFIX}{POSITIONAL_BLOCK}{:04}",
            row_index.saturating_sub(1)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric suffix, or `None` when the prefix or digits are malformed.
    pub fn number(&self) -> Option<u64> {
        let digits = self.0.strip_prefix(TICKET_ID_PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    /// Spreadsheet row addressed by a position-derived id.
    ///
    /// The last four digits are the slot; the row is slot + 1. Slot 0 would
    /// point at the header and is rejected.
    pub fn sheet_row(&self) -> Option<u32> {
        if !self.0.starts_with(TICKET_ID_PREFIX) || self.0.len() < TICKET_ID_PREFIX.len() + 4 {
            return None;
        }
        let slot = &self.0[self.0.len() - 4..];
        if !slot.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        match slot.parse::<u32>().ok()? {
            0 => None,
            n => Some(n + 1),
        }
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TicketId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TicketId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Next free id: highest valid suffix plus one, zero-padded to 8 digits.
///
/// Malformed ids are skipped. With no valid id at all the sequence starts
/// at `IT-20250001`.
pub fn next_ticket_id<'a, I>(existing: I) -> TicketId
where
    I: IntoIterator<Item = &'a TicketId>,
{
    existing
        .into_iter()
        .filter_map(TicketId::number)
        .max()
        .map(|n| TicketId::from_number(n + 1))
        .unwrap_or_else(|| TicketId::from_number(FIRST_TICKET_NUMBER))
}
