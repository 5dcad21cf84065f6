use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::days_open::DaysOpen;
use crate::record::Ticket;
use crate::ticket_id::TicketId;

/// The one text format accepted for dates held as plain text.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Semantic column order of a storage row.
pub const FIELD_ORDER: [&str; 9] = [
    "title",
    "status",
    "priority",
    "request_type",
    "staff_assigned",
    "requester",
    "date_opened",
    "description",
    "resolution_notes",
];

/// A single storage cell, already lifted out of the backend's own types.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// Time-of-day without a date; read as "today".
    Time(NaiveTime),
}

impl CellValue {
    /// Trimmed text form; empty cells give `""`.
    pub fn text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.trim().to_owned(),
            Self::Date(d) => d.format(DATE_FORMAT).to_string(),
            Self::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            Self::Time(t) => t.format("%H:%M:%S").to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Calendar date held by the cell, if any. Text that does not match
    /// [`DATE_FORMAT`] yields `None` rather than an error.
    pub fn date(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Empty => None,
            Self::Text(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok(),
            Self::Date(d) => Some(*d),
            Self::DateTime(dt) => Some(dt.date()),
            Self::Time(_) => Some(today),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Option<NaiveDate>> for CellValue {
    fn from(value: Option<NaiveDate>) -> Self {
        value.map(Self::Date).unwrap_or_default()
    }
}

/// Field values of one stored ticket, independent of the backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub title: CellValue,
    pub status: CellValue,
    pub priority: CellValue,
    pub request_type: CellValue,
    pub staff_assigned: CellValue,
    pub requester: CellValue,
    pub date_opened: CellValue,
    pub description: CellValue,
    pub resolution_notes: CellValue,
}

impl RawRow {
    /// Build from cells in [`FIELD_ORDER`]. Missing trailing cells are empty;
    /// extra cells are ignored.
    pub fn from_cells<I>(cells: I) -> Self
    where
        I: IntoIterator<Item = CellValue>,
    {
        let mut it = cells.into_iter();
        let mut next = || it.next().unwrap_or_default();
        Self {
            title: next(),
            status: next(),
            priority: next(),
            request_type: next(),
            staff_assigned: next(),
            requester: next(),
            date_opened: next(),
            description: next(),
            resolution_notes: next(),
        }
    }
}

/// Where a decoded ticket's identity comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowIdentity {
    /// Spreadsheet row number; the id is derived from it.
    Positional(u32),
    /// Id persisted alongside the row.
    Stored(TicketId),
}

impl RowIdentity {
    fn into_ticket_id(self) -> TicketId {
        match self {
            Self::Positional(row) => TicketId::positional(row),
            Self::Stored(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowDecode {
    Ticket(Ticket),
    /// Empty title: a sequential scan stops here.
    EndOfData,
}

impl RowDecode {
    pub fn into_ticket(self) -> Option<Ticket> {
        match self {
            Self::Ticket(ticket) => Some(ticket),
            Self::EndOfData => None,
        }
    }
}

pub fn decode_row(row: &RawRow, identity: RowIdentity, today: NaiveDate) -> RowDecode {
    let title = row.title.text();
    if title.is_empty() {
        return RowDecode::EndOfData;
    }

    let status = row.status.text();
    let date_opened = row.date_opened.date(today);
    let days_open = DaysOpen::compute(&status, date_opened, today);

    RowDecode::Ticket(Ticket {
        ticket_id: identity.into_ticket_id(),
        title,
        status,
        priority: row.priority.text(),
        request_type: row.request_type.text(),
        category_id: None,
        staff_assigned: row.staff_assigned.text(),
        requester: row.requester.text(),
        date_opened,
        days_open,
        description: row.description.text(),
        resolution_notes: row.resolution_notes.text(),
        labels: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 20).expect("valid date")
    }

    fn row(title: &str, status: &str, date: CellValue) -> RawRow {
        RawRow {
            title: title.into(),
            status: status.into(),
            priority: "High".into(),
            date_opened: date,
            ..RawRow::default()
        }
    }

    #[test]
    fn empty_title_ends_the_scan() {
        let blank = row("   ", "Open", CellValue::Empty);
        assert_eq!(
            decode_row(&blank, RowIdentity::Positional(10), today()),
            RowDecode::EndOfData
        );
        assert_eq!(
            decode_row(&RawRow::default(), RowIdentity::Positional(3), today()),
            RowDecode::EndOfData
        );
    }

    #[test]
    fn scan_produces_nothing_at_or_after_first_blank_title() {
        let mut rows: Vec<RawRow> = (0..12)
            .map(|i| row(&format!("ticket {i}"), "Open", CellValue::Empty))
            .collect();
        // spreadsheet row 10 is index 8 when data starts on row 2
        rows[8] = RawRow::default();

        let decoded: Vec<Ticket> = rows
            .iter()
            .enumerate()
            .map(|(i, r)| decode_row(r, RowIdentity::Positional(i as u32 + 2), today()))
            .map_while(RowDecode::into_ticket)
            .collect();

        assert_eq!(decoded.len(), 8);
        assert_eq!(decoded.last().expect("some").ticket_id.as_str(), "IT-20250008");
    }

    #[test]
    fn positional_identity_derives_id() {
        let ticket = decode_row(&row("Printer", "Open", CellValue::Empty), RowIdentity::Positional(5), today())
            .into_ticket()
            .expect("ticket");
        assert_eq!(ticket.ticket_id.as_str(), "IT-20250004");
    }

    #[test]
    fn stored_identity_is_kept() {
        let id = TicketId::from("IT-20250042");
        let ticket = decode_row(
            &row("Printer", "Open", CellValue::Empty),
            RowIdentity::Stored(id.clone()),
            today(),
        )
        .into_ticket()
        .expect("ticket");
        assert_eq!(ticket.ticket_id, id);
    }

    #[test]
    fn text_fields_are_trimmed_and_absent_cells_are_empty() {
        let raw = RawRow {
            title: "  Laptop won't boot \n".into(),
            status: " In Progress ".into(),
            ..RawRow::default()
        };
        let ticket = decode_row(&raw, RowIdentity::Positional(2), today())
            .into_ticket()
            .expect("ticket");
        assert_eq!(ticket.title, "Laptop won't boot");
        assert_eq!(ticket.status, "In Progress");
        assert_eq!(ticket.priority, "");
        assert_eq!(ticket.requester, "");
        assert_eq!(ticket.resolution_notes, "");
        assert!(ticket.labels.is_empty());
    }

    #[test]
    fn date_cells_decode_by_kind() {
        let d = NaiveDate::from_ymd_opt(2025, 6, 15).expect("valid");
        let cases = [
            (CellValue::Empty, None),
            (CellValue::from("2025-06-15"), Some(d)),
            (CellValue::Date(d), Some(d)),
            (
                CellValue::DateTime(d.and_hms_opt(14, 30, 0).expect("valid")),
                Some(d),
            ),
            (
                CellValue::Time(NaiveTime::from_hms_opt(9, 0, 0).expect("valid")),
                Some(today()),
            ),
            (CellValue::from("15/06/2025"), None),
            (CellValue::from("soon"), None),
        ];
        for (cell, expected) in cases {
            let ticket = decode_row(&row("x", "Open", cell.clone()), RowIdentity::Positional(2), today())
                .into_ticket()
                .expect("ticket");
            assert_eq!(ticket.date_opened, expected, "cell {cell:?}");
        }
    }

    #[test]
    fn unparseable_date_gives_zero_days() {
        let ticket = decode_row(&row("x", "Open", "yesterday".into()), RowIdentity::Positional(2), today())
            .into_ticket()
            .expect("ticket");
        assert_eq!(ticket.date_opened, None);
        assert_eq!(ticket.days_open, DaysOpen::Days(0));
    }

    #[test]
    fn open_ticket_five_days_old() {
        let opened = today() - chrono::Duration::days(5);
        let ticket = decode_row(&row("x", "Open", CellValue::Date(opened)), RowIdentity::Positional(2), today())
            .into_ticket()
            .expect("ticket");
        assert_eq!(ticket.days_open, DaysOpen::Days(5));
    }

    #[test]
    fn resolved_ticket_five_days_old_is_marked_closed() {
        let opened = today() - chrono::Duration::days(5);
        let ticket = decode_row(
            &row("x", "Resolved", CellValue::Date(opened)),
            RowIdentity::Positional(2),
            today(),
        )
        .into_ticket()
        .expect("ticket");
        assert_eq!(ticket.days_open, DaysOpen::Closed);
        assert_eq!(ticket.days_open.to_string(), "-");
    }

    #[test]
    fn from_cells_follows_field_order() {
        let cells: Vec<CellValue> = FIELD_ORDER.iter().map(|f| CellValue::from(*f)).collect();
        let raw = RawRow::from_cells(cells);
        assert_eq!(raw.title.text(), "title");
        assert_eq!(raw.requester.text(), "requester");
        assert_eq!(raw.resolution_notes.text(), "resolution_notes");

        let short = RawRow::from_cells([CellValue::from("only title")]);
        assert_eq!(short.title.text(), "only title");
        assert!(short.status.is_blank());
    }
}
