use std::io::Cursor;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use helpdesk_common::error::{HelpdeskError, HelpdeskResult};
use helpdesk_tickets::{
    decode_row, CellValue, NewTicket, RawRow, RowDecode, RowIdentity, Ticket, TicketField,
    TicketId, TicketPatch,
};
use umya_spreadsheet::{Spreadsheet, Worksheet};

pub const HEADER_ROW: u32 = 1;
pub const FIRST_DATA_ROW: u32 = 2;
/// Workbook-backend scans never look past this row. Imports read on to the
/// last filled row.
pub const LAST_SCAN_ROW: u32 = 999;

const ID_COLUMN: &str = "A";
const DATE_COLUMN: &str = "H";
const DAYS_OPEN_COLUMN: &str = "I";
const DATE_FORMAT_CODE: &str = "yyyy-mm-dd";

pub const HEADERS: [(&str, &str); 11] = [
    ("A", "Ticket ID"),
    ("B", "Title"),
    ("C", "Status"),
    ("D", "Priority"),
    ("E", "Request Type"),
    ("F", "Staff Assigned"),
    ("G", "Requester"),
    ("H", "Date Opened"),
    ("I", "Days Open"),
    ("J", "Description"),
    ("K", "Resolution Notes"),
];

/// Columns cleared when a ticket is deleted. Column A is left alone: legacy
/// workbooks keep a positional formula there.
const DATA_COLUMNS: [&str; 10] = ["B", "C", "D", "E", "F", "G", "H", "I", "J", "K"];

fn column(field: TicketField) -> &'static str {
    match field {
        TicketField::Title => "B",
        TicketField::Status => "C",
        TicketField::Priority => "D",
        TicketField::RequestType => "E",
        TicketField::StaffAssigned => "F",
        TicketField::Requester => "G",
        TicketField::Description => "J",
        TicketField::ResolutionNotes => "K",
    }
}

fn coord(col: &str, row: u32) -> String {
    format!("{col}{row}")
}

/// How a scan assigns ids to rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSource {
    /// Always derive from the row number.
    Positional,
    /// Use column A when it holds a well-formed id, else derive.
    ColumnOrPositional,
}

fn excel_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

pub fn date_to_serial(date: NaiveDate) -> f64 {
    (date - excel_epoch()).num_days() as f64
}

/// Excel serial number to a cell value. Serials below one carry only a time
/// of day.
pub fn serial_to_cell(serial: f64) -> CellValue {
    if !serial.is_finite() || serial < 0.0 {
        return CellValue::Empty;
    }
    let whole_days = serial.trunc() as i64;
    let seconds = ((serial - serial.trunc()) * 86_400.0).round() as i64;
    if whole_days == 0 {
        return NaiveTime::from_num_seconds_from_midnight_opt(seconds.clamp(0, 86_399) as u32, 0)
            .map(CellValue::Time)
            .unwrap_or_default();
    }
    let midnight: NaiveDateTime = (excel_epoch() + Duration::days(whole_days))
        .and_time(NaiveTime::MIN);
    let stamp = midnight + Duration::seconds(seconds);
    if seconds == 0 {
        CellValue::Date(stamp.date())
    } else {
        CellValue::DateTime(stamp)
    }
}

pub fn find_sheet<'a>(book: &'a Spreadsheet, name: &str) -> HelpdeskResult<&'a Worksheet> {
    book.get_sheet_collection()
        .iter()
        .find(|ws| ws.get_name() == name)
        .ok_or_else(|| HelpdeskError::Spreadsheet(format!("worksheet not found: {name}")))
}

pub fn find_sheet_mut<'a>(
    book: &'a mut Spreadsheet,
    name: &str,
) -> HelpdeskResult<&'a mut Worksheet> {
    book.get_sheet_collection_mut()
        .iter_mut()
        .find(|ws| ws.get_name() == name)
        .ok_or_else(|| HelpdeskError::Spreadsheet(format!("worksheet not found: {name}")))
}

/// Empty workbook holding one worksheet with the header row.
pub fn new_workbook(sheet_name: &str) -> HelpdeskResult<Spreadsheet> {
    let mut book = umya_spreadsheet::new_file_empty_worksheet();
    let ws = book
        .new_sheet(sheet_name)
        .map_err(|e| HelpdeskError::Spreadsheet(e.to_string()))?;
    for (col, title) in HEADERS {
        ws.get_cell_mut(coord(col, HEADER_ROW).as_str())
            .set_value(title);
    }
    Ok(book)
}

fn read_cell(ws: &Worksheet, col: &str, row: u32) -> CellValue {
    let value = ws.get_value(coord(col, row).as_str());
    if value.trim().is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(value)
    }
}

/// Only numeric cells are Excel serials; text cells go through the fixed
/// text date format.
fn read_date_cell(ws: &Worksheet, row: u32) -> CellValue {
    let numeric = ws
        .get_cell(coord(DATE_COLUMN, row).as_str())
        .is_some_and(|cell| cell.get_data_type() == "n");
    match read_cell(ws, DATE_COLUMN, row) {
        CellValue::Text(text) if numeric => match text.trim().parse::<f64>() {
            Ok(serial) => serial_to_cell(serial),
            Err(_) => CellValue::Text(text),
        },
        other => other,
    }
}

pub fn read_row(ws: &Worksheet, row: u32) -> RawRow {
    RawRow {
        title: read_cell(ws, column(TicketField::Title), row),
        status: read_cell(ws, column(TicketField::Status), row),
        priority: read_cell(ws, column(TicketField::Priority), row),
        request_type: read_cell(ws, column(TicketField::RequestType), row),
        staff_assigned: read_cell(ws, column(TicketField::StaffAssigned), row),
        requester: read_cell(ws, column(TicketField::Requester), row),
        date_opened: read_date_cell(ws, row),
        description: read_cell(ws, column(TicketField::Description), row),
        resolution_notes: read_cell(ws, column(TicketField::ResolutionNotes), row),
    }
}

fn row_identity(ws: &Worksheet, row: u32, ids: IdSource) -> RowIdentity {
    if ids == IdSource::ColumnOrPositional {
        let stored = TicketId::from(ws.get_value(coord(ID_COLUMN, row).as_str()));
        if stored.number().is_some() {
            return RowIdentity::Stored(stored);
        }
    }
    RowIdentity::Positional(row)
}

/// Decode rows from the first data row until the first empty title.
pub fn scan(ws: &Worksheet, today: NaiveDate, ids: IdSource) -> Vec<Ticket> {
    let last_row = match ids {
        IdSource::Positional => LAST_SCAN_ROW,
        IdSource::ColumnOrPositional => ws.get_highest_row().max(LAST_SCAN_ROW),
    };
    let mut tickets = Vec::new();
    for row in FIRST_DATA_ROW..=last_row {
        match decode_row(&read_row(ws, row), row_identity(ws, row, ids), today) {
            RowDecode::Ticket(ticket) => tickets.push(ticket),
            RowDecode::EndOfData => break,
        }
    }
    tickets
}

fn has_title(ws: &Worksheet, row: u32) -> bool {
    !ws.get_value(coord(column(TicketField::Title), row).as_str())
        .trim()
        .is_empty()
}

/// First data row without a title, where the next ticket goes.
pub fn first_empty_row(ws: &Worksheet) -> u32 {
    (FIRST_DATA_ROW..=LAST_SCAN_ROW)
        .find(|row| !has_title(ws, *row))
        .unwrap_or_else(|| ws.get_highest_row() + 1)
}

/// Row holding the ticket addressed by a position-derived id. Only the exact
/// id a scan would report for that row matches.
pub fn ticket_row(ws: &Worksheet, id: &TicketId) -> Option<u32> {
    id.sheet_row()
        .filter(|row| TicketId::positional(*row) == *id && has_title(ws, *row))
}

fn write_date(ws: &mut Worksheet, row: u32, date: NaiveDate) {
    let cell = ws.get_cell_mut(coord(DATE_COLUMN, row).as_str());
    cell.set_value_number(date_to_serial(date));
    cell.get_style_mut()
        .get_number_format_mut()
        .set_format_code(DATE_FORMAT_CODE);
}

fn write_text(ws: &mut Worksheet, col: &str, row: u32, value: &str) {
    ws.get_cell_mut(coord(col, row).as_str())
        .set_value_string(value);
}

/// Fill a blank row with a new ticket. Column A is never touched.
pub fn write_new_row(ws: &mut Worksheet, row: u32, ticket: &NewTicket, date_opened: NaiveDate) {
    for field in TicketField::ALL {
        write_text(ws, column(field), row, ticket.value(field));
    }
    write_date(ws, row, date_opened);
}

pub fn write_patch(ws: &mut Worksheet, row: u32, patch: &TicketPatch) {
    for (field, value) in &patch.fields {
        write_text(ws, column(*field), row, value);
    }
}

pub fn clear_row(ws: &mut Worksheet, row: u32) {
    for col in DATA_COLUMNS {
        ws.get_cell_mut(coord(col, row).as_str()).set_value("");
    }
}

/// Workbook with every ticket written in the standard layout, ids and
/// days-open included.
pub fn export_workbook(tickets: &[Ticket], sheet_name: &str) -> HelpdeskResult<Spreadsheet> {
    let mut book = new_workbook(sheet_name)?;
    let ws = find_sheet_mut(&mut book, sheet_name)?;

    for (offset, ticket) in tickets.iter().enumerate() {
        let row = FIRST_DATA_ROW + offset as u32;
        write_text(ws, ID_COLUMN, row, ticket.ticket_id.as_str());
        write_text(ws, column(TicketField::Title), row, &ticket.title);
        write_text(ws, column(TicketField::Status), row, &ticket.status);
        write_text(ws, column(TicketField::Priority), row, &ticket.priority);
        write_text(ws, column(TicketField::RequestType), row, &ticket.request_type);
        write_text(ws, column(TicketField::StaffAssigned), row, &ticket.staff_assigned);
        write_text(ws, column(TicketField::Requester), row, &ticket.requester);
        if let Some(date) = ticket.date_opened {
            write_date(ws, row, date);
        }
        write_text(ws, DAYS_OPEN_COLUMN, row, &ticket.days_open.to_string());
        write_text(ws, column(TicketField::Description), row, &ticket.description);
        write_text(
            ws,
            column(TicketField::ResolutionNotes),
            row,
            &ticket.resolution_notes,
        );
    }
    Ok(book)
}

pub fn to_xlsx_bytes(book: &Spreadsheet) -> HelpdeskResult<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(book, &mut cursor)
        .map_err(|e| HelpdeskError::Spreadsheet(e.to_string()))?;
    Ok(cursor.into_inner())
}

/// Decode an uploaded workbook. Column A ids win over row positions.
pub fn tickets_from_xlsx_bytes(
    bytes: &[u8],
    sheet_name: &str,
    today: NaiveDate,
) -> HelpdeskResult<Vec<Ticket>> {
    let book = umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(bytes), true)
        .map_err(|e| HelpdeskError::Validation(format!("unreadable workbook: {e}")))?;
    let ws = find_sheet(&book, sheet_name)
        .map_err(|_| HelpdeskError::Validation(format!("workbook has no sheet named {sheet_name}")))?;
    Ok(scan(ws, today, IdSource::ColumnOrPositional))
}
