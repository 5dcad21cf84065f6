use std::collections::BTreeMap;

use chrono::NaiveDate;
use helpdesk_common::error::{HelpdeskError, HelpdeskResult};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::decode::{CellValue, RawRow};
use crate::record::{DEFAULT_PRIORITY, DEFAULT_STATUS};

/// Request body shape accepted by create and update.
pub type FieldMap = serde_json::Map<String, Value>;

/// Writable text attributes of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TicketField {
    Title,
    Status,
    Priority,
    RequestType,
    StaffAssigned,
    Requester,
    Description,
    ResolutionNotes,
}

impl TicketField {
    pub const ALL: [Self; 8] = [
        Self::Title,
        Self::Status,
        Self::Priority,
        Self::RequestType,
        Self::StaffAssigned,
        Self::Requester,
        Self::Description,
        Self::ResolutionNotes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Status => "status",
            Self::Priority => "priority",
            Self::RequestType => "request_type",
            Self::StaffAssigned => "staff_assigned",
            Self::Requester => "requester",
            Self::Description => "description",
            Self::ResolutionNotes => "resolution_notes",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

/// Attributes a caller may send but never changes through an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadOnlyField {
    TicketId,
    DateOpened,
    DaysOpen,
}

impl ReadOnlyField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TicketId => "ticket_id",
            Self::DateOpened => "date_opened",
            Self::DaysOpen => "days_open",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ticket_id" => Some(Self::TicketId),
            "date_opened" => Some(Self::DateOpened),
            "days_open" => Some(Self::DaysOpen),
            _ => None,
        }
    }
}

/// Partial set of changes for an existing ticket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketPatch {
    pub fields: BTreeMap<TicketField, String>,
    /// `Some(None)` clears the category.
    pub category_id: Option<Option<Uuid>>,
    /// Replaces the whole label set when present.
    pub label_ids: Option<Vec<Uuid>>,
}

impl TicketPatch {
    pub fn set(&mut self, field: TicketField, value: impl Into<String>) -> &mut Self {
        self.fields.insert(field, value.into());
        self
    }

    pub fn get(&self, field: TicketField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn has_taxonomy_changes(&self) -> bool {
        self.category_id.is_some() || self.label_ids.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && !self.has_taxonomy_changes()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodedPatch {
    pub patch: TicketPatch,
    /// Write-once or derived fields that were present in the map and dropped.
    pub ignored: Vec<ReadOnlyField>,
}

/// A ticket about to be created. Id and opening date are assigned by the
/// store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    pub title: String,
    pub status: String,
    pub priority: String,
    pub request_type: String,
    pub staff_assigned: String,
    pub requester: String,
    pub description: String,
    pub resolution_notes: String,
    pub category_id: Option<Uuid>,
    pub label_ids: Vec<Uuid>,
}

impl NewTicket {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status: DEFAULT_STATUS.to_owned(),
            priority: DEFAULT_PRIORITY.to_owned(),
            request_type: String::new(),
            staff_assigned: String::new(),
            requester: String::new(),
            description: String::new(),
            resolution_notes: String::new(),
            category_id: None,
            label_ids: Vec::new(),
        }
    }

    pub fn value(&self, field: TicketField) -> &str {
        match field {
            TicketField::Title => &self.title,
            TicketField::Status => &self.status,
            TicketField::Priority => &self.priority,
            TicketField::RequestType => &self.request_type,
            TicketField::StaffAssigned => &self.staff_assigned,
            TicketField::Requester => &self.requester,
            TicketField::Description => &self.description,
            TicketField::ResolutionNotes => &self.resolution_notes,
        }
    }

    pub fn to_raw_row(&self, date_opened: NaiveDate) -> RawRow {
        let mut row = RawRow {
            date_opened: CellValue::Date(date_opened),
            ..RawRow::default()
        };
        for field in TicketField::ALL {
            *row.field_mut(field) = CellValue::Text(self.value(field).to_owned());
        }
        row
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodedCreate {
    pub ticket: NewTicket,
    pub ignored: Vec<ReadOnlyField>,
}

impl RawRow {
    pub fn field_mut(&mut self, field: TicketField) -> &mut CellValue {
        match field {
            TicketField::Title => &mut self.title,
            TicketField::Status => &mut self.status,
            TicketField::Priority => &mut self.priority,
            TicketField::RequestType => &mut self.request_type,
            TicketField::StaffAssigned => &mut self.staff_assigned,
            TicketField::Requester => &mut self.requester,
            TicketField::Description => &mut self.description,
            TicketField::ResolutionNotes => &mut self.resolution_notes,
        }
    }

    /// Overwrite only the attributes named in the patch.
    pub fn apply(&mut self, patch: &TicketPatch) {
        for (field, value) in &patch.fields {
            *self.field_mut(*field) = CellValue::Text(value.clone());
        }
    }
}

/// Turn a submitted field map into an update patch.
///
/// `ticket_id`, `date_opened` and `days_open` are dropped and listed in
/// [`EncodedPatch::ignored`]. Unknown keys and non-string text values are
/// validation errors; `null` clears a text field.
pub fn encode_update(map: &FieldMap) -> HelpdeskResult<EncodedPatch> {
    let mut patch = TicketPatch::default();
    let mut ignored = Vec::new();

    for (key, value) in map {
        if let Some(field) = ReadOnlyField::from_name(key) {
            ignored.push(field);
            continue;
        }
        if let Some(field) = TicketField::from_name(key) {
            patch.set(field, text_value(key, value)?);
            continue;
        }
        match key.as_str() {
            "category_id" => patch.category_id = Some(optional_uuid(key, value)?),
            "label_ids" => patch.label_ids = Some(uuid_list(key, value)?),
            _ => {
                return Err(HelpdeskError::Validation(format!(
                    "unknown ticket field: {key}"
                )))
            }
        }
    }

    if patch
        .get(TicketField::Title)
        .is_some_and(|title| title.is_empty())
    {
        return Err(HelpdeskError::Validation(
            "title must not be empty".to_owned(),
        ));
    }

    Ok(EncodedPatch { patch, ignored })
}

/// Turn a submitted field map into a new ticket, filling defaults for
/// anything left out (`status=Open`, `priority=Low`, everything else empty).
pub fn encode_create(map: &FieldMap) -> HelpdeskResult<EncodedCreate> {
    let title_missing = map
        .get("title")
        .map(|v| v.as_str().map_or(v.is_null(), |s| s.trim().is_empty()))
        .unwrap_or(true);
    if title_missing {
        return Err(HelpdeskError::Validation("title is required".to_owned()));
    }

    let EncodedPatch { patch, ignored } = encode_update(map)?;
    let mut ticket = NewTicket::new(String::new());
    for (field, value) in patch.fields {
        if value.is_empty() {
            continue;
        }
        match field {
            TicketField::Title => ticket.title = value,
            TicketField::Status => ticket.status = value,
            TicketField::Priority => ticket.priority = value,
            TicketField::RequestType => ticket.request_type = value,
            TicketField::StaffAssigned => ticket.staff_assigned = value,
            TicketField::Requester => ticket.requester = value,
            TicketField::Description => ticket.description = value,
            TicketField::ResolutionNotes => ticket.resolution_notes = value,
        }
    }
    ticket.category_id = patch.category_id.flatten();
    ticket.label_ids = patch.label_ids.unwrap_or_default();

    Ok(EncodedCreate { ticket, ignored })
}

fn text_value(key: &str, value: &Value) -> HelpdeskResult<String> {
    match value {
        Value::String(s) => Ok(s.trim().to_owned()),
        Value::Null => Ok(String::new()),
        _ => Err(HelpdeskError::Validation(format!(
            "field {key} must be a string"
        ))),
    }
}

fn optional_uuid(key: &str, value: &Value) -> HelpdeskResult<Option<Uuid>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Uuid::parse_str(s.trim())
            .map(Some)
            .map_err(|_| HelpdeskError::Validation(format!("invalid UUID in {key}: {s}"))),
        _ => Err(HelpdeskError::Validation(format!(
            "field {key} must be a UUID string or null"
        ))),
    }
}

fn uuid_list(key: &str, value: &Value) -> HelpdeskResult<Vec<Uuid>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => {
            let mut ids = Vec::with_capacity(items.len());
            for item in items {
                if let Some(id) = optional_uuid(key, item)? {
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
            }
            Ok(ids)
        }
        _ => Err(HelpdeskError::Validation(format!(
            "field {key} must be an array of UUIDs"
        ))),
    }
}
