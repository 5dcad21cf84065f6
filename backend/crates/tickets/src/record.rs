use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::days_open::DaysOpen;
use crate::ticket_id::TicketId;

pub const STATUS_OPEN: &str = "Open";
pub const STATUS_IN_PROGRESS: &str = "In Progress";
pub const STATUS_WAITING: &str = "Waiting for Info";
pub const STATUS_RESOLVED: &str = "Resolved";
pub const STATUS_CLOSED: &str = "Closed";

/// Statuses the dashboard offers. Storage may still hold anything else;
/// transitions between any two values are allowed.
pub const STATUSES: &[&str] = &[
    STATUS_OPEN,
    STATUS_IN_PROGRESS,
    STATUS_WAITING,
    STATUS_RESOLVED,
    STATUS_CLOSED,
];

/// Statuses that stop the days-open clock and count as closed in stats.
pub const CLOSED_STATUSES: &[&str] = &[STATUS_CLOSED, STATUS_RESOLVED];

pub const PRIORITY_LOW: &str = "Low";
pub const PRIORITY_CRITICAL: &str = "Critical";
pub const PRIORITIES: &[&str] = &[PRIORITY_LOW, "Medium", "High", PRIORITY_CRITICAL];

pub const DEFAULT_STATUS: &str = STATUS_OPEN;
pub const DEFAULT_PRIORITY: &str = PRIORITY_LOW;

pub fn is_closed_status(status: &str) -> bool {
    CLOSED_STATUSES.contains(&status.trim())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRef {
    pub id: Uuid,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ticket {
    pub ticket_id: TicketId,
    pub title: String,
    pub status: String,
    pub priority: String,
    pub request_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    pub staff_assigned: String,
    pub requester: String,
    #[serde(serialize_with = "serialize_iso_date")]
    pub date_opened: Option<NaiveDate>,
    pub days_open: DaysOpen,
    pub description: String,
    pub resolution_notes: String,
    pub labels: Vec<LabelRef>,
}

impl Ticket {
    pub fn is_closed(&self) -> bool {
        is_closed_status(&self.status)
    }

    pub fn is_critical_open(&self) -> bool {
        self.priority == PRIORITY_CRITICAL && !self.is_closed()
    }

    /// `date_opened` as `YYYY-MM-DD`, or empty when unknown.
    pub fn date_opened_iso(&self) -> String {
        self.date_opened
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

fn serialize_iso_date<S: Serializer>(
    date: &Option<NaiveDate>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match date {
        Some(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
        None => serializer.serialize_str(""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Ticket {
        Ticket {
            ticket_id: TicketId::from("IT-20250003"),
            title: "VPN drops".to_owned(),
            status: STATUS_RESOLVED.to_owned(),
            priority: PRIORITY_CRITICAL.to_owned(),
            request_type: "Network".to_owned(),
            category_id: None,
            staff_assigned: "Dana".to_owned(),
            requester: "Lee".to_owned(),
            date_opened: NaiveDate::from_ymd_opt(2025, 2, 1),
            days_open: DaysOpen::Closed,
            description: String::new(),
            resolution_notes: "Rebooted".to_owned(),
            labels: Vec::new(),
        }
    }

    #[test]
    fn serializes_dates_and_closed_marker() {
        let value = serde_json::to_value(sample()).expect("serialize");
        assert_eq!(value["ticket_id"], "IT-20250003");
        assert_eq!(value["date_opened"], "2025-02-01");
        assert_eq!(value["days_open"], "-");
        assert!(value.get("category_id").is_none());
        assert_eq!(value["labels"], serde_json::json!([]));
    }

    #[test]
    fn missing_date_serializes_as_empty_string() {
        let mut ticket = sample();
        ticket.date_opened = None;
        let value = serde_json::to_value(&ticket).expect("serialize");
        assert_eq!(value["date_opened"], "");
        assert_eq!(ticket.date_opened_iso(), "");
    }

    #[test]
    fn critical_open_requires_unclosed_status() {
        let mut ticket = sample();
        assert!(!ticket.is_critical_open());
        ticket.status = STATUS_IN_PROGRESS.to_owned();
        assert!(ticket.is_critical_open());
        ticket.priority = "High".to_owned();
        assert!(!ticket.is_critical_open());
    }

    #[test]
    fn closed_statuses_are_a_subset_of_known_statuses() {
        for status in CLOSED_STATUSES {
            assert!(STATUSES.contains(status));
        }
        assert!(STATUSES.contains(&DEFAULT_STATUS));
        assert!(PRIORITIES.contains(&DEFAULT_PRIORITY));
    }
}
