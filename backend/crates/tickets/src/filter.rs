use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::Ticket;

/// Optional list filters; every set field must match exactly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketFilter {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub staff_assigned: Option<String>,
    pub request_type: Option<String>,
    pub label_id: Option<Uuid>,
}

impl TicketFilter {
    pub fn matches(&self, ticket: &Ticket) -> bool {
        fn eq(wanted: &Option<String>, actual: &str) -> bool {
            wanted.as_deref().map_or(true, |w| w == actual)
        }

        eq(&self.status, &ticket.status)
            && eq(&self.priority, &ticket.priority)
            && eq(&self.staff_assigned, &ticket.staff_assigned)
            && eq(&self.request_type, &ticket.request_type)
            && self
                .label_id
                .map_or(true, |id| ticket.labels.iter().any(|l| l.id == id))
    }

    pub fn apply(&self, tickets: Vec<Ticket>) -> Vec<Ticket> {
        tickets.into_iter().filter(|t| self.matches(t)).collect()
    }
}

/// Newest first by opening date; tickets without a date go last.
pub fn sort_newest_first(tickets: &mut [Ticket]) {
    tickets.sort_by(|a, b| b.date_opened.cmp(&a.date_opened));
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DropdownOptions {
    pub request_types: Vec<String>,
    pub staff: Vec<String>,
    pub requesters: Vec<String>,
}

/// Sorted distinct values for the dashboard's pick lists.
pub fn dropdown_options(tickets: &[Ticket]) -> DropdownOptions {
    fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
        values
            .filter(|v| !v.is_empty() && *v != "nan")
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    DropdownOptions {
        request_types: distinct(tickets.iter().map(|t| t.request_type.as_str())),
        staff: distinct(tickets.iter().map(|t| t.staff_assigned.as_str())),
        requesters: distinct(tickets.iter().map(|t| t.requester.as_str())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::days_open::DaysOpen;
    use crate::record::LabelRef;
    use crate::ticket_id::TicketId;
    use chrono::NaiveDate;

    fn ticket(id: &str, date: Option<(i32, u32, u32)>, staff: &str, requester: &str) -> Ticket {
        Ticket {
            ticket_id: TicketId::from(id),
            title: "t".to_owned(),
            status: "Open".to_owned(),
            priority: "Low".to_owned(),
            request_type: "Hardware".to_owned(),
            category_id: None,
            staff_assigned: staff.to_owned(),
            requester: requester.to_owned(),
            date_opened: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            days_open: DaysOpen::Days(0),
            description: String::new(),
            resolution_notes: String::new(),
            labels: Vec::new(),
        }
    }

    #[test]
    fn sorts_newest_first_with_undated_last() {
        let mut tickets = vec![
            ticket("IT-20250001", Some((2025, 1, 2)), "", ""),
            ticket("IT-20250002", None, "", ""),
            ticket("IT-20250003", Some((2025, 3, 1)), "", ""),
        ];
        sort_newest_first(&mut tickets);
        let order: Vec<&str> = tickets.iter().map(|t| t.ticket_id.as_str()).collect();
        assert_eq!(order, vec!["IT-20250003", "IT-20250001", "IT-20250002"]);
    }

    #[test]
    fn filter_matches_on_every_set_field() {
        let mut labelled = ticket("IT-20250001", None, "Ana", "");
        let label = LabelRef {
            id: Uuid::new_v4(),
            name: "vip".to_owned(),
            color: "#ff0000".to_owned(),
        };
        labelled.labels.push(label.clone());
        let plain = ticket("IT-20250002", None, "Ben", "");

        let by_staff = TicketFilter {
            staff_assigned: Some("Ana".to_owned()),
            ..TicketFilter::default()
        };
        assert!(by_staff.matches(&labelled));
        assert!(!by_staff.matches(&plain));

        let by_label = TicketFilter {
            label_id: Some(label.id),
            ..TicketFilter::default()
        };
        let kept = by_label.apply(vec![labelled, plain]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].ticket_id.as_str(), "IT-20250001");
    }

    #[test]
    fn options_are_sorted_and_distinct() {
        let tickets = vec![
            ticket("IT-20250001", None, "Zoe", "nan"),
            ticket("IT-20250002", None, "Ana", "Kim"),
            ticket("IT-20250003", None, "Zoe", ""),
        ];
        let options = dropdown_options(&tickets);
        assert_eq!(options.staff, vec!["Ana", "Zoe"]);
        assert_eq!(options.requesters, vec!["Kim"]);
        assert_eq!(options.request_types, vec!["Hardware"]);
    }
}
