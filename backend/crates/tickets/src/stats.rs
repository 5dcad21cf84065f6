use std::collections::BTreeMap;

use serde::Serialize;

use crate::record::Ticket;

/// Values that mean "not filled in" when grouping: empty cells and the
/// `nan` left behind by dataframe exports of empty cells.
const PLACEHOLDERS: &[&str] = &["", "nan"];

fn is_placeholder(value: &str) -> bool {
    PLACEHOLDERS.contains(&value)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StaffLoad {
    pub assigned: usize,
    pub open: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TicketStats {
    pub total: usize,
    pub open: usize,
    pub closed: usize,
    /// Critical priority and not closed.
    pub critical: usize,
    pub statuses: BTreeMap<String, usize>,
    pub priorities: BTreeMap<String, usize>,
    pub request_types: BTreeMap<String, usize>,
    pub staff_workload: BTreeMap<String, StaffLoad>,
}

pub fn calculate_stats(tickets: &[Ticket]) -> TicketStats {
    let mut stats = TicketStats {
        total: tickets.len(),
        ..TicketStats::default()
    };

    for ticket in tickets {
        let closed = ticket.is_closed();
        if closed {
            stats.closed += 1;
        } else {
            stats.open += 1;
        }
        if ticket.is_critical_open() {
            stats.critical += 1;
        }

        *stats.statuses.entry(ticket.status.clone()).or_default() += 1;
        *stats.priorities.entry(ticket.priority.clone()).or_default() += 1;

        if !is_placeholder(&ticket.request_type) {
            *stats
                .request_types
                .entry(ticket.request_type.clone())
                .or_default() += 1;
        }

        if !is_placeholder(&ticket.staff_assigned) {
            let load = stats
                .staff_workload
                .entry(ticket.staff_assigned.clone())
                .or_default();
            load.assigned += 1;
            if !closed {
                load.open += 1;
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::days_open::DaysOpen;
    use crate::ticket_id::TicketId;

    fn ticket(status: &str, priority: &str, request_type: &str, staff: &str) -> Ticket {
        Ticket {
            ticket_id: TicketId::from("IT-20250001"),
            title: "t".to_owned(),
            status: status.to_owned(),
            priority: priority.to_owned(),
            request_type: request_type.to_owned(),
            category_id: None,
            staff_assigned: staff.to_owned(),
            requester: String::new(),
            date_opened: None,
            days_open: DaysOpen::Days(0),
            description: String::new(),
            resolution_notes: String::new(),
            labels: Vec::new(),
        }
    }

    #[test]
    fn empty_set_is_all_zero() {
        assert_eq!(calculate_stats(&[]), TicketStats::default());
    }

    #[test]
    fn counts_open_closed_and_critical() {
        let tickets = vec![
            ticket("Open", "Critical", "Hardware", "Ana"),
            ticket("Closed", "Critical", "Hardware", "Ana"),
            ticket("Resolved", "Low", "Software", "Ben"),
            ticket("In Progress", "High", "", ""),
        ];
        let stats = calculate_stats(&tickets);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.open, 2);
        assert_eq!(stats.closed, 2);
        assert_eq!(stats.critical, 1);
        assert_eq!(stats.statuses["Closed"], 1);
        assert_eq!(stats.priorities["Critical"], 2);
    }

    #[test]
    fn placeholder_request_types_and_staff_are_skipped() {
        let tickets = vec![
            ticket("Open", "Low", "nan", "nan"),
            ticket("Open", "Low", "", ""),
            ticket("Open", "Low", "Access", "Cruz"),
        ];
        let stats = calculate_stats(&tickets);

        assert_eq!(stats.request_types.len(), 1);
        assert_eq!(stats.request_types["Access"], 1);
        assert_eq!(stats.staff_workload.len(), 1);
    }

    #[test]
    fn staff_workload_tracks_assigned_and_open() {
        let tickets = vec![
            ticket("Open", "Low", "", "Ana"),
            ticket("Closed", "Low", "", "Ana"),
            ticket("Waiting for Info", "Low", "", "Ana"),
            ticket("Resolved", "Low", "", "Ben"),
        ];
        let stats = calculate_stats(&tickets);

        assert_eq!(
            stats.staff_workload["Ana"],
            StaffLoad {
                assigned: 3,
                open: 2
            }
        );
        assert_eq!(
            stats.staff_workload["Ben"],
            StaffLoad {
                assigned: 1,
                open: 0
            }
        );
    }

    #[test]
    fn serializes_with_dashboard_keys() {
        let stats = calculate_stats(&[ticket("Open", "Low", "Email", "Ana")]);
        let value = serde_json::to_value(&stats).expect("serialize");
        assert_eq!(value["total"], 1);
        assert_eq!(value["staff_workload"]["Ana"]["assigned"], 1);
        assert_eq!(value["request_types"]["Email"], 1);
    }
}
