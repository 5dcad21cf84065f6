use std::fmt;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use crate::record::is_closed_status;

/// Age of a ticket in whole days, or the closed marker.
///
/// Never stored: always recomputed from `(status, date_opened, today)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaysOpen {
    Days(i64),
    Closed,
}

impl DaysOpen {
    /// Integer form of [`DaysOpen::Closed`] used by integer-only consumers.
    pub const CLOSED_SENTINEL: i64 = -1;

    /// Closed/resolved tickets get the marker; otherwise days since opening,
    /// clamped at zero; no valid date gives zero.
    pub fn compute(status: &str, date_opened: Option<NaiveDate>, today: NaiveDate) -> Self {
        if is_closed_status(status) {
            return Self::Closed;
        }
        match date_opened {
            Some(opened) => Self::Days((today - opened).num_days().max(0)),
            None => Self::Days(0),
        }
    }

    pub fn as_sentinel(&self) -> i64 {
        match self {
            Self::Days(days) => *days,
            Self::Closed => Self::CLOSED_SENTINEL,
        }
    }

    pub fn from_sentinel(value: i64) -> Self {
        if value < 0 {
            Self::Closed
        } else {
            Self::Days(value)
        }
    }
}

impl fmt::Display for DaysOpen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Days(days) => write!(f, "{days}"),
            Self::Closed => f.write_str("-"),
        }
    }
}

impl Serialize for DaysOpen {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Days(days) => serializer.serialize_i64(*days),
            Self::Closed => serializer.serialize_str("-"),
        }
    }
}
