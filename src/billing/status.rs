use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::cycle::days_until;
use crate::domain::PaymentStatus;

/// Time remaining until a due date, as shown next to each guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueCountdown {
    Overdue(i64),
    DueToday,
    Remaining(i64),
}

impl DueCountdown {
    pub fn between(due: NaiveDate, today: NaiveDate) -> Self {
        let days = days_until(due, today);
        if days < 0 {
            DueCountdown::Overdue(-days)
        } else if days == 0 {
            DueCountdown::DueToday
        } else {
            DueCountdown::Remaining(days)
        }
    }

    pub fn bucket(self) -> DueBucket {
        match self {
            DueCountdown::Overdue(_) => DueBucket::Overdue,
            DueCountdown::DueToday => DueBucket::DueToday,
            DueCountdown::Remaining(_) => DueBucket::Upcoming,
        }
    }
}

impl fmt::Display for DueCountdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DueCountdown::Overdue(days) => write!(f, "{days} days overdue"),
            DueCountdown::DueToday => f.write_str("Due today"),
            DueCountdown::Remaining(days) => write!(f, "{days} days"),
        }
    }
}

/// Placeholder rendered when a guest has no usable due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingDueLabel {
    #[default]
    NotAvailable,
    Blank,
}

impl MissingDueLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            MissingDueLabel::NotAvailable => "N/A",
            MissingDueLabel::Blank => "",
        }
    }
}

pub fn days_label(due: Option<NaiveDate>, today: NaiveDate, missing: MissingDueLabel) -> String {
    match due {
        Some(due) => DueCountdown::between(due, today).to_string(),
        None => missing.as_str().to_string(),
    }
}

/// Search bucket a due date falls into relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueBucket {
    Overdue,
    DueToday,
    Upcoming,
}

impl DueBucket {
    pub fn of(due: Option<NaiveDate>, today: NaiveDate) -> Option<Self> {
        due.map(|due| DueCountdown::between(due, today).bucket())
    }

    pub fn keyword(self) -> &'static str {
        match self {
            DueBucket::Overdue => "overdue",
            DueBucket::DueToday => "due today",
            DueBucket::Upcoming => "future",
        }
    }
}

/// The one rule for automatic breaches.
///
/// Returns the new status when a guest whose due date lies strictly before
/// `today` is still neither `Paid` nor `Breached`. Anything else stays as is,
/// so a breached guest is only released by an explicit status change.
pub fn breach_transition(
    status: PaymentStatus,
    due: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<PaymentStatus> {
    let due = due?;
    if due >= today {
        return None;
    }
    match status {
        PaymentStatus::Paid | PaymentStatus::Breached => None,
        PaymentStatus::Pending | PaymentStatus::PartialPaid => Some(PaymentStatus::Breached),
    }
}
