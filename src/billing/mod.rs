//! Payment-cycle arithmetic: next due dates, countdown labels and the
//! automatic breach rule. Every function here is pure.

mod cycle;
mod status;

pub use cycle::{compute_next_due_date, days_until};
pub use status::{breach_transition, days_label, DueBucket, DueCountdown, MissingDueLabel};
