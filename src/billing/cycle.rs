use chrono::{Datelike, Duration, NaiveDate};

/// Next payment due date for a guest.
///
/// The cycle day is the day-of-month of `joining`. The base is `reference`
/// (the last recorded payment) or `joining` when no payment is recorded.
/// The result lands in the calendar month after the base, on the cycle day
/// clamped to that month's length, so a 31st joiner is due on the 29th of a
/// leap February.
pub fn compute_next_due_date(joining: NaiveDate, reference: Option<NaiveDate>) -> Option<NaiveDate> {
    let cycle_day = joining.day();
    let base = reference.unwrap_or(joining);
    let (year, month) = next_month(base.year(), base.month());
    let day = cycle_day.min(days_in_month(year, month)?);
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Whole days from `today` to `due`; negative when the date has passed.
pub fn days_until(due: NaiveDate, today: NaiveDate) -> i64 {
    (due - today).num_days()
}

pub(crate) fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

pub(crate) fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = next_month(year, month);
    let first_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;
    Some((first_next - Duration::days(1)).day())
}
