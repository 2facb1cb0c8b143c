//! Revenue statistics keyed on each guest's last payment date.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};

use crate::core::manager::PropertyManager;
use crate::core::services::{ServiceError, ServiceResult};
use crate::domain::{Guest, PaymentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    Month { year: i32, month: u32 },
    Range { from: NaiveDate, to: NaiveDate },
    All,
}

impl ReportPeriod {
    pub fn month(year: i32, month: u32) -> ServiceResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(ServiceError::Invalid(format!("month {month} is out of range")));
        }
        Ok(ReportPeriod::Month { year, month })
    }

    pub fn range(from: NaiveDate, to: NaiveDate) -> ServiceResult<Self> {
        if to < from {
            return Err(ServiceError::Invalid(format!(
                "range end {to} is before its start {from}"
            )));
        }
        Ok(ReportPeriod::Range { from, to })
    }

    /// `All` covers every guest; the dated periods only guests with a payment inside them.
    fn includes(&self, guest: &Guest) -> bool {
        let paid_on = guest.monthly_payment_date;
        match *self {
            ReportPeriod::All => true,
            ReportPeriod::Month { year, month } => {
                paid_on.is_some_and(|date| date.year() == year && date.month() == month)
            }
            ReportPeriod::Range { from, to } => {
                paid_on.is_some_and(|date| date >= from && date <= to)
            }
        }
    }

    pub fn title(&self) -> String {
        match self {
            ReportPeriod::Month { year, month } => format!("{year}-{month:02}"),
            ReportPeriod::Range { from, to } => format!("{from} to {to}"),
            ReportPeriod::All => "All Guests".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportStats {
    pub guests: usize,
    pub paid: usize,
    pub pending: usize,
    pub breached: usize,
    pub total_revenue: f64,
    pub collected_revenue: f64,
    pub pending_revenue: f64,
    /// Percentage of revenue collected, 0 when there is no revenue.
    pub collection_rate: f64,
    pub vacated: usize,
}

impl ReportStats {
    pub fn compute<'a>(guests: impl IntoIterator<Item = &'a Guest>) -> Self {
        let mut stats = Self::default();
        for guest in guests {
            stats.guests += 1;
            stats.total_revenue += guest.payment_amount;
            match guest.monthly_payment_status {
                PaymentStatus::Paid => {
                    stats.paid += 1;
                    stats.collected_revenue += guest.payment_amount;
                }
                PaymentStatus::Pending | PaymentStatus::PartialPaid => stats.pending += 1,
                PaymentStatus::Breached => stats.breached += 1,
            }
            if guest.room_vacate.is_vacated() {
                stats.vacated += 1;
            }
        }
        stats.pending_revenue = stats.total_revenue - stats.collected_revenue;
        if stats.total_revenue > 0.0 {
            let rate = stats.collected_revenue / stats.total_revenue * 100.0;
            stats.collection_rate = (rate * 100.0).round() / 100.0;
        }
        stats
    }
}

#[derive(Debug, Clone)]
pub struct Report<'a> {
    pub period: ReportPeriod,
    pub building: Option<String>,
    pub stats: ReportStats,
    pub guests: Vec<&'a Guest>,
}

pub struct ReportService;

impl ReportService {
    pub fn generate<'a>(
        guests: &'a [Guest],
        period: ReportPeriod,
        building: Option<&str>,
    ) -> Report<'a> {
        let selected: Vec<&Guest> = guests
            .iter()
            .filter(|guest| building.map_or(true, |name| guest.building == name))
            .filter(|guest| period.includes(guest))
            .collect();
        Report {
            period,
            building: building.map(str::to_string),
            stats: ReportStats::compute(selected.iter().copied()),
            guests: selected,
        }
    }

    pub fn monthly<'a>(
        manager: &'a PropertyManager,
        year: i32,
        month: u32,
        building: Option<&str>,
    ) -> ServiceResult<Report<'a>> {
        let period = ReportPeriod::month(year, month)?;
        Ok(Self::generate(manager.guests(), period, building))
    }

    pub fn range<'a>(
        manager: &'a PropertyManager,
        from: NaiveDate,
        to: NaiveDate,
        building: Option<&str>,
    ) -> ServiceResult<Report<'a>> {
        let period = ReportPeriod::range(from, to)?;
        Ok(Self::generate(manager.guests(), period, building))
    }

    pub fn all<'a>(manager: &'a PropertyManager, building: Option<&str>) -> Report<'a> {
        Self::generate(manager.guests(), ReportPeriod::All, building)
    }

    /// One row per month that has at least one recorded payment, oldest first.
    pub fn monthly_comparison(guests: &[Guest], building: Option<&str>) -> Vec<(String, ReportStats)> {
        let months: BTreeSet<(i32, u32)> = guests
            .iter()
            .filter_map(|guest| guest.monthly_payment_date)
            .map(|date| (date.year(), date.month()))
            .collect();
        months
            .into_iter()
            .map(|(year, month)| {
                let period = ReportPeriod::Month { year, month };
                let report = Self::generate(guests, period, building);
                (period.title(), report.stats)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CapacityCell, GuestDraft, SharingType, VacateFlag};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn paid_guest(paid_on: Option<NaiveDate>, amount: f64, status: PaymentStatus) -> Guest {
        let cell = CapacityCell::new("Building-1", "102", SharingType::Two);
        let mut guest = Guest::from_draft(GuestDraft::new("R", "2", cell, date(2024, 1, 3)));
        guest.monthly_payment_date = paid_on;
        guest.payment_amount = amount;
        guest.monthly_payment_status = status;
        guest
    }

    #[test]
    fn stats_split_collected_and_pending_revenue() {
        let mut vacated = paid_guest(Some(date(2024, 3, 2)), 1000.0, PaymentStatus::Paid);
        vacated.room_vacate = VacateFlag::Yes;
        let guests = vec![
            paid_guest(Some(date(2024, 3, 5)), 6000.0, PaymentStatus::Paid),
            paid_guest(Some(date(2024, 3, 9)), 3000.0, PaymentStatus::PartialPaid),
            paid_guest(Some(date(2024, 4, 1)), 5000.0, PaymentStatus::Paid),
            paid_guest(None, 4000.0, PaymentStatus::Pending),
            vacated,
        ];
        let march = ReportService::generate(&guests, ReportPeriod::Month { year: 2024, month: 3 }, None);
        assert_eq!(march.stats.guests, 3);
        assert_eq!(march.stats.collected_revenue, 7000.0);
        assert_eq!(march.stats.pending_revenue, 3000.0);
        assert_eq!(march.stats.collection_rate, 70.0);
        assert_eq!(march.stats.vacated, 1);

        let all = ReportService::generate(&guests, ReportPeriod::All, Some("Building-1"));
        assert_eq!(all.stats.guests, 5);

        let comparison = ReportService::monthly_comparison(&guests, None);
        let months: Vec<&str> = comparison.iter().map(|(month, _)| month.as_str()).collect();
        assert_eq!(months, vec!["2024-03", "2024-04"]);
    }

    #[test]
    fn range_is_inclusive_and_validated() {
        let guests = vec![paid_guest(Some(date(2024, 5, 31)), 100.0, PaymentStatus::Paid)];
        let period = ReportPeriod::range(date(2024, 5, 1), date(2024, 5, 31)).unwrap();
        assert_eq!(ReportService::generate(&guests, period, None).stats.guests, 1);
        assert!(ReportPeriod::range(date(2024, 6, 1), date(2024, 5, 1)).is_err());
        assert!(ReportPeriod::month(2024, 13).is_err());
    }

    #[test]
    fn empty_revenue_has_zero_rate() {
        let stats = ReportStats::compute(std::iter::empty());
        assert_eq!(stats.collection_rate, 0.0);
    }
}
