use chrono::NaiveDate;
use uuid::Uuid;

use crate::billing::{self, MissingDueLabel};
use crate::core::manager::PropertyManager;
use crate::domain::{Guest, PaymentStatus};

const UPCOMING_LIMIT: usize = 10;

/// Head counts by payment status. Pending includes partial payments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusTotals {
    pub total: usize,
    pub paid: usize,
    pub pending: usize,
    pub breached: usize,
}

impl StatusTotals {
    pub fn tally<'a>(guests: impl IntoIterator<Item = &'a Guest>) -> Self {
        let mut totals = Self::default();
        for guest in guests {
            totals.total += 1;
            match guest.monthly_payment_status {
                PaymentStatus::Paid => totals.paid += 1,
                PaymentStatus::Pending | PaymentStatus::PartialPaid => totals.pending += 1,
                PaymentStatus::Breached => totals.breached += 1,
            }
        }
        totals
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpcomingPayment {
    pub guest_id: Uuid,
    pub name: String,
    pub building: String,
    pub room_no: String,
    pub status: PaymentStatus,
    pub due: NaiveDate,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub totals: StatusTotals,
    pub buildings: Vec<(String, StatusTotals)>,
    pub upcoming: Vec<UpcomingPayment>,
}

pub struct SummaryService;

impl SummaryService {
    /// Dashboard over active guests of the cached snapshot.
    pub fn dashboard(manager: &PropertyManager) -> Dashboard {
        Self::build(
            manager.guests(),
            &manager.config().building_names(),
            manager.today(),
            manager.config().missing_due_label,
        )
    }

    pub fn build(
        guests: &[Guest],
        buildings: &[&str],
        today: NaiveDate,
        missing: MissingDueLabel,
    ) -> Dashboard {
        let active: Vec<&Guest> = guests.iter().filter(|guest| guest.is_active()).collect();
        let totals = StatusTotals::tally(active.iter().copied());
        let buildings = buildings
            .iter()
            .map(|name| {
                let in_building = active.iter().copied().filter(|guest| guest.building == *name);
                (name.to_string(), StatusTotals::tally(in_building))
            })
            .collect();

        let mut dated: Vec<(&Guest, NaiveDate)> = active
            .iter()
            .filter_map(|guest| guest.upcoming_payment_due_date.map(|due| (*guest, due)))
            .collect();
        dated.sort_by_key(|(_, due)| *due);
        let upcoming = dated
            .into_iter()
            .take(UPCOMING_LIMIT)
            .map(|(guest, due)| UpcomingPayment {
                guest_id: guest.id,
                name: guest.name.clone(),
                building: guest.building.clone(),
                room_no: guest.room_no.clone(),
                status: guest.monthly_payment_status,
                due,
                label: billing::days_label(Some(due), today, missing),
            })
            .collect();

        Dashboard {
            totals,
            buildings,
            upcoming,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CapacityCell, GuestDraft, SharingType, VacateFlag};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn guest(building: &str, joined: NaiveDate, status: PaymentStatus) -> Guest {
        let cell = CapacityCell::new(building, "101", SharingType::Three);
        let mut guest = Guest::from_draft(GuestDraft::new("G", "1", cell, joined));
        guest.monthly_payment_status = status;
        guest
    }

    #[test]
    fn dashboard_counts_only_active_guests() {
        let mut gone = guest("Building-1", date(2024, 1, 1), PaymentStatus::Paid);
        gone.room_vacate = VacateFlag::Yes;
        let guests = vec![
            guest("Building-1", date(2024, 1, 5), PaymentStatus::Paid),
            guest("Building-1", date(2024, 1, 9), PaymentStatus::PartialPaid),
            guest("Building-2", date(2024, 1, 2), PaymentStatus::Breached),
            gone,
        ];
        let dashboard = SummaryService::build(
            &guests,
            &["Building-1", "Building-2"],
            date(2024, 2, 3),
            MissingDueLabel::NotAvailable,
        );
        assert_eq!(
            dashboard.totals,
            StatusTotals {
                total: 3,
                paid: 1,
                pending: 1,
                breached: 1
            }
        );
        assert_eq!(dashboard.buildings[0].1.total, 2);
        assert_eq!(dashboard.buildings[1].1.breached, 1);

        let labels: Vec<&str> = dashboard.upcoming.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["1 days overdue", "2 days", "6 days"]);
    }
}
