//! Guest registration, edits, payments and search.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::billing::{self, DueBucket};
use crate::capacity::Admission;
use crate::core::manager::PropertyManager;
use crate::core::services::{ServiceError, ServiceResult};
use crate::domain::{CapacityCell, Guest, GuestDraft, GuestPatch, PaymentStatus, VacateFlag};

/// Narrows the cached guest list for display.
#[derive(Debug, Clone, Default)]
pub struct GuestFilter {
    pub building: Option<String>,
    pub query: Option<String>,
    pub include_vacated: bool,
}

impl GuestFilter {
    pub fn search(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    fn matches(&self, guest: &Guest, today: NaiveDate) -> bool {
        if !self.include_vacated && !guest.is_active() {
            return false;
        }
        if let Some(building) = self.building.as_deref() {
            if guest.building != building {
                return false;
            }
        }
        let Some(query) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
            return true;
        };
        let query = query.to_lowercase();
        let fields = [
            guest.name.to_lowercase(),
            guest.mobile.to_lowercase(),
            guest.room_no.to_lowercase(),
            guest.monthly_payment_status.label().to_lowercase(),
        ];
        if fields.iter().any(|field| field.contains(&query)) {
            return true;
        }
        DueBucket::of(guest.upcoming_payment_due_date, today)
            .is_some_and(|bucket| bucket.keyword().contains(&query))
    }
}

pub struct GuestService;

impl GuestService {
    /// Registers a guest after an authoritative admission check against fresh data.
    pub fn register(manager: &mut PropertyManager, draft: GuestDraft) -> ServiceResult<Guest> {
        Self::validate_draft(manager, &draft)?;
        let cell = draft.cell();
        Self::ensure_admissible(manager, &cell, None)?;

        let guest = Guest::from_draft(draft);
        manager.storage().create(&guest)?;
        tracing::info!(guest = %guest.id, cell = %cell, "guest registered");
        manager.upsert_cached(guest.clone());
        Ok(guest)
    }

    /// Applies a partial update. Placement changes are re-checked against
    /// capacity with the guest's own record excluded; cycle changes
    /// recompute the due date.
    pub fn edit(manager: &mut PropertyManager, id: Uuid, patch: GuestPatch) -> ServiceResult<Guest> {
        if patch.is_empty() {
            return Err(ServiceError::Invalid("nothing to update".into()));
        }
        let current = manager
            .storage()
            .get(id)?
            .ok_or(ServiceError::NotFound(id))?;
        let mut preview = current.clone();
        patch.apply(&mut preview);
        if preview.name.is_empty() {
            return Err(ServiceError::Invalid("guest name is required".into()));
        }
        if patch.changes_placement(&current) {
            if !manager.config().is_known_room(&preview.building, &preview.room_no) {
                return Err(ServiceError::Invalid(format!(
                    "unknown room {} in {}",
                    preview.room_no, preview.building
                )));
            }
            if preview.is_active() {
                Self::ensure_admissible(manager, &preview.cell(), Some(id))?;
            }
        }

        let mut patch = patch;
        if patch.changes_cycle() {
            preview.refresh_due_date();
            patch.upcoming_payment_due_date = preview.upcoming_payment_due_date;
        }
        let updated = manager.storage().update(id, &patch)?;
        tracing::info!(guest = %id, "guest updated");
        manager.upsert_cached(updated.clone());
        Ok(updated)
    }

    /// Records a payment on `date`, moving the next due date forward.
    pub fn record_payment(
        manager: &mut PropertyManager,
        id: Uuid,
        date: NaiveDate,
        status: PaymentStatus,
        amount: Option<f64>,
    ) -> ServiceResult<Guest> {
        if !matches!(status, PaymentStatus::Paid | PaymentStatus::PartialPaid) {
            return Err(ServiceError::Invalid(format!(
                "a payment must be Paid or Partial Paid, not {status}"
            )));
        }
        if amount.is_some_and(|value| value < 0.0) {
            return Err(ServiceError::Invalid("payment amount cannot be negative".into()));
        }
        let patch = GuestPatch {
            monthly_payment_date: Some(date),
            monthly_payment_status: Some(status),
            payment_amount: amount,
            ..GuestPatch::default()
        };
        Self::edit(manager, id, patch)
    }

    pub fn vacate(manager: &mut PropertyManager, id: Uuid) -> ServiceResult<Guest> {
        let guest = manager
            .storage()
            .get(id)?
            .ok_or(ServiceError::NotFound(id))?;
        if !guest.is_active() {
            return Err(ServiceError::Invalid(format!("{} has already vacated", guest.name)));
        }
        let patch = GuestPatch {
            room_vacate: Some(VacateFlag::Yes),
            ..GuestPatch::default()
        };
        let updated = manager.storage().update(id, &patch)?;
        tracing::info!(guest = %id, cell = %updated.cell(), "guest vacated");
        manager.upsert_cached(updated.clone());
        Ok(updated)
    }

    pub fn delete(manager: &mut PropertyManager, id: Uuid) -> ServiceResult<()> {
        manager.storage().delete(id).map_err(|err| match err {
            crate::errors::PgError::GuestNotFound(id) => ServiceError::NotFound(id),
            other => ServiceError::Core(other),
        })?;
        tracing::info!(guest = %id, "guest deleted");
        manager.remove_cached(id);
        Ok(())
    }

    /// Cached guests matching `filter`, ordered by building, room and name.
    pub fn list<'a>(manager: &'a PropertyManager, filter: &GuestFilter) -> Vec<&'a Guest> {
        let today = manager.today();
        let mut guests: Vec<&Guest> = manager
            .guests()
            .iter()
            .filter(|guest| filter.matches(guest, today))
            .collect();
        guests.sort_by(|a, b| {
            (&a.building, &a.room_no, &a.name).cmp(&(&b.building, &b.room_no, &b.name))
        });
        guests
    }

    /// Resolves a guest by full id or by a unique prefix of its short id.
    pub fn find<'a>(manager: &'a PropertyManager, key: &str) -> ServiceResult<&'a Guest> {
        if let Ok(id) = Uuid::parse_str(key) {
            return manager.guest(id).ok_or(ServiceError::NotFound(id));
        }
        let key = key.trim().to_lowercase();
        if key.is_empty() {
            return Err(ServiceError::Invalid("guest id is required".into()));
        }
        let matches: Vec<&Guest> = manager
            .guests()
            .iter()
            .filter(|guest| guest.id.simple().to_string().starts_with(&key))
            .collect();
        match matches.as_slice() {
            [guest] => Ok(*guest),
            [] => Err(ServiceError::Invalid(format!("no guest with id `{key}`"))),
            _ => Err(ServiceError::Invalid(format!("guest id `{key}` is ambiguous"))),
        }
    }

    /// Live check against the cached snapshot, for selection feedback only.
    pub fn preview_admission(
        manager: &PropertyManager,
        cell: &CapacityCell,
        exclude: Option<Uuid>,
    ) -> Admission {
        manager.ledger().admission(manager.guests(), cell, exclude)
    }

    pub fn days_label(manager: &PropertyManager, guest: &Guest) -> String {
        billing::days_label(
            guest.upcoming_payment_due_date,
            manager.today(),
            manager.config().missing_due_label,
        )
    }

    fn validate_draft(manager: &PropertyManager, draft: &GuestDraft) -> ServiceResult<()> {
        if draft.name.trim().is_empty() {
            return Err(ServiceError::Invalid("guest name is required".into()));
        }
        if draft.mobile.trim().is_empty() {
            return Err(ServiceError::Invalid("mobile number is required".into()));
        }
        if manager.config().rooms_for(draft.building.trim()).is_none() {
            return Err(ServiceError::Invalid(format!(
                "unknown building `{}`",
                draft.building
            )));
        }
        if !manager
            .config()
            .is_known_room(draft.building.trim(), draft.room_no.trim())
        {
            return Err(ServiceError::Invalid(format!(
                "unknown room {} in {}",
                draft.room_no, draft.building
            )));
        }
        if draft.advance_payment < 0.0 || draft.payment_amount < 0.0 {
            return Err(ServiceError::Invalid("amounts cannot be negative".into()));
        }
        Ok(())
    }

    fn ensure_admissible(
        manager: &PropertyManager,
        cell: &CapacityCell,
        exclude: Option<Uuid>,
    ) -> ServiceResult<()> {
        let (guests, ledger) = manager.fetch_snapshot()?;
        match ledger.admission(&guests, cell, exclude) {
            Admission::Admitted { last_bed, .. } => {
                if last_bed {
                    tracing::info!(cell = %cell, "admitting into the last free bed");
                }
                Ok(())
            }
            Admission::Refused { occupied, capacity } => Err(ServiceError::RoomFull {
                cell: cell.clone(),
                occupied,
                capacity,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SharingType;

    fn guest_named(name: &str, room: &str) -> Guest {
        let cell = CapacityCell::new("Building-1", room, SharingType::Two);
        let joining = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        Guest::from_draft(GuestDraft::new(name, "98450 12345", cell, joining))
    }

    #[test]
    fn filter_searches_name_mobile_room_and_status() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();
        let guest = guest_named("Kiran Rao", "203");
        assert!(GuestFilter::search("kiran").matches(&guest, today));
        assert!(GuestFilter::search("12345").matches(&guest, today));
        assert!(GuestFilter::search("203").matches(&guest, today));
        assert!(GuestFilter::search("pending").matches(&guest, today));
        assert!(GuestFilter::search("future").matches(&guest, today));
        assert!(!GuestFilter::search("overdue").matches(&guest, today));
        assert!(!GuestFilter::search("breached").matches(&guest, today));
    }

    #[test]
    fn filter_hides_vacated_unless_requested() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();
        let mut guest = guest_named("Meena", "101");
        guest.room_vacate = VacateFlag::Yes;
        assert!(!GuestFilter::default().matches(&guest, today));
        let filter = GuestFilter {
            include_vacated: true,
            building: Some("Building-1".into()),
            ..GuestFilter::default()
        };
        assert!(filter.matches(&guest, today));
    }
}
