use crate::capacity::{self, CapacityDelta, CapacityRefusal, RoomStatus};
use crate::core::manager::PropertyManager;
use crate::core::services::{ServiceError, ServiceResult};
use crate::domain::{CapacityCell, CapacityRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityOutcome {
    Applied { capacity: u8 },
    Refused(CapacityRefusal),
}

pub struct CapacityService;

impl CapacityService {
    /// Adds or removes one bed in a cell.
    ///
    /// Sequence: fetch, plan, conditional write, then install the fetched
    /// snapshot with the new value. A refused plan or a failed write leaves
    /// the cached snapshot untouched.
    pub fn change(
        manager: &mut PropertyManager,
        cell: &CapacityCell,
        delta: CapacityDelta,
    ) -> ServiceResult<CapacityOutcome> {
        if !manager.config().is_known_room(&cell.building, &cell.room_no) {
            return Err(ServiceError::Invalid(format!(
                "unknown room {} in {}",
                cell.room_no, cell.building
            )));
        }
        let (guests, mut ledger) = manager.fetch_snapshot()?;
        let capacity = match ledger.plan(&guests, cell, delta) {
            Ok(capacity) => capacity,
            Err(reason) => {
                tracing::info!(cell = %cell, reason = %reason, "capacity change refused");
                return Ok(CapacityOutcome::Refused(reason));
            }
        };

        let row = CapacityRow::new(cell, capacity);
        manager.storage().upsert(&row, ledger.stored_override(cell))?;
        ledger.commit(&row);
        manager.install(guests, ledger);
        tracing::info!(cell = %cell, capacity, "capacity updated");
        Ok(CapacityOutcome::Applied { capacity })
    }

    /// Bed grid for every configured room of `building`, from the cache.
    pub fn room_status(manager: &PropertyManager, building: &str) -> ServiceResult<Vec<RoomStatus>> {
        let rooms = manager
            .config()
            .rooms_for(building)
            .ok_or_else(|| ServiceError::Invalid(format!("unknown building `{building}`")))?;
        Ok(capacity::room_status(
            manager.guests(),
            manager.ledger(),
            building,
            rooms,
        ))
    }
}
