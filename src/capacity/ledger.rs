use thiserror::Error;
use uuid::Uuid;

use crate::domain::{CapacityCell, CapacityMap, CapacityRow, Guest, SharingType, MAX_BEDS};

/// Active guests assigned to `cell`, skipping `exclude` when given.
pub fn occupancy_count(guests: &[Guest], cell: &CapacityCell, exclude: Option<Uuid>) -> usize {
    guests
        .iter()
        .filter(|guest| guest.is_active())
        .filter(|guest| Some(guest.id) != exclude)
        .filter(|guest| cell.contains(guest))
        .count()
}

/// Answer to "can one more guest go into this cell?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted {
        occupied: usize,
        capacity: u8,
        /// Advisory: this admission takes the final bed.
        last_bed: bool,
    },
    Refused {
        occupied: usize,
        capacity: u8,
    },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }

    pub fn occupied(&self) -> usize {
        match self {
            Admission::Admitted { occupied, .. } | Admission::Refused { occupied, .. } => *occupied,
        }
    }

    pub fn capacity(&self) -> u8 {
        match self {
            Admission::Admitted { capacity, .. } | Admission::Refused { capacity, .. } => *capacity,
        }
    }
}

pub fn can_admit(
    guests: &[Guest],
    cell: &CapacityCell,
    capacity: &CapacityMap,
    exclude: Option<Uuid>,
) -> Admission {
    let max = capacity.capacity_or_fallback(cell);
    let occupied = occupancy_count(guests, cell, exclude);
    if occupied < usize::from(max) {
        Admission::Admitted {
            occupied,
            capacity: max,
            last_bed: occupied + 1 == usize::from(max),
        }
    } else {
        Admission::Refused {
            occupied,
            capacity: max,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityDelta {
    Increase,
    Decrease,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CapacityRefusal {
    #[error("already at the maximum of {MAX_BEDS} beds")]
    AtMaximum,
    #[error("{sharing_type} rooms need at least {minimum} beds")]
    BelowMinimum {
        sharing_type: SharingType,
        minimum: u8,
    },
    #[error("{occupied} beds are occupied; vacate a guest first")]
    BelowOccupancy { occupied: usize },
}

/// Plans a one-bed change of a cell.
///
/// Checks run in a fixed order (maximum, then minimum, then occupancy) and
/// the first failing bound is reported. An unset cell counts as one bed.
pub fn plan_capacity_change(
    current: Option<u8>,
    sharing_type: SharingType,
    delta: CapacityDelta,
    occupied: usize,
) -> Result<u8, CapacityRefusal> {
    let current = current.unwrap_or(crate::domain::FALLBACK_CAPACITY);
    match delta {
        CapacityDelta::Increase => {
            if current >= MAX_BEDS {
                return Err(CapacityRefusal::AtMaximum);
            }
            Ok(current + 1)
        }
        CapacityDelta::Decrease => {
            let minimum = sharing_type.minimum_beds();
            if current <= minimum {
                return Err(CapacityRefusal::BelowMinimum {
                    sharing_type,
                    minimum,
                });
            }
            let next = current - 1;
            if usize::from(next) < occupied {
                return Err(CapacityRefusal::BelowOccupancy { occupied });
            }
            Ok(next)
        }
    }
}

/// Effective capacity of every cell: static defaults overlaid with the
/// stored overrides. Always replaced wholesale on reload.
#[derive(Debug, Clone, Default)]
pub struct CapacityLedger {
    effective: CapacityMap,
    overrides: CapacityMap,
}

impl CapacityLedger {
    pub fn new(defaults: CapacityMap, rows: &[CapacityRow]) -> Self {
        let overrides = CapacityMap::from_rows(rows);
        let mut effective = defaults;
        effective.overlay(&overrides);
        Self {
            effective,
            overrides,
        }
    }

    pub fn map(&self) -> &CapacityMap {
        &self.effective
    }

    pub fn capacity(&self, cell: &CapacityCell) -> u8 {
        self.effective.capacity_or_fallback(cell)
    }

    /// Stored override for the cell, if any. Used as the expected value of a
    /// compare-and-set write.
    pub fn stored_override(&self, cell: &CapacityCell) -> Option<u8> {
        self.overrides.get(cell)
    }

    pub fn admission(&self, guests: &[Guest], cell: &CapacityCell, exclude: Option<Uuid>) -> Admission {
        can_admit(guests, cell, &self.effective, exclude)
    }

    pub fn plan(
        &self,
        guests: &[Guest],
        cell: &CapacityCell,
        delta: CapacityDelta,
    ) -> Result<u8, CapacityRefusal> {
        let occupied = occupancy_count(guests, cell, None);
        plan_capacity_change(self.effective.get(cell), cell.sharing_type, delta, occupied)
    }

    /// Records a write that the store has already accepted.
    pub fn commit(&mut self, row: &CapacityRow) {
        let cell = row.cell();
        self.overrides.set(&cell, row.capacity);
        self.effective.set(&cell, row.capacity);
    }
}
