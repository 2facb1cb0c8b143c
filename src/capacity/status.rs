use std::fmt;

use super::ledger::{occupancy_count, CapacityLedger};
use crate::domain::{CapacityCell, Guest, SharingType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    Vacant,
    Partial,
    Full,
}

impl Occupancy {
    pub fn classify(occupied: usize, capacity: u8) -> Self {
        if occupied == 0 {
            Occupancy::Vacant
        } else if occupied >= usize::from(capacity) {
            Occupancy::Full
        } else {
            Occupancy::Partial
        }
    }
}

impl fmt::Display for Occupancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Occupancy::Vacant => "Vacant",
            Occupancy::Partial => "Partial",
            Occupancy::Full => "Full",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BedSlot {
    Occupied(String),
    Free,
}

#[derive(Debug, Clone)]
pub struct SharingStatus {
    pub sharing_type: SharingType,
    pub capacity: u8,
    pub occupied: usize,
    pub beds: Vec<BedSlot>,
}

impl SharingStatus {
    pub fn occupancy(&self) -> Occupancy {
        Occupancy::classify(self.occupied, self.capacity)
    }
}

#[derive(Debug, Clone)]
pub struct RoomStatus {
    pub building: String,
    pub room_no: String,
    pub sharing: Vec<SharingStatus>,
}

impl RoomStatus {
    pub fn occupied(&self) -> usize {
        self.sharing.iter().map(|cell| cell.occupied).sum()
    }

    pub fn capacity(&self) -> usize {
        self.sharing.iter().map(|cell| usize::from(cell.capacity)).sum()
    }
}

/// Bed grid for the given rooms of one building.
pub fn room_status(
    guests: &[Guest],
    ledger: &CapacityLedger,
    building: &str,
    rooms: &[String],
) -> Vec<RoomStatus> {
    rooms
        .iter()
        .map(|room_no| {
            let sharing = SharingType::ALL
                .iter()
                .map(|&sharing_type| {
                    let cell = CapacityCell::new(building, room_no.as_str(), sharing_type);
                    sharing_status(guests, ledger, &cell)
                })
                .collect();
            RoomStatus {
                building: building.to_string(),
                room_no: room_no.clone(),
                sharing,
            }
        })
        .collect()
}

fn sharing_status(guests: &[Guest], ledger: &CapacityLedger, cell: &CapacityCell) -> SharingStatus {
    let capacity = ledger.capacity(cell);
    let occupied = occupancy_count(guests, cell, None);
    let mut beds: Vec<BedSlot> = guests
        .iter()
        .filter(|guest| guest.is_active() && cell.contains(guest))
        .map(|guest| BedSlot::Occupied(guest.name.clone()))
        .collect();
    while beds.len() < usize::from(capacity) {
        beds.push(BedSlot::Free);
    }
    SharingStatus {
        sharing_type: cell.sharing_type,
        capacity,
        occupied,
        beds,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{CapacityMap, GuestDraft};

    #[test]
    fn grid_reports_bed_slots_per_sharing_type() {
        let two = CapacityCell::new("Building-1", "G01", SharingType::Two);
        let mut defaults = CapacityMap::new();
        for sharing_type in SharingType::ALL {
            let cell = CapacityCell::new("Building-1", "G01", sharing_type);
            defaults.set(&cell, sharing_type.default_beds());
        }
        let ledger = CapacityLedger::new(defaults, &[]);
        let joining = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let guests = vec![Guest::from_draft(GuestDraft::new("Asha", "9", two, joining))];

        let grid = room_status(&guests, &ledger, "Building-1", &["G01".to_string()]);
        assert_eq!(grid.len(), 1);
        let room = &grid[0];
        assert_eq!(room.capacity(), 6);
        assert_eq!(room.occupied(), 1);

        let statuses: Vec<Occupancy> = room.sharing.iter().map(SharingStatus::occupancy).collect();
        assert_eq!(statuses, vec![Occupancy::Vacant, Occupancy::Partial, Occupancy::Vacant]);
        assert_eq!(
            room.sharing[1].beds,
            vec![BedSlot::Occupied("Asha".into()), BedSlot::Free]
        );
    }
}
