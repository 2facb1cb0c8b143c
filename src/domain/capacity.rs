use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use super::guest::{Guest, SharingType};

/// Hard ceiling on beds in any (building, room, sharing type) cell.
pub const MAX_BEDS: u8 = 5;

/// Capacity assumed for a cell missing from every source.
pub const FALLBACK_CAPACITY: u8 = 1;

/// Identifies one capacity cell: a sharing type inside a room of a building.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityCell {
    pub building: String,
    pub room_no: String,
    pub sharing_type: SharingType,
}

impl CapacityCell {
    pub fn new(
        building: impl Into<String>,
        room_no: impl Into<String>,
        sharing_type: SharingType,
    ) -> Self {
        Self {
            building: building.into(),
            room_no: room_no.into(),
            sharing_type,
        }
    }

    /// True when the guest is assigned to this cell, vacated or not.
    pub fn contains(&self, guest: &Guest) -> bool {
        guest.building == self.building
            && guest.room_no == self.room_no
            && guest.sharing_type == self.sharing_type
    }
}

impl fmt::Display for CapacityCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.building, self.room_no, self.sharing_type)
    }
}

/// Flat row shape exchanged with the capacity store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityRow {
    pub building: String,
    pub room_no: String,
    pub sharing_type: SharingType,
    pub capacity: u8,
}

impl CapacityRow {
    pub fn new(cell: &CapacityCell, capacity: u8) -> Self {
        Self {
            building: cell.building.clone(),
            room_no: cell.room_no.clone(),
            sharing_type: cell.sharing_type,
            capacity,
        }
    }

    pub fn cell(&self) -> CapacityCell {
        CapacityCell::new(self.building.clone(), self.room_no.clone(), self.sharing_type)
    }
}

type RoomCells = BTreeMap<SharingType, u8>;

/// building → room → sharing type → bed count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapacityMap {
    buildings: BTreeMap<String, BTreeMap<String, RoomCells>>,
}

impl CapacityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a CapacityRow>) -> Self {
        let mut map = Self::new();
        for row in rows {
            map.set(&row.cell(), row.capacity);
        }
        map
    }

    pub fn to_rows(&self) -> Vec<CapacityRow> {
        let mut rows = Vec::new();
        for (building, rooms) in &self.buildings {
            for (room_no, cells) in rooms {
                for (sharing_type, capacity) in cells {
                    rows.push(CapacityRow {
                        building: building.clone(),
                        room_no: room_no.clone(),
                        sharing_type: *sharing_type,
                        capacity: *capacity,
                    });
                }
            }
        }
        rows
    }

    pub fn get(&self, cell: &CapacityCell) -> Option<u8> {
        self.buildings
            .get(&cell.building)?
            .get(&cell.room_no)?
            .get(&cell.sharing_type)
            .copied()
    }

    /// Capacity of the cell, or [`FALLBACK_CAPACITY`] when it is unknown.
    pub fn capacity_or_fallback(&self, cell: &CapacityCell) -> u8 {
        self.get(cell).unwrap_or(FALLBACK_CAPACITY)
    }

    pub fn set(&mut self, cell: &CapacityCell, capacity: u8) {
        self.buildings
            .entry(cell.building.clone())
            .or_default()
            .entry(cell.room_no.clone())
            .or_default()
            .insert(cell.sharing_type, capacity);
    }

    /// Overlays every cell of `overrides` on top of this map.
    pub fn overlay(&mut self, overrides: &CapacityMap) {
        for row in overrides.to_rows() {
            self.set(&row.cell(), row.capacity);
        }
    }

    pub fn rooms(&self, building: &str) -> Vec<&str> {
        self.buildings
            .get(building)
            .map(|rooms| rooms.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.buildings
            .values()
            .flat_map(|rooms| rooms.values())
            .map(|cells| cells.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_round_trip_through_nested_map() {
        let rows = vec![
            CapacityRow {
                building: "Building-1".into(),
                room_no: "G01".into(),
                sharing_type: SharingType::Two,
                capacity: 4,
            },
            CapacityRow {
                building: "Building-2".into(),
                room_no: "104".into(),
                sharing_type: SharingType::One,
                capacity: 2,
            },
        ];
        let map = CapacityMap::from_rows(&rows);
        assert_eq!(map.len(), 2);
        assert_eq!(
            map.get(&CapacityCell::new("Building-1", "G01", SharingType::Two)),
            Some(4)
        );
        assert_eq!(map.to_rows(), rows);
    }

    #[test]
    fn overlay_replaces_only_present_cells() {
        let mut base = CapacityMap::new();
        let single = CapacityCell::new("Building-1", "101", SharingType::One);
        let triple = CapacityCell::new("Building-1", "101", SharingType::Three);
        base.set(&single, 1);
        base.set(&triple, 3);

        let mut overrides = CapacityMap::new();
        overrides.set(&triple, 5);
        base.overlay(&overrides);

        assert_eq!(base.get(&single), Some(1));
        assert_eq!(base.get(&triple), Some(5));
    }

    #[test]
    fn unknown_cell_falls_back_to_one_bed() {
        let map = CapacityMap::new();
        let cell = CapacityCell::new("Annex", "X1", SharingType::Three);
        assert_eq!(map.get(&cell), None);
        assert_eq!(map.capacity_or_fallback(&cell), FALLBACK_CAPACITY);
    }
}
