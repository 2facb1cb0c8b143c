//! Bed accounting per (building, room, sharing type) cell.

mod ledger;
mod status;

pub use ledger::{
    can_admit, occupancy_count, plan_capacity_change, Admission, CapacityDelta, CapacityLedger,
    CapacityRefusal,
};
pub use status::{room_status, BedSlot, Occupancy, RoomStatus, SharingStatus};
