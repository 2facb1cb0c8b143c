//! Guest, capacity and archive records. No I/O.

pub mod capacity;
pub mod common;
pub mod guest;
pub mod history;

pub use capacity::{CapacityCell, CapacityMap, CapacityRow, FALLBACK_CAPACITY, MAX_BEDS};
pub use common::parse_date;
pub use guest::{Guest, GuestDraft, GuestPatch, PaymentStatus, SharingType, VacateFlag};
pub use history::{BackupArchive, BackupInfo, BackupKind, SessionEntry};
