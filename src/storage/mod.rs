pub mod json_backend;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    domain::{BackupArchive, BackupInfo, CapacityRow, Guest, GuestPatch, SessionEntry},
    errors::Result,
};

/// Guest records. Implementations must hand back fully typed guests:
/// sharing type numeric, dates parsed, vacate flag resolved.
pub trait GuestStore {
    fn list(&self) -> Result<Vec<Guest>>;
    fn get(&self, id: Uuid) -> Result<Option<Guest>>;
    fn create(&self, guest: &Guest) -> Result<()>;
    fn update(&self, id: Uuid, patch: &GuestPatch) -> Result<Guest>;
    fn delete(&self, id: Uuid) -> Result<()>;
    /// Swaps the whole collection in one step; a failure leaves the old one in place.
    fn replace_all(&self, guests: &[Guest]) -> Result<()>;
}

/// Per-cell capacity overrides.
pub trait CapacityStore {
    fn list_all(&self) -> Result<Vec<CapacityRow>>;
    /// Writes `row` only if the stored override for its cell still equals
    /// `expected` (`None` meaning no override yet). Otherwise fails with
    /// [`PgError::Conflict`](crate::errors::PgError::Conflict).
    fn upsert(&self, row: &CapacityRow, expected: Option<u8>) -> Result<()>;
}

pub trait BackupStore {
    fn save_backup(&self, archive: &BackupArchive) -> Result<BackupInfo>;
    /// Newest first.
    fn list_backups(&self) -> Result<Vec<BackupInfo>>;
    fn load_backup(&self, name: &str) -> Result<BackupArchive>;
    /// Month key (`YYYY-MM`) of the last automatic backup.
    fn last_auto_backup(&self) -> Result<Option<String>>;
    fn record_auto_backup(&self, month: &str) -> Result<()>;
}

pub trait SessionStore {
    fn record_login(&self, entry: &SessionEntry) -> Result<()>;
    fn record_logout(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;
    /// Newest first.
    fn list_sessions(&self) -> Result<Vec<SessionEntry>>;
}

/// Everything the property manager needs from persistence.
pub trait StorageBackend: GuestStore + CapacityStore + BackupStore + SessionStore + Send + Sync {}

impl<T> StorageBackend for T where
    T: GuestStore + CapacityStore + BackupStore + SessionStore + Send + Sync
{
}

pub use json_backend::{load_guests_from_path, save_guests_to_path, JsonStorage};
