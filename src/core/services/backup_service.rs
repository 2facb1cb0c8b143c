use std::path::Path;

use chrono::{Datelike, NaiveDate};

use crate::core::manager::{PropertyManager, ReloadReport};
use crate::core::services::ServiceResult;
use crate::domain::{BackupArchive, BackupInfo, BackupKind};
use crate::storage::{load_guests_from_path, save_guests_to_path};

pub struct BackupService;

impl BackupService {
    /// Archives the stored guest collection (not the cache).
    pub fn create(
        manager: &PropertyManager,
        kind: BackupKind,
        note: Option<&str>,
    ) -> ServiceResult<BackupInfo> {
        let guests = manager.storage().list()?;
        let note = note.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string);
        let archive = BackupArchive::new(guests, kind, note);
        Ok(manager.storage().save_backup(&archive)?)
    }

    pub fn list(manager: &PropertyManager) -> ServiceResult<Vec<BackupInfo>> {
        Ok(manager.storage().list_backups()?)
    }

    /// Replaces every guest with the archive's contents in one swap, then reloads.
    pub fn restore(manager: &mut PropertyManager, name: &str) -> ServiceResult<ReloadReport> {
        let archive = manager.storage().load_backup(name)?;
        manager.storage().replace_all(&archive.guests)?;
        tracing::info!(backup = %name, records = archive.guests.len(), "backup restored");
        Ok(manager.reload()?)
    }

    /// Restores from an exported file, which must hold a JSON array of guests.
    pub fn restore_from_file(manager: &mut PropertyManager, path: &Path) -> ServiceResult<ReloadReport> {
        let guests = load_guests_from_path(path)?;
        manager.storage().replace_all(&guests)?;
        tracing::info!(path = %path.display(), records = guests.len(), "guests imported");
        Ok(manager.reload()?)
    }

    /// Writes every stored guest to `path` as a pretty JSON array.
    pub fn export(manager: &PropertyManager, path: &Path) -> ServiceResult<usize> {
        let guests = manager.storage().list()?;
        save_guests_to_path(&guests, path)?;
        tracing::info!(path = %path.display(), records = guests.len(), "guests exported");
        Ok(guests.len())
    }

    /// Takes the monthly automatic backup when `today` is on or past the
    /// configured day and none was taken this month yet.
    pub fn auto_backup_if_due(manager: &PropertyManager, today: NaiveDate) -> ServiceResult<Option<BackupInfo>> {
        let day = manager.config().auto_backup_day;
        if today.day() < day {
            return Ok(None);
        }
        let month = month_key(today);
        let last = manager.storage().last_auto_backup()?;
        if last.as_deref() == Some(month.as_str()) {
            return Ok(None);
        }
        let info = Self::create(manager, BackupKind::Auto, Some(&format!("monthly {month}")))?;
        manager.storage().record_auto_backup(&month)?;
        Ok(Some(info))
    }
}

fn month_key(date: NaiveDate) -> String {
    format!("{}-{:02}", date.year(), date.month())
}
