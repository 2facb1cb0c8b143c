use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};
use uuid::Uuid;

use crate::{
    domain::{BackupArchive, BackupInfo, CapacityRow, Guest, GuestPatch, SessionEntry},
    errors::{PgError, Result},
    utils::{
        paths::PathResolver,
        persistence::{ensure_dir, load_json, save_json},
    },
};

use super::{BackupStore, CapacityStore, GuestStore, SessionStore};

const BACKUP_EXTENSION: &str = "json";
const BACKUP_PREFIX: &str = "backup";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const GUESTS_FILE: &str = "guests.json";
const CAPACITY_FILE: &str = "room_capacity.json";
const SESSIONS_FILE: &str = "login_history.json";
const STATE_FILE: &str = "state.json";
const DEFAULT_BACKUP_RETENTION: usize = 3;
const DEFAULT_SESSION_RETENTION: usize = 5;

/// File-backed store: one JSON document per collection under `data/`,
/// archives under `backups/`. Every write goes through a tmp file and a rename.
pub struct JsonStorage {
    root: PathBuf,
    data_dir: PathBuf,
    backups_dir: PathBuf,
    backup_retention: usize,
    session_retention: usize,
    write_lock: Mutex<()>,
}

impl JsonStorage {
    pub fn new(
        root: Option<PathBuf>,
        backup_retention: Option<usize>,
        session_retention: Option<usize>,
    ) -> Result<Self> {
        let app_root = PathResolver::resolve_base(root);
        ensure_dir(&app_root)?;
        let data_dir = PathResolver::data_dir_in(&app_root);
        let backups_dir = PathResolver::backup_dir_in(&app_root);
        ensure_dir(&data_dir)?;
        ensure_dir(&backups_dir)?;
        Ok(Self {
            root: app_root,
            data_dir,
            backups_dir,
            backup_retention: backup_retention.unwrap_or(DEFAULT_BACKUP_RETENTION).max(1),
            session_retention: session_retention.unwrap_or(DEFAULT_SESSION_RETENTION).max(1),
            write_lock: Mutex::new(()),
        })
    }

    pub fn new_default() -> Result<Self> {
        Self::new(None, None, None)
    }

    pub fn base_dir(&self) -> &Path {
        &self.root
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    fn data_file(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| PgError::Storage("storage lock poisoned".into()))
    }

    fn read_guests(&self) -> Result<Vec<Guest>> {
        Ok(load_json(&self.data_file(GUESTS_FILE))?.unwrap_or_default())
    }

    fn write_guests(&self, guests: &[Guest]) -> Result<()> {
        save_json(guests, &self.data_file(GUESTS_FILE))
    }

    fn read_capacity(&self) -> Result<Vec<CapacityRow>> {
        Ok(load_json(&self.data_file(CAPACITY_FILE))?.unwrap_or_default())
    }

    fn read_sessions(&self) -> Result<Vec<SessionEntry>> {
        Ok(load_json(&self.data_file(SESSIONS_FILE))?.unwrap_or_default())
    }

    fn read_state(&self) -> Result<StoreState> {
        Ok(load_json(&self.data_file(STATE_FILE))?.unwrap_or_default())
    }

    fn backup_path(&self, name: &str) -> Result<PathBuf> {
        let file_name = Path::new(name)
            .file_name()
            .and_then(|value| value.to_str())
            .filter(|value| *value == name)
            .ok_or_else(|| PgError::InvalidInput(format!("invalid backup name `{name}`")))?;
        Ok(self.backups_dir.join(file_name))
    }

    fn prune_backups(&self) -> Result<()> {
        let backups = self.list_backups()?;
        for stale in backups.iter().skip(self.backup_retention) {
            if let Err(err) = fs::remove_file(&stale.path) {
                tracing::warn!(backup = %stale.name, error = %err, "failed to prune backup");
            }
        }
        Ok(())
    }
}

impl GuestStore for JsonStorage {
    fn list(&self) -> Result<Vec<Guest>> {
        self.read_guests()
    }

    fn get(&self, id: Uuid) -> Result<Option<Guest>> {
        Ok(self.read_guests()?.into_iter().find(|guest| guest.id == id))
    }

    fn create(&self, guest: &Guest) -> Result<()> {
        let _guard = self.lock()?;
        let mut guests = self.read_guests()?;
        if guests.iter().any(|existing| existing.id == guest.id) {
            return Err(PgError::Conflict(format!("guest {} already exists", guest.id)));
        }
        guests.push(guest.clone());
        self.write_guests(&guests)
    }

    fn update(&self, id: Uuid, patch: &GuestPatch) -> Result<Guest> {
        let _guard = self.lock()?;
        let mut guests = self.read_guests()?;
        let guest = guests
            .iter_mut()
            .find(|guest| guest.id == id)
            .ok_or(PgError::GuestNotFound(id))?;
        patch.apply(guest);
        let updated = guest.clone();
        self.write_guests(&guests)?;
        Ok(updated)
    }

    fn delete(&self, id: Uuid) -> Result<()> {
        let _guard = self.lock()?;
        let mut guests = self.read_guests()?;
        let before = guests.len();
        guests.retain(|guest| guest.id != id);
        if guests.len() == before {
            return Err(PgError::GuestNotFound(id));
        }
        self.write_guests(&guests)
    }

    fn replace_all(&self, guests: &[Guest]) -> Result<()> {
        ensure_unique_ids(guests)?;
        let _guard = self.lock()?;
        self.write_guests(guests)
    }
}

impl CapacityStore for JsonStorage {
    fn list_all(&self) -> Result<Vec<CapacityRow>> {
        self.read_capacity()
    }

    fn upsert(&self, row: &CapacityRow, expected: Option<u8>) -> Result<()> {
        let _guard = self.lock()?;
        let mut rows = self.read_capacity()?;
        let cell = row.cell();
        let position = rows.iter().position(|existing| existing.cell() == cell);
        let stored = position.map(|index| rows[index].capacity);
        if stored != expected {
            return Err(PgError::Conflict(format!(
                "capacity of {cell} changed since it was read ({} now stored)",
                stored.map_or_else(|| "no override".to_string(), |value| value.to_string())
            )));
        }
        match position {
            Some(index) => rows[index].capacity = row.capacity,
            None => rows.push(row.clone()),
        }
        save_json(&rows, &self.data_file(CAPACITY_FILE))
    }
}

impl BackupStore for JsonStorage {
    fn save_backup(&self, archive: &BackupArchive) -> Result<BackupInfo> {
        ensure_dir(&self.backups_dir)?;
        let timestamp = archive.created_at.format(BACKUP_TIMESTAMP_FORMAT);
        let short_id = &archive.id.simple().to_string()[..6];
        let mut file_stem = format!("{BACKUP_PREFIX}_{timestamp}_{short_id}_{}", archive.kind);
        if let Some(label) = sanitize_backup_note(archive.note.as_deref()) {
            file_stem.push('_');
            file_stem.push_str(&label);
        }
        let name = format!("{file_stem}.{BACKUP_EXTENSION}");
        let path = self.backups_dir.join(&name);
        save_json(archive, &path)?;
        tracing::info!(backup = %name, records = archive.guests.len(), "backup written");
        self.prune_backups()?;
        Ok(BackupInfo {
            name,
            path,
            created_at: archive.created_at,
            kind: archive.kind,
            note: archive.note.clone(),
            record_count: archive.guests.len(),
        })
    }

    fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        if !self.backups_dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.backups_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BACKUP_EXTENSION) {
                continue;
            }
            let name = match path.file_name().and_then(|name| name.to_str()) {
                Some(name) if name.starts_with(BACKUP_PREFIX) => name.to_string(),
                _ => continue,
            };
            let archive: BackupArchive = match load_json(&path) {
                Ok(Some(archive)) => archive,
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(backup = %name, error = %err, "skipping unreadable backup");
                    continue;
                }
            };
            entries.push(BackupInfo {
                name,
                path,
                created_at: archive.created_at,
                kind: archive.kind,
                note: archive.note,
                record_count: archive.guests.len(),
            });
        }
        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.name.cmp(&a.name))
        });
        Ok(entries)
    }

    fn load_backup(&self, name: &str) -> Result<BackupArchive> {
        let path = self.backup_path(name)?;
        load_json(&path)?.ok_or_else(|| PgError::Storage(format!("backup `{name}` not found")))
    }

    fn last_auto_backup(&self) -> Result<Option<String>> {
        Ok(self.read_state()?.last_auto_backup)
    }

    fn record_auto_backup(&self, month: &str) -> Result<()> {
        let _guard = self.lock()?;
        let mut state = self.read_state()?;
        state.last_auto_backup = Some(month.to_string());
        save_json(&state, &self.data_file(STATE_FILE))
    }
}

impl SessionStore for JsonStorage {
    fn record_login(&self, entry: &SessionEntry) -> Result<()> {
        let _guard = self.lock()?;
        let mut sessions = self.read_sessions()?;
        sessions.insert(0, entry.clone());
        sessions.truncate(self.session_retention);
        save_json(&sessions, &self.data_file(SESSIONS_FILE))
    }

    fn record_logout(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let _guard = self.lock()?;
        let mut sessions = self.read_sessions()?;
        match sessions.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => entry.logout_time = Some(at),
            // Rotated out while still open; nothing left to close.
            None => return Ok(()),
        }
        save_json(&sessions, &self.data_file(SESSIONS_FILE))
    }

    fn list_sessions(&self) -> Result<Vec<SessionEntry>> {
        let mut sessions = self.read_sessions()?;
        sessions.sort_by(|a, b| b.login_time.cmp(&a.login_time));
        Ok(sessions)
    }
}

/// Writes guests as a pretty JSON array, the export and import format.
pub fn save_guests_to_path(guests: &[Guest], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    save_json(guests, path)
}

/// Reads a guest file; anything other than a top-level JSON array is rejected.
pub fn load_guests_from_path(path: &Path) -> Result<Vec<Guest>> {
    let data = fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&data)?;
    if !value.is_array() {
        return Err(PgError::InvalidInput(format!(
            "`{}` does not contain a JSON array of guests",
            path.display()
        )));
    }
    let guests: Vec<Guest> = serde_json::from_value(value)?;
    ensure_unique_ids(&guests)?;
    Ok(guests)
}

/// Every guest id in a bulk write must appear once.
fn ensure_unique_ids(guests: &[Guest]) -> Result<()> {
    let mut seen = HashSet::with_capacity(guests.len());
    match guests.iter().find(|guest| !seen.insert(guest.id)) {
        Some(repeated) => Err(PgError::InvalidInput(format!(
            "guest {} appears more than once",
            repeated.id
        ))),
        None => Ok(()),
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    last_auto_backup: Option<String>,
}

fn sanitize_backup_note(note: Option<&str>) -> Option<String> {
    let raw = note?.trim();
    if raw.is_empty() {
        return None;
    }
    let mut sanitized = String::new();
    let mut last_dash = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if (ch.is_whitespace() || matches!(ch, '-' | '.' | '_'))
            && !sanitized.is_empty()
            && !last_dash
        {
            sanitized.push('-');
            last_dash = true;
        }
    }
    let trimmed = sanitized.trim_matches('-').to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BackupKind, CapacityCell, GuestDraft, PaymentStatus, SharingType};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn storage_with_temp_dir() -> (JsonStorage, TempDir) {
        let temp = TempDir::new().expect("temp dir");
        let storage = JsonStorage::new(Some(temp.path().to_path_buf()), Some(3), Some(2))
            .expect("json storage");
        (storage, temp)
    }

    fn sample_guest(name: &str) -> Guest {
        let cell = CapacityCell::new("Building-1", "101", SharingType::One);
        let joining = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        Guest::from_draft(GuestDraft::new(name, "9000000000", cell, joining))
    }

    #[test]
    fn guest_crud_roundtrip() {
        let (storage, _guard) = storage_with_temp_dir();
        let guest = sample_guest("Ravi");
        storage.create(&guest).expect("create");
        assert!(matches!(storage.create(&guest), Err(PgError::Conflict(_))));

        let updated = storage
            .update(guest.id, &GuestPatch::status(PaymentStatus::Paid))
            .expect("update");
        assert_eq!(updated.monthly_payment_status, PaymentStatus::Paid);
        assert_eq!(
            storage.get(guest.id).expect("get").map(|g| g.monthly_payment_status),
            Some(PaymentStatus::Paid)
        );

        storage.delete(guest.id).expect("delete");
        assert!(matches!(storage.delete(guest.id), Err(PgError::GuestNotFound(_))));
        assert!(storage.list().expect("list").is_empty());
    }

    #[test]
    fn capacity_upsert_is_compare_and_set() {
        let (storage, _guard) = storage_with_temp_dir();
        let cell = CapacityCell::new("Building-1", "G01", SharingType::Two);
        storage.upsert(&CapacityRow::new(&cell, 3), None).expect("first write");
        let stale = storage.upsert(&CapacityRow::new(&cell, 4), None);
        assert!(matches!(stale, Err(PgError::Conflict(_))));
        storage.upsert(&CapacityRow::new(&cell, 4), Some(3)).expect("fresh write");
        assert_eq!(storage.list_all().expect("rows"), vec![CapacityRow::new(&cell, 4)]);
    }

    #[test]
    fn backups_are_pruned_to_retention() {
        let (storage, _guard) = storage_with_temp_dir();
        for index in 0..5 {
            let note = format!("run {index}");
            let archive = BackupArchive::new(vec![sample_guest("A")], BackupKind::Manual, Some(note));
            storage.save_backup(&archive).expect("backup");
        }
        let backups = storage.list_backups().expect("list");
        assert_eq!(backups.len(), 3);
        assert_eq!(backups[0].note.as_deref(), Some("run 4"));
        assert!(backups[0].name.ends_with("_manual_run-4.json"));

        let archive = storage.load_backup(&backups[0].name).expect("load");
        assert_eq!(archive.guests.len(), 1);
        assert!(storage.load_backup("../guests.json").is_err());
    }

    #[test]
    fn sessions_rotate_and_close() {
        let (storage, _guard) = storage_with_temp_dir();
        let mut ids = Vec::new();
        for offset in 0..3 {
            let at = Utc::now() + chrono::Duration::seconds(offset);
            let entry = SessionEntry::open("admin", at);
            ids.push(entry.id);
            storage.record_login(&entry).expect("login");
        }
        storage.record_logout(ids[2], Utc::now()).expect("logout");
        storage.record_logout(ids[0], Utc::now()).expect("rotated out");

        let sessions = storage.list_sessions().expect("list");
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, ids[2]);
        assert!(!sessions[0].is_open());
        assert!(sessions[1].is_open());
    }

    #[test]
    fn import_rejects_non_array_documents() {
        let (_storage, guard) = storage_with_temp_dir();
        let path = guard.path().join("import.json");
        fs::write(&path, r#"{"guests": []}"#).expect("write");
        assert!(matches!(load_guests_from_path(&path), Err(PgError::InvalidInput(_))));

        save_guests_to_path(&[sample_guest("B")], &path).expect("export");
        assert_eq!(load_guests_from_path(&path).expect("import").len(), 1);
    }

    #[test]
    fn bulk_writes_reject_repeated_ids() {
        let (storage, guard) = storage_with_temp_dir();
        let guest = sample_guest("A");
        storage.create(&guest).expect("create");
        let doubled = vec![guest.clone(), guest.clone()];

        assert!(matches!(storage.replace_all(&doubled), Err(PgError::InvalidInput(_))));
        assert_eq!(storage.list().expect("list").len(), 1);

        let path = guard.path().join("doubled.json");
        save_guests_to_path(&doubled, &path).expect("export");
        assert!(matches!(load_guests_from_path(&path), Err(PgError::InvalidInput(_))));
    }
}
