#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc, sync::Mutex};

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use pg_admin_core::{
    config::Config,
    core::{services::GuestService, FixedClock, PropertyManager},
    domain::{CapacityCell, Guest, GuestDraft, SharingType},
    storage::JsonStorage,
};
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn temp_base() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

/// Manager over a fresh JSON store with the clock pinned to `today`.
pub fn setup_test_env(today: NaiveDate) -> (PropertyManager, PathBuf) {
    let base = temp_base();
    (manager_at(&base, today), base)
}

/// Opens another manager over an existing store, as a second operator would.
pub fn manager_at(base: &PathBuf, today: NaiveDate) -> PropertyManager {
    let config = Config::default();
    let storage = JsonStorage::new(
        Some(base.clone()),
        Some(config.backup_retention),
        Some(config.session_retention),
    )
    .expect("create json storage backend");
    let mut manager = PropertyManager::new(Box::new(storage), config, Arc::new(FixedClock::on(today)));
    manager.reload().expect("initial reload");
    manager
}

pub fn cell(building: &str, room: &str, sharing: SharingType) -> CapacityCell {
    CapacityCell::new(building, room, sharing)
}

pub fn register(
    manager: &mut PropertyManager,
    name: &str,
    cell: &CapacityCell,
    joined: NaiveDate,
) -> Guest {
    let mut draft = GuestDraft::new(name, "98450 00000", cell.clone(), joined);
    draft.payment_amount = 6500.0;
    GuestService::register(manager, draft).expect("register guest")
}
