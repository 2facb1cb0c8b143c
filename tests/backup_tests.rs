mod common;

use std::fs;

use common::{cell, date, manager_at, register, setup_test_env, temp_base};
use pg_admin_core::{
    capacity::occupancy_count,
    core::services::{BackupService, GuestService, ServiceError, SessionService},
    domain::{BackupKind, SharingType},
    errors::PgError,
};

#[test]
fn restore_replaces_every_guest_with_the_archive() {
    let (mut manager, _base) = setup_test_env(date(2024, 5, 1));
    let room = cell("Building-1", "103", SharingType::Three);
    let asha = register(&mut manager, "Asha", &room, date(2024, 4, 10));
    let ravi = register(&mut manager, "Ravi", &room, date(2024, 4, 11));

    let info = BackupService::create(&manager, BackupKind::Manual, Some("before cleanup"))
        .expect("backup");
    assert_eq!(info.record_count, 2);
    assert!(info.name.starts_with("backup_"));
    assert!(info.name.ends_with("_manual_before-cleanup.json"), "{}", info.name);

    GuestService::delete(&mut manager, asha.id).expect("delete");
    register(&mut manager, "Meena", &room, date(2024, 4, 12));

    let report = BackupService::restore(&mut manager, &info.name).expect("restore");
    assert_eq!(report.guests, 2);
    let mut names: Vec<&str> = manager.guests().iter().map(|g| g.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["Asha", "Ravi"]);
    assert!(manager.guest(ravi.id).is_some());
}

#[test]
fn restore_rejects_names_outside_the_backup_folder() {
    let (mut manager, _base) = setup_test_env(date(2024, 5, 1));
    let result = BackupService::restore(&mut manager, "../data/guests.json");
    assert!(matches!(
        result,
        Err(ServiceError::Core(PgError::InvalidInput(_)))
    ));
}

#[test]
fn retention_keeps_the_newest_archives() {
    let (manager, _base) = setup_test_env(date(2024, 5, 1));
    for idx in 0..5 {
        BackupService::create(&manager, BackupKind::Manual, Some(&format!("run {idx}")))
            .expect("backup");
    }
    let backups = BackupService::list(&manager).expect("list");
    assert_eq!(backups.len(), manager.config().backup_retention);
    assert!(backups
        .windows(2)
        .all(|pair| pair[0].created_at >= pair[1].created_at));
}

#[test]
fn export_then_import_into_another_property() {
    let (mut source, _base) = setup_test_env(date(2024, 5, 1));
    let room = cell("Building-2", "205", SharingType::Two);
    register(&mut source, "Asha", &room, date(2024, 4, 10));
    register(&mut source, "Ravi", &room, date(2024, 4, 11));

    let export_path = temp_base().join("exports").join("guests.json");
    let written = BackupService::export(&source, &export_path).expect("export");
    assert_eq!(written, 2);

    let (mut target, _other) = setup_test_env(date(2024, 5, 1));
    let report = BackupService::restore_from_file(&mut target, &export_path).expect("import");
    assert_eq!(report.guests, 2);
    assert_eq!(target.guests().len(), 2);
}

#[test]
fn import_of_a_non_array_file_keeps_existing_guests() {
    let (mut manager, _base) = setup_test_env(date(2024, 5, 1));
    let room = cell("Building-2", "206", SharingType::One);
    register(&mut manager, "Asha", &room, date(2024, 4, 10));

    let bogus = temp_base().join("bogus.json");
    fs::write(&bogus, r#"{"guests": []}"#).expect("write bogus file");
    let result = BackupService::restore_from_file(&mut manager, &bogus);
    assert!(matches!(
        result,
        Err(ServiceError::Core(PgError::InvalidInput(_)))
    ));
    assert_eq!(manager.guests().len(), 1);
    assert_eq!(manager.storage().list().expect("stored").len(), 1);
}

#[test]
fn restore_refuses_an_archive_with_repeated_guests() {
    let (mut manager, _base) = setup_test_env(date(2024, 5, 1));
    let g01 = cell("Building-1", "G01", SharingType::Two);
    register(&mut manager, "Asha", &g01, date(2024, 4, 10));
    let info = BackupService::create(&manager, BackupKind::Manual, None).expect("backup");

    let mut archive: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&info.path).expect("read archive"))
            .expect("parse archive");
    let guests = archive["guests"].as_array_mut().expect("guest array");
    let copy = guests[0].clone();
    guests.push(copy.clone());
    guests.push(copy);
    fs::write(&info.path, archive.to_string()).expect("rewrite archive");

    let result = BackupService::restore(&mut manager, &info.name);
    assert!(matches!(
        result,
        Err(ServiceError::Core(PgError::InvalidInput(_)))
    ));
    assert_eq!(manager.storage().list().expect("stored").len(), 1);
    assert_eq!(occupancy_count(manager.guests(), &g01, None), 1);
}

#[test]
fn import_refuses_a_file_with_repeated_guests() {
    let (mut manager, _base) = setup_test_env(date(2024, 5, 1));
    let g01 = cell("Building-1", "G01", SharingType::Two);
    let asha = register(&mut manager, "Asha", &g01, date(2024, 4, 10));

    let path = temp_base().join("repeated.json");
    let body = serde_json::to_string(&vec![asha.clone(), asha.clone(), asha]).expect("serialise");
    fs::write(&path, body).expect("write import file");

    let result = BackupService::restore_from_file(&mut manager, &path);
    assert!(matches!(
        result,
        Err(ServiceError::Core(PgError::InvalidInput(_)))
    ));
    assert_eq!(manager.guests().len(), 1);
    assert_eq!(manager.storage().list().expect("stored").len(), 1);
}

#[test]
fn automatic_backup_runs_once_per_month_from_the_configured_day() {
    let (manager, _base) = setup_test_env(date(2024, 5, 1));
    assert!(BackupService::auto_backup_if_due(&manager, date(2024, 5, 4))
        .expect("check")
        .is_none());

    let first = BackupService::auto_backup_if_due(&manager, date(2024, 5, 5))
        .expect("check")
        .expect("backup taken");
    assert_eq!(first.kind, BackupKind::Auto);
    assert_eq!(first.note.as_deref(), Some("monthly 2024-05"));

    assert!(BackupService::auto_backup_if_due(&manager, date(2024, 5, 20))
        .expect("check")
        .is_none());
    assert!(BackupService::auto_backup_if_due(&manager, date(2024, 6, 9))
        .expect("check")
        .is_some());
}

#[test]
fn login_history_rotates_and_closes_sessions() {
    let (manager, base) = setup_test_env(date(2024, 5, 1));
    let mut ids = Vec::new();
    for _ in 0..7 {
        ids.push(SessionService::start(&manager, "admin").expect("start").id);
    }
    let history = SessionService::history(&manager).expect("history");
    assert_eq!(history.len(), manager.config().session_retention);

    SessionService::end(&manager, ids[6]).expect("end newest");
    SessionService::end(&manager, ids[0]).expect("ending a rotated-out session is fine");

    let reopened = manager_at(&base, date(2024, 5, 1));
    let history = SessionService::history(&reopened).expect("history");
    let newest = history.iter().find(|entry| entry.id == ids[6]).expect("newest kept");
    assert!(!newest.is_open());
}
