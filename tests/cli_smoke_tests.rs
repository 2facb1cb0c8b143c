mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use regex::Regex;

fn cli(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("pg_admin_cli").expect("binary built");
    cmd.env("PG_ADMIN_HOME", home)
        .env("PG_ADMIN_CLI_SCRIPT", "1")
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn script_mode_registers_and_lists_guests() {
    let home = common::temp_base();
    let script = "\
# register two guests in a two-sharing room
guest-add name=Asha mobile=9000000001 building=Building-1 room=G01 sharing=2 joined=2024-01-15 amount=6500
guest-add name=\"Ravi Kumar\" mobile=9000000002 building=Building-1 room=G01 sharing=2 joined=2024-02-01
guest-add name=Meena mobile=9000000003 building=Building-1 room=G01 sharing=2 joined=2024-02-03
guests --all
rooms Building-1
exit
";
    let assert = cli(&home).write_stdin(script).assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();

    let registered = Regex::new(r"Registered Asha \([0-9a-f]{8}\) in Building-1 G01 \(2 Sharing\)")
        .expect("regex");
    assert!(registered.is_match(&stdout), "{stdout}");
    assert!(stdout.contains("Building-1 G01 (2 Sharing) is now full."), "{stdout}");
    assert!(stdout.contains("is full (2/2 beds occupied)"), "{stdout}");
    assert!(stdout.contains("Ravi Kumar"));
    assert!(stdout.contains("=== Building-1 (2/"), "{stdout}");

    let stored = std::fs::read_to_string(home.join("data").join("guests.json")).expect("guests file");
    assert!(stored.contains("\"roomNo\": \"G01\""));
    assert!(home.join("data").join("login_history.json").exists());
}

#[test]
fn unknown_commands_get_a_suggestion() {
    let home = common::temp_base();
    cli(&home)
        .write_stdin("gusts\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Unknown command `gusts`"))
        .stdout(predicate::str::contains("Suggestion: `guests`?"));
}

#[test]
fn capacity_commands_report_refusals() {
    let home = common::temp_base();
    let script = "\
bed-remove Building-2 104 2
bed-add Building-2 104 2
backup before reports
backups
report compare
dashboard
quit
";
    cli(&home)
        .write_stdin(script)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 Sharing rooms need at least 2 beds"))
        .stdout(predicate::str::contains("Building-2 104 (2 Sharing) now has 3 bed(s)."))
        .stdout(predicate::str::contains("_manual_before-reports.json"))
        .stdout(predicate::str::contains("No payments recorded yet."))
        .stdout(predicate::str::contains("=== Dashboard ==="));
}

#[test]
fn export_writes_a_json_array() {
    let home = common::temp_base();
    let export = home.join("out.json");
    let script = format!(
        "guest-add name=Asha mobile=9 building=Building-2 room=G02 sharing=1 joined=2024-03-01\nexport {}\nexit\n",
        export.display()
    );
    cli(&home)
        .write_stdin(script)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 guest(s)"));
    let raw = std::fs::read_to_string(&export).expect("export file");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(value.as_array().map(Vec::len), Some(1));
}

#[test]
fn config_changes_are_validated_and_saved() {
    let home = common::temp_base();
    cli(&home)
        .write_stdin("config auto-backup-day 40\nconfig operator warden\nconfig\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("must be between 1 and 28"))
        .stdout(predicate::str::contains("Settings saved"))
        .stdout(predicate::str::contains("warden"));
    let saved = std::fs::read_to_string(home.join("config.json")).expect("config file");
    assert!(saved.contains("\"operator\": \"warden\""));
    assert!(saved.contains("\"auto_backup_day\": 5"));
}
