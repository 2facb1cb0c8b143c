use std::path::PathBuf;

use crate::cli::context::{CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::table::{Table, TableColumn};
use crate::core::manager::ReloadReport;
use crate::core::services::BackupService;
use crate::domain::BackupKind;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("backup", "Create a manual backup", "backup [note...]", cmd_backup),
        CommandEntry::new("backups", "List stored backups", "backups", cmd_backups),
        CommandEntry::new(
            "restore",
            "Replace all guests with a stored backup",
            "restore <backup name>",
            cmd_restore,
        ),
        CommandEntry::new(
            "import",
            "Replace all guests with a JSON export",
            "import <path>",
            cmd_import,
        ),
        CommandEntry::new("export", "Write all guests to a JSON file", "export <path>", cmd_export),
    ]
}

fn cmd_backup(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let note = (!args.is_empty()).then(|| args.join(" "));
    let info = BackupService::create(&context.manager, BackupKind::Manual, note.as_deref())?;
    output::success(format!(
        "Backup {} written with {} guest(s).",
        info.name, info.record_count
    ));
    Ok(())
}

fn cmd_backups(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let backups = BackupService::list(&context.manager)?;
    if backups.is_empty() {
        output::info("No backups yet.");
        return Ok(());
    }
    let mut table = Table::new(vec![
        TableColumn::left("Name"),
        TableColumn::left("Created"),
        TableColumn::left("Kind"),
        TableColumn::right("Guests"),
        TableColumn::left("Note").max(30),
    ]);
    for info in &backups {
        table.push(vec![
            info.name.clone(),
            info.created_at.format("%Y-%m-%d %H:%M").to_string(),
            info.kind.to_string(),
            info.record_count.to_string(),
            info.note.clone().unwrap_or_default(),
        ]);
    }
    output::section(format!("Backups ({})", backups.len()));
    println!("{}", table.render());
    Ok(())
}

fn cmd_restore(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let name = match args {
        [name] => *name,
        _ => return Err(CommandError::InvalidArguments("usage: restore <backup name>".into())),
    };
    if !context.confirm(&format!("Replace every guest with backup {name}?"))? {
        output::info("Restore cancelled.");
        return Ok(());
    }
    let report = BackupService::restore(&mut context.manager, name)?;
    announce_reload("Restored", &report);
    Ok(())
}

fn cmd_import(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let path = single_path(args, "import <path>")?;
    if !context.confirm(&format!("Replace every guest with {}?", path.display()))? {
        output::info("Import cancelled.");
        return Ok(());
    }
    let report = BackupService::restore_from_file(&mut context.manager, &path)?;
    announce_reload("Imported", &report);
    Ok(())
}

fn cmd_export(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let path = single_path(args, "export <path>")?;
    let count = BackupService::export(&context.manager, &path)?;
    output::success(format!("Exported {count} guest(s) to {}.", path.display()));
    Ok(())
}

fn single_path(args: &[&str], usage: &str) -> Result<PathBuf, CommandError> {
    match args {
        [path] => Ok(PathBuf::from(path)),
        _ => Err(CommandError::InvalidArguments(format!("usage: {usage}"))),
    }
}

fn announce_reload(verb: &str, report: &ReloadReport) {
    output::success(format!("{verb} {} guest(s).", report.guests));
    if !report.breached.is_empty() {
        output::warning(format!("{} guest(s) moved to Breached.", report.breached.len()));
    }
}
