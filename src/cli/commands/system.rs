use crate::billing::MissingDueLabel;
use crate::cli::context::{short_id, CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::table::{Table, TableColumn};
use crate::core::services::SessionService;
use crate::utils::build_info;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("help", "Show available commands", "help [command]", cmd_help),
        CommandEntry::new("version", "Show build metadata", "version", cmd_version),
        CommandEntry::new("refresh", "Reload guests and capacities", "refresh", cmd_refresh),
        CommandEntry::new("history", "Show recent operator sessions", "history", cmd_history),
        CommandEntry::new(
            "config",
            "Show or change stored settings",
            "config [operator|missing-label|backup-retention|session-retention|auto-backup-day <value>]",
            cmd_config,
        ),
        CommandEntry::new("exit", "Exit the shell", "exit", cmd_exit),
    ]
}

fn cmd_help(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if let Some(name) = args.first() {
        match context.entry(&name.to_lowercase()) {
            Some(entry) => {
                output::section(entry.name);
                output::info(entry.description);
                output::info(format!("Usage: {}", entry.usage));
            }
            None => context.suggest_command(name),
        }
        return Ok(());
    }

    let mut table = Table::new(vec![TableColumn::left("Command"), TableColumn::left("Usage")]);
    for entry in context.registry.list() {
        table.push(vec![entry.name.to_string(), entry.usage.to_string()]);
    }
    output::section("Commands");
    println!("{}", table.render());
    Ok(())
}

fn cmd_version(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let meta = build_info::current();
    output::section(format!("PG Admin {}", meta.version));
    output::info(format!("  Build hash : {} ({})", meta.git_hash, meta.git_status));
    output::info(format!("  Built at   : {}", meta.timestamp));
    output::info(format!("  Target     : {} [{}]", meta.target, meta.profile));
    output::info(format!("  Rustc      : {}", meta.rustc));
    Ok(())
}

fn cmd_refresh(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let report = context.manager.reload()?;
    output::success(format!(
        "Loaded {} guest(s); {} newly breached.",
        report.guests,
        report.breached.len()
    ));
    Ok(())
}

fn cmd_history(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let sessions = SessionService::history(&context.manager)?;
    if sessions.is_empty() {
        output::info("No sessions recorded.");
        return Ok(());
    }
    let mut table = Table::new(vec![
        TableColumn::left("Session"),
        TableColumn::left("Operator"),
        TableColumn::left("Login"),
        TableColumn::left("Logout"),
    ]);
    for entry in sessions {
        table.push(vec![
            short_id(entry.id),
            entry.operator.clone(),
            entry.login_time.format("%Y-%m-%d %H:%M").to_string(),
            entry
                .logout_time
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "active".to_string()),
        ]);
    }
    output::section("Login history");
    println!("{}", table.render());
    Ok(())
}

fn cmd_config(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let mut config = context.config_manager.load()?;
    match args {
        [] => {
            output::section("Settings");
            output::info(format!("Config file       : {}", context.config_manager.path().display()));
            output::info(format!(
                "Operator          : {}",
                config.operator.as_deref().unwrap_or("(default)")
            ));
            output::info(format!("Missing due label : {:?}", config.missing_due_label.as_str()));
            output::info(format!("Backup retention  : {}", config.backup_retention));
            output::info(format!("Session retention : {}", config.session_retention));
            output::info(format!("Auto backup day   : {}", config.auto_backup_day));
            output::info(format!("Buildings         : {}", config.building_names().join(", ")));
            return Ok(());
        }
        ["operator", value] => config.operator = Some(value.to_string()),
        ["missing-label", value] => {
            config.missing_due_label = match *value {
                "na" | "n/a" => MissingDueLabel::NotAvailable,
                "blank" => MissingDueLabel::Blank,
                other => {
                    return Err(CommandError::InvalidArguments(format!(
                        "missing-label must be `na` or `blank`, not `{other}`"
                    )))
                }
            };
        }
        ["backup-retention", value] => config.backup_retention = parse_count(value)?,
        ["session-retention", value] => config.session_retention = parse_count(value)?,
        ["auto-backup-day", value] => config.auto_backup_day = parse_count(value)?,
        _ => {
            let usage = context.entry("config").map_or("", |entry| entry.usage);
            return Err(CommandError::InvalidArguments(format!("usage: {usage}")));
        }
    }
    context.config_manager.save(&config)?;
    output::success("Settings saved; they apply from the next start.");
    Ok(())
}

fn parse_count<T: std::str::FromStr>(raw: &str) -> Result<T, CommandError> {
    raw.parse()
        .map_err(|_| CommandError::InvalidArguments(format!("`{raw}` is not a whole number")))
}

fn cmd_exit(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    Err(CommandError::ExitRequested)
}
