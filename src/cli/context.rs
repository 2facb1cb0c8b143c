//! Shell state, dispatch and error reporting.

use std::{collections::HashMap, io, sync::Arc};

use dialoguer::{theme::ColorfulTheme, Confirm};
use strsim::levenshtein;
use uuid::Uuid;

use crate::{
    config::ConfigManager,
    core::{
        services::{BackupService, ServiceError, SessionService},
        PropertyManager, SystemClock,
    },
    domain::{parse_date, SessionEntry},
    errors::PgError,
    storage::JsonStorage,
    utils::paths::PathResolver,
};

use super::{
    commands, output,
    registry::{CommandEntry, CommandRegistry},
};

const DEFAULT_OPERATOR: &str = "admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] PgError),
    #[error("Command failed: {0}")]
    Command(String),
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        CliError::Command(err.to_string())
    }
}

impl From<rustyline::error::ReadlineError> for CliError {
    fn from(err: rustyline::error::ReadlineError) -> Self {
        CliError::Command(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Core(#[from] PgError),
    #[error(transparent)]
    Dialoguer(#[from] dialoguer::Error),
    #[error("exit requested")]
    ExitRequested,
}

pub struct ShellContext {
    pub mode: CliMode,
    pub registry: CommandRegistry,
    pub manager: PropertyManager,
    pub config_manager: ConfigManager,
    pub theme: ColorfulTheme,
    pub session: Option<SessionEntry>,
    pub last_command: Option<String>,
    pub running: bool,
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        let base = PathResolver::base_dir();
        let config_manager = ConfigManager::with_base_dir(base.clone())?;
        let config = config_manager.load()?;
        let storage = JsonStorage::new(
            Some(base),
            Some(config.backup_retention),
            Some(config.session_retention),
        )?;
        let manager = PropertyManager::new(Box::new(storage), config, Arc::new(SystemClock));
        Ok(Self::with_manager(mode, manager, config_manager))
    }

    pub fn with_manager(mode: CliMode, manager: PropertyManager, config_manager: ConfigManager) -> Self {
        let mut registry = CommandRegistry::new();
        commands::register_all(&mut registry);
        Self {
            mode,
            registry,
            manager,
            config_manager,
            theme: ColorfulTheme::default(),
            session: None,
            last_command: None,
            running: true,
        }
    }

    /// Loads data, opens a session and runs the monthly backup check.
    /// Failures are reported and leave the shell usable on whatever is cached.
    pub(crate) fn startup(&mut self) {
        match self.manager.reload() {
            Ok(report) => {
                if !report.breached.is_empty() {
                    output::warning(format!(
                        "{} guest(s) moved to Breached.",
                        report.breached.len()
                    ));
                }
            }
            Err(err) => output::error(format!("Could not load guests: {err}")),
        }
        let operator = self
            .manager
            .config()
            .operator
            .clone()
            .unwrap_or_else(|| DEFAULT_OPERATOR.to_string());
        match SessionService::start(&self.manager, &operator) {
            Ok(entry) => self.session = Some(entry),
            Err(err) => tracing::warn!(error = %err, "could not record session start"),
        }
        let today = self.manager.today();
        match BackupService::auto_backup_if_due(&self.manager, today) {
            Ok(Some(info)) => output::info(format!("Monthly backup written: {}", info.name)),
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "automatic backup failed"),
        }
    }

    pub(crate) fn shutdown(&mut self) {
        if let Some(entry) = self.session.take() {
            if let Err(err) = SessionService::end(&self.manager, entry.id) {
                tracing::warn!(error = %err, "could not record session end");
            }
        }
    }

    pub(crate) fn command_names(&self) -> Vec<&'static str> {
        self.registry.names().collect()
    }

    pub(crate) fn prompt(&self) -> String {
        format!("pg-admin [{} guests]> ", self.manager.guests().iter().filter(|g| g.is_active()).count())
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        if let Some(handler) = self.registry.handler(command) {
            match handler(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            }
        } else {
            self.suggest_command(raw);
            Ok(LoopControl::Continue)
        }
    }

    pub(crate) fn process_line(&mut self, line: &str) -> Result<LoopControl, CommandError> {
        let tokens = match shell_words::split(line) {
            Ok(tokens) => tokens,
            Err(err) => {
                output::warning(err);
                return Ok(LoopControl::Continue);
            }
        };
        let Some(raw) = tokens.first() else {
            return Ok(LoopControl::Continue);
        };
        let command = raw.to_lowercase();
        let args: Vec<&str> = tokens.iter().skip(1).map(String::as_str).collect();
        self.last_command = Some(line.trim().to_string());
        self.dispatch(&command, raw, &args)
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{input}`. Type `help` to see available commands."
        ));
        let best = self
            .registry
            .names()
            .map(|name| (levenshtein(name, input), name))
            .min_by_key(|(distance, _)| *distance);
        if let Some((distance, name)) = best {
            if distance <= 3 {
                output::info(format!("Suggestion: `{name}`?"));
            }
        }
    }

    pub(crate) fn entry(&self, name: &str) -> Option<&CommandEntry> {
        self.registry.get(name)
    }

    /// Asks before destructive actions; script mode always proceeds.
    pub(crate) fn confirm(&self, prompt: &str) -> Result<bool, CommandError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        Ok(Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(false)
            .interact()?)
    }

    pub(crate) fn confirm_exit(&self) -> Result<bool, CliError> {
        self.confirm("Exit shell?")
            .map_err(|err| CliError::Command(err.to_string()))
    }

    pub(crate) fn report_error(&self, err: CommandError) {
        match err {
            CommandError::ExitRequested => {}
            CommandError::InvalidArguments(message) => {
                output::error(message);
                output::hint("Use `help <command>` for usage details.");
            }
            CommandError::Service(ServiceError::RoomFull { cell, occupied, capacity }) => {
                output::error(format!("{cell} is full ({occupied}/{capacity} beds occupied)."));
                output::hint("Add a bed with `bed-add` or pick another room.");
            }
            other => output::error(other),
        }
    }
}

/// Splits `key=value` arguments; keys are lowercased.
pub(crate) fn parse_fields(args: &[&str]) -> Result<HashMap<String, String>, CommandError> {
    let mut fields = HashMap::new();
    for arg in args {
        let (key, value) = arg.split_once('=').ok_or_else(|| {
            CommandError::InvalidArguments(format!("expected key=value, got `{arg}`"))
        })?;
        let key = key.trim().to_lowercase();
        if key.is_empty() {
            return Err(CommandError::InvalidArguments(format!("missing key in `{arg}`")));
        }
        fields.insert(key, value.trim().to_string());
    }
    Ok(fields)
}

pub(crate) fn require_date(input: &str) -> Result<chrono::NaiveDate, CommandError> {
    parse_date(input).ok_or_else(|| {
        CommandError::InvalidArguments(format!("invalid date `{input}` (use YYYY-MM-DD)"))
    })
}

pub(crate) fn require_amount(input: &str) -> Result<f64, CommandError> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
        .ok_or_else(|| CommandError::InvalidArguments(format!("invalid amount `{input}`")))
}

pub(crate) fn short_id(id: Uuid) -> String {
    let mut short = id.simple().to_string();
    short.truncate(8);
    short
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_split_on_first_equals() {
        let fields = parse_fields(&["Name=Asha Rao", "remarks=a=b"]).expect("fields");
        assert_eq!(fields.get("name").map(String::as_str), Some("Asha Rao"));
        assert_eq!(fields.get("remarks").map(String::as_str), Some("a=b"));
        assert!(parse_fields(&["oops"]).is_err());
    }

    #[test]
    fn amounts_must_be_non_negative_numbers() {
        assert_eq!(require_amount("6500").ok(), Some(6500.0));
        assert!(require_amount("-1").is_err());
        assert!(require_amount("lots").is_err());
        assert!(require_date("2024-13-01").is_err());
    }
}
