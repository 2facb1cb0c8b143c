mod guest;
mod maintenance;
mod report;
mod room;
mod system;

use uuid::Uuid;

use crate::core::services::GuestService;
use crate::domain::{CapacityCell, SharingType};

use super::context::{CommandError, ShellContext};
use super::registry::CommandRegistry;

pub(crate) fn register_all(registry: &mut CommandRegistry) {
    let entries = system::definitions()
        .into_iter()
        .chain(report::definitions())
        .chain(guest::definitions())
        .chain(room::definitions())
        .chain(maintenance::definitions());
    for entry in entries {
        registry.register(entry);
    }
    registry.alias("quit", "exit");
    registry.alias("ls", "guests");
}

fn resolve_guest(context: &ShellContext, key: Option<&&str>) -> Result<Uuid, CommandError> {
    let key = key.ok_or_else(|| CommandError::InvalidArguments("guest id is required".into()))?;
    Ok(GuestService::find(&context.manager, key)?.id)
}

fn parse_sharing(raw: &str) -> Result<SharingType, CommandError> {
    raw.parse::<SharingType>()
        .map_err(CommandError::InvalidArguments)
}

/// `<building> <room> <sharing>` as used by the room commands.
fn parse_cell(args: &[&str], usage: &str) -> Result<CapacityCell, CommandError> {
    match args {
        [building, room, sharing] => Ok(CapacityCell::new(*building, *room, parse_sharing(sharing)?)),
        _ => Err(CommandError::InvalidArguments(format!("usage: {usage}"))),
    }
}

/// Pulls `--building <name>` out of `args`, returning it and the remaining words.
fn take_building<'a>(args: &[&'a str]) -> Result<(Option<String>, Vec<&'a str>), CommandError> {
    let mut building = None;
    let mut rest = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if *arg == "--building" || *arg == "-b" {
            let name = iter.next().ok_or_else(|| {
                CommandError::InvalidArguments("--building needs a building name".into())
            })?;
            building = Some(name.to_string());
        } else {
            rest.push(*arg);
        }
    }
    Ok((building, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn building_flag_is_extracted() {
        let (building, rest) =
            take_building(&["month", "--building", "Building-2", "2024-03"]).expect("args");
        assert_eq!(building.as_deref(), Some("Building-2"));
        assert_eq!(rest, vec!["month", "2024-03"]);
        assert!(take_building(&["-b"]).is_err());
    }

    #[test]
    fn cell_needs_three_parts() {
        let cell = parse_cell(&["Building-1", "G01", "2"], "x").expect("cell");
        assert_eq!(cell.sharing_type, SharingType::Two);
        assert!(parse_cell(&["Building-1", "G01"], "x").is_err());
        assert!(parse_cell(&["Building-1", "G01", "4"], "x").is_err());
    }
}
