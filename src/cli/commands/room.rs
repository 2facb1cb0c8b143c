use crate::capacity::{BedSlot, CapacityDelta, RoomStatus};
use crate::cli::context::{CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::table::{Table, TableColumn};
use crate::core::services::{CapacityOutcome, CapacityService};
use crate::domain::SharingType;

use super::parse_cell;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("rooms", "Show the bed grid of a building", "rooms [building]", cmd_rooms),
        CommandEntry::new(
            "bed-add",
            "Add one bed to a room's sharing type",
            "bed-add <building> <room> <sharing>",
            cmd_bed_add,
        ),
        CommandEntry::new(
            "bed-remove",
            "Remove one free bed from a room's sharing type",
            "bed-remove <building> <room> <sharing>",
            cmd_bed_remove,
        ),
    ]
}

fn cmd_rooms(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let buildings: Vec<String> = match args.first() {
        Some(name) => vec![name.to_string()],
        None => context
            .manager
            .config()
            .building_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    };
    if buildings.is_empty() {
        output::info("No buildings configured.");
        return Ok(());
    }
    for building in buildings {
        let grid = CapacityService::room_status(&context.manager, &building)?;
        let occupied: usize = grid.iter().map(RoomStatus::occupied).sum();
        let capacity: usize = grid.iter().map(RoomStatus::capacity).sum();
        output::section(format!("{building} ({occupied}/{capacity} beds)"));
        println!("{}", render_grid(&grid));
    }
    Ok(())
}

fn cmd_bed_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    change_capacity(context, args, CapacityDelta::Increase, "bed-add")
}

fn cmd_bed_remove(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    change_capacity(context, args, CapacityDelta::Decrease, "bed-remove")
}

fn change_capacity(
    context: &mut ShellContext,
    args: &[&str],
    delta: CapacityDelta,
    name: &str,
) -> CommandResult {
    let cell = parse_cell(args, &format!("{name} <building> <room> <sharing>"))?;
    match CapacityService::change(&mut context.manager, &cell, delta)? {
        CapacityOutcome::Applied { capacity } => {
            output::success(format!("{cell} now has {capacity} bed(s)."));
        }
        CapacityOutcome::Refused(reason) => {
            output::warning(format!("{cell}: {reason}"));
        }
    }
    Ok(())
}

fn render_grid(grid: &[RoomStatus]) -> String {
    let mut columns = vec![TableColumn::left("Room")];
    columns.extend(
        SharingType::ALL
            .iter()
            .map(|sharing_type| TableColumn::left(&sharing_type.to_string()).max(40)),
    );
    let mut table = Table::new(columns);
    for room in grid {
        let mut row = vec![room.room_no.clone()];
        row.extend(room.sharing.iter().map(|cell| {
            let beds: Vec<&str> = cell
                .beds
                .iter()
                .map(|bed| match bed {
                    BedSlot::Occupied(name) => name.as_str(),
                    BedSlot::Free => "-",
                })
                .collect();
            format!(
                "{}/{} {} [{}]",
                cell.occupied,
                cell.capacity,
                cell.occupancy(),
                beds.join(", ")
            )
        }));
        table.push(row);
    }
    table.render()
}
