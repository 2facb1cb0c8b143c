use std::collections::HashMap;

use crate::capacity::Admission;
use crate::cli::context::{
    parse_fields, require_amount, require_date, CommandError, CommandResult, ShellContext,
};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::table::{Table, TableColumn};
use crate::core::services::{GuestFilter, GuestService};
use crate::domain::{CapacityCell, Guest, GuestDraft, GuestPatch, PaymentStatus, VacateFlag};

use super::{parse_cell, parse_sharing, resolve_guest, take_building};

const ADD_USAGE: &str = "guest-add name=<name> mobile=<mobile> building=<building> room=<room> \
sharing=<1|2|3> joined=<YYYY-MM-DD> [advance=<amount>] [amount=<rent>] [paid=<date>] \
[status=<status>] [remarks=<text>]";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "guests",
            "List guests, optionally filtered",
            "guests [--all] [--building <name>] [search words]",
            cmd_guests,
        ),
        CommandEntry::new("guest", "Show one guest", "guest <id>", cmd_guest),
        CommandEntry::new("guest-add", "Register a guest", ADD_USAGE, cmd_guest_add),
        CommandEntry::new(
            "guest-edit",
            "Update guest fields",
            "guest-edit <id> key=value... (keys as guest-add, plus vacate=yes|no)",
            cmd_guest_edit,
        ),
        CommandEntry::new(
            "pay",
            "Record a monthly payment",
            "pay <id> <date> [paid|partial] [amount]",
            cmd_pay,
        ),
        CommandEntry::new("vacate", "Mark a guest as vacated", "vacate <id>", cmd_vacate),
        CommandEntry::new("guest-delete", "Delete a guest record", "guest-delete <id>", cmd_delete),
        CommandEntry::new(
            "check",
            "Check whether a cell has a free bed",
            "check <building> <room> <sharing>",
            cmd_check,
        ),
    ]
}

fn cmd_guests(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (building, rest) = take_building(args)?;
    let include_vacated = rest.contains(&"--all");
    let words: Vec<&str> = rest.into_iter().filter(|word| *word != "--all").collect();
    let filter = GuestFilter {
        building,
        query: (!words.is_empty()).then(|| words.join(" ")),
        include_vacated,
    };
    context.manager.refresh_breaches();
    let guests = GuestService::list(&context.manager, &filter);
    if guests.is_empty() {
        output::info("No guests match.");
        return Ok(());
    }
    let mut table = Table::new(vec![
        TableColumn::left("ID"),
        TableColumn::left("Name").max(24),
        TableColumn::left("Mobile"),
        TableColumn::left("Building"),
        TableColumn::left("Room"),
        TableColumn::left("Sharing"),
        TableColumn::left("Due"),
        TableColumn::right("Days"),
        TableColumn::left("Status"),
    ]);
    for guest in &guests {
        let mut status = guest.monthly_payment_status.to_string();
        if !guest.is_active() {
            status.push_str(" (vacated)");
        }
        table.push(vec![
            guest.short_id(),
            guest.name.clone(),
            guest.mobile.clone(),
            guest.building.clone(),
            guest.room_no.clone(),
            guest.sharing_type.to_string(),
            format_due(context, guest),
            GuestService::days_label(&context.manager, guest),
            status,
        ]);
    }
    output::section(format!("Guests ({})", guests.len()));
    println!("{}", table.render());
    Ok(())
}

fn cmd_guest(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let key = args
        .first()
        .ok_or_else(|| CommandError::InvalidArguments("usage: guest <id>".into()))?;
    let guest = GuestService::find(&context.manager, key)?;
    output::section(&guest.name);
    let lines = [
        ("ID", guest.id.to_string()),
        ("Mobile", guest.mobile.clone()),
        ("Cell", guest.cell().to_string()),
        ("Joined", guest.joining_date.to_string()),
        ("Advance", format!("{:.2}", guest.advance_payment)),
        ("Rent", format!("{:.2}", guest.payment_amount)),
        (
            "Last payment",
            guest
                .monthly_payment_date
                .map(|date| date.to_string())
                .unwrap_or_else(|| "none".into()),
        ),
        ("Next due", format_due(context, guest)),
        ("Countdown", GuestService::days_label(&context.manager, guest)),
        ("Status", guest.monthly_payment_status.to_string()),
        ("Vacated", guest.room_vacate.to_string()),
        ("Remarks", guest.remarks.clone()),
    ];
    for (label, value) in lines {
        output::info(format!("{label:<13}: {value}"));
    }
    Ok(())
}

fn cmd_guest_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let mut fields = parse_fields(args)?;
    let name = take_required(&mut fields, "name")?;
    let mobile = take_required(&mut fields, "mobile")?;
    let building = take_required(&mut fields, "building")?;
    let room = take_required(&mut fields, "room")?;
    let sharing = parse_sharing(&take_required(&mut fields, "sharing")?)?;
    let joined = require_date(&take_required(&mut fields, "joined")?)?;

    let cell = CapacityCell::new(building, room, sharing);
    let mut draft = GuestDraft::new(name, mobile, cell.clone(), joined);
    if let Some(value) = fields.remove("advance") {
        draft.advance_payment = require_amount(&value)?;
    }
    if let Some(value) = fields.remove("amount") {
        draft.payment_amount = require_amount(&value)?;
    }
    if let Some(value) = fields.remove("paid") {
        draft.monthly_payment_date = Some(require_date(&value)?);
    }
    if let Some(value) = fields.remove("status") {
        draft.monthly_payment_status = Some(parse_status(&value)?);
    }
    if let Some(value) = fields.remove("remarks") {
        draft.remarks = value;
    }
    reject_unknown(fields)?;

    let last_bed = matches!(
        GuestService::preview_admission(&context.manager, &cell, None),
        Admission::Admitted { last_bed: true, .. }
    );
    let guest = GuestService::register(&mut context.manager, draft)?;
    output::success(format!(
        "Registered {} ({}) in {}. Next due {}.",
        guest.name,
        guest.short_id(),
        cell,
        format_due(context, &guest)
    ));
    if last_bed {
        output::warning(format!("{cell} is now full."));
    }
    Ok(())
}

fn cmd_guest_edit(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let id = resolve_guest(context, args.first())?;
    let mut fields = parse_fields(&args[1..])?;
    let mut patch = GuestPatch {
        name: fields.remove("name"),
        mobile: fields.remove("mobile"),
        building: fields.remove("building"),
        room_no: fields.remove("room"),
        remarks: fields.remove("remarks"),
        ..GuestPatch::default()
    };
    if let Some(value) = fields.remove("sharing") {
        patch.sharing_type = Some(parse_sharing(&value)?);
    }
    if let Some(value) = fields.remove("joined") {
        patch.joining_date = Some(require_date(&value)?);
    }
    if let Some(value) = fields.remove("paid") {
        patch.monthly_payment_date = Some(require_date(&value)?);
    }
    if let Some(value) = fields.remove("advance") {
        patch.advance_payment = Some(require_amount(&value)?);
    }
    if let Some(value) = fields.remove("amount") {
        patch.payment_amount = Some(require_amount(&value)?);
    }
    if let Some(value) = fields.remove("status") {
        patch.monthly_payment_status = Some(parse_status(&value)?);
    }
    if let Some(value) = fields.remove("vacate") {
        patch.room_vacate = Some(parse_vacate(&value)?);
    }
    reject_unknown(fields)?;

    let guest = GuestService::edit(&mut context.manager, id, patch)?;
    output::success(format!("Updated {} ({}).", guest.name, guest.short_id()));
    Ok(())
}

fn cmd_pay(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let id = resolve_guest(context, args.first())?;
    let raw_date = args.get(1).ok_or_else(|| {
        CommandError::InvalidArguments("usage: pay <id> <date> [paid|partial] [amount]".into())
    })?;
    let date = require_date(raw_date)?;
    let status = match args.get(2) {
        Some(raw) => parse_status(raw)?,
        None => PaymentStatus::Paid,
    };
    let amount = args.get(3).map(|raw| require_amount(raw)).transpose()?;
    let guest = GuestService::record_payment(&mut context.manager, id, date, status, amount)?;
    output::success(format!(
        "{} marked {} on {}. Next due {}.",
        guest.name,
        guest.monthly_payment_status,
        date,
        format_due(context, &guest)
    ));
    Ok(())
}

fn cmd_vacate(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let id = resolve_guest(context, args.first())?;
    let guest = GuestService::vacate(&mut context.manager, id)?;
    output::success(format!("{} vacated {}.", guest.name, guest.cell()));
    Ok(())
}

fn cmd_delete(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let id = resolve_guest(context, args.first())?;
    let name = context
        .manager
        .guest(id)
        .map(|guest| guest.name.clone())
        .unwrap_or_default();
    if !context.confirm(&format!("Delete {name} permanently?"))? {
        output::info("Delete cancelled.");
        return Ok(());
    }
    GuestService::delete(&mut context.manager, id)?;
    output::success(format!("Deleted {name}."));
    Ok(())
}

fn cmd_check(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let cell = parse_cell(args, "check <building> <room> <sharing>")?;
    match GuestService::preview_admission(&context.manager, &cell, None) {
        Admission::Admitted {
            occupied,
            capacity,
            last_bed,
        } => {
            output::success(format!("{cell}: {occupied}/{capacity} beds occupied, bed available."));
            if last_bed {
                output::warning("Only one bed left.");
            }
        }
        Admission::Refused { occupied, capacity } => {
            output::warning(format!("{cell} is full ({occupied}/{capacity})."));
        }
    }
    Ok(())
}

fn format_due(context: &ShellContext, guest: &Guest) -> String {
    guest
        .upcoming_payment_due_date
        .map(|date| date.to_string())
        .unwrap_or_else(|| context.manager.config().missing_due_label.as_str().to_string())
}

fn take_required(fields: &mut HashMap<String, String>, key: &str) -> Result<String, CommandError> {
    fields
        .remove(key)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| CommandError::InvalidArguments(format!("`{key}` is required")))
}

fn reject_unknown(fields: HashMap<String, String>) -> Result<(), CommandError> {
    let mut unknown: Vec<String> = fields.into_keys().collect();
    if unknown.is_empty() {
        return Ok(());
    }
    unknown.sort();
    Err(CommandError::InvalidArguments(format!(
        "unknown field(s): {}",
        unknown.join(", ")
    )))
}

fn parse_status(raw: &str) -> Result<PaymentStatus, CommandError> {
    raw.parse::<PaymentStatus>()
        .map_err(CommandError::InvalidArguments)
}

fn parse_vacate(raw: &str) -> Result<VacateFlag, CommandError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" => Ok(VacateFlag::Yes),
        "no" | "n" | "false" => Ok(VacateFlag::No),
        other => Err(CommandError::InvalidArguments(format!(
            "vacate must be yes or no, not `{other}`"
        ))),
    }
}
