use chrono::Datelike;

use crate::cli::context::{require_date, CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::table::{Table, TableColumn};
use crate::core::services::{Report, ReportService, ReportStats, StatusTotals, SummaryService};

use super::take_building;

const REPORT_USAGE: &str =
    "report [all | month YYYY-MM | range FROM TO | compare] [--building <name>]";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "dashboard",
            "Occupancy and payment overview",
            "dashboard",
            cmd_dashboard,
        ),
        CommandEntry::new("report", "Revenue and payment statistics", REPORT_USAGE, cmd_report),
    ]
}

fn cmd_dashboard(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    context.manager.refresh_breaches();
    let dashboard = SummaryService::dashboard(&context.manager);

    output::section("Dashboard");
    let mut totals = Table::new(vec![
        TableColumn::left("Scope"),
        TableColumn::right("Guests"),
        TableColumn::right("Paid"),
        TableColumn::right("Pending"),
        TableColumn::right("Breached"),
    ]);
    totals.push(totals_row("All", &dashboard.totals));
    for (building, building_totals) in &dashboard.buildings {
        totals.push(totals_row(building, building_totals));
    }
    println!("{}", totals.render());

    if dashboard.upcoming.is_empty() {
        output::info("No upcoming payments.");
        return Ok(());
    }
    output::section("Upcoming payments");
    let mut upcoming = Table::new(vec![
        TableColumn::left("Name").max(24),
        TableColumn::left("Building"),
        TableColumn::left("Room"),
        TableColumn::left("Due"),
        TableColumn::right("Days"),
        TableColumn::left("Status"),
    ]);
    for payment in &dashboard.upcoming {
        upcoming.push(vec![
            payment.name.clone(),
            payment.building.clone(),
            payment.room_no.clone(),
            payment.due.to_string(),
            payment.label.clone(),
            payment.status.to_string(),
        ]);
    }
    println!("{}", upcoming.render());
    Ok(())
}

fn cmd_report(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (building, rest) = take_building(args)?;
    let building = building.as_deref();
    let manager = &context.manager;
    match rest.as_slice() {
        [] | ["all"] => print_report(&ReportService::all(manager, building)),
        ["month"] => {
            let today = manager.today();
            let report = ReportService::monthly(manager, today.year(), today.month(), building)?;
            print_report(&report);
        }
        ["month", month] => {
            let (year, month) = parse_month(month)?;
            print_report(&ReportService::monthly(manager, year, month, building)?);
        }
        ["range", from, to] => {
            let report =
                ReportService::range(manager, require_date(from)?, require_date(to)?, building)?;
            print_report(&report);
        }
        ["compare"] => {
            let rows = ReportService::monthly_comparison(manager.guests(), building);
            if rows.is_empty() {
                output::info("No payments recorded yet.");
                return Ok(());
            }
            output::section("Monthly comparison");
            let mut table = stats_table("Month");
            for (month, stats) in &rows {
                table.push(stats_row(month, stats));
            }
            println!("{}", table.render());
        }
        _ => {
            return Err(CommandError::InvalidArguments(format!("usage: {REPORT_USAGE}")));
        }
    }
    Ok(())
}

fn print_report(report: &Report<'_>) {
    let scope = report
        .building
        .as_deref()
        .map(|name| format!(" ({name})"))
        .unwrap_or_default();
    output::section(format!("Report: {}{scope}", report.period.title()));
    let stats = &report.stats;
    output::info(format!(
        "Guests {} | Paid {} | Pending {} | Breached {} | Vacated {}",
        stats.guests, stats.paid, stats.pending, stats.breached, stats.vacated
    ));
    output::info(format!(
        "Revenue {:.2} | Collected {:.2} | Outstanding {:.2} | Collection rate {:.2}%",
        stats.total_revenue, stats.collected_revenue, stats.pending_revenue, stats.collection_rate
    ));
    if report.guests.is_empty() {
        return;
    }
    let mut table = Table::new(vec![
        TableColumn::left("Name").max(24),
        TableColumn::left("Building"),
        TableColumn::left("Room"),
        TableColumn::left("Paid on"),
        TableColumn::right("Amount"),
        TableColumn::left("Status"),
    ]);
    for guest in &report.guests {
        table.push(vec![
            guest.name.clone(),
            guest.building.clone(),
            guest.room_no.clone(),
            guest
                .monthly_payment_date
                .map(|date| date.to_string())
                .unwrap_or_else(|| "-".into()),
            format!("{:.2}", guest.payment_amount),
            guest.monthly_payment_status.to_string(),
        ]);
    }
    println!("{}", table.render());
}

fn totals_row(scope: &str, totals: &StatusTotals) -> Vec<String> {
    vec![
        scope.to_string(),
        totals.total.to_string(),
        totals.paid.to_string(),
        totals.pending.to_string(),
        totals.breached.to_string(),
    ]
}

fn stats_table(first: &str) -> Table {
    Table::new(vec![
        TableColumn::left(first),
        TableColumn::right("Guests"),
        TableColumn::right("Paid"),
        TableColumn::right("Pending"),
        TableColumn::right("Breached"),
        TableColumn::right("Collected"),
        TableColumn::right("Rate %"),
    ])
}

fn stats_row(label: &str, stats: &ReportStats) -> Vec<String> {
    vec![
        label.to_string(),
        stats.guests.to_string(),
        stats.paid.to_string(),
        stats.pending.to_string(),
        stats.breached.to_string(),
        format!("{:.2}", stats.collected_revenue),
        format!("{:.2}", stats.collection_rate),
    ]
}

/// `YYYY-MM` into year and month.
fn parse_month(raw: &str) -> Result<(i32, u32), CommandError> {
    let invalid = || CommandError::InvalidArguments(format!("invalid month `{raw}` (use YYYY-MM)"));
    let (year, month) = raw.split_once('-').ok_or_else(invalid)?;
    let year = year.parse::<i32>().map_err(|_| invalid())?;
    let month = month.parse::<u32>().map_err(|_| invalid())?;
    Ok((year, month))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_argument_parses() {
        assert_eq!(parse_month("2024-03").ok(), Some((2024, 3)));
        assert!(parse_month("2024").is_err());
        assert!(parse_month("march-2024").is_err());
    }
}
