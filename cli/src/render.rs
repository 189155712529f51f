//! Terminal output for replay reports.

use chrono::SecondsFormat;
use colored::Colorize;

use dealboard::board::BoardColumn;

use crate::replay::{ReplayReport, StepReport};

pub fn print_report(report: &ReplayReport) {
    if !report.steps.is_empty() {
        println!("{}", "Steps".bold());
        for step in &report.steps {
            print_step(step);
        }
        println!();
    }

    for notice in &report.notices {
        println!("{} {}: {}", "!".red().bold(), notice.deal_id, notice.message);
    }
    if !report.notices.is_empty() {
        println!();
    }

    for column in &report.board.columns {
        print_column(column);
    }

    let stats = report.stats;
    println!(
        "{}",
        format!(
            "confirmed {}, rolled back {}, stale discarded {}, duplicate inserts {}",
            stats.confirmed, stats.rolled_back, stats.stale_discarded, stats.duplicate_inserts
        )
        .dimmed()
    );
}

fn print_step(step: &StepReport) {
    let outcome = match step.outcome {
        "confirmed" | "changed" => step.outcome.green(),
        "rolled_back" | "discarded" => step.outcome.red(),
        _ => step.outcome.yellow(),
    };
    match &step.message {
        Some(message) => println!(
            "  {:>3}. {} {}: {} ({})",
            step.step, step.deal_id, step.action, outcome, message
        ),
        None => println!(
            "  {:>3}. {} {}: {}",
            step.step, step.deal_id, step.action, outcome
        ),
    }
}

fn print_column(column: &BoardColumn) {
    let totals = column
        .totals
        .iter()
        .map(|(currency, total)| format!("{total:.2} {currency}"))
        .collect::<Vec<_>>()
        .join(", ");
    let header = format!("{} ({})", column.stage.as_str().to_uppercase(), column.len());
    if totals.is_empty() {
        println!("{}", header.bold());
    } else {
        println!("{}  {}", header.bold(), totals.dimmed());
    }

    for deal in &column.deals {
        println!(
            "  {:<10} {:<32} {:>12.2} {}  {}",
            deal.id.as_str(),
            deal.title,
            deal.value,
            deal.currency,
            deal.updated_at
                .to_rfc3339_opts(SecondsFormat::Secs, true)
                .dimmed()
        );
    }
}
