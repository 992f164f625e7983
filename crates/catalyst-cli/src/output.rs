use catalyst_core::dispatcher::Outcome;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  ").trim_end());

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}

/// Report what handling an utterance did. Statuses are printed verbatim on
/// their own line.
pub fn print_outcome(outcome: &Outcome, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(outcome);
    }
    match outcome {
        Outcome::Ignored => {}
        Outcome::Resumed(r) => {
            println!("  resumed: {}", r.action);
        }
        Outcome::Executed { invocations } => {
            for inv in invocations.iter().take(invocations.len().saturating_sub(1)) {
                println!("  {}: {}", inv.action, inv.status);
            }
        }
        Outcome::Committed { report, .. } => {
            for name in &report.appended {
                println!("  created: {name}");
            }
        }
    }
    if let Some(status) = outcome.status() {
        println!("{status}");
    }
    Ok(())
}
