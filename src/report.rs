use std::fmt::Write;

use crate::batch::BatchReport;
use crate::db::RunRow;
use crate::parser::rules;
use crate::parser::Tally;

/// One `  - N label` line per non-zero entry, catalog order first.
pub fn format_tally(tally: &Tally) -> String {
    let mut out = String::new();
    for (key, n) in tally.entries() {
        let label = rules::find(key).map(|r| r.label).unwrap_or(key);
        let _ = writeln!(out, "  - {} {}", n, label);
    }
    out
}

pub fn format_report(report: &BatchReport) -> String {
    let mut out = String::new();
    if report.dry_run {
        out.push_str("Dry run, nothing was saved.\n");
    }
    if report.updated == 0 {
        out.push_str("No custom blocks were converted.\n");
    } else {
        let _ = writeln!(out, "Custom blocks converted in {} post(s):", report.updated);
        out.push_str(&format_tally(&report.tally));
    }
    let _ = writeln!(out, "Scanned:   {}", report.scanned);
    if report.failed > 0 {
        let _ = writeln!(out, "Failed:    {}", report.failed);
    }
    out
}

pub fn print_report(report: &BatchReport) {
    print!("{}", format_report(report));
}

/// The report as pretty-printed JSON, for scripting.
pub fn format_report_json(report: &BatchReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

pub fn format_runs(runs: &[RunRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<20} | {:<20} | {:>7} | {:>7} | {:>7} | {:>6} | {:>6}",
        "Run", "Started", "Took", "Scanned", "Updated", "Failed", "Blocks"
    );
    let _ = writeln!(out, "{}", "-".repeat(92));
    for run in runs {
        let started = run
            .started()
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| run.started_at.clone());
        let took = run
            .elapsed()
            .map(|d| format!("{:.1}s", d.num_milliseconds() as f64 / 1000.0))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:<20} | {:<20} | {:>7} | {:>7} | {:>7} | {:>6} | {:>6}",
            run.run_id,
            started,
            took,
            run.scanned,
            run.updated,
            run.failed,
            run.tally.total()
        );
        out.push_str(&format_tally(&run.tally));
    }
    out
}
