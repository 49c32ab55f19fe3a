use std::fmt::Write as _;

use colored::Colorize;

use crate::fetch::FetchReport;

/// Render the batch summary followed by one listing per non-empty bucket.
///
/// Pure: the caller decides where the text goes.
pub fn render_report(report: &FetchReport) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} Total | {} Success | {} Failed | {} Invalid",
        report.total.to_string().bold(),
        report.succeeded.len().to_string().green().bold(),
        colour_count(report.failed.len(), |s| s.red().bold()),
        colour_count(report.invalid.len(), |s| s.yellow().bold()),
    );

    if !report.succeeded.is_empty() {
        let _ = writeln!(out, "\n{}", "Success URLs:".green().bold());
        for url in &report.succeeded {
            let _ = writeln!(out, "  {url}");
        }
    }

    if !report.failed.is_empty() {
        let _ = writeln!(out, "\n{}", "Failed URLs:".red().bold());
        for failure in &report.failed {
            let _ = writeln!(
                out,
                "  {} {}",
                failure.url,
                format!("({}: {})", failure.kind, failure.error).dimmed()
            );
        }
    }

    if !report.invalid.is_empty() {
        let _ = writeln!(out, "\n{}", "Invalid URLs:".yellow().bold());
        for url in &report.invalid {
            let _ = writeln!(out, "  {url}");
        }
    }

    out
}

// Zero counts stay plain so a clean run doesn't light up red
fn colour_count(
    count: usize,
    style: impl Fn(&str) -> colored::ColoredString,
) -> colored::ColoredString {
    let text = count.to_string();
    if count == 0 {
        text.normal()
    } else {
        style(&text)
    }
}
