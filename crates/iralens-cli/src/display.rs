use std::fmt::Write;

use iralens_pipeline::{AttritionReport, RunSummary};

fn size(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"))
}

// ── Attrition table ──

/// Render the per-status attrition table.
pub fn render_attrition(report: &AttritionReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Attrition ({} companies) ===", report.total);
    let _ = writeln!(
        out,
        "  {:<26} {:>7} {:>7} {:>12} {:>12} {:>9}",
        "status", "count", "share", "mean size", "median size", "sized"
    );
    for group in &report.groups {
        let _ = writeln!(
            out,
            "  {:<26} {:>7} {:>6.1}% {:>12} {:>12} {:>9}",
            group.status.as_str(),
            group.count,
            group.share * 100.0,
            size(group.mean_size),
            size(group.median_size),
            group.with_size,
        );
    }
    if report.unrecognized > 0 {
        let _ = writeln!(out, "  {:<26} {:>7}", "(unrecognized status)", report.unrecognized);
    }
    let verdict = if report.identity_holds() {
        "holds"
    } else {
        "VIOLATED"
    };
    let _ = writeln!(out, "  attrition identity: {verdict}");
    out
}

pub fn print_attrition(report: &AttritionReport) {
    print!("{}", render_attrition(report));
}

pub fn print_run_summary(summary: &RunSummary) {
    println!(
        "Processed {} of {} companies.",
        summary.processed, summary.submitted
    );
    if summary.cancelled {
        println!(
            "Run cancelled: {} companies were not dispatched.",
            summary.not_dispatched()
        );
    }
    println!();
}
