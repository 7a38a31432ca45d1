//! Text rendering of a benchmark report.

use colliery_core::benchmark::BenchmarkReport;

/// Column header of the results table.
pub const HEADER: &str = "miners\ttime [s]\tspeedup\tefficiency";

/// Results table: the header followed by one line per crew size, figures
/// with two decimals.
pub fn render(report: &BenchmarkReport) -> Vec<String> {
    let mut lines = Vec::with_capacity(report.rows.len().saturating_add(1));
    lines.push(HEADER.to_owned());
    lines.extend(report.rows.iter().map(|row| {
        format!(
            "{}\t{:.2}\t\t{:.2}\t{:.2}",
            row.miners,
            row.elapsed_seconds(),
            row.speedup,
            row.efficiency
        )
    }));
    lines
}
