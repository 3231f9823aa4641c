//! Markdown migration report

use chrono::{DateTime, Utc};
use relocp_config::Config;
use relocp_state::MigrationState;
use std::fmt::Write;

/// Render the final migration report as Markdown.
///
/// Every non-empty error, rename, skip, and discrepancy list gets its own
/// section; the conclusion states plainly whether the migration was clean.
pub fn render(state: &MigrationState, config: &Config) -> String {
    let mut out = String::new();
    let w = &mut out;

    let _ = writeln!(w, "# Data Migration Report\n");
    let _ = writeln!(
        w,
        "**Generated:** {}\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );

    let _ = writeln!(w, "## General");
    let _ = writeln!(w, "- **Source:** {}", config.source.root.display());
    let _ = writeln!(w, "- **Target:** {}", config.target.root.display());
    let _ = writeln!(w, "- **Started:** {}", fmt_time(state.started_at));
    let _ = writeln!(w, "- **Finished:** {}", fmt_time(state.finished_at));
    let _ = writeln!(w, "- **Duration:** {}", fmt_duration(state));
    let _ = writeln!(w, "- **Final phase:** {}", state.phase);
    if state.restart_generation > 0 {
        let _ = writeln!(w, "- **Restarts:** {}", state.restart_generation);
    }
    let _ = writeln!(w);

    let _ = writeln!(w, "## Data Volume");
    let _ = writeln!(w, "- **Total size:** {}", format_size(state.total_size_bytes));
    let _ = writeln!(
        w,
        "- **Copied this pass:** {}",
        format_size(state.copied_size_bytes)
    );
    let _ = writeln!(w, "- **Average speed:** {}\n", average_speed(state));

    let _ = writeln!(w, "## Results");
    let _ = writeln!(w, "- **Total files:** {}", state.total_files);
    let _ = writeln!(w, "- **Copied:** {}", state.files_copied);
    let _ = writeln!(w, "- **Copy errors:** {}", state.copy_errors.len());
    let _ = writeln!(w, "- **Renamed:** {}", state.renamed_files.len());
    let _ = writeln!(w, "- **Skipped:** {}\n", state.skipped_files.len());

    if !state.copy_errors.is_empty() {
        let _ = writeln!(w, "### Copy Errors\n");
        for e in &state.copy_errors {
            let _ = writeln!(w, "- `{}`: {}", e.path, e.reason);
        }
        let _ = writeln!(w);
    }

    if !state.renamed_files.is_empty() {
        let _ = writeln!(w, "### Renamed Files\n");
        let _ = writeln!(w, "| Original name | New name |");
        let _ = writeln!(w, "|---------------|----------|");
        for r in &state.renamed_files {
            let _ = writeln!(w, "| {} | {} |", r.original_name, r.new_name);
        }
        let _ = writeln!(w);
    }

    if !state.skipped_files.is_empty() {
        let _ = writeln!(w, "### Skipped Files\n");
        let _ = writeln!(w, "Total skipped: {}\n", state.skipped_files.len());
        for s in &state.skipped_files {
            let _ = writeln!(w, "- {}", s);
        }
        let _ = writeln!(w);
    }

    let _ = writeln!(w, "## Integrity Verification");
    let _ = writeln!(w, "- **Verified:** {}", state.files_verified);
    let _ = writeln!(w, "- **Discrepancies:** {}\n", state.discrepancies.len());

    if !state.discrepancies.is_empty() {
        let _ = writeln!(w, "### Discrepancies\n");
        for d in &state.discrepancies {
            let _ = writeln!(
                w,
                "- `{}`: expected {}, got {}",
                d.path, d.expected, d.actual
            );
        }
        let _ = writeln!(w);
    }

    let _ = writeln!(w, "## Conclusion");
    let errors = !state.copy_errors.is_empty();
    let discrepancies = !state.discrepancies.is_empty();
    match (errors, discrepancies) {
        (false, false) => {
            let _ = writeln!(w, "The migration completed **successfully**.");
        }
        (true, true) => {
            let _ = writeln!(
                w,
                "The migration completed with **copy errors** and **integrity discrepancies**."
            );
        }
        (true, false) => {
            let _ = writeln!(w, "The migration completed with **copy errors**.");
        }
        (false, true) => {
            let _ = writeln!(
                w,
                "The migration completed with **integrity discrepancies**."
            );
        }
    }
    if errors || discrepancies {
        let _ = writeln!(w, "\n**Recommended:**");
        if errors {
            let _ = writeln!(w, "- Review the Copy Errors section above.");
        }
        if discrepancies {
            let _ = writeln!(w, "- Review the Discrepancies section above.");
        }
        let _ = writeln!(
            w,
            "- Re-run the migration for the affected files or contact an administrator."
        );
    }

    out
}

fn fmt_time(t: Option<DateTime<Utc>>) -> String {
    t.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn fmt_duration(state: &MigrationState) -> String {
    match (state.started_at, state.finished_at) {
        (Some(a), Some(b)) => {
            let secs = (b - a).num_seconds().max(0);
            if secs < 60 {
                format!("{}s", secs)
            } else if secs < 3600 {
                format!("{}m {}s", secs / 60, secs % 60)
            } else {
                format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
            }
        }
        _ => "unknown".to_string(),
    }
}

fn average_speed(state: &MigrationState) -> String {
    match (state.started_at, state.finished_at) {
        (Some(a), Some(b)) if (b - a).num_seconds() > 0 => {
            let secs = (b - a).num_seconds() as f64;
            let rate = state.copied_size_bytes as f64 / secs;
            format!("{}/s", format_size(rate as u64))
        }
        _ => "unknown".to_string(),
    }
}

/// Human-readable byte count
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use relocp_types::Phase;

    fn finished_state() -> MigrationState {
        let mut state = MigrationState::new();
        state.advance(Phase::Mounting).unwrap();
        state.advance(Phase::Copying).unwrap();
        state.total_files = 3;
        state.total_size_bytes = 3 * 1024 * 1024;
        state.record_copied("a.txt", "a.txt", 1024 * 1024);
        state.record_copied("sub/c.txt", "sub/c.txt", 2 * 1024 * 1024);
        state.advance(Phase::Verifying).unwrap();
        state.files_verified = 2;
        state.advance(Phase::Completed).unwrap();
        state
    }

    #[test]
    fn test_clean_report_conclusion() {
        let report = render(&finished_state(), &Config::default());
        assert!(report.contains("# Data Migration Report"));
        assert!(report.contains("**Total files:** 3"));
        assert!(report.contains("completed **successfully**"));
        assert!(!report.contains("### Copy Errors"));
        assert!(!report.contains("### Discrepancies"));
    }

    #[test]
    fn test_errors_and_discrepancies_sections() {
        let mut state = finished_state();
        state.record_copy_error("b.txt", "permission denied");
        state.record_discrepancy("a.txt", "abc", "def");

        let report = render(&state, &Config::default());
        assert!(report.contains("### Copy Errors"));
        assert!(report.contains("`b.txt`: permission denied"));
        assert!(report.contains("### Discrepancies"));
        assert!(report.contains("**copy errors** and **integrity discrepancies**"));
        assert!(report.contains("**Recommended:**"));
    }

    #[test]
    fn test_renamed_files_table() {
        let mut state = finished_state();
        state.record_renamed("b.txt", "b.txt", "b-1.txt", 10);

        let report = render(&state, &Config::default());
        assert!(report.contains("| b.txt | b-1.txt |"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512.00 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }
}
