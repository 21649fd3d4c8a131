//! Human-readable run summary.

use std::io::{self, Write};

use bytesize::ByteSize;

use crate::duplicates::{Outcome, RunReport};

/// Text summary of a run.
#[derive(Debug, Clone, Copy)]
pub struct TextOutput<'a> {
    report: &'a RunReport,
    list_actions: bool,
}

impl<'a> TextOutput<'a> {
    /// Summary of `report` without per-file lines.
    #[must_use]
    pub fn new(report: &'a RunReport) -> Self {
        Self {
            report,
            list_actions: false,
        }
    }

    /// Also list every action and error.
    #[must_use]
    pub fn with_actions(mut self, enabled: bool) -> Self {
        self.list_actions = enabled;
        self
    }

    /// Write the summary.
    ///
    /// # Errors
    ///
    /// Returns any error from `writer`.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let report = self.report;
        let stats = &report.stats;

        if report.simulated {
            writeln!(writer, "DRY RUN (simulated) - no files were changed")?;
        }
        writeln!(
            writer,
            "{} ({}, {})",
            report.root.display(),
            report.algorithm,
            report.strategy
        )?;

        if self.list_actions {
            for record in report.notable_records() {
                writeln!(writer, "  {}", describe(&record.outcome, &record.path))?;
            }
        }

        let saved_label = if report.simulated {
            "Space that would be saved"
        } else {
            "Space saved"
        };
        let rows: [(&str, String); 10] = [
            ("Files processed", stats.files_processed.to_string()),
            ("Files excluded", stats.files_excluded.to_string()),
            ("Files skipped", stats.files_skipped.to_string()),
            ("Duplicates found", stats.duplicates_found.to_string()),
            ("Duplicates removed", stats.duplicates_removed.to_string()),
            ("Hard links created", stats.hardlinks_created.to_string()),
            (saved_label, ByteSize::b(stats.bytes_saved).to_string()),
            ("Stale index entries", stats.stale_entries.to_string()),
            ("Errors", stats.errors.to_string()),
            ("Index entries", report.index_entries.to_string()),
        ];
        let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
        for (label, value) in rows {
            writeln!(writer, "{label:<width$}  {value}")?;
        }

        if let Some(prefilter) = report.prefilter {
            writeln!(
                writer,
                "{:<width$}  {} lookup(s) skipped",
                "Bloom prefilter", prefilter.skipped_lookups
            )?;
        }
        if !report.index_synced {
            writeln!(writer, "WARNING: the index could not be saved completely")?;
        }
        if report.interrupted {
            writeln!(
                writer,
                "Interrupted: {} file(s) were not processed",
                stats.interrupted
            )?;
        }
        Ok(())
    }
}

fn describe(outcome: &Outcome, path: &std::path::Path) -> String {
    match outcome {
        Outcome::Hardlinked { original } => {
            format!("link    {} -> {}", path.display(), original.display())
        }
        Outcome::Deleted { original } => {
            format!("delete  {} (same as {})", path.display(), original.display())
        }
        Outcome::Renamed { renamed_to, .. } => {
            format!("rename  {} -> {}", path.display(), renamed_to.display())
        }
        Outcome::Error { message } => format!("error   {}: {}", path.display(), message),
        other => format!("{:<7} {}", other.kind(), path.display()),
    }
}
