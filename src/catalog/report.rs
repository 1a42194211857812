//! Outcome aggregation for a reconciliation run.

use serde::Serialize;
use std::fmt::Write as _;

/// Aggregate counts of a run.
///
/// `deleted` is always zero: reconciliation never removes roles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Roles created.
    pub created: usize,
    /// Roles whose permission set was replaced.
    pub updated: usize,
    /// Existing roles left untouched.
    pub skipped: usize,
    /// Roles removed.
    pub deleted: usize,
    /// Roles whose reconciliation failed.
    pub failed: usize,
}

/// Result of reconciling a single role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "error", rename_all = "snake_case")]
pub enum RoleOutcome {
    /// The role was created.
    Created,
    /// The role's permission set was replaced.
    Updated,
    /// The role already existed and was not modified.
    Skipped,
    /// Dry run: the role would be created.
    WouldCreate,
    /// Dry run: the role would have its permission set replaced.
    WouldUpdate,
    /// Dry run: the role would be left untouched.
    WouldSkip,
    /// Reconciliation of the role failed with the given message.
    Failed(String),
}

impl RoleOutcome {
    /// Metric and log label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Skipped => "skipped",
            Self::WouldCreate => "would_create",
            Self::WouldUpdate => "would_update",
            Self::WouldSkip => "would_skip",
            Self::Failed(_) => "failed",
        }
    }

    /// Returns true for dry-run predictions.
    #[must_use]
    pub const fn is_prediction(&self) -> bool {
        matches!(self, Self::WouldCreate | Self::WouldUpdate | Self::WouldSkip)
    }

    /// Console line for this outcome.
    #[must_use]
    pub fn describe(&self, role: &str) -> String {
        match self {
            Self::Created => format!("Created role: {role}"),
            Self::Updated => format!("Updated role: {role}"),
            Self::Skipped => format!("Skipping existing role: {role}"),
            Self::WouldCreate => format!("Would create role: {role}"),
            Self::WouldUpdate => format!("Would update role: {role}"),
            Self::WouldSkip => format!("Would skip existing role: {role}"),
            Self::Failed(message) => format!("Failed to process role {role}: {message}"),
        }
    }
}

/// Per-role entry of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleReport {
    /// Role name.
    pub role: String,
    /// What happened to it.
    #[serde(flatten)]
    pub outcome: RoleOutcome,
}

/// Final result of a reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Aggregate counts.
    pub stats: SyncStats,
    /// Per-role outcomes in processing order.
    pub entries: Vec<RoleReport>,
    /// Whether the run was a dry run.
    pub dry_run: bool,
    /// Whether the run stopped early on cancellation.
    pub cancelled: bool,
    /// Requested role names that are not declared in the desired state.
    pub unknown_roles: Vec<String>,
    #[serde(skip)]
    verbose: bool,
}

impl SyncReport {
    /// Entries that failed.
    pub fn failures(&self) -> impl Iterator<Item = &RoleReport> {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.outcome, RoleOutcome::Failed(_)))
    }

    /// Returns true if any role failed.
    #[must_use]
    pub const fn has_failures(&self) -> bool {
        self.stats.failed > 0
    }

    /// Number of entries carrying the given outcome label.
    #[must_use]
    pub fn count(&self, label: &str) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.outcome.label() == label)
            .count()
    }

    /// Per-role console lines.
    ///
    /// Predictions and failures are always shown; applied outcomes only in
    /// verbose mode.
    #[must_use]
    pub fn detail_lines(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| {
                self.verbose
                    || entry.outcome.is_prediction()
                    || matches!(entry.outcome, RoleOutcome::Failed(_))
            })
            .map(|entry| entry.outcome.describe(&entry.role))
            .collect()
    }

    /// Human-readable summary block.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::from("Sync Summary:\n");
        let _ = writeln!(out, "   Created: {}", self.stats.created);
        let _ = writeln!(out, "   Updated: {}", self.stats.updated);
        let _ = writeln!(out, "   Skipped: {}", self.stats.skipped);
        if self.stats.failed > 0 {
            let _ = writeln!(out, "   Failed:  {}", self.stats.failed);
        }
        if self.dry_run {
            let _ = writeln!(
                out,
                "   Dry run (no changes made): {} to create, {} to update, {} to skip",
                self.count("would_create"),
                self.count("would_update"),
                self.count("would_skip"),
            );
        }
        if !self.unknown_roles.is_empty() {
            let _ = writeln!(out, "   Unknown roles: {}", self.unknown_roles.join(", "));
        }
        if self.cancelled {
            out.push_str("   Cancelled before all roles were processed\n");
        }
        out
    }
}

/// Collects per-role outcomes into a [`SyncReport`].
#[derive(Debug, Default)]
pub struct OutcomeReporter {
    report: SyncReport,
}

impl OutcomeReporter {
    /// Creates a reporter for a run.
    #[must_use]
    pub fn new(dry_run: bool, verbose: bool) -> Self {
        Self {
            report: SyncReport {
                dry_run,
                verbose,
                ..SyncReport::default()
            },
        }
    }

    /// Records the outcome of one role.
    pub fn record(&mut self, role: &str, outcome: RoleOutcome) {
        let stats = &mut self.report.stats;
        match outcome {
            RoleOutcome::Created => stats.created += 1,
            RoleOutcome::Updated => stats.updated += 1,
            RoleOutcome::Skipped => stats.skipped += 1,
            RoleOutcome::Failed(_) => stats.failed += 1,
            RoleOutcome::WouldCreate | RoleOutcome::WouldUpdate | RoleOutcome::WouldSkip => {},
        }

        metrics::counter!("permsync_roles_total", "outcome" => outcome.label()).increment(1);
        if self.report.verbose || outcome.is_prediction() {
            tracing::info!(role, outcome = outcome.label(), "{}", outcome.describe(role));
        } else {
            tracing::debug!(role, outcome = outcome.label(), "role reconciled");
        }

        self.report.entries.push(RoleReport {
            role: role.to_string(),
            outcome,
        });
    }

    /// Records requested role names missing from the desired state.
    pub fn note_unknown(&mut self, names: Vec<String>) {
        self.report.unknown_roles = names;
    }

    /// Marks the run as stopped early.
    pub const fn mark_cancelled(&mut self) {
        self.report.cancelled = true;
    }

    /// Returns the finished report.
    #[must_use]
    pub fn finish(self) -> SyncReport {
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_follow_outcomes() {
        let mut reporter = OutcomeReporter::new(false, false);
        reporter.record("Admin", RoleOutcome::Created);
        reporter.record("Editor", RoleOutcome::Updated);
        reporter.record("User", RoleOutcome::Skipped);
        reporter.record("Guest", RoleOutcome::Failed("locked".to_string()));

        let report = reporter.finish();
        assert_eq!(
            report.stats,
            SyncStats {
                created: 1,
                updated: 1,
                skipped: 1,
                deleted: 0,
                failed: 1,
            }
        );
        assert_eq!(report.entries.len(), 4);
        assert!(report.has_failures());
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn test_predictions_never_touch_counters() {
        let mut reporter = OutcomeReporter::new(true, false);
        reporter.record("Admin", RoleOutcome::WouldCreate);
        reporter.record("Editor", RoleOutcome::WouldUpdate);
        reporter.record("User", RoleOutcome::WouldSkip);

        let report = reporter.finish();
        assert_eq!(report.stats, SyncStats::default());
        assert_eq!(report.count("would_create"), 1);
        assert!(report.summary().contains("1 to create, 1 to update, 1 to skip"));
    }

    #[test]
    fn test_detail_lines_respect_verbose() {
        let mut quiet = OutcomeReporter::new(false, false);
        quiet.record("Admin", RoleOutcome::Created);
        quiet.record("Guest", RoleOutcome::Failed("boom".to_string()));
        assert_eq!(
            quiet.finish().detail_lines(),
            vec!["Failed to process role Guest: boom".to_string()]
        );

        let mut loud = OutcomeReporter::new(false, true);
        loud.record("Admin", RoleOutcome::Created);
        assert_eq!(
            loud.finish().detail_lines(),
            vec!["Created role: Admin".to_string()]
        );
    }

    #[test]
    fn test_summary_mentions_unknown_and_cancelled() {
        let mut reporter = OutcomeReporter::new(false, false);
        reporter.note_unknown(vec!["Auditor".to_string()]);
        reporter.mark_cancelled();
        let summary = reporter.finish().summary();
        assert!(summary.starts_with("Sync Summary:"));
        assert!(summary.contains("Unknown roles: Auditor"));
        assert!(summary.contains("Cancelled"));
        assert!(!summary.contains("Failed"));
    }

    #[test]
    fn test_report_serializes_outcomes() {
        let mut reporter = OutcomeReporter::new(false, false);
        reporter.record("Guest", RoleOutcome::Failed("locked".to_string()));
        let json = serde_json::to_value(reporter.finish()).unwrap();
        assert_eq!(json["entries"][0]["role"], "Guest");
        assert_eq!(json["entries"][0]["outcome"], "failed");
        assert_eq!(json["entries"][0]["error"], "locked");
        assert_eq!(json["stats"]["failed"], 1);
    }
}
