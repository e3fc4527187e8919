//! Replay outcomes.

use docstore_core::RecordId;
use docstore_oplog::LogTimestamp;
use std::fmt;

/// Why an entry was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Insert of an id that is already present.
    Duplicate,
    /// Diff with nothing to apply.
    NoOp,
    /// Update or delete selector without a usable `_id`.
    MissingIdentifier,
    /// Update of a record that does not exist.
    TargetMissing,
    /// Entry for a namespace the engine is not scoped to.
    ForeignNamespace,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Duplicate => "duplicate insert",
            Self::NoOp => "empty diff",
            Self::MissingIdentifier => "missing _id",
            Self::TargetMissing => "target missing",
            Self::ForeignNamespace => "foreign namespace",
        })
    }
}

/// What happened to one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// The entry's effect is now in the store.
    Applied,
    /// Nothing was written.
    Skipped(SkipReason),
    /// The entry could not be applied.
    Failed(String),
}

impl fmt::Display for EntryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => f.write_str("applied"),
            Self::Skipped(reason) => write!(f, "skipped ({reason})"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Outcome of one entry with enough context to identify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryReport {
    /// Timestamp of the entry.
    pub timestamp: LogTimestamp,
    /// Operation code (`i`, `u`, `d`).
    pub op: &'static str,
    /// Target record, when the entry names a well-formed one.
    pub target: Option<RecordId>,
    /// What happened.
    pub outcome: EntryOutcome,
}

/// Result of replaying a batch of entries.
///
/// Reports are in entry order, one per entry processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayResult {
    reports: Vec<EntryReport>,
}

impl ReplayResult {
    /// Creates an empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, report: EntryReport) {
        self.reports.push(report);
    }

    /// Per-entry reports, in order.
    #[must_use]
    pub fn reports(&self) -> &[EntryReport] {
        &self.reports
    }

    /// Number of entries processed.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.reports.len()
    }

    /// Number of entries applied.
    #[must_use]
    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, EntryOutcome::Applied))
    }

    /// Number of entries skipped.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, EntryOutcome::Skipped(_)))
    }

    /// Number of entries that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, EntryOutcome::Failed(_)))
    }

    /// Entries skipped for `reason`.
    #[must_use]
    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.count(|o| *o == EntryOutcome::Skipped(reason))
    }

    /// Returns true if nothing failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&EntryOutcome) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.outcome)).count()
    }
}

impl fmt::Display for ReplayResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} applied, {} skipped, {} failed",
            self.applied(),
            self.skipped(),
            self.failed()
        )
    }
}
