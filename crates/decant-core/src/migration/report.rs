//! Structured run outcomes, suitable for logging or CLI summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How one source record fared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// A new target entity was created.
    Created,
    /// An existing target entity was updated in place.
    Updated,
    /// The record could not be transformed or persisted.
    Failed,
}

/// Outcome of migrating one source record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOutcome {
    /// Identifier of the source record.
    pub source_id: String,
    /// What happened.
    pub status: RecordStatus,
    /// Failure detail, present when status is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl RecordOutcome {
    /// A created outcome.
    pub fn created(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            status: RecordStatus::Created,
            error: None,
        }
    }

    /// An updated outcome.
    pub fn updated(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            status: RecordStatus::Updated,
            error: None,
        }
    }

    /// A failed outcome with its error detail.
    pub fn failed(source_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            status: RecordStatus::Failed,
            error: Some(error.into()),
        }
    }
}

/// Report for one migration unit run.
///
/// Appended to per record while the run is in flight, immutable once the
/// run ends. Covers every record the unit looked at; records never
/// reached (behind an error halt or an abnormal end) are counted in
/// `skipped` when the source total is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Unit name.
    pub unit: String,
    /// Source entity records were read from.
    pub source_entity: String,
    /// Target entity records were written to.
    pub target_entity: String,
    /// Per-record outcomes, in source iteration order.
    pub outcomes: Vec<RecordOutcome>,
    /// Count of created outcomes.
    pub created: u64,
    /// Count of updated outcomes.
    pub updated: u64,
    /// Count of failed outcomes.
    pub failed: u64,
    /// Source records never attempted because the run halted early.
    pub skipped: u64,
    /// Total records the source reported, when known.
    pub total: Option<u64>,
    /// Whether the run transformed without persisting.
    pub dry_run: bool,
    /// Fault detail when the run ended abnormally.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub aborted: Option<String>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u64,
}

impl RunReport {
    /// Start an empty report.
    pub fn new(
        unit: impl Into<String>,
        source_entity: impl Into<String>,
        target_entity: impl Into<String>,
    ) -> Self {
        Self {
            unit: unit.into(),
            source_entity: source_entity.into(),
            target_entity: target_entity.into(),
            outcomes: Vec::new(),
            created: 0,
            updated: 0,
            failed: 0,
            skipped: 0,
            total: None,
            dry_run: false,
            aborted: None,
            started_at: Utc::now(),
            duration_ms: 0,
        }
    }

    /// Append one outcome, keeping the aggregate counts in step.
    pub fn record(&mut self, outcome: RecordOutcome) {
        match outcome.status {
            RecordStatus::Created => self.created += 1,
            RecordStatus::Updated => self.updated += 1,
            RecordStatus::Failed => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }

    /// Mark the run as ended abnormally.
    pub fn abort(&mut self, detail: impl Into<String>) {
        self.aborted = Some(detail.into());
    }

    /// Records that landed in the target store.
    pub fn succeeded(&self) -> u64 {
        self.created + self.updated
    }

    /// Records the unit looked at.
    pub fn processed(&self) -> u64 {
        self.outcomes.len() as u64
    }

    /// Whether the run finished with no failures and no abnormal end.
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.aborted.is_none()
    }
}

/// Report for a whole migration sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceReport {
    /// One report per unit that ran, in execution order.
    pub reports: Vec<RunReport>,
    /// Zero-based position of the unit that halted the sequence, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub halted_at: Option<usize>,
    /// Name of the halting unit, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub halted_unit: Option<String>,
}

impl SequenceReport {
    /// An empty sequence report.
    pub fn new() -> Self {
        Self {
            reports: Vec::new(),
            halted_at: None,
            halted_unit: None,
        }
    }

    /// Number of units that ran.
    pub fn units_run(&self) -> usize {
        self.reports.len()
    }

    /// Whether every unit finished cleanly and nothing halted.
    pub fn is_clean(&self) -> bool {
        self.halted_at.is_none() && self.reports.iter().all(RunReport::is_clean)
    }

    /// Records that landed in the target store, across all units.
    pub fn succeeded(&self) -> u64 {
        self.reports.iter().map(RunReport::succeeded).sum()
    }

    /// Failed records across all units.
    pub fn failed(&self) -> u64 {
        self.reports.iter().map(|r| r.failed).sum()
    }
}

impl Default for SequenceReport {
    fn default() -> Self {
        Self::new()
    }
}
