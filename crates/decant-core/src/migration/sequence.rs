//! Ordered execution of migration units with a shared halt policy.

use super::report::SequenceReport;
use super::unit::MigrationUnit;
use crate::store::{SourceQueryable, TargetStore};
use parking_lot::Mutex;
use tracing::{info, warn};

/// Configuration shared by every unit in a sequence.
#[derive(Debug, Clone, Default)]
pub struct SequenceOptions {
    /// Halt the sequence before the next unit when a unit reports any
    /// failure or ends abnormally. Off by default: all units run and
    /// every failure is visible in the aggregated report.
    pub stop_on_error: bool,
}

struct SequencedUnit {
    unit: MigrationUnit,
    source: Box<dyn SourceQueryable>,
}

/// An ordered list of migration units run one after another.
///
/// Units run strictly in registration order; a unit only starts after the
/// previous one has fully finished, so later units can depend on rows
/// written by earlier ones (e.g. foreign-key targets).
pub struct MigrationSequence {
    units: Vec<SequencedUnit>,
    options: SequenceOptions,
}

impl MigrationSequence {
    /// Create an empty sequence.
    pub fn new(options: SequenceOptions) -> Self {
        Self {
            units: Vec::new(),
            options,
        }
    }

    /// Append a unit and the source it reads from.
    pub fn push(&mut self, unit: MigrationUnit, source: Box<dyn SourceQueryable>) {
        self.units.push(SequencedUnit { unit, source });
    }

    /// Number of registered units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether no units are registered.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Run every unit in order against the shared target store.
    ///
    /// The store is locked for the duration of one unit's run and
    /// released between units and on every exit path. Abnormally ended
    /// units are folded into the report the same way as units with
    /// failures; the sequence itself always returns a report.
    pub fn run_all(&mut self, store: &Mutex<Box<dyn TargetStore>>) -> SequenceReport {
        let mut sequence_report = SequenceReport::new();
        let mut migrated_targets: Vec<String> = Vec::new();

        for (position, entry) in self.units.iter_mut().enumerate() {
            let name = entry.unit.name().to_string();
            info!(unit = %name, position, "sequence unit starting");

            let result = {
                let mut guard = store.lock();
                entry.unit.run(entry.source.as_mut(), guard.as_mut())
            };

            let target = entry.unit.target().name.clone();
            if !migrated_targets.contains(&target) {
                migrated_targets.push(target);
            }

            let report = match result {
                Ok(report) => report,
                Err(aborted) => {
                    warn!(unit = %name, fault = %aborted.fault, "unit ended abnormally");
                    aborted.report
                }
            };

            let halt = self.options.stop_on_error && !report.is_clean();
            sequence_report.reports.push(report);

            if halt {
                warn!(unit = %name, position, "sequence halted");
                sequence_report.halted_at = Some(position);
                sequence_report.halted_unit = Some(name);
                break;
            }
        }

        {
            let mut guard = store.lock();
            if let Err(fault) = guard.realign_sequences(&migrated_targets) {
                warn!(fault = %fault, "sequence realignment failed");
            }
        }

        info!(
            units = sequence_report.units_run(),
            succeeded = sequence_report.succeeded(),
            failed = sequence_report.failed(),
            halted = sequence_report.halted_at.is_some(),
            "sequence finished"
        );
        sequence_report
    }
}
