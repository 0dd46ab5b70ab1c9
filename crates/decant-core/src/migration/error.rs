//! Run-time fault types for migration units.

use super::report::RunReport;
use crate::error::ConfigError;
use crate::store::{SourceFault, StoreFault};
use thiserror::Error;

/// A fault that ends a unit run before the source is exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitFault {
    /// Configuration problem detected at run start, before any record was
    /// processed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Reading from the source store failed.
    #[error(transparent)]
    Source(#[from] SourceFault),

    /// The target store reported a fatal fault.
    #[error(transparent)]
    Store(#[from] StoreFault),
}

/// A unit run that ended abnormally, carrying whatever partial report
/// exists. Callers always get either a complete report or this - never a
/// silent partial success.
#[derive(Debug, Clone, Error)]
#[error("migration unit '{}' aborted: {fault}", report.unit)]
pub struct AbortedRun {
    /// The partial report, with its abnormal-end marker set.
    pub report: RunReport,
    /// The fault that ended the run.
    pub fault: UnitFault,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aborted_run_display() {
        let mut report = RunReport::new("users", "LegacyUser", "User");
        report.abort("source read failed: timeout");

        let aborted = AbortedRun {
            report,
            fault: SourceFault::Read {
                detail: "timeout".into(),
            }
            .into(),
        };
        let msg = aborted.to_string();
        assert!(msg.contains("users"));
        assert!(msg.contains("timeout"));
    }
}
