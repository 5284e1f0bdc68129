//! Fatal error taxonomy for an optimization request
//!
//! Per-trial failures are not errors at this level: the search recovers
//! them locally as invalid, penalty-scored trials. What remains fatal is a
//! design that cannot be converted at all, a full budget without a single
//! valid trial, and I/O trouble around the output directory.

use thiserror::Error;

use crate::search::FailureCounts;

/// Errors that abort an optimization request
#[derive(Debug, Error)]
pub enum OptimizeError {
    /// The design cannot be reduced to and-inverter form
    ///
    /// This is a documented limitation of the pipeline, not a transient
    /// fault: no trial can run without a golden baseline.
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// Every trial in the budget failed
    #[error("no valid trial out of {nb_trials} ({counts})")]
    Exhausted {
        /// Trials attempted
        nb_trials: usize,
        /// Failures per category, for diagnosing the unreliable stage
        counts: FailureCounts,
    },

    /// The best result could not be regenerated or persisted
    #[error("failed to materialize result: {0}")]
    Materialize(String),

    /// Output directory or artifact I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
