//! Interface to the external synthesis and optimization engine
//!
//! All interaction with the engine goes through the [`Engine`] trait, so that
//! the search loop never spawns a subprocess directly and tests can
//! substitute a deterministic in-process implementation.
//! The only shipped implementation is [`yosys::YosysAbc`], which drives
//! Yosys for conversion and ABC for pass application and equivalence
//! checking over subprocess text I/O.

pub mod report;
pub mod run;
pub mod yosys;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::passes::PassToken;

/// A source circuit description, immutable once accepted
#[derive(Clone, Debug)]
pub struct Design {
    /// Path to the circuit text
    pub path: PathBuf,
    /// Top module name, if the engine cannot infer it
    pub top: Option<String>,
}

impl Design {
    /// Design rooted at the given file, letting the engine pick the top module
    pub fn from_file(path: impl Into<PathBuf>) -> Design {
        Design {
            path: path.into(),
            top: None,
        }
    }
}

/// Statistics of a gate graph in and-inverter form
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraphStats {
    /// Number of primary inputs
    pub nb_inputs: usize,
    /// Number of primary outputs
    pub nb_outputs: usize,
    /// Number of two-input And gates
    pub nb_gates: usize,
    /// Number of logic levels on the longest path
    pub nb_levels: usize,
}

impl fmt::Display for GraphStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stats:")?;
        writeln!(f, "  Inputs: {}", self.nb_inputs)?;
        writeln!(f, "  Outputs: {}", self.nb_outputs)?;
        writeln!(f, "  Gates: {}", self.nb_gates)?;
        writeln!(f, "  Levels: {}", self.nb_levels)?;
        fmt::Result::Ok(())
    }
}

/// A gate graph artifact on disk together with its statistics
///
/// The golden graph is created once by conversion and never replaced;
/// every trial works on its own copy derived from it.
#[derive(Clone, Debug)]
pub struct GateGraph {
    /// Persisted artifact the engine can read back
    pub path: PathBuf,
    /// Statistics reported by the engine at creation
    pub stats: GraphStats,
}

/// Verdict of a combinational equivalence check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EquivStatus {
    /// Equivalence proven for all input assignments
    Equivalent,
    /// A counterexample exists
    NotEquivalent,
}

/// Errors reported by an engine adapter
///
/// During the search these are recovered per trial; only conversion
/// failures abort the whole run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The call exceeded its time budget and was killed
    #[error("engine call timed out after {0:?}")]
    Timeout(Duration),
    /// The engine exited with an error
    #[error("engine failed: {0}")]
    Failed(String),
    /// The engine output could not be interpreted
    #[error("unparseable engine report: {0}")]
    Report(String),
    /// The design cannot be reduced to and-inverter form
    #[error("unsupported design: {0}")]
    Unsupported(String),
    /// The engine could not be spawned or an artifact could not be accessed
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Abstract capability exposed by the external engine
pub trait Engine {
    /// Convert a design into and-inverter form, writing the artifact at `out`
    ///
    /// Any failure here is fatal for the optimization request: without a
    /// golden baseline no trial can run.
    fn convert(&self, design: &Design, out: &Path) -> Result<GraphStats, EngineError>;

    /// Apply a pass sequence to a fresh copy of `golden`, writing the result at `out`
    ///
    /// No-op tokens in the sequence are skipped. The golden artifact is
    /// only ever read.
    fn apply_passes(
        &self,
        golden: &Path,
        seq: &[PassToken],
        out: &Path,
    ) -> Result<GraphStats, EngineError>;

    /// Check combinational equivalence of two gate graph artifacts
    ///
    /// Returns an error when the check is inconclusive; equivalence is
    /// never assumed by default.
    fn check_equivalence(&self, golden: &Path, candidate: &Path)
        -> Result<EquivStatus, EngineError>;

    /// Regenerate circuit-level text from a gate graph artifact
    fn export_netlist(&self, graph: &Path, out: &Path) -> Result<(), EngineError>;
}
