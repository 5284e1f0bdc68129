//! Search over pass sequences
//!
//! The controller owns everything mutable about the search: the sampler,
//! the append-only trial history and the best-so-far tracking. Each trial
//! is a strictly sequential propose/execute/verify/score pipeline; a failed
//! trial is recorded with its reason and a penalty score so the sampler
//! learns to avoid the region, and never aborts the search.

pub mod sampler;

use std::fmt;

use fxhash::FxHashMap;

use crate::cost::CostModel;
use crate::engine::{Engine, EngineError, EquivStatus, GateGraph, GraphStats};
use crate::passes::{PassToken, Sequence};
use crate::search::sampler::Sampler;

/// Score observed by the sampler for a failed trial
pub const PENALTY_COST: f64 = 1e9;

/// Why a trial was rejected
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureReason {
    /// Pass application exceeded the per-trial timeout
    Timeout,
    /// The engine failed or its report was unusable
    Execution,
    /// The transformed graph is proven different from the golden graph
    NotEquivalent,
    /// The equivalence check was inconclusive or failed
    Verification,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureReason::Timeout => "timeout",
            FailureReason::Execution => "execution error",
            FailureReason::NotEquivalent => "not equivalent",
            FailureReason::Verification => "verification failure",
        };
        write!(f, "{}", name)
    }
}

/// Number of failed trials in each category
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FailureCounts {
    /// Trials killed by the timeout
    pub timeouts: usize,
    /// Engine failures and unparseable reports
    pub execution_errors: usize,
    /// Proven non-equivalences
    pub not_equivalent: usize,
    /// Inconclusive or failed equivalence checks
    pub verification_errors: usize,
}

impl FailureCounts {
    fn record(&mut self, reason: FailureReason) {
        match reason {
            FailureReason::Timeout => self.timeouts += 1,
            FailureReason::Execution => self.execution_errors += 1,
            FailureReason::NotEquivalent => self.not_equivalent += 1,
            FailureReason::Verification => self.verification_errors += 1,
        }
    }

    /// Total number of failed trials
    pub fn total(&self) -> usize {
        self.timeouts + self.execution_errors + self.not_equivalent + self.verification_errors
    }
}

impl fmt::Display for FailureCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} timeouts, {} execution errors, {} non-equivalences, {} verification failures",
            self.timeouts, self.execution_errors, self.not_equivalent, self.verification_errors
        )
    }
}

/// Terminal state of a trial
#[derive(Clone, Debug)]
pub enum TrialOutcome {
    /// Equivalence proven and cost computed
    Valid,
    /// Rejected with a reason code and diagnostic detail
    Failed {
        /// Failure category
        reason: FailureReason,
        /// Diagnostic text from the failing stage
        detail: String,
    },
}

/// One propose/execute/verify/score cycle, never mutated once recorded
#[derive(Clone, Debug)]
pub struct Trial {
    /// Position in the history
    pub index: usize,
    /// Proposed pass sequence
    pub sequence: Sequence,
    /// Statistics of the transformed graph, if execution succeeded
    pub stats: Option<GraphStats>,
    /// Cost, defined only for valid trials
    pub cost: Option<f64>,
    /// How the trial ended
    pub outcome: TrialOutcome,
}

impl Trial {
    /// Whether equivalence was proven and the cost is defined
    pub fn is_valid(&self) -> bool {
        matches!(self.outcome, TrialOutcome::Valid)
    }
}

/// Outcome of executing and verifying one sequence, reusable across trials
type SequenceOutcome = Result<GraphStats, (FailureReason, String)>;

/// Drives trials against the engine and records their outcomes
///
/// The golden graph is read-only; every trial writes its candidate artifact
/// in a private temporary directory. Among valid trials with equal minimal
/// cost, the earliest recorded one stays the best, so repeated runs with
/// the same seed report the same winner.
pub struct SearchController<'a, E: Engine + ?Sized> {
    engine: &'a E,
    golden: &'a GateGraph,
    cost_model: CostModel,
    sampler: Box<dyn Sampler>,
    history: Vec<Trial>,
    best: Option<usize>,
    counts: FailureCounts,
    cache: FxHashMap<Sequence, SequenceOutcome>,
}

impl<'a, E: Engine + ?Sized> SearchController<'a, E> {
    /// Controller over a golden graph, with a fresh history
    pub fn new(
        engine: &'a E,
        golden: &'a GateGraph,
        cost_model: CostModel,
        sampler: Box<dyn Sampler>,
    ) -> SearchController<'a, E> {
        SearchController {
            engine,
            golden,
            cost_model,
            sampler,
            history: Vec::new(),
            best: None,
            counts: FailureCounts::default(),
            cache: FxHashMap::default(),
        }
    }

    /// Run one complete trial and record it
    pub fn run_trial(&mut self) -> &Trial {
        let token_ids = self.sampler.propose();
        let sequence: Sequence = token_ids.iter().map(|&i| PassToken::ALL[i]).collect();

        let outcome = self.evaluate(&sequence);
        let (stats, cost, outcome) = match outcome {
            Ok(stats) => {
                let cost = self.cost_model.cost(&stats);
                (Some(stats), Some(cost), TrialOutcome::Valid)
            }
            Err((reason, detail)) => {
                self.counts.record(reason);
                (None, None, TrialOutcome::Failed { reason, detail })
            }
        };
        self.sampler
            .observe(&token_ids, cost.unwrap_or(PENALTY_COST));

        let index = self.history.len();
        match &outcome {
            TrialOutcome::Valid => {
                log::debug!("trial {}: cost {}", index, cost.unwrap());
            }
            TrialOutcome::Failed { reason, detail } => {
                log::debug!("trial {}: {} ({})", index, reason, detail);
            }
        }
        let trial = Trial {
            index,
            sequence,
            stats,
            cost,
            outcome,
        };
        if trial.is_valid() {
            let better = match self.best_trial() {
                // Strict comparison: the earliest of equal-cost trials wins
                Some(best) => trial.cost < best.cost,
                None => true,
            };
            if better {
                self.best = Some(index);
            }
        }
        self.history.push(trial);
        self.history.last().unwrap()
    }

    /// Execute and verify a sequence, reusing the outcome of identical ones
    fn evaluate(&mut self, sequence: &Sequence) -> SequenceOutcome {
        // Identity fast path: the candidate is the golden graph itself
        if sequence.iter().all(|t| t.is_noop()) {
            return Ok(self.golden.stats);
        }
        if let Some(cached) = self.cache.get(sequence) {
            return cached.clone();
        }
        let outcome = self.execute_and_verify(sequence);
        self.cache.insert(sequence.clone(), outcome.clone());
        outcome
    }

    fn execute_and_verify(&self, sequence: &Sequence) -> SequenceOutcome {
        let workdir = tempfile::tempdir()
            .map_err(|e| (FailureReason::Execution, format!("no working directory: {}", e)))?;
        let candidate = workdir.path().join("trial.aig");

        let stats = self
            .engine
            .apply_passes(&self.golden.path, sequence, &candidate)
            .map_err(|e| match e {
                EngineError::Timeout(_) => (FailureReason::Timeout, e.to_string()),
                other => (FailureReason::Execution, other.to_string()),
            })?;

        match self.engine.check_equivalence(&self.golden.path, &candidate) {
            Ok(EquivStatus::Equivalent) => Ok(stats),
            Ok(EquivStatus::NotEquivalent) => Err((
                FailureReason::NotEquivalent,
                "counterexample found".to_string(),
            )),
            Err(e) => Err((FailureReason::Verification, e.to_string())),
        }
    }

    /// Best valid trial recorded so far
    pub fn best_trial(&self) -> Option<&Trial> {
        self.best.map(|i| &self.history[i])
    }

    /// All recorded trials, in order
    pub fn history(&self) -> &[Trial] {
        &self.history
    }

    /// Number of valid trials recorded so far
    pub fn nb_valid(&self) -> usize {
        self.history.iter().filter(|t| t.is_valid()).count()
    }

    /// Failed trials per category
    pub fn failure_counts(&self) -> FailureCounts {
        self.counts
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::engine::fake::FakeEngine;
    use crate::engine::Design;

    /// Sampler replaying canned proposals and exposing observed scores
    struct FixedSampler {
        proposals: Vec<Vec<usize>>,
        at: usize,
        observed: Rc<RefCell<Vec<f64>>>,
    }

    impl FixedSampler {
        fn new(proposals: Vec<Vec<usize>>) -> (FixedSampler, Rc<RefCell<Vec<f64>>>) {
            let observed = Rc::new(RefCell::new(Vec::new()));
            (
                FixedSampler {
                    proposals,
                    at: 0,
                    observed: observed.clone(),
                },
                observed,
            )
        }
    }

    impl Sampler for FixedSampler {
        fn propose(&mut self) -> Vec<usize> {
            let p = self.proposals[self.at % self.proposals.len()].clone();
            self.at += 1;
            p
        }

        fn observe(&mut self, _seq: &[usize], score: f64) {
            self.observed.borrow_mut().push(score);
        }
    }

    fn token_id(t: PassToken) -> usize {
        PassToken::ALL.iter().position(|&x| x == t).unwrap()
    }

    fn golden_graph(engine: &FakeEngine, dir: &tempfile::TempDir) -> GateGraph {
        let path = dir.path().join("golden.aig");
        let design = Design::from_file("design.v");
        let stats = engine.convert(&design, &path).unwrap();
        GateGraph { path, stats }
    }

    #[test]
    fn test_identity_fast_path() {
        let engine = FakeEngine::new(FakeEngine::minimal_and());
        let dir = tempfile::tempdir().unwrap();
        let golden = golden_graph(&engine, &dir);
        let noop = vec![token_id(PassToken::Noop); 2];
        let (sampler, _) = FixedSampler::new(vec![noop]);
        let mut ctrl =
            SearchController::new(&engine, &golden, CostModel::default(), Box::new(sampler));

        let trial = ctrl.run_trial();
        assert!(trial.is_valid());
        assert_eq!(trial.stats, Some(golden.stats));
        assert_eq!(trial.cost, Some(1.1));
        // The engine was never invoked for the identity sequence
        assert_eq!(*engine.nb_executions.borrow(), 0);
    }

    #[test]
    fn test_failure_isolation() {
        let mut engine = FakeEngine::new(FakeEngine::redundant_and());
        engine.timeout_on_call = Some(2);
        let dir = tempfile::tempdir().unwrap();
        let golden = golden_graph(&engine, &dir);
        // Three distinct non-identity sequences, so none is served from cache
        let (sampler, observed) = FixedSampler::new(vec![
            vec![token_id(PassToken::Rewrite), token_id(PassToken::Noop)],
            vec![token_id(PassToken::Balance), token_id(PassToken::Noop)],
            vec![token_id(PassToken::Noop), token_id(PassToken::Rewrite)],
        ]);
        let mut ctrl =
            SearchController::new(&engine, &golden, CostModel::default(), Box::new(sampler));

        for _ in 0..3 {
            ctrl.run_trial();
        }
        let history = ctrl.history();
        assert_eq!(history.len(), 3);
        assert!(history[0].is_valid());
        assert!(matches!(
            history[1].outcome,
            TrialOutcome::Failed {
                reason: FailureReason::Timeout,
                ..
            }
        ));
        assert!(history[2].is_valid());
        // The failed trial was observed at the penalty score
        assert_eq!(observed.borrow()[1], PENALTY_COST);
        assert_eq!(ctrl.failure_counts().timeouts, 1);
        // Best-so-far survives the failure
        assert_eq!(ctrl.best_trial().unwrap().index, 0);
    }

    #[test]
    fn test_inconclusive_check_fails_trial_only() {
        let mut engine = FakeEngine::new(FakeEngine::redundant_and());
        // The equivalence checker itself crashes on the second candidate
        engine.cec_error_on_call = Some(2);
        let dir = tempfile::tempdir().unwrap();
        let golden = golden_graph(&engine, &dir);
        let (sampler, observed) = FixedSampler::new(vec![
            vec![token_id(PassToken::Rewrite), token_id(PassToken::Noop)],
            vec![token_id(PassToken::Balance), token_id(PassToken::Noop)],
            vec![token_id(PassToken::Noop), token_id(PassToken::Rewrite)],
        ]);
        let mut ctrl =
            SearchController::new(&engine, &golden, CostModel::default(), Box::new(sampler));

        for _ in 0..3 {
            ctrl.run_trial();
        }
        let history = ctrl.history();
        assert_eq!(history.len(), 3);
        assert!(history[0].is_valid());
        // An unproven candidate is rejected, never assumed equivalent
        assert!(matches!(
            history[1].outcome,
            TrialOutcome::Failed {
                reason: FailureReason::Verification,
                ..
            }
        ));
        assert!(history[2].is_valid());
        assert_eq!(observed.borrow()[1], PENALTY_COST);
        assert_eq!(ctrl.failure_counts().verification_errors, 1);
        assert_eq!(ctrl.best_trial().unwrap().index, 0);
    }

    #[test]
    fn test_verifier_gates_corrupting_pass() {
        let mut engine = FakeEngine::new(FakeEngine::full_adder());
        engine.buggy_dc2 = true;
        let dir = tempfile::tempdir().unwrap();
        let golden = golden_graph(&engine, &dir);
        let (sampler, _) = FixedSampler::new(vec![
            vec![token_id(PassToken::Dc2), token_id(PassToken::Noop)],
            vec![token_id(PassToken::Rewrite), token_id(PassToken::Balance)],
            vec![token_id(PassToken::Balance), token_id(PassToken::Dc2)],
        ]);
        let mut ctrl =
            SearchController::new(&engine, &golden, CostModel::default(), Box::new(sampler));
        for _ in 0..3 {
            ctrl.run_trial();
        }
        // No trial that went through the corrupting pass may be valid
        for trial in ctrl.history() {
            if trial.sequence.contains(&PassToken::Dc2) {
                assert!(matches!(
                    trial.outcome,
                    TrialOutcome::Failed {
                        reason: FailureReason::NotEquivalent,
                        ..
                    }
                ));
            } else {
                assert!(trial.is_valid());
            }
        }
        assert_eq!(ctrl.failure_counts().not_equivalent, 2);
    }

    #[test]
    fn test_sequence_cache() {
        let engine = FakeEngine::new(FakeEngine::redundant_and());
        let dir = tempfile::tempdir().unwrap();
        let golden = golden_graph(&engine, &dir);
        let seq = vec![token_id(PassToken::Rewrite), token_id(PassToken::Noop)];
        let (sampler, _) = FixedSampler::new(vec![seq]);
        let mut ctrl =
            SearchController::new(&engine, &golden, CostModel::default(), Box::new(sampler));
        for _ in 0..3 {
            ctrl.run_trial();
        }
        assert_eq!(ctrl.history().len(), 3);
        assert!(ctrl.history().iter().all(|t| t.is_valid()));
        // Identical sequences hit the engine only once
        assert_eq!(*engine.nb_executions.borrow(), 1);
    }

    #[test]
    fn test_tie_break_keeps_earliest() {
        let engine = FakeEngine::new(FakeEngine::minimal_and());
        let dir = tempfile::tempdir().unwrap();
        let golden = golden_graph(&engine, &dir);
        // Both sequences leave the minimal graph untouched, so costs tie
        let (sampler, _) = FixedSampler::new(vec![
            vec![token_id(PassToken::Balance), token_id(PassToken::Noop)],
            vec![token_id(PassToken::Rewrite), token_id(PassToken::Rewrite)],
        ]);
        let mut ctrl =
            SearchController::new(&engine, &golden, CostModel::default(), Box::new(sampler));
        ctrl.run_trial();
        ctrl.run_trial();
        assert_eq!(ctrl.nb_valid(), 2);
        assert_eq!(ctrl.best_trial().unwrap().index, 0);
    }
}
