//! End-to-end optimization of a design
//!
//! Orchestrates the full flow: one conversion to the golden graph, the
//! trial loop under a fixed budget, and materialization of the winning
//! result into the output directory together with a machine-readable
//! summary.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::cost::{CostModel, DEFAULT_DELAY_WEIGHT};
use crate::engine::{Design, Engine, GateGraph};
use crate::error::OptimizeError;
use crate::passes::{effective_commands, PassToken};
use crate::search::sampler::SamplerKind;
use crate::search::{SearchController, Trial};

/// Parameters of an optimization request, read-only once supplied
#[derive(Clone, Debug)]
pub struct OptimizeConfig {
    /// Trial budget
    pub nb_trials: usize,
    /// Number of tokens per proposed sequence
    pub seq_len: usize,
    /// Weight of one logic level relative to one gate in the cost
    pub delay_weight: f64,
    /// Seed for the sampler
    pub seed: u64,
    /// Proposal strategy
    pub sampler: SamplerKind,
    /// Directory receiving the golden, best and summary artifacts
    pub out_dir: PathBuf,
}

impl OptimizeConfig {
    /// Default search parameters writing into the given directory
    pub fn new(out_dir: impl Into<PathBuf>) -> OptimizeConfig {
        OptimizeConfig {
            nb_trials: 60,
            seq_len: 6,
            delay_weight: DEFAULT_DELAY_WEIGHT,
            seed: 1,
            sampler: SamplerKind::Tpe,
            out_dir: out_dir.into(),
        }
    }
}

/// Machine-readable record of a completed search, persisted as JSON
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Summary {
    /// Cost of the best valid trial
    pub best_cost: f64,
    /// Engine commands of the winning sequence, no-op tokens removed
    pub best_sequence: Vec<String>,
    /// Trials attempted
    pub trials_completed: usize,
    /// Trials that passed equivalence checking
    pub trials_valid: usize,
    /// Wall-clock time of the whole request, in seconds
    pub execution_time: f64,
}

/// Everything produced by a successful optimization
#[derive(Clone, Debug)]
pub struct OptimizeResult {
    /// The immutable golden baseline
    pub golden: GateGraph,
    /// The winning trial
    pub best: Trial,
    /// The persisted summary record
    pub summary: Summary,
}

/// File name of the golden graph artifact in the output directory
pub const GOLDEN_FILE: &str = "golden.aig";
/// File name of the best graph artifact
pub const BEST_GRAPH_FILE: &str = "best.aig";
/// File name of the regenerated circuit text
pub const BEST_NETLIST_FILE: &str = "best.v";
/// File name of the summary record
pub const SUMMARY_FILE: &str = "summary.json";

/// Run the whole optimization flow for one design
///
/// `on_trial` is called once per recorded trial, in order; the command line
/// uses it to drive its progress bar. Per-trial failures never abort the
/// search; only conversion failures, an exhausted budget and output I/O do.
pub fn optimize<E: Engine + ?Sized>(
    engine: &E,
    design: &Design,
    config: &OptimizeConfig,
    mut on_trial: impl FnMut(&Trial),
) -> Result<OptimizeResult, OptimizeError> {
    let start = Instant::now();
    fs::create_dir_all(&config.out_dir)?;

    let golden_path = config.out_dir.join(GOLDEN_FILE);
    let stats = engine
        .convert(design, &golden_path)
        .map_err(|e| OptimizeError::Conversion(e.to_string()))?;
    let golden = GateGraph {
        path: golden_path,
        stats,
    };
    let cost_model = CostModel {
        delay_weight: config.delay_weight,
    };
    log::info!(
        "golden graph: {} gates, {} levels, cost {}",
        stats.nb_gates,
        stats.nb_levels,
        cost_model.cost(&stats)
    );

    let sampler = config
        .sampler
        .build(config.seq_len, PassToken::ALL.len(), config.seed);
    let mut controller = SearchController::new(engine, &golden, cost_model, sampler);
    for _ in 0..config.nb_trials {
        let trial = controller.run_trial();
        on_trial(trial);
    }

    let best = match controller.best_trial() {
        Some(t) => t.clone(),
        None => {
            return Err(OptimizeError::Exhausted {
                nb_trials: controller.history().len(),
                counts: controller.failure_counts(),
            })
        }
    };
    log::info!(
        "best trial {} with cost {} ({} valid trials)",
        best.index,
        best.cost.unwrap_or(f64::NAN),
        controller.nb_valid()
    );

    let summary = materialize(engine, &golden, &best, config, &controller, start)?;
    Ok(OptimizeResult {
        golden,
        best,
        summary,
    })
}

/// Regenerate the winning artifacts and persist the summary record
///
/// The best graph is re-derived by replaying the winning sequence from the
/// golden artifact; trial working copies live in temporary directories and
/// are gone by now.
fn materialize<E: Engine + ?Sized>(
    engine: &E,
    golden: &GateGraph,
    best: &Trial,
    config: &OptimizeConfig,
    controller: &SearchController<E>,
    start: Instant,
) -> Result<Summary, OptimizeError> {
    let best_graph = config.out_dir.join(BEST_GRAPH_FILE);
    engine
        .apply_passes(&golden.path, &best.sequence, &best_graph)
        .map_err(|e| OptimizeError::Materialize(e.to_string()))?;
    let best_netlist = config.out_dir.join(BEST_NETLIST_FILE);
    engine
        .export_netlist(&best_graph, &best_netlist)
        .map_err(|e| OptimizeError::Materialize(e.to_string()))?;

    let summary = Summary {
        best_cost: best.cost.expect("best trial is valid"),
        best_sequence: effective_commands(&best.sequence)
            .iter()
            .map(|c| c.to_string())
            .collect(),
        trials_completed: controller.history().len(),
        trials_valid: controller.nb_valid(),
        execution_time: start.elapsed().as_secs_f64(),
    };
    let text = serde_json::to_string_pretty(&summary)
        .map_err(|e| OptimizeError::Materialize(e.to_string()))?;
    fs::write(config.out_dir.join(SUMMARY_FILE), text)?;
    log::info!(
        "best sequence: {}",
        summary.best_sequence.iter().join("; ")
    );
    Ok(summary)
}
