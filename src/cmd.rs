//! Command line interface

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use itertools::Itertools;
use kdam::{tqdm, BarExt};

use crate::engine::yosys::YosysAbc;
use crate::engine::{Design, Engine};
use crate::optimize::{optimize, OptimizeConfig, BEST_NETLIST_FILE};
use crate::search::sampler::SamplerKind;

/// Command line arguments
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Command line arguments
#[derive(Subcommand)]
pub enum Commands {
    /// Search for a pass sequence minimizing the cost of a design
    ///
    /// The design is converted once to an and-inverter graph, then a fixed
    /// budget of candidate pass sequences is executed through the external
    /// engine. Every candidate is checked for functional equivalence
    /// against the golden graph before it can win.
    #[clap(alias = "opt")]
    Optimize(OptArgs),

    /// Convert a design and show its golden graph statistics
    #[clap()]
    Show(ShowArgs),
}

/// Proposal strategy selection
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SamplerChoice {
    /// Tree-structured Parzen estimator
    Tpe,
    /// Uniform random baseline
    Random,
}

impl From<SamplerChoice> for SamplerKind {
    fn from(choice: SamplerChoice) -> SamplerKind {
        match choice {
            SamplerChoice::Tpe => SamplerKind::Tpe,
            SamplerChoice::Random => SamplerKind::Random,
        }
    }
}

/// Command arguments for optimization
#[derive(Args)]
pub struct OptArgs {
    /// Design to optimize (Verilog)
    file: PathBuf,

    /// Top module name, if the engine cannot infer it
    #[arg(long)]
    top: Option<String>,

    /// Number of trials
    #[arg(short = 'n', long, default_value_t = 60)]
    nb_trials: usize,

    /// Number of pass tokens per candidate sequence
    #[arg(short = 'l', long, default_value_t = 6)]
    seq_len: usize,

    /// Weight of one logic level relative to one gate in the cost
    #[arg(short = 'w', long, default_value_t = 0.1)]
    delay_weight: f64,

    /// Time budget per engine call, in seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// Output directory for the golden, best and summary artifacts
    #[arg(short = 'o', long, default_value = "optseq_out")]
    out_dir: PathBuf,

    /// Seed for the sampler
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Proposal strategy
    #[arg(long, value_enum, default_value = "tpe")]
    sampler: SamplerChoice,

    /// Yosys command
    #[arg(long, default_value = "yosys")]
    yosys: String,

    /// ABC command
    #[arg(long, default_value = "abc")]
    abc: String,
}

impl OptArgs {
    /// Run the optimization and report the result
    pub fn run(&self) {
        let engine =
            YosysAbc::with_commands(&self.yosys, &self.abc, Duration::from_secs(self.timeout));
        let design = Design {
            path: self.file.clone(),
            top: self.top.clone(),
        };
        let mut config = OptimizeConfig::new(&self.out_dir);
        config.nb_trials = self.nb_trials;
        config.seq_len = self.seq_len;
        config.delay_weight = self.delay_weight;
        config.seed = self.seed;
        config.sampler = self.sampler.into();

        let mut progress = tqdm!(total = self.nb_trials);
        progress.set_description("Trials");
        let mut best_so_far: Option<f64> = None;
        let result = optimize(&engine, &design, &config, |trial| {
            if let Some(cost) = trial.cost {
                if best_so_far.map_or(true, |b| cost < b) {
                    best_so_far = Some(cost);
                    progress.set_postfix(format!("best={:.2}", cost));
                }
            }
            progress.update(1).unwrap();
        });
        eprintln!();

        match result {
            Ok(res) => {
                let golden_cost = res.golden.stats.nb_gates as f64
                    + self.delay_weight * res.golden.stats.nb_levels as f64;
                println!("Golden cost: {}", golden_cost);
                println!("Best cost:   {}", res.summary.best_cost);
                let sequence = if res.summary.best_sequence.is_empty() {
                    "<identity>".to_string()
                } else {
                    res.summary.best_sequence.iter().join("; ")
                };
                println!("Best sequence: {}", sequence);
                println!(
                    "Valid trials: {}/{}",
                    res.summary.trials_valid, res.summary.trials_completed
                );
                println!(
                    "Optimized netlist: {}",
                    self.out_dir.join(BEST_NETLIST_FILE).display()
                );
            }
            Err(err) => {
                println!("Optimization failed: {}", err);
                std::process::exit(1);
            }
        }
    }
}

/// Command arguments for design statistics
#[derive(Args)]
pub struct ShowArgs {
    /// Design to convert (Verilog)
    file: PathBuf,

    /// Top module name, if the engine cannot infer it
    #[arg(long)]
    top: Option<String>,

    /// Time budget per engine call, in seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// Yosys command
    #[arg(long, default_value = "yosys")]
    yosys: String,

    /// ABC command
    #[arg(long, default_value = "abc")]
    abc: String,
}

impl ShowArgs {
    /// Convert the design and print its golden statistics
    pub fn run(&self) {
        let engine =
            YosysAbc::with_commands(&self.yosys, &self.abc, Duration::from_secs(self.timeout));
        let design = Design {
            path: self.file.clone(),
            top: self.top.clone(),
        };
        let workdir = match tempfile::tempdir() {
            Ok(d) => d,
            Err(err) => {
                println!("Cannot create working directory: {}", err);
                std::process::exit(1);
            }
        };
        match engine.convert(&design, &workdir.path().join("golden.aig")) {
            Ok(stats) => {
                println!("Golden graph:\n{}", stats);
            }
            Err(err) => {
                println!("Conversion failed: {}", err);
                std::process::exit(1);
            }
        }
    }
}
