//! Search-based logic synthesis optimization
//!
//! This crate discovers a sequence of logic-transformation passes that
//! minimizes the area/delay cost of a combinational design, while proving
//! that every accepted candidate is functionally equivalent to the input.
//! The heavy lifting of synthesis is delegated to an external engine
//! (Yosys and ABC) reached over subprocess text I/O; this crate owns the
//! search loop, the equivalence gating and the scoring.
//!
//! # Usage
//!
//! ```bash
//! # Show available commands
//! optseq help
//! # Search for a good pass sequence with the default budget
//! optseq opt mydesign.v -o results
//! # Inspect the golden graph of a design
//! optseq show mydesign.v
//! ```
//!
//! The `results` directory then contains the golden and best and-inverter
//! graphs, the regenerated Verilog and a JSON summary of the search.
//!
//! # Design
//!
//! The optimization flow is a fixed budget of independent trials. Each
//! trial proposes a pass sequence, applies it to a fresh copy of the
//! golden graph, proves equivalence with a combinational equivalence
//! check, and only then scores the candidate with the cost function
//! `gates + delay_weight * levels`. Failed trials are recorded with their
//! reason and a penalty score; they steer the sampler away from bad
//! regions but never abort the search.
//!
//! Proposals come from a Tree-structured Parzen estimator over the token
//! vocabulary, which learns from the observed costs which passes tend to
//! help at each position. Identical designs, seeds and budgets give
//! identical results.
//!
//! Only combinational designs are supported: anything that does not map
//! to two-input And gates and inverters is rejected at conversion time.

#![warn(missing_docs)]

pub mod cmd;
pub mod cost;
pub mod engine;
pub mod error;
pub mod optimize;
pub mod passes;
pub mod search;

pub use cost::CostModel;
pub use engine::{Design, Engine, GateGraph, GraphStats};
pub use error::OptimizeError;
pub use optimize::{optimize, OptimizeConfig, OptimizeResult, Summary};
pub use passes::{PassToken, Sequence};
pub use search::{SearchController, Trial};
