//! Quality-of-result estimation for gate graphs
//!
//! ```
//! use optseq::cost::CostModel;
//! use optseq::engine::GraphStats;
//!
//! let stats = GraphStats { nb_inputs: 2, nb_outputs: 1, nb_gates: 1, nb_levels: 1 };
//! let cost = CostModel::default().cost(&stats);
//! assert_eq!(cost, 1.1);
//! ```

use crate::engine::GraphStats;

/// Cost parameters for optimization
///
/// Gate count approximates area, level count approximates critical-path depth.
/// This is obviously very inaccurate, and is meant to be used as an objective
/// to compare candidates during search, not as a timing model.
#[derive(Clone, Copy, Debug)]
pub struct CostModel {
    /// Weight of one logic level relative to one gate
    pub delay_weight: f64,
}

/// Default weight of a logic level in the cost function
pub const DEFAULT_DELAY_WEIGHT: f64 = 0.1;

impl Default for CostModel {
    fn default() -> CostModel {
        CostModel {
            delay_weight: DEFAULT_DELAY_WEIGHT,
        }
    }
}

impl CostModel {
    /// Scalar cost of a graph: gates plus weighted levels
    pub fn cost(&self, stats: &GraphStats) -> f64 {
        stats.nb_gates as f64 + self.delay_weight * stats.nb_levels as f64
    }
}
