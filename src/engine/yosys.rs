//! Engine adapter driving Yosys and ABC as subprocesses
//!
//! Yosys handles the circuit-level ends of the pipeline: flattening a design
//! into and-inverter form, and regenerating circuit text from an optimized
//! graph. ABC handles everything in between: pass application, statistics
//! and combinational equivalence checking. Both tools are reached through
//! their batch modes (`yosys -q -p`, `abc -q`) with a hard timeout per call.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use crate::engine::report::{parse_abc_stats, parse_cec_verdict, AbcStats};
use crate::engine::run::run_command;
use crate::engine::{Design, Engine, EngineError, EquivStatus, GraphStats};
use crate::passes::{effective_commands, PassToken};

/// Default time budget for a single engine call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Yosys + ABC engine reached over subprocess text I/O
pub struct YosysAbc {
    yosys: String,
    abc: String,
    timeout: Duration,
}

impl YosysAbc {
    /// Engine using `yosys` and `abc` from the search path
    pub fn new(timeout: Duration) -> YosysAbc {
        YosysAbc::with_commands("yosys", "abc", timeout)
    }

    /// Engine using explicit tool commands
    pub fn with_commands(yosys: &str, abc: &str, timeout: Duration) -> YosysAbc {
        YosysAbc {
            yosys: yosys.to_string(),
            abc: abc.to_string(),
            timeout,
        }
    }

    fn run_yosys(&self, script: &str) -> Result<String, EngineError> {
        let mut cmd = Command::new(&self.yosys);
        cmd.arg("-q").arg("-p").arg(script);
        run_command(cmd, self.timeout)
    }

    fn run_abc(&self, script: &str) -> Result<String, EngineError> {
        let mut cmd = Command::new(&self.abc);
        cmd.arg("-q").arg(script);
        run_command(cmd, self.timeout)
    }

    /// Statistics of a gate graph artifact
    fn read_stats(&self, graph: &Path) -> Result<AbcStats, EngineError> {
        let out = self.run_abc(&format!("read {}; print_stats", graph.display()))?;
        parse_abc_stats(&out)
    }
}

impl From<AbcStats> for GraphStats {
    fn from(stats: AbcStats) -> GraphStats {
        GraphStats {
            nb_inputs: stats.nb_inputs,
            nb_outputs: stats.nb_outputs,
            nb_gates: stats.nb_ands,
            nb_levels: stats.nb_levels,
        }
    }
}

/// Yosys script flattening a design into an and-inverter graph
fn conversion_script(design: &Design, out: &Path) -> String {
    let top = match &design.top {
        Some(t) => format!(" -top {}", t),
        None => String::new(),
    };
    format!(
        "read_verilog {path}; hierarchy -check{top}; synth -flatten -noabc{top}; \
         opt; clean; aigmap; opt; clean; write_aiger {out}",
        path = design.path.display(),
        top = top,
        out = out.display(),
    )
}

/// ABC script applying a pass sequence to a copy of the golden graph
fn pass_script(golden: &Path, commands: &[&str], out: &Path) -> String {
    let mut script = format!("read {}; ", golden.display());
    for c in commands {
        script.push_str(c);
        script.push_str("; ");
    }
    script.push_str(&format!("write {}; print_stats", out.display()));
    script
}

impl Engine for YosysAbc {
    fn convert(&self, design: &Design, out: &Path) -> Result<GraphStats, EngineError> {
        self.run_yosys(&conversion_script(design, out))?;
        let stats = self.read_stats(out)?;
        if stats.nb_latches > 0 {
            return Err(EngineError::Unsupported(format!(
                "{} latches after mapping; only combinational designs are supported",
                stats.nb_latches
            )));
        }
        Ok(stats.into())
    }

    fn apply_passes(
        &self,
        golden: &Path,
        seq: &[PassToken],
        out: &Path,
    ) -> Result<GraphStats, EngineError> {
        let commands = effective_commands(seq);
        let report = self.run_abc(&pass_script(golden, &commands, out))?;
        Ok(parse_abc_stats(&report)?.into())
    }

    fn check_equivalence(
        &self,
        golden: &Path,
        candidate: &Path,
    ) -> Result<EquivStatus, EngineError> {
        let out = self.run_abc(&format!(
            "cec {} {}",
            golden.display(),
            candidate.display()
        ))?;
        parse_cec_verdict(&out)
    }

    fn export_netlist(&self, graph: &Path, out: &Path) -> Result<(), EngineError> {
        self.run_yosys(&format!(
            "read_aiger {}; write_verilog -noattr {}",
            graph.display(),
            out.display()
        ))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_conversion_script() {
        let design = Design {
            path: PathBuf::from("m.v"),
            top: Some("m".to_string()),
        };
        assert_eq!(
            conversion_script(&design, Path::new("golden.aig")),
            "read_verilog m.v; hierarchy -check -top m; synth -flatten -noabc -top m; \
             opt; clean; aigmap; opt; clean; write_aiger golden.aig"
        );
        let no_top = Design::from_file("m.v");
        assert!(!conversion_script(&no_top, Path::new("g.aig")).contains("-top"));
    }

    #[test]
    fn test_pass_script() {
        let script = pass_script(
            Path::new("golden.aig"),
            &["balance", "rewrite -z"],
            Path::new("trial.aig"),
        );
        assert_eq!(
            script,
            "read golden.aig; balance; rewrite -z; write trial.aig; print_stats"
        );
        // Identity sequence still produces a well-formed script
        let script = pass_script(Path::new("g.aig"), &[], Path::new("t.aig"));
        assert_eq!(script, "read g.aig; write t.aig; print_stats");
    }

    #[test]
    fn test_stats_conversion() {
        let abc = AbcStats {
            nb_inputs: 3,
            nb_outputs: 2,
            nb_latches: 0,
            nb_ands: 7,
            nb_levels: 3,
        };
        let stats: GraphStats = abc.into();
        assert_eq!(stats.nb_gates, 7);
        assert_eq!(stats.nb_levels, 3);
    }
}
