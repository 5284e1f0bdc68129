//! Parsing of the engine's free-form textual reports
//!
//! The statistics format printed by ABC varies between versions and network
//! types, so this adapter is deliberately the only place in the crate that
//! looks at raw engine text. Anything it cannot interpret is an error:
//! the search must fail closed rather than score a guessed graph.

use crate::engine::{EngineError, EquivStatus};

/// Statistics extracted from an ABC `print_stats` report
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AbcStats {
    /// Primary inputs
    pub nb_inputs: usize,
    /// Primary outputs
    pub nb_outputs: usize,
    /// Latches; non-zero means the design is not combinational
    pub nb_latches: usize,
    /// Two-input And gates
    pub nb_ands: usize,
    /// Logic levels
    pub nb_levels: usize,
}

/// Parse an ABC statistics report
///
/// A typical line looks like
/// `top : i/o = 3/ 2  lat = 0  and = 7  lev = 3`,
/// but key spellings differ between versions, so several are accepted.
pub fn parse_abc_stats(text: &str) -> Result<AbcStats, EngineError> {
    let (nb_inputs, nb_outputs) = parse_io(text)
        .ok_or_else(|| EngineError::Report(format!("no i/o counts in: {}", excerpt(text))))?;
    let nb_ands = find_value(text, &["and", "gates", "gate"])
        .ok_or_else(|| EngineError::Report(format!("no gate count in: {}", excerpt(text))))?;
    let nb_levels = find_value(text, &["levels", "level", "lev", "depth"])
        .ok_or_else(|| EngineError::Report(format!("no level count in: {}", excerpt(text))))?;
    let nb_latches = find_value(text, &["lat", "latch"]).unwrap_or(0);
    Ok(AbcStats {
        nb_inputs,
        nb_outputs,
        nb_latches,
        nb_ands,
        nb_levels,
    })
}

/// Parse an ABC `cec` verdict
///
/// Only an explicit verdict is accepted; any other output, including
/// resource-limit messages, is inconclusive and therefore an error.
pub fn parse_cec_verdict(text: &str) -> Result<EquivStatus, EngineError> {
    let lower = text.to_lowercase();
    if lower.contains("networks are not equivalent") {
        Ok(EquivStatus::NotEquivalent)
    } else if lower.contains("networks are equivalent") {
        Ok(EquivStatus::Equivalent)
    } else {
        Err(EngineError::Report(format!(
            "no equivalence verdict in: {}",
            excerpt(text)
        )))
    }
}

/// Find `key = <int>` or `key : <int>`, trying keys in order
fn find_value(text: &str, keys: &[&str]) -> Option<usize> {
    for key in keys {
        let mut start = 0;
        while let Some(pos) = text[start..].find(key) {
            let at = start + pos;
            start = at + key.len();
            // Reject matches inside a longer word, e.g. `and` in `nand`
            let boundary_ok = text[..at]
                .chars()
                .next_back()
                .map_or(true, |c| !c.is_alphanumeric());
            if !boundary_ok {
                continue;
            }
            if let Some(v) = read_separated_int(&text[at + key.len()..]) {
                return Some(v);
            }
        }
    }
    None
}

/// Parse the `i/o = <in>/ <out>` group
fn parse_io(text: &str) -> Option<(usize, usize)> {
    let at = text.find("i/o")?;
    let rest = &text[at + 3..];
    let inputs = read_separated_int(rest)?;
    let slash = rest.find('/')?;
    let outputs = read_int(&rest[slash + 1..])?;
    Some((inputs, outputs))
}

/// Read an integer after an optional `=` or `:` separator
fn read_separated_int(text: &str) -> Option<usize> {
    let rest = text.trim_start();
    let rest = rest.strip_prefix(['=', ':']).unwrap_or(rest);
    read_int(rest)
}

/// Read a leading integer, skipping whitespace
fn read_int(text: &str) -> Option<usize> {
    let rest = text.trim_start();
    let end = rest
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(rest.len(), |(i, _)| i);
    if end == 0 {
        None
    } else {
        rest[..end].parse().ok()
    }
}

/// Short quote of the offending text for error messages
fn excerpt(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.len() > 120 {
        format!("{}...", &flat[..120])
    } else if flat.is_empty() {
        "<empty output>".to_string()
    } else {
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_typical_line() {
        let text = "top                      : i/o =    3/    2  lat =    0  and =      7  lev =  3";
        let stats = parse_abc_stats(text).unwrap();
        assert_eq!(
            stats,
            AbcStats {
                nb_inputs: 3,
                nb_outputs: 2,
                nb_latches: 0,
                nb_ands: 7,
                nb_levels: 3,
            }
        );
    }

    #[test]
    fn test_parse_key_variants() {
        let stats = parse_abc_stats("m: i/o = 8/8 gates : 120 depth = 14").unwrap();
        assert_eq!(stats.nb_ands, 120);
        assert_eq!(stats.nb_levels, 14);
        assert_eq!(stats.nb_latches, 0);

        let stats = parse_abc_stats("m: i/o = 2/1 latch = 4 and = 3 level = 2").unwrap();
        assert_eq!(stats.nb_latches, 4);
    }

    #[test]
    fn test_and_does_not_match_nand() {
        // `nand` must not be taken for the gate count key
        let stats = parse_abc_stats("nand2 lib : i/o = 2/1 and = 5 lev = 2").unwrap();
        assert_eq!(stats.nb_ands, 5);
    }

    #[test]
    fn test_unparseable_is_an_error() {
        assert!(parse_abc_stats("").is_err());
        assert!(parse_abc_stats("Error: file not found").is_err());
        assert!(parse_abc_stats("i/o = 2/1 and = x lev = 1").is_err());
        // Missing level count fails closed
        assert!(parse_abc_stats("i/o = 2/1 and = 5").is_err());
    }

    #[test]
    fn test_cec_verdicts() {
        assert_eq!(
            parse_cec_verdict("Networks are equivalent.  Time = 0.01 sec").unwrap(),
            EquivStatus::Equivalent
        );
        assert_eq!(
            parse_cec_verdict("Networks are NOT EQUIVALENT.").unwrap(),
            EquivStatus::NotEquivalent
        );
        assert!(parse_cec_verdict("Resource limit reached").is_err());
        assert!(parse_cec_verdict("").is_err());
    }
}
