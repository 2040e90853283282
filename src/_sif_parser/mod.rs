use crate::{InfluenceGraph, Sign};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    /// Matches one `source relation target` line of a `.sif` file.
    static ref SIF_LINE_REGEX: Regex =
        Regex::new(r"^\s*(\S+)\s+(\S+)\s+(\S+)\s*$").unwrap();
}

impl InfluenceGraph {
    /// Try to load an `InfluenceGraph` from the contents of a `.sif` file.
    ///
    /// Each non-empty line is `source relation target`, separated by
    /// whitespace, where relation is `1`/`+` (activation) or `-1`/`-`
    /// (inhibition). Lines starting with `#` are comments. Any other
    /// relation token is a fatal error.
    pub fn try_from_sif(model_string: &str) -> Result<InfluenceGraph, String> {
        let mut influences: Vec<(String, Sign, String)> = Vec::new();
        let mut names: BTreeSet<String> = BTreeSet::new();
        for line in model_string.lines() {
            if line.trim().is_empty() || line.trim().starts_with('#') {
                continue;
            }
            let captures = SIF_LINE_REGEX
                .captures(line)
                .ok_or(format!("Unexpected `.sif` line: `{}`.", line))?;
            let source = captures[1].to_string();
            let target = captures[3].to_string();
            let sign = match &captures[2] {
                "1" | "+" => Sign::Positive,
                "-1" | "-" => Sign::Negative,
                token => {
                    return Err(format!("Unknown `.sif` relation `{}`.", token));
                }
            };
            names.insert(source.clone());
            names.insert(target.clone());
            influences.push((source, sign, target));
        }
        let mut graph = InfluenceGraph::new(names.into_iter().collect());
        for (source, sign, target) in influences {
            // Repeated lines are tolerated, the influence set is what counts.
            if graph.find_node(&source).is_some() && graph.find_node(&target).is_some() {
                let _ = graph.add_influence(&source, sign, &target);
            }
        }
        Ok(graph)
    }
}
