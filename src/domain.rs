//! Conversion of externally supplied restrictions into logic-program text:
//! previously identified network sets (enumeration domains), partial network
//! specifications, and fixed-point constraints.

use crate::network_list::LogicalNetworkList;
use crate::{Clause, Fact, Hypergraph};
use std::collections::BTreeMap;

/// Convert a set of previously identified networks into an enumeration
/// domain: exactly one `model/1` is chosen, and every network's defining
/// facts are derived from its selector.
///
/// Only the formula-bearing nodes of each network are emitted. Clause-less
/// nodes stay free, so a converted network keeps the mismatch weight of the
/// run that produced it.
pub fn domain_of_networks(
    networks: &LogicalNetworkList,
    hypergraph: &Hypergraph,
) -> Result<String, String> {
    if networks.is_empty() {
        return Err("Cannot build a domain from an empty network set.".to_string());
    }
    let selectors: Vec<String> = (0..networks.len())
        .map(|i| format!("model({})", i))
        .collect();
    let mut out = format!("1{{{}}}1.\n", selectors.join("; "));

    let graph = hypergraph.graph();
    for (i, network) in networks.networks().enumerate() {
        let network = network?;
        for (node, formula) in network.formulas() {
            let id = graph
                .find_node(node)
                .ok_or(format!("Node `{}` is not part of the hypergraph.", node))?;
            let head = Fact::Formula(node.clone(), id.to_index());
            out.push_str(&format!("{} :- model({}).\n", head, i));
            for clause in formula.clauses() {
                let hyperedge = hypergraph.resolve(id, clause)?;
                let head = Fact::Dnf(id.to_index(), hyperedge.to_index());
                out.push_str(&format!("{} :- model({}).\n", head, i));
                for literal in clause.literals() {
                    let head =
                        Fact::Clause(hyperedge.to_index(), literal.node.clone(), literal.sign);
                    out.push_str(&format!("{} :- model({}).\n", head, i));
                }
            }
        }
    }
    Ok(out)
}

/// Parse a partial network specification and emit the corresponding
/// `dnf/2` restrictions.
///
/// Each line is `node = clause | clause`, where a clause with a trailing
/// `..` is *extensible*: any candidate clause containing it satisfies the
/// requirement. Complete clauses are required verbatim; candidate clauses of
/// the node that match nothing are forbidden.
pub fn partial_network_restriction(
    hypergraph: &Hypergraph,
    specification: &str,
) -> Result<String, String> {
    let graph = hypergraph.graph();
    let mut out = String::new();
    for line in specification.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (node, clauses) = line
            .split_once('=')
            .ok_or(format!("Invalid partial network line `{}`.", line))?;
        let node = node.trim();
        let id = graph
            .find_node(node)
            .ok_or(format!("Unknown node `{}` in partial network.", node))?;

        // clause -> is the specification complete (no trailing `..`)?
        let mut specified: Vec<(Clause, bool)> = Vec::new();
        for chunk in clauses.split('|') {
            let chunk = chunk.trim();
            let (chunk, complete) = match chunk.strip_suffix("..") {
                Some(prefix) => (prefix.trim(), false),
                None => (chunk, true),
            };
            specified.push((Clause::try_from_str(chunk)?, complete));
        }

        // For every extensible clause, the candidate hyperedges containing it.
        let mut extensions: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for candidate in hypergraph.candidates(id) {
            let clause = hypergraph.get_clause(*candidate);
            let exact = specified
                .iter()
                .find(|(c, _)| c == clause)
                .map(|(_, complete)| *complete);
            match exact {
                Some(true) => {
                    out.push_str(&format!(
                        "{}.\n",
                        Fact::Dnf(id.to_index(), candidate.to_index())
                    ));
                }
                Some(false) | None => {
                    let mut extends_something = false;
                    for (i, (c, complete)) in specified.iter().enumerate() {
                        if !complete && c.is_subset_of(clause) {
                            extensions.entry(i).or_default().push(candidate.to_index());
                            extends_something = true;
                        }
                    }
                    if !extends_something {
                        out.push_str(&format!(
                            ":- {}.\n",
                            Fact::Dnf(id.to_index(), candidate.to_index())
                        ));
                    }
                }
            }
        }
        for (i, (clause, complete)) in specified.iter().enumerate() {
            if *complete {
                continue;
            }
            let choices = extensions.remove(&i).unwrap_or_default();
            if choices.is_empty() {
                return Err(format!(
                    "No candidate clause of `{}` extends `{}..`.",
                    node, clause
                ));
            }
            let atoms: Vec<String> = choices
                .into_iter()
                .map(|h| Fact::Dnf(id.to_index(), h).to_string())
                .collect();
            out.push_str(&format!("1 {{{}}}.\n", atoms.join("; ")));
        }
    }
    Ok(out)
}

/// Convert a fixed-point CSV (header of node names, rows of 0/1 states)
/// into `fixpoint/3` facts consumed by the fixed-point constraint rules.
pub fn fixpoint_facts(csv: &str) -> Result<String, String> {
    let mut lines = csv.lines().filter(|l| !l.trim().is_empty());
    let header = lines.next().ok_or("Fixpoint CSV is empty.".to_string())?;
    let nodes: Vec<&str> = header.split(',').map(|c| c.trim()).collect();
    let mut out = String::new();
    for (k, line) in lines.enumerate() {
        let cells: Vec<&str> = line.split(',').map(|c| c.trim()).collect();
        if cells.len() != nodes.len() {
            return Err(format!(
                "Fixpoint CSV row {} has {} cells, expected {}.",
                k + 1,
                cells.len(),
                nodes.len()
            ));
        }
        for (node, cell) in nodes.iter().zip(&cells) {
            let value = match *cell {
                "0" => 0,
                "1" => 1,
                other => {
                    return Err(format!("Invalid fixpoint CSV cell `{}`.", other));
                }
            };
            out.push_str(&format!("fixpoint({},\"{}\",{}).\n", k, node, value));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::{domain_of_networks, fixpoint_facts, partial_network_restriction};
    use crate::network_list::LogicalNetworkList;
    use crate::{Hypergraph, InfluenceGraph, LogicalNetwork, Sign};
    use pretty_assertions::assert_eq;

    fn toy_hypergraph() -> Hypergraph {
        let mut graph =
            InfluenceGraph::new(vec!["a".to_string(), "b".to_string(), "c".to_string()]);
        graph.add_influence("a", Sign::Positive, "c").unwrap();
        graph.add_influence("b", Sign::Negative, "c").unwrap();
        Hypergraph::build(graph, 0)
    }

    #[test]
    fn domain_of_one_network() {
        let hg = toy_hypergraph();
        let c = hg.graph().find_node("c").unwrap();
        let network = LogicalNetwork::from_hyperedges(
            &hg,
            &[(c.to_index(), hg.candidates(c)[0].to_index())],
        )
        .unwrap();
        let mut list = LogicalNetworkList::from_hypergraph(&hg);
        list.append(&network, &hg).unwrap();

        let domain = domain_of_networks(&list, &hg).unwrap();
        assert!(domain.starts_with("1{model(0)}1."));
        assert!(domain.contains("formula(\"c\",2) :- model(0)."));
        assert!(domain.contains("dnf(2,0) :- model(0)."));
        // Clause-less nodes are not completed with constant-false formulas:
        // they stay free, exactly as in the run that produced the network.
        assert!(!domain.contains("formula(\"a\""));
        assert!(!domain.contains("formula(\"b\""));
    }

    #[test]
    fn partial_specification() {
        let hg = toy_hypergraph();
        // `a` is required verbatim, everything else is forbidden.
        let restriction = partial_network_restriction(&hg, "c = a\n").unwrap();
        assert!(restriction.contains("dnf(2,0).\n"));
        assert!(restriction.contains(":- dnf(2,1)."));
        assert!(restriction.contains(":- dnf(2,2)."));

        // `a..` may be extended: the candidates containing `a` form a choice.
        let extensible = partial_network_restriction(&hg, "c = a..\n").unwrap();
        assert!(extensible.contains("1 {dnf(2,0); dnf(2,2)}."));
        assert!(extensible.contains(":- dnf(2,1)."));
    }

    #[test]
    fn unknown_node_in_partial_specification() {
        let hg = toy_hypergraph();
        assert!(partial_network_restriction(&hg, "z = a\n").is_err());
    }

    #[test]
    fn fixpoints_from_csv() {
        let facts = fixpoint_facts("a,b\n1,0\n0,1\n").unwrap();
        assert_eq!(
            "fixpoint(0,\"a\",1).\nfixpoint(0,\"b\",0).\n\
             fixpoint(1,\"a\",0).\nfixpoint(1,\"b\",1).\n",
            facts
        );
        assert!(fixpoint_facts("a,b\n1\n").is_err());
        assert!(fixpoint_facts("a\nx\n").is_err());
    }
}
