//! Enumeration of the admissible orderings in which a set of simultaneously
//! changing control inputs may be applied.
//!
//! A *stage sequence* is a list of stages; every changing node appears in
//! exactly one stage. Under the asynchronous policy each stage is a
//! singleton, so the sequences are exactly the permutations of the node set.
//! Under the general policy any non-empty subset of the still-unapplied
//! nodes may form a stage, which yields every ordered set partition and
//! strictly subsumes the asynchronous family.
//!
//! The enumeration is total over finite sets, and a zero-change set yields a
//! single empty sequence. There is no internal size limiting: the number of
//! results grows factorially (asynchronous) or faster (general, ordered Bell
//! numbers), so callers must bound the node-set size themselves.

use crate::UpdateMode;

/// One stage: the nodes whose change is applied together.
pub type Stage = Vec<String>;

/// Every admissible stage sequence for the given changing nodes under the
/// given update policy.
pub fn interleavings(mode: UpdateMode, nodes: &[String]) -> Vec<Vec<Stage>> {
    match mode {
        UpdateMode::Asynchronous => permutations(nodes)
            .into_iter()
            .map(|seq| seq.into_iter().map(|n| vec![n]).collect())
            .collect(),
        UpdateMode::General => {
            let mut result = Vec::new();
            for partition in partitions(nodes) {
                for ordering in permutations_of_parts(&partition) {
                    result.push(ordering);
                }
            }
            result
        }
    }
}

/// All permutations of `items`, in a deterministic order.
fn permutations(items: &[String]) -> Vec<Vec<String>> {
    if items.is_empty() {
        return vec![Vec::new()];
    }
    let mut result = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let mut rest: Vec<String> = items.to_vec();
        rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, item.clone());
            result.push(tail);
        }
    }
    result
}

/// All unordered set partitions of `items` (each partition is a list of
/// non-empty parts). The empty set has exactly one partition: no parts.
fn partitions(items: &[String]) -> Vec<Vec<Stage>> {
    if items.is_empty() {
        return vec![Vec::new()];
    }
    let first = &items[0];
    let mut result = Vec::new();
    for partition in partitions(&items[1..]) {
        // `first` as its own part.
        let mut own = partition.clone();
        own.push(vec![first.clone()]);
        result.push(own);
        // `first` joined to each existing part.
        for i in 0..partition.len() {
            let mut joined = partition.clone();
            joined[i].push(first.clone());
            result.push(joined);
        }
    }
    result
}

/// All orderings of the parts of one partition.
fn permutations_of_parts(parts: &[Stage]) -> Vec<Vec<Stage>> {
    if parts.is_empty() {
        return vec![Vec::new()];
    }
    let mut result = Vec::new();
    for i in 0..parts.len() {
        let mut rest: Vec<Stage> = parts.to_vec();
        let part = rest.remove(i);
        for mut tail in permutations_of_parts(&rest) {
            tail.insert(0, part.clone());
            result.push(tail);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::interleavings;
    use crate::UpdateMode;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn nodes(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn zero_changes_yield_one_empty_sequence() {
        assert_eq!(vec![Vec::<Vec<String>>::new()], interleavings(UpdateMode::Asynchronous, &[]));
        assert_eq!(vec![Vec::<Vec<String>>::new()], interleavings(UpdateMode::General, &[]));
    }

    #[test]
    fn asynchronous_is_permutations_of_singletons() {
        let result = interleavings(UpdateMode::Asynchronous, &nodes(&["a", "b", "c"]));
        assert_eq!(6, result.len());
        for sequence in &result {
            assert_eq!(3, sequence.len());
            assert!(sequence.iter().all(|stage| stage.len() == 1));
        }
        // All sequences are distinct.
        let distinct: HashSet<_> = result.iter().collect();
        assert_eq!(6, distinct.len());
    }

    #[test]
    fn general_subsumes_asynchronous() {
        let input = nodes(&["a", "b", "c"]);
        let asynchronous: HashSet<Vec<Vec<String>>> =
            interleavings(UpdateMode::Asynchronous, &input)
                .into_iter()
                .collect();
        let general: HashSet<Vec<Vec<String>>> = interleavings(UpdateMode::General, &input)
            .into_iter()
            .collect();
        assert!(asynchronous.is_subset(&general));
        assert!(general.len() > asynchronous.len());
        // Ordered Bell number for n = 3.
        assert_eq!(13, general.len());
    }

    #[test]
    fn every_node_appears_in_exactly_one_stage() {
        let input = nodes(&["a", "b", "c"]);
        for sequence in interleavings(UpdateMode::General, &input) {
            let mut seen: Vec<String> = sequence.into_iter().flatten().collect();
            seen.sort();
            assert_eq!(nodes(&["a", "b", "c"]), seen);
        }
    }

    #[test]
    fn singleton_input() {
        let result = interleavings(UpdateMode::General, &nodes(&["a"]));
        assert_eq!(vec![vec![vec!["a".to_string()]]], result);
    }
}
