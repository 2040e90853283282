use crate::{InfluenceGraph, NodeId, Sign};
use fxhash::FxHashMap;
use std::fmt::{Display, Error, Formatter};

/// Methods for safely constructing new instances of `InfluenceGraph`s.
impl InfluenceGraph {
    /// Create a new `InfluenceGraph` with the given node names and no
    /// influences.
    ///
    /// The ordering of the nodes is preserved.
    pub fn new(nodes: Vec<String>) -> InfluenceGraph {
        let mut node_to_index = FxHashMap::default();
        for (i, name) in nodes.iter().enumerate() {
            node_to_index.insert(name.clone(), NodeId(i));
        }
        InfluenceGraph {
            nodes,
            node_to_index,
            edges: Vec::new(),
        }
    }

    /// Add a signed influence `source -> target`.
    ///
    /// Returns `Err` if either node is unknown or if the same signed
    /// influence is already present.
    pub fn add_influence(&mut self, source: &str, sign: Sign, target: &str) -> Result<(), String> {
        let source = self
            .find_node(source)
            .ok_or(format!("Invalid influence: Unknown source {}.", source))?;
        let target = self
            .find_node(target)
            .ok_or(format!("Invalid influence: Unknown target {}.", target))?;
        if self.edges.contains(&(source, sign, target)) {
            return Err(format!(
                "Invalid influence: {} already regulates {} with this sign.",
                self.get_node_name(source),
                self.get_node_name(target)
            ));
        }
        self.edges.push((source, sign, target));
        Ok(())
    }
}

/// Some basic utility methods for inspecting the `InfluenceGraph`.
impl InfluenceGraph {
    /// The number of nodes in this graph.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Find a `NodeId` for the given name, or `None` if the node does
    /// not exist.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.node_to_index.get(name).cloned()
    }

    /// Return the name of the given node.
    pub fn get_node_name(&self, id: NodeId) -> &String {
        &self.nodes[id.0]
    }

    /// An iterator over all `NodeId`s of this graph.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// All signed influences, as `(source, sign, target)` triples.
    pub fn influences(&self) -> &[(NodeId, Sign, NodeId)] {
        &self.edges
    }

    /// Return a sorted, de-duplicated list of signed regulators of `target`.
    pub fn regulators(&self, target: NodeId) -> Vec<(NodeId, Sign)> {
        let mut regulators: Vec<(NodeId, Sign)> = self
            .edges
            .iter()
            .filter(|(_, _, t)| *t == target)
            .map(|(s, sign, _)| (*s, *sign))
            .collect();
        regulators.sort();
        regulators.dedup();
        regulators
    }

    /// True if `target` has at least one regulator (of any sign).
    pub fn has_regulators(&self, target: NodeId) -> bool {
        self.edges.iter().any(|(_, _, t)| *t == target)
    }
}

impl Display for InfluenceGraph {
    /// Prints the graph back into the `.sif` format.
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        for (source, sign, target) in &self.edges {
            writeln!(
                f,
                "{}\t{}\t{}",
                self.get_node_name(*source),
                sign.to_i32(),
                self.get_node_name(*target)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{InfluenceGraph, Sign};
    use pretty_assertions::assert_eq;

    fn simple_graph() -> InfluenceGraph {
        let mut graph = InfluenceGraph::new(vec!["a".to_string(), "b".to_string()]);
        graph.add_influence("a", Sign::Positive, "b").unwrap();
        graph
    }

    #[test]
    fn build_and_inspect() {
        let graph = simple_graph();
        assert_eq!(2, graph.num_nodes());
        let b = graph.find_node("b").unwrap();
        let a = graph.find_node("a").unwrap();
        assert_eq!(vec![(a, Sign::Positive)], graph.regulators(b));
        assert!(graph.regulators(a).is_empty());
        assert!(!graph.has_regulators(a));
    }

    #[test]
    fn duplicate_influence_is_rejected() {
        let mut graph = simple_graph();
        assert!(graph.add_influence("a", Sign::Positive, "b").is_err());
        // The same pair with the other sign is a different influence.
        assert!(graph.add_influence("a", Sign::Negative, "b").is_ok());
    }

    #[test]
    fn unknown_node_is_rejected() {
        let mut graph = simple_graph();
        assert!(graph.add_influence("a", Sign::Positive, "c").is_err());
    }

    #[test]
    fn sif_round_trip() {
        let graph = simple_graph();
        let parsed = InfluenceGraph::try_from_sif(&graph.to_string()).unwrap();
        assert_eq!(graph.influences().len(), parsed.influences().len());
    }
}
