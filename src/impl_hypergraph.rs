use crate::{Clause, Fact, HyperedgeId, Hypergraph, InfluenceGraph, Literal, NodeId, Sign};
use fxhash::FxHashMap;

impl Hypergraph {
    /// Build the hypergraph of candidate clauses for every node of `graph`.
    ///
    /// A candidate clause of a node is any non-empty subset of its signed
    /// regulators which does not mention one regulator with both signs, of at
    /// most `max_clause_len` literals (`0` means "as many as there are
    /// regulators").
    ///
    /// Every distinct clause receives a stable `HyperedgeId` in the order of
    /// first appearance; clauses shared between nodes share their id. The
    /// formula id of a node is its `NodeId`.
    pub fn build(graph: InfluenceGraph, max_clause_len: usize) -> Hypergraph {
        let mut clauses: Vec<Clause> = Vec::new();
        let mut clause_to_index: FxHashMap<Clause, HyperedgeId> = FxHashMap::default();
        let mut candidates: Vec<Vec<HyperedgeId>> = Vec::new();
        for node in graph.nodes() {
            let regulators = graph.regulators(node);
            let limit = if max_clause_len == 0 {
                regulators.len()
            } else {
                max_clause_len.min(regulators.len())
            };
            let mut node_candidates = Vec::new();
            for clause in candidate_clauses(&graph, &regulators, limit) {
                let id = *clause_to_index.entry(clause.clone()).or_insert_with(|| {
                    clauses.push(clause);
                    HyperedgeId::from(clauses.len() - 1)
                });
                node_candidates.push(id);
            }
            candidates.push(node_candidates);
        }
        Hypergraph {
            graph,
            clauses,
            clause_to_index,
            candidates,
        }
    }

    pub fn graph(&self) -> &InfluenceGraph {
        &self.graph
    }

    pub fn num_hyperedges(&self) -> usize {
        self.clauses.len()
    }

    /// The clause stored under the given `HyperedgeId`.
    pub fn get_clause(&self, id: HyperedgeId) -> &Clause {
        &self.clauses[id.to_index()]
    }

    /// Candidate hyperedges of one node, in their stable order.
    pub fn candidates(&self, node: NodeId) -> &[HyperedgeId] {
        &self.candidates[node.to_index()]
    }

    /// Find the id of a clause, if it is a candidate anywhere in the graph.
    pub fn find_hyperedge(&self, clause: &Clause) -> Option<HyperedgeId> {
        self.clause_to_index.get(clause).cloned()
    }

    /// Resolve a symbolic clause of `node` into its `HyperedgeId`.
    ///
    /// Returns `Err` when the clause is not a candidate of this node: such a
    /// clause cannot be expressed in the solver facts, which is a fatal
    /// encoding error.
    pub fn resolve(&self, node: NodeId, clause: &Clause) -> Result<HyperedgeId, String> {
        let id = self.find_hyperedge(clause).ok_or(format!(
            "Clause `{}` is not a candidate clause of this hypergraph.",
            clause
        ))?;
        if !self.candidates[node.to_index()].contains(&id) {
            return Err(format!(
                "Clause `{}` is not a candidate for node `{}`.",
                clause,
                self.graph.get_node_name(node)
            ));
        }
        Ok(id)
    }

    /// The canonical `(node, hyperedge)` column list: for every node (in id
    /// order) every candidate clause (in stable order). This fixes the layout
    /// of network CSV files and of [`crate::LogicalNetwork::to_array`].
    pub fn mappings(&self) -> Vec<(NodeId, HyperedgeId)> {
        let mut mappings = Vec::new();
        for node in self.graph.nodes() {
            for id in &self.candidates[node.to_index()] {
                mappings.push((node, *id));
            }
        }
        mappings
    }

    /// The `node/2`, `hyper/3` and `edge/3` facts describing this hypergraph.
    pub fn facts(&self) -> Vec<Fact> {
        let mut facts = Vec::new();
        for node in self.graph.nodes() {
            facts.push(Fact::Node(
                self.graph.get_node_name(node).clone(),
                node.to_index(),
            ));
        }
        for node in self.graph.nodes() {
            for id in &self.candidates[node.to_index()] {
                facts.push(Fact::Hyper(
                    node.to_index(),
                    id.to_index(),
                    self.get_clause(*id).len(),
                ));
            }
        }
        for (i, clause) in self.clauses.iter().enumerate() {
            for literal in clause.literals() {
                facts.push(Fact::Edge(i, literal.node.clone(), literal.sign));
            }
        }
        facts
    }
}

/// **(internal)** All candidate clauses over the given signed regulators,
/// ordered by size and then by regulator order.
fn candidate_clauses(
    graph: &InfluenceGraph,
    regulators: &[(NodeId, Sign)],
    limit: usize,
) -> Vec<Clause> {
    let mut result = Vec::new();
    for size in 1..=limit {
        let mut selection = Vec::with_capacity(size);
        combinations(graph, regulators, size, 0, &mut selection, &mut result);
    }
    result
}

fn combinations(
    graph: &InfluenceGraph,
    regulators: &[(NodeId, Sign)],
    size: usize,
    from: usize,
    selection: &mut Vec<(NodeId, Sign)>,
    result: &mut Vec<Clause>,
) {
    if size == 0 {
        // Skip clauses that mention one node with both signs.
        let mut nodes: Vec<NodeId> = selection.iter().map(|(n, _)| *n).collect();
        nodes.sort();
        nodes.dedup();
        if nodes.len() == selection.len() {
            let literals = selection
                .iter()
                .map(|(n, sign)| Literal::new(graph.get_node_name(*n), *sign))
                .collect();
            result.push(Clause::new(literals));
        }
        return;
    }
    for i in from..regulators.len() {
        selection.push(regulators[i]);
        combinations(graph, regulators, size - 1, i + 1, selection, result);
        selection.pop();
    }
}

#[cfg(test)]
mod tests {
    use crate::{Clause, Hypergraph, InfluenceGraph, Sign};
    use pretty_assertions::assert_eq;

    fn toy_hypergraph() -> Hypergraph {
        let mut graph = InfluenceGraph::new(vec![
            "a".to_string(),
            "b".to_string(),
            "c".to_string(),
        ]);
        graph.add_influence("a", Sign::Positive, "c").unwrap();
        graph.add_influence("b", Sign::Negative, "c").unwrap();
        Hypergraph::build(graph, 0)
    }

    #[test]
    fn candidate_enumeration() {
        let hg = toy_hypergraph();
        let c = hg.graph().find_node("c").unwrap();
        // a, !b, a+!b
        assert_eq!(3, hg.candidates(c).len());
        assert_eq!(3, hg.num_hyperedges());
        let a = hg.graph().find_node("a").unwrap();
        assert!(hg.candidates(a).is_empty());
    }

    #[test]
    fn clause_length_limit() {
        let mut graph = InfluenceGraph::new(vec!["a".to_string(), "b".to_string(), "c".to_string()]);
        graph.add_influence("a", Sign::Positive, "c").unwrap();
        graph.add_influence("b", Sign::Negative, "c").unwrap();
        let hg = Hypergraph::build(graph, 1);
        let c = hg.graph().find_node("c").unwrap();
        assert_eq!(2, hg.candidates(c).len());
    }

    #[test]
    fn both_signs_of_one_regulator_are_not_combined() {
        let mut graph = InfluenceGraph::new(vec!["a".to_string(), "b".to_string()]);
        graph.add_influence("a", Sign::Positive, "b").unwrap();
        graph.add_influence("a", Sign::Negative, "b").unwrap();
        let hg = Hypergraph::build(graph, 0);
        let b = hg.graph().find_node("b").unwrap();
        // a and !a, but never a+!a
        assert_eq!(2, hg.candidates(b).len());
    }

    #[test]
    fn resolution_is_unambiguous() {
        let hg = toy_hypergraph();
        let c = hg.graph().find_node("c").unwrap();
        let a = hg.graph().find_node("a").unwrap();
        let clause = Clause::try_from_str("a+!b").unwrap();
        let id = hg.resolve(c, &clause).unwrap();
        assert_eq!(clause, *hg.get_clause(id));
        // Valid clause, wrong node.
        assert!(hg.resolve(a, &clause).is_err());
        // Clause outside of the arena.
        assert!(hg.resolve(c, &Clause::try_from_str("!a").unwrap()).is_err());
    }

    #[test]
    fn facts_shape() {
        let hg = toy_hypergraph();
        let facts = hg.facts();
        let nodes = facts.iter().filter(|f| f.predicate() == "node").count();
        let hypers = facts.iter().filter(|f| f.predicate() == "hyper").count();
        let edges = facts.iter().filter(|f| f.predicate() == "edge").count();
        assert_eq!(3, nodes);
        assert_eq!(3, hypers);
        // a; !b; a,!b
        assert_eq!(4, edges);
    }
}
