use crate::{Clause, DnfFormula, Fact, Hypergraph, Literal, LogicalNetwork};
use fxhash::FxHashSet;
use std::collections::BTreeMap;
use std::fmt::{Display, Error, Formatter};

impl LogicalNetwork {
    /// An empty network (no formulas assigned).
    pub fn new() -> LogicalNetwork {
        LogicalNetwork {
            formulas: BTreeMap::new(),
        }
    }

    /// Create a network directly from `(node, formula)` assignments.
    ///
    /// Returns `Err` when one node is assigned twice.
    pub fn from_formulas(
        assignments: Vec<(String, DnfFormula)>,
    ) -> Result<LogicalNetwork, String> {
        let mut formulas = BTreeMap::new();
        for (node, formula) in assignments {
            if formulas.insert(node.clone(), formula).is_some() {
                return Err(format!("Node `{}` is assigned two formulas.", node));
            }
        }
        Ok(LogicalNetwork { formulas })
    }

    /// Project `formula/2`, `dnf/2` and `clause/3` facts into a network.
    ///
    /// Every referenced formula and clause id must be fully described by the
    /// facts; a dangling reference is a fatal error.
    pub fn from_facts(facts: &[Fact]) -> Result<LogicalNetwork, String> {
        let mut formula_names: BTreeMap<usize, String> = BTreeMap::new();
        let mut formula_clauses: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        let mut clause_literals: BTreeMap<usize, Vec<Literal>> = BTreeMap::new();
        for fact in facts {
            match fact {
                Fact::Formula(name, id) => {
                    formula_names.insert(*id, name.clone());
                    formula_clauses.entry(*id).or_default();
                }
                Fact::Dnf(formula, hyperedge) => {
                    formula_clauses.entry(*formula).or_default().push(*hyperedge);
                }
                Fact::Clause(hyperedge, node, sign) => {
                    clause_literals
                        .entry(*hyperedge)
                        .or_default()
                        .push(Literal::new(node, *sign));
                }
                _ => (),
            }
        }
        let mut assignments = Vec::new();
        for (id, clause_ids) in formula_clauses {
            let name = formula_names
                .get(&id)
                .ok_or(format!("Clauses reference unknown formula id {}.", id))?;
            let mut clauses = Vec::new();
            for clause_id in clause_ids {
                let literals = clause_literals.get(&clause_id).ok_or(format!(
                    "Formula `{}` references clause id {} with no literals.",
                    name, clause_id
                ))?;
                clauses.push(Clause::new(literals.clone()));
            }
            assignments.push((name.clone(), DnfFormula::new(clauses)));
        }
        LogicalNetwork::from_formulas(assignments)
    }

    /// Project `(formula-id, hyperedge-id)` pairs into a network, resolving
    /// the ids through the hypergraph arena.
    pub fn from_hyperedges(
        hypergraph: &Hypergraph,
        pairs: &[(usize, usize)],
    ) -> Result<LogicalNetwork, String> {
        let graph = hypergraph.graph();
        let mut clauses_of: BTreeMap<String, Vec<Clause>> = BTreeMap::new();
        for (formula, hyperedge) in pairs {
            if *formula >= graph.num_nodes() {
                return Err(format!("Unknown formula id {}.", formula));
            }
            if *hyperedge >= hypergraph.num_hyperedges() {
                return Err(format!("Unknown hyperedge id {}.", hyperedge));
            }
            let node = crate::NodeId::from(*formula);
            let id = crate::HyperedgeId::from(*hyperedge);
            if !hypergraph.candidates(node).contains(&id) {
                return Err(format!(
                    "Hyperedge {} is not a candidate of node `{}`.",
                    hyperedge,
                    graph.get_node_name(node)
                ));
            }
            clauses_of
                .entry(graph.get_node_name(node).clone())
                .or_default()
                .push(hypergraph.get_clause(id).clone());
        }
        let assignments = clauses_of
            .into_iter()
            .map(|(node, clauses)| (node, DnfFormula::new(clauses)))
            .collect();
        LogicalNetwork::from_formulas(assignments)
    }

    /// Complete the assignment with constant-false formulas for every node
    /// of `nodes` that has no formula yet.
    ///
    /// Idempotent: nodes that already carry a formula are never touched.
    pub fn default_false<'a>(&mut self, nodes: impl IntoIterator<Item = &'a str>) {
        for node in nodes {
            self.formulas
                .entry(node.to_string())
                .or_insert_with(DnfFormula::constant_false);
        }
    }

    /// An iterator over the `(node, formula)` assignments, in node order.
    pub fn formulas(&self) -> impl Iterator<Item = (&String, &DnfFormula)> {
        self.formulas.iter()
    }

    pub fn get_formula(&self, node: &str) -> Option<&DnfFormula> {
        self.formulas.get(node)
    }

    pub fn num_formulas(&self) -> usize {
        self.formulas.len()
    }

    /// Every node mentioned by this network: assigned nodes plus the nodes
    /// appearing inside clauses.
    pub fn variables(&self) -> std::collections::BTreeSet<String> {
        let mut variables = std::collections::BTreeSet::new();
        for (node, formula) in &self.formulas {
            variables.insert(node.clone());
            for clause in formula.clauses() {
                for literal in clause.literals() {
                    variables.insert(literal.node.clone());
                }
            }
        }
        variables
    }

    /// Total number of literals across all formulas (the solution
    /// cardinality measure).
    pub fn size(&self) -> usize {
        self.formulas.values().map(|f| f.size()).sum()
    }

    /// The canonical 0/1 vector of this network over the hypergraph's
    /// `(node, hyperedge)` columns.
    ///
    /// Returns `Err` when the network mentions a node or clause the
    /// hypergraph cannot express.
    pub fn to_array(&self, hypergraph: &Hypergraph) -> Result<Vec<bool>, String> {
        let graph = hypergraph.graph();
        let mut selected: FxHashSet<(crate::NodeId, crate::HyperedgeId)> = FxHashSet::default();
        for (node, formula) in &self.formulas {
            let id = graph
                .find_node(node)
                .ok_or(format!("Node `{}` is not part of the hypergraph.", node))?;
            for clause in formula.clauses() {
                selected.insert((id, hypergraph.resolve(id, clause)?));
            }
        }
        Ok(hypergraph
            .mappings()
            .into_iter()
            .map(|column| selected.contains(&column))
            .collect())
    }
}

impl Display for LogicalNetwork {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        for (node, formula) in &self.formulas {
            writeln!(f, "{} = {}", node, formula)?;
        }
        Ok(())
    }
}
