//! Identification of Boolean networks that explain a discretized time-series
//! perturbation dataset, together with an exactness check based on temporal
//! model checking.
//!
//! The crate is organised around two external oracles:
//!
//!  - a combinatorial optimization oracle (`clingo`) which enumerates
//!    minimum-mismatch candidate networks over a prior-knowledge network
//!    (see [`solver`]);
//!  - a model-checking oracle (`NuSMV`) which decides whether one candidate
//!    reproduces the dataset exactly (see [`modelchecking`]).
//!
//! Everything in between is the data model: a signed influence graph (the
//! PKN), the hypergraph of candidate DNF clauses derived from it, logical
//! networks assigning a DNF formula to each node, and discretized experiment
//! datasets.

use fxhash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};

pub mod domain;
pub mod identification;
pub mod interleavings;
pub mod modelchecking;
pub mod network_list;
pub mod solver;

/// **(internal)** Implements a `.sif` parser for `InfluenceGraph` objects.
mod _sif_parser;

/// **(internal)** Implements a MIDAS `.csv` parser for `Dataset` objects.
mod _midas_parser;

/// **(internal)** Utility methods for `Literal`, `Clause` and `DnfFormula`.
mod impl_clause;
/// **(internal)** Utility methods for `Experiment` and `Dataset`.
mod impl_dataset;
/// **(internal)** Parsing and printing of logic-program facts.
mod impl_fact;

pub use impl_fact::facts_to_lp;
/// **(internal)** Utility methods for `Hypergraph`.
mod impl_hypergraph;
/// **(internal)** Utility methods for `InfluenceGraph`.
mod impl_influence_graph;
/// **(internal)** Utility methods for `LogicalNetwork`.
mod impl_logical_network;

/// A type-safe index of a node inside an `InfluenceGraph` (and the
/// `Hypergraph` built from it).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeId(usize);

/// A type-safe index of a candidate clause (hyperedge) inside a `Hypergraph`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct HyperedgeId(usize);

/// The sign of an influence or a literal: `Positive` is activation,
/// `Negative` is inhibition.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Sign {
    Positive,
    Negative,
}

/// A signed occurrence of a node inside a `Clause`.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Literal {
    pub node: String,
    pub sign: Sign,
}

/// A conjunction of signed literals.
///
/// The literals are kept sorted and de-duplicated, so that structurally equal
/// clauses compare (and hash) equal. A clause containing a node with both
/// signs is unsatisfiable but still a valid clause.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Clause {
    literals: Vec<Literal>,
}

/// A disjunction of `Clause`s attached to one output node.
///
/// An empty formula is the constant `false`.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct DnfFormula {
    clauses: Vec<Clause>,
}

/// A prior-knowledge network: named nodes plus signed directed influences.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InfluenceGraph {
    nodes: Vec<String>,
    node_to_index: FxHashMap<String, NodeId>,
    edges: Vec<(NodeId, Sign, NodeId)>,
}

/// The hypergraph of candidate clauses derived from an `InfluenceGraph`.
///
/// Every distinct candidate clause is assigned a stable `HyperedgeId` at
/// construction time, and the arena keeps both directions of the mapping, so
/// translating between symbolic formulas and integer-indexed solver facts is
/// a plain lookup.
#[derive(Clone, Debug)]
pub struct Hypergraph {
    graph: InfluenceGraph,
    clauses: Vec<Clause>,
    clause_to_index: FxHashMap<Clause, HyperedgeId>,
    /// Candidate hyperedges of each node, indexed by `NodeId`.
    candidates: Vec<Vec<HyperedgeId>>,
}

/// An assignment of a `DnfFormula` to every non-constant node.
///
/// Immutable after construction: the only mutating operation is
/// [`LogicalNetwork::default_false`], which completes the assignment with
/// constant-false formulas for declared-but-unassigned nodes.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LogicalNetwork {
    formulas: BTreeMap<String, DnfFormula>,
}

/// One experiment of a `Dataset`: a clamping plus time-indexed observations.
///
/// Observed values are kept on the `0..=factor` integer scale of the owning
/// dataset and binarized on read.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Experiment {
    id: usize,
    clampings: BTreeMap<String, Sign>,
    observations: BTreeMap<u32, BTreeMap<String, u32>>,
}

/// A discretized perturbation dataset.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Dataset {
    name: String,
    factor: u32,
    stimuli: BTreeSet<String>,
    inhibitors: BTreeSet<String>,
    readouts: BTreeSet<String>,
    /// Nodes that are externally driven without being declared stimuli
    /// or inhibitors.
    controls: BTreeSet<String>,
    experiments: BTreeMap<usize, Experiment>,
}

/// One fact of the logic-program encoding.
///
/// This is a closed set: the identification engine only ever exchanges these
/// predicates with the optimization oracle, and an unknown predicate tag in
/// parsed output is a fatal error.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Fact {
    /// `node(name, id)` — a node of the hypergraph with its formula id.
    Node(String, usize),
    /// `edge(hyperedge, node, sign)` — a literal of a candidate clause.
    Edge(usize, String, Sign),
    /// `hyper(formula, hyperedge, size)` — a candidate clause of a formula.
    Hyper(usize, usize, usize),
    /// `formula(name, id)` — a node selected by a solution.
    Formula(String, usize),
    /// `dnf(formula, hyperedge)` — a clause selected by a solution.
    Dnf(usize, usize),
    /// `clause(hyperedge, node, sign)` — a literal of a selected clause.
    Clause(usize, String, Sign),
    /// `exp(id)` — an experiment.
    Exp(usize),
    /// `clamped(exp, node, sign)` — a clamping of one experiment.
    Clamped(usize, String, Sign),
    /// `obs(exp, time, node, value)` — a scaled continuous observation.
    Obs(usize, u32, String, u32),
    /// `dfactor(factor)` — the discretization factor.
    Dfactor(u32),
    /// `model(id)` — selector used when enumeration is restricted to a
    /// previously identified set of networks.
    Model(usize),
    /// `stimulus(node)` — the experimental setup.
    Stimulus(String),
    /// `inhibitor(node)` — the experimental setup.
    Inhibitor(String),
    /// `readout(node)` — the experimental setup.
    Readout(String),
    /// `control(node)` — an externally driven node.
    Control(String),
    /// `measured(exp, time, node, bool)` — binarized observation, emitted by
    /// the oracle.
    Measured(usize, u32, String, u32),
    /// `guessed(exp, time, node, bool)` — a candidate's own trajectory,
    /// emitted by the oracle.
    Guessed(usize, u32, String, u32),
    /// `toGuess(exp, time, node)` — observation points subject to matching.
    ToGuess(usize, u32, String),
}

/// The update policy used by the temporal encoding.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UpdateMode {
    /// Exactly one pending change is applied per stage.
    Asynchronous,
    /// Any non-empty subset of pending changes may be applied per stage.
    General,
}

impl NodeId {
    /// Unwrap into the raw index.
    pub fn to_index(self) -> usize {
        self.0
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        NodeId(index)
    }
}

impl HyperedgeId {
    /// Unwrap into the raw index.
    pub fn to_index(self) -> usize {
        self.0
    }
}

impl From<usize> for HyperedgeId {
    fn from(index: usize) -> Self {
        HyperedgeId(index)
    }
}

impl Sign {
    /// The `1`/`-1` integer form used in the fact encoding.
    pub fn to_i32(self) -> i32 {
        match self {
            Sign::Positive => 1,
            Sign::Negative => -1,
        }
    }

    /// Parse the `1`/`-1` integer form used in the fact encoding.
    pub fn try_from_i32(value: i32) -> Result<Sign, String> {
        match value {
            1 => Ok(Sign::Positive),
            -1 => Ok(Sign::Negative),
            _ => Err(format!("Invalid sign value `{}`.", value)),
        }
    }
}

impl UpdateMode {
    /// The name used on the command line and in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            UpdateMode::Asynchronous => "asynchronous",
            UpdateMode::General => "general",
        }
    }

    pub fn try_from_name(name: &str) -> Result<UpdateMode, String> {
        match name {
            "asynchronous" => Ok(UpdateMode::Asynchronous),
            "general" => Ok(UpdateMode::General),
            _ => Err(format!("Unknown update mode `{}`.", name)),
        }
    }
}
