//! One solution surfaced by the optimization oracle, together with its
//! derived views: the selected network, the guessed dataset trace, the MSE
//! of the trajectory, and the blocking constraint excluding the solution
//! from future solves.

use crate::solver::clingo::AnswerSet;
use crate::solver::Family;
use crate::{Dataset, Fact, Hypergraph, LogicalNetwork};
use fxhash::FxHashMap;

/// One answer set of the oracle, with the optimization vector attached.
#[derive(Clone, Debug)]
pub struct Sample {
    facts: Vec<Fact>,
    optimization: Vec<i64>,
}

impl Sample {
    pub fn new(answer: &AnswerSet) -> Sample {
        Sample {
            facts: answer.facts.clone(),
            optimization: answer.optimization.clone(),
        }
    }

    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    /// Total weighted mismatch of this solution.
    pub fn weight(&self) -> i64 {
        self.optimization.first().cloned().unwrap_or(0)
    }

    /// Total literal count of this solution, when cardinality was part of
    /// the objective.
    pub fn size(&self) -> Option<i64> {
        self.optimization.get(1).cloned()
    }

    /// Project the `dnf/2` atoms into a `LogicalNetwork`.
    pub fn network(&self, hypergraph: &Hypergraph) -> Result<LogicalNetwork, String> {
        let selections: Vec<(usize, usize)> = self
            .facts
            .iter()
            .filter_map(|fact| match fact {
                Fact::Dnf(formula, hyperedge) => Some((*formula, *hyperedge)),
                _ => None,
            })
            .collect();
        LogicalNetwork::from_hyperedges(hypergraph, &selections)
    }

    /// Project the guessed trajectory onto a copy of `dataset`.
    ///
    /// Only observed, unclamped readout values are rewritten; the loaded
    /// dataset itself is never touched.
    pub fn trace(&self, dataset: &Dataset) -> Dataset {
        let mut trace = dataset.clone();
        for fact in &self.facts {
            if let Fact::Guessed(experiment, time, node, value) = fact {
                if !dataset.readouts().contains(node) || dataset.controls().contains(node) {
                    continue;
                }
                if dataset.binary_observation(*experiment, *time, node).is_none() {
                    continue;
                }
                trace.set_binary_observation(*experiment, *time, node, *value != 0);
            }
        }
        trace
    }

    /// Root-mean-square discrepancy between the continuous observations and
    /// (discrete series, sample series): the binarized `measured/4` values
    /// and the candidate's own `guessed/4` trajectory. Observation points
    /// without a matching predicted value are skipped; `None` when no pair
    /// matches at all.
    pub fn mse(&self, factor: u32) -> (Option<f64>, Option<f64>) {
        (self.series_mse(factor, false), self.series_mse(factor, true))
    }

    fn series_mse(&self, factor: u32, guessed: bool) -> Option<f64> {
        let factor = f64::from(factor);
        let mut observed: FxHashMap<(usize, u32, &str), f64> = FxHashMap::default();
        let mut predicted: FxHashMap<(usize, u32, &str), f64> = FxHashMap::default();
        for fact in &self.facts {
            match fact {
                Fact::Obs(experiment, time, node, value) => {
                    observed.insert(
                        (*experiment, *time, node.as_str()),
                        f64::from(*value) / factor,
                    );
                }
                Fact::Measured(experiment, time, node, value) if !guessed => {
                    predicted.insert((*experiment, *time, node.as_str()), f64::from(*value));
                }
                Fact::Guessed(experiment, time, node, value) if guessed => {
                    predicted.insert((*experiment, *time, node.as_str()), f64::from(*value));
                }
                _ => (),
            }
        }
        let mut cumulative = 0.0;
        let mut count = 0usize;
        for (key, value) in &observed {
            if let Some(prediction) = predicted.get(key) {
                cumulative += (value - prediction) * (value - prediction);
                count += 1;
            }
        }
        if count == 0 {
            None
        } else {
            Some((cumulative / count as f64).sqrt())
        }
    }

    /// The blocking constraint excluding exactly this solution's defining
    /// facts (and, for trace-level enumeration, its guessed trajectory) from
    /// future solves.
    ///
    /// For the unrestricted family the defining atoms alone only exclude
    /// supersets, so cardinality bounds pinning the exact counts are added.
    pub fn exclusion_constraint(&self, family: Family, enum_traces: bool) -> String {
        let mut body: Vec<String> = Vec::new();
        let mut formulas = 0usize;
        let mut dnfs = 0usize;
        let mut clauses = 0usize;
        for fact in &self.facts {
            match fact {
                Fact::Formula(..) => formulas += 1,
                Fact::Dnf(..) => dnfs += 1,
                Fact::Clause(..) => clauses += 1,
                Fact::Guessed(..) => {
                    if !enum_traces {
                        continue;
                    }
                }
                _ => continue,
            }
            body.push(fact.to_string());
        }
        if family == Family::All {
            body.push(format!("{}{{formula(V,I) : node(V,I)}}{}", formulas, formulas));
            body.push(format!("{}{{dnf(I,J) : hyper(I,J,N)}}{}", dnfs, dnfs));
            body.push(format!("{}{{clause(J,V,B) : edge(J,V,B)}}{}", clauses, clauses));
        }
        format!(":- {}.", body.join(", "))
    }
}
