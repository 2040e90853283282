use crate::{Dataset, Experiment, Fact, Sign};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Error, Formatter};

impl Experiment {
    pub fn new(id: usize) -> Experiment {
        Experiment {
            id,
            clampings: BTreeMap::new(),
            observations: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Fix `node` to on/off for the whole experiment.
    pub fn add_clamping(&mut self, node: &str, sign: Sign) {
        self.clampings.insert(node.to_string(), sign);
    }

    /// Record a scaled observation of `node` at time `time`.
    pub fn add_observation(&mut self, time: u32, node: &str, value: u32) {
        self.observations
            .entry(time)
            .or_default()
            .insert(node.to_string(), value);
    }

    pub fn clampings(&self) -> &BTreeMap<String, Sign> {
        &self.clampings
    }

    pub fn clamping(&self, node: &str) -> Option<Sign> {
        self.clampings.get(node).cloned()
    }

    /// Observed time points, in increasing order.
    pub fn times(&self) -> Vec<u32> {
        self.observations.keys().cloned().collect()
    }

    /// The first observed time point, if any.
    pub fn first_time(&self) -> Option<u32> {
        self.observations.keys().next().cloned()
    }

    /// The scaled observations at one time point.
    pub fn observations_at(&self, time: u32) -> Option<&BTreeMap<String, u32>> {
        self.observations.get(&time)
    }

    /// The scaled value of `node` at `time`, if observed.
    pub fn value(&self, time: u32, node: &str) -> Option<u32> {
        self.observations.get(&time).and_then(|o| o.get(node)).cloned()
    }
}

impl Display for Experiment {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        writeln!(f, "Experiment({}):", self.id)?;
        for (node, sign) in &self.clampings {
            writeln!(f, "\t{:2} {}", sign.to_i32(), node)?;
        }
        for (time, values) in &self.observations {
            write!(f, "\t{:4} |", time)?;
            for (node, value) in values {
                write!(f, "\t{}={}", node, value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Dataset {
    /// A new empty dataset with the default discretization factor (100).
    pub fn new(name: &str) -> Dataset {
        Dataset::with_factor(name, 100)
    }

    pub fn with_factor(name: &str, factor: u32) -> Dataset {
        Dataset {
            name: name.to_string(),
            factor,
            stimuli: BTreeSet::new(),
            inhibitors: BTreeSet::new(),
            readouts: BTreeSet::new(),
            controls: BTreeSet::new(),
            experiments: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn factor(&self) -> u32 {
        self.factor
    }

    /// Binarize one scaled value: `value >= factor/2` maps to `true`.
    pub fn binarize(&self, value: u32) -> bool {
        2 * value >= self.factor
    }

    pub fn declare_stimulus(&mut self, node: &str) -> Result<(), String> {
        if self.controls.contains(node) {
            return Err(format!("Control node `{}` cannot be a stimulus.", node));
        }
        self.stimuli.insert(node.to_string());
        Ok(())
    }

    pub fn declare_inhibitor(&mut self, node: &str) -> Result<(), String> {
        if self.controls.contains(node) {
            return Err(format!("Control node `{}` cannot be an inhibitor.", node));
        }
        self.inhibitors.insert(node.to_string());
        Ok(())
    }

    pub fn declare_readout(&mut self, node: &str) {
        self.readouts.insert(node.to_string());
    }

    /// Declare `node` as externally driven. A control node can never also be
    /// clampable (stimulus or inhibitor).
    pub fn declare_control(&mut self, node: &str) -> Result<(), String> {
        if self.stimuli.contains(node) || self.inhibitors.contains(node) {
            return Err(format!(
                "Node `{}` is clampable and cannot also be a control node.",
                node
            ));
        }
        self.controls.insert(node.to_string());
        Ok(())
    }

    pub fn stimuli(&self) -> &BTreeSet<String> {
        &self.stimuli
    }

    pub fn inhibitors(&self) -> &BTreeSet<String> {
        &self.inhibitors
    }

    pub fn readouts(&self) -> &BTreeSet<String> {
        &self.readouts
    }

    pub fn controls(&self) -> &BTreeSet<String> {
        &self.controls
    }

    /// Stimuli and inhibitors together: the externally clampable nodes.
    pub fn clampable(&self) -> BTreeSet<String> {
        self.stimuli.union(&self.inhibitors).cloned().collect()
    }

    /// Every node referenced anywhere in the dataset.
    pub fn declared_nodes(&self) -> BTreeSet<String> {
        let mut nodes: BTreeSet<String> = BTreeSet::new();
        nodes.extend(self.stimuli.iter().cloned());
        nodes.extend(self.inhibitors.iter().cloned());
        nodes.extend(self.readouts.iter().cloned());
        nodes.extend(self.controls.iter().cloned());
        for experiment in self.experiments.values() {
            nodes.extend(experiment.clampings.keys().cloned());
            for values in experiment.observations.values() {
                nodes.extend(values.keys().cloned());
            }
        }
        nodes
    }

    /// Insert an experiment, enforcing the `0 <= value <= factor` invariant
    /// on every observation.
    pub fn add_experiment(&mut self, experiment: Experiment) -> Result<(), String> {
        for (time, values) in &experiment.observations {
            for (node, value) in values {
                if *value > self.factor {
                    return Err(format!(
                        "Observation of `{}` at time {} exceeds the discretization \
                         factor ({} > {}).",
                        node, time, value, self.factor
                    ));
                }
            }
        }
        self.experiments.insert(experiment.id, experiment);
        Ok(())
    }

    pub fn experiments(&self) -> impl Iterator<Item = &Experiment> {
        self.experiments.values()
    }

    pub fn experiment(&self, id: usize) -> Option<&Experiment> {
        self.experiments.get(&id)
    }

    pub fn num_experiments(&self) -> usize {
        self.experiments.len()
    }

    /// Binarized observation of `node` in experiment `id` at `time`.
    pub fn binary_observation(&self, id: usize, time: u32, node: &str) -> Option<bool> {
        self.experiments
            .get(&id)
            .and_then(|e| e.value(time, node))
            .map(|value| self.binarize(value))
    }

    /// Overwrite one observation with a binary value (scaled back to the
    /// `0..=factor` range).
    ///
    /// This is only meant for building a *trace copy* of the dataset whose
    /// readouts follow a candidate's guessed trajectory; the loaded dataset
    /// itself is never rewritten (see `Sample::trace`).
    pub fn set_binary_observation(&mut self, id: usize, time: u32, node: &str, value: bool) {
        if let Some(experiment) = self.experiments.get_mut(&id) {
            if let Some(values) = experiment.observations.get_mut(&time) {
                if values.contains_key(node) {
                    let scaled = if value { self.factor } else { 0 };
                    values.insert(node.to_string(), scaled);
                }
            }
        }
    }

    /// Build a dataset from parsed facts.
    pub fn from_facts(name: &str, facts: &[Fact]) -> Result<Dataset, String> {
        let mut dataset = Dataset::new(name);
        // Setup and experiment declarations first, so that clampings and
        // observations always find their experiment.
        for fact in facts {
            match fact {
                Fact::Dfactor(factor) => dataset.factor = *factor,
                Fact::Stimulus(node) => dataset.declare_stimulus(node)?,
                Fact::Inhibitor(node) => dataset.declare_inhibitor(node)?,
                Fact::Readout(node) => dataset.declare_readout(node),
                Fact::Control(node) => dataset.declare_control(node)?,
                Fact::Exp(id) => {
                    dataset.experiments.insert(*id, Experiment::new(*id));
                }
                _ => (),
            }
        }
        for fact in facts {
            match fact {
                Fact::Clamped(id, node, sign) => {
                    let experiment = dataset
                        .experiments
                        .get_mut(id)
                        .ok_or(format!("Clamping references unknown experiment {}.", id))?;
                    experiment.add_clamping(node, *sign);
                }
                Fact::Obs(id, time, node, value) => {
                    if *value > dataset.factor {
                        return Err(format!(
                            "Observation of `{}` at time {} exceeds the discretization \
                             factor ({} > {}).",
                            node, time, value, dataset.factor
                        ));
                    }
                    let experiment = dataset
                        .experiments
                        .get_mut(id)
                        .ok_or(format!("Observation references unknown experiment {}.", id))?;
                    experiment.add_observation(*time, node, *value);
                }
                _ => (),
            }
        }
        Ok(dataset)
    }

    /// The fact encoding of this dataset.
    pub fn facts(&self) -> Vec<Fact> {
        let mut facts = Vec::new();
        facts.push(Fact::Dfactor(self.factor));
        for node in &self.stimuli {
            facts.push(Fact::Stimulus(node.clone()));
        }
        for node in &self.inhibitors {
            facts.push(Fact::Inhibitor(node.clone()));
        }
        for node in &self.readouts {
            facts.push(Fact::Readout(node.clone()));
        }
        for node in &self.controls {
            facts.push(Fact::Control(node.clone()));
        }
        for experiment in self.experiments.values() {
            facts.push(Fact::Exp(experiment.id));
            for (node, sign) in &experiment.clampings {
                facts.push(Fact::Clamped(experiment.id, node.clone(), *sign));
            }
            for (time, values) in &experiment.observations {
                for (node, value) in values {
                    facts.push(Fact::Obs(experiment.id, *time, node.clone(), *value));
                }
            }
        }
        facts
    }
}

impl Display for Dataset {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        writeln!(f, "########## {} ##########", self.name)?;
        for experiment in self.experiments.values() {
            write!(f, "{}", experiment)?;
        }
        Ok(())
    }
}
