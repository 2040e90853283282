use crate::{Dataset, Experiment, InfluenceGraph, Sign};
use std::collections::BTreeMap;

/// **(internal)** The role of one MIDAS column.
enum Column {
    /// `TR:<node>` — stimulus treatment.
    Stimulus(String),
    /// `TR:<node>i` — inhibitor treatment.
    Inhibitor(String),
    /// `DA:<node>` or `DA:ALL` — acquisition time.
    Time(Option<String>),
    /// `DV:<node>` — measured value.
    Value(String),
    /// Cell-line annotation and similar columns are carried but unused.
    Ignored,
}

fn classify(header: &str) -> Column {
    let header = header.trim();
    if let Some(name) = header.strip_prefix("TR:") {
        if name.contains("CellLine") || name.contains(':') {
            return Column::Ignored;
        }
        if let Some(name) = name.strip_suffix('i') {
            return Column::Inhibitor(name.to_string());
        }
        return Column::Stimulus(name.to_string());
    }
    if let Some(name) = header.strip_prefix("DA:") {
        if name == "ALL" {
            return Column::Time(None);
        }
        return Column::Time(Some(name.to_string()));
    }
    if let Some(name) = header.strip_prefix("DV:") {
        return Column::Value(name.to_string());
    }
    Column::Ignored
}

impl Dataset {
    /// Try to load a `Dataset` from the contents of a MIDAS `.csv` file.
    ///
    /// `TR:` columns describe treatments (a trailing `i` marks an
    /// inhibitor), `DA:` columns the acquisition times, `DV:` columns the
    /// measured readout values on the `[0, 1]` scale. Rows sharing one
    /// treatment combination become a single experiment. A stimulus set to
    /// `0` is clamped off only when the node has regulators in the PKN
    /// (an input left untreated is simply absent, not forced).
    pub fn try_from_midas(
        csv: &str,
        name: &str,
        factor: u32,
        graph: &InfluenceGraph,
    ) -> Result<Dataset, String> {
        let mut lines = csv.lines().filter(|l| !l.trim().is_empty());
        let header = lines.next().ok_or("MIDAS file is empty.".to_string())?;
        let columns: Vec<Column> = header.split(',').map(classify).collect();

        let mut dataset = Dataset::with_factor(name, factor);
        for column in &columns {
            match column {
                Column::Stimulus(node) => dataset.declare_stimulus(node)?,
                Column::Inhibitor(node) => dataset.declare_inhibitor(node)?,
                Column::Value(node) => dataset.declare_readout(node),
                _ => (),
            }
        }

        // Group rows by their clamping so repeated measurements of one
        // condition land in the same experiment.
        let mut experiment_of: BTreeMap<Vec<(String, Sign)>, usize> = BTreeMap::new();
        let mut experiments: Vec<Experiment> = Vec::new();

        for (row_index, line) in lines.enumerate() {
            let cells: Vec<&str> = line.split(',').map(|c| c.trim()).collect();
            if cells.len() != columns.len() {
                return Err(format!(
                    "MIDAS row {} has {} cells, expected {}.",
                    row_index + 1,
                    cells.len(),
                    columns.len()
                ));
            }

            let mut clamping: Vec<(String, Sign)> = Vec::new();
            let mut default_time: Option<u32> = None;
            let mut times: BTreeMap<String, u32> = BTreeMap::new();
            let mut values: Vec<(String, f64)> = Vec::new();

            for (column, cell) in columns.iter().zip(&cells) {
                match column {
                    Column::Stimulus(node) => {
                        let on = parse_binary(cell, node)?;
                        if on {
                            clamping.push((node.clone(), Sign::Positive));
                        } else if graph
                            .find_node(node)
                            .map(|id| graph.has_regulators(id))
                            .unwrap_or(false)
                        {
                            clamping.push((node.clone(), Sign::Negative));
                        }
                    }
                    Column::Inhibitor(node) => {
                        if parse_binary(cell, node)? {
                            clamping.push((node.clone(), Sign::Negative));
                        }
                    }
                    Column::Time(None) => {
                        default_time = Some(parse_time(cell)?);
                    }
                    Column::Time(Some(node)) => {
                        times.insert(node.clone(), parse_time(cell)?);
                    }
                    Column::Value(node) => {
                        if cell.is_empty() || *cell == "NaN" {
                            continue;
                        }
                        let value: f64 = cell
                            .parse()
                            .map_err(|_| format!("Invalid value `{}` for `{}`.", cell, node))?;
                        if !(0.0..=1.0).contains(&value) {
                            return Err(format!(
                                "Value {} of `{}` is outside of the [0, 1] range.",
                                value, node
                            ));
                        }
                        values.push((node.clone(), value));
                    }
                    Column::Ignored => (),
                }
            }

            clamping.sort();
            let id = *experiment_of.entry(clamping.clone()).or_insert_with(|| {
                let mut experiment = Experiment::new(experiments.len());
                for (node, sign) in &clamping {
                    experiment.add_clamping(node, *sign);
                }
                experiments.push(experiment);
                experiments.len() - 1
            });

            for (node, value) in values {
                let time = times.get(&node).cloned().or(default_time).ok_or(format!(
                    "No acquisition time for `{}` in MIDAS row {}.",
                    node,
                    row_index + 1
                ))?;
                let scaled = (value * f64::from(factor)).round() as u32;
                experiments[id].add_observation(time, &node, scaled);
            }
        }

        for experiment in experiments {
            dataset.add_experiment(experiment)?;
        }
        Ok(dataset)
    }
}

fn parse_binary(cell: &str, node: &str) -> Result<bool, String> {
    match cell {
        "1" => Ok(true),
        "0" | "" => Ok(false),
        _ => Err(format!("Invalid treatment value `{}` for `{}`.", cell, node)),
    }
}

fn parse_time(cell: &str) -> Result<u32, String> {
    cell.parse()
        .map_err(|_| format!("Invalid acquisition time `{}`.", cell))
}
