//! A tabular collection of identified networks over one fixed hypergraph.
//!
//! Every column is one `(node, clause)` candidate pair, written as
//! `node<=clause` in the CSV header; every row is the canonical 0/1 array of
//! one network. This is the interchange format for identified network sets.

use crate::{Clause, DnfFormula, Hypergraph, LogicalNetwork};
use std::collections::BTreeMap;

/// An ordered list of networks sharing one column layout.
#[derive(Clone, Debug)]
pub struct LogicalNetworkList {
    columns: Vec<(String, Clause)>,
    rows: Vec<Vec<bool>>,
}

impl LogicalNetworkList {
    /// An empty list over the column layout of `hypergraph`.
    pub fn from_hypergraph(hypergraph: &Hypergraph) -> LogicalNetworkList {
        let graph = hypergraph.graph();
        let columns = hypergraph
            .mappings()
            .into_iter()
            .map(|(node, id)| {
                (
                    graph.get_node_name(node).clone(),
                    hypergraph.get_clause(id).clone(),
                )
            })
            .collect();
        LogicalNetworkList {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append one network, projected onto this list's columns.
    pub fn append(
        &mut self,
        network: &LogicalNetwork,
        hypergraph: &Hypergraph,
    ) -> Result<(), String> {
        let array = network.to_array(hypergraph)?;
        if array.len() != self.columns.len() {
            return Err(format!(
                "Network array has {} columns, the list expects {}.",
                array.len(),
                self.columns.len()
            ));
        }
        self.rows.push(array);
        Ok(())
    }

    /// Reconstruct the network stored in row `index`.
    pub fn get(&self, index: usize) -> Result<LogicalNetwork, String> {
        let row = self
            .rows
            .get(index)
            .ok_or(format!("Row {} is out of range.", index))?;
        let mut clauses_of: BTreeMap<String, Vec<Clause>> = BTreeMap::new();
        for ((node, clause), selected) in self.columns.iter().zip(row) {
            if *selected {
                clauses_of
                    .entry(node.clone())
                    .or_default()
                    .push(clause.clone());
            }
        }
        LogicalNetwork::from_formulas(
            clauses_of
                .into_iter()
                .map(|(node, clauses)| (node, DnfFormula::new(clauses)))
                .collect(),
        )
    }

    /// An iterator over the stored networks.
    pub fn networks(&self) -> impl Iterator<Item = Result<LogicalNetwork, String>> + '_ {
        (0..self.rows.len()).map(move |i| self.get(i))
    }

    /// Restrict to the rows `from..from + length` (`length == 0` keeps
    /// everything from `from` on).
    pub fn slice(&self, from: usize, length: usize) -> LogicalNetworkList {
        let end = if length == 0 {
            self.rows.len()
        } else {
            (from + length).min(self.rows.len())
        };
        let from = from.min(end);
        LogicalNetworkList {
            columns: self.columns.clone(),
            rows: self.rows[from..end].to_vec(),
        }
    }

    /// Restrict to the given row indices; out-of-range indices are skipped.
    pub fn select(&self, indices: &[usize]) -> LogicalNetworkList {
        LogicalNetworkList {
            columns: self.columns.clone(),
            rows: indices
                .iter()
                .filter_map(|index| self.rows.get(*index).cloned())
                .collect(),
        }
    }

    /// Serialize into the `node<=clause` CSV form.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        let header: Vec<String> = self
            .columns
            .iter()
            .map(|(node, clause)| format!("{}<={}", node, clause))
            .collect();
        out.push_str(&header.join(","));
        out.push('\n');
        for row in &self.rows {
            let cells: Vec<&str> = row.iter().map(|b| if *b { "1" } else { "0" }).collect();
            out.push_str(&cells.join(","));
            out.push('\n');
        }
        out
    }

    /// Parse the `node<=clause` CSV form.
    pub fn from_csv(csv: &str) -> Result<LogicalNetworkList, String> {
        let mut lines = csv.lines().filter(|l| !l.trim().is_empty());
        let header = lines.next().ok_or("Network CSV is empty.".to_string())?;
        let mut columns = Vec::new();
        for cell in header.split(',') {
            let (node, clause) = cell
                .trim()
                .split_once("<=")
                .ok_or(format!("Invalid network column `{}`.", cell))?;
            columns.push((node.trim().to_string(), Clause::try_from_str(clause)?));
        }
        let mut rows = Vec::new();
        for (index, line) in lines.enumerate() {
            let cells: Vec<&str> = line.split(',').map(|c| c.trim()).collect();
            if cells.len() != columns.len() {
                return Err(format!(
                    "Network CSV row {} has {} cells, expected {}.",
                    index + 1,
                    cells.len(),
                    columns.len()
                ));
            }
            let row = cells
                .iter()
                .map(|cell| match *cell {
                    "1" => Ok(true),
                    "0" => Ok(false),
                    other => Err(format!("Invalid network CSV cell `{}`.", other)),
                })
                .collect::<Result<Vec<bool>, String>>()?;
            rows.push(row);
        }
        Ok(LogicalNetworkList { columns, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::LogicalNetworkList;
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
    fn append_and_get_round_trip() {
        let hg = toy_hypergraph();
        let c = hg.graph().find_node("c").unwrap();
        let network = LogicalNetwork::from_hyperedges(
            &hg,
            &[(c.to_index(), hg.candidates(c)[0].to_index())],
        )
        .unwrap();
        let mut list = LogicalNetworkList::from_hypergraph(&hg);
        list.append(&network, &hg).unwrap();
        assert_eq!(1, list.len());
        assert_eq!(network, list.get(0).unwrap());
    }

    #[test]
    fn csv_round_trip() {
        let hg = toy_hypergraph();
        let c = hg.graph().find_node("c").unwrap();
        let mut list = LogicalNetworkList::from_hypergraph(&hg);
        for id in hg.candidates(c) {
            let network =
                LogicalNetwork::from_hyperedges(&hg, &[(c.to_index(), id.to_index())]).unwrap();
            list.append(&network, &hg).unwrap();
        }
        let csv = list.to_csv();
        let parsed = LogicalNetworkList::from_csv(&csv).unwrap();
        assert_eq!(list.len(), parsed.len());
        for i in 0..list.len() {
            assert_eq!(list.get(i).unwrap(), parsed.get(i).unwrap());
        }
    }

    #[test]
    fn slice_ranges() {
        let hg = toy_hypergraph();
        let c = hg.graph().find_node("c").unwrap();
        let mut list = LogicalNetworkList::from_hypergraph(&hg);
        for id in hg.candidates(c) {
            let network =
                LogicalNetwork::from_hyperedges(&hg, &[(c.to_index(), id.to_index())]).unwrap();
            list.append(&network, &hg).unwrap();
        }
        assert_eq!(3, list.len());
        assert_eq!(2, list.slice(1, 0).len());
        assert_eq!(1, list.slice(0, 1).len());
        assert_eq!(0, list.slice(5, 2).len());

        let selected = list.select(&[0, 2, 7]);
        assert_eq!(2, selected.len());
        assert_eq!(list.get(2).unwrap(), selected.get(1).unwrap());
    }

    #[test]
    fn malformed_csv_is_fatal() {
        assert!(LogicalNetworkList::from_csv("c=a\n1\n").is_err());
        assert!(LogicalNetworkList::from_csv("c<=a\n1,0\n").is_err());
        assert!(LogicalNetworkList::from_csv("c<=a\n2\n").is_err());
    }
}
