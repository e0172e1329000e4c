//! Capacity split followed by greedy line-graph colouring
//!
//! Every colour class is a set of alias-disjoint edges, i.e. one valid round.

use tracing::info;
use transched_core::{EdgeId, StrategyKind, TransferGraph, TranschedResult};

use crate::split::SplitGraph;
use crate::strategy::Strategy;

/// Adjacency of the line graph: split edges sharing an alias
pub fn line_graph(split: &SplitGraph) -> Vec<Vec<usize>> {
    let mut adjacency = vec![Vec::new(); split.edge_count()];
    for incident in split.incidence() {
        for (i, &x) in incident.iter().enumerate() {
            for &y in &incident[i + 1..] {
                adjacency[x].push(y);
                adjacency[y].push(x);
            }
        }
    }
    // Parallel edges share both aliases and would appear twice.
    for neighbors in &mut adjacency {
        neighbors.sort_unstable();
        neighbors.dedup();
    }
    adjacency
}

/// First-fit colouring, visiting nodes by descending degree
///
/// Ties in degree keep node order. Returns one colour per node.
pub fn greedy_coloring(adjacency: &[Vec<usize>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..adjacency.len()).collect();
    order.sort_by_key(|&node| std::cmp::Reverse(adjacency[node].len()));

    let mut colors: Vec<Option<usize>> = vec![None; adjacency.len()];
    let mut taken = Vec::new();
    for node in order {
        taken.clear();
        taken.resize(adjacency[node].len() + 1, false);
        for &neighbor in &adjacency[node] {
            if let Some(c) = colors[neighbor] {
                if c < taken.len() {
                    taken[c] = true;
                }
            }
        }
        let color = taken.iter().position(|&t| !t).unwrap_or(taken.len());
        colors[node] = Some(color);
    }

    colors.into_iter().map(|c| c.unwrap_or(0)).collect()
}

/// Pending edges in ascending colour order, computed once per run
#[derive(Debug, Default)]
pub struct CapacitySplitColoring {
    plan: Option<Vec<EdgeId>>,
    color_count: usize,
}

impl CapacitySplitColoring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Colours used by the cached plan (zero before the first round)
    pub fn color_count(&self) -> usize {
        self.color_count
    }

    fn build_plan(&mut self, graph: &TransferGraph) -> Vec<EdgeId> {
        let split = SplitGraph::build(graph);
        let colors = greedy_coloring(&line_graph(&split));
        self.color_count = colors.iter().max().map_or(0, |&c| c + 1);

        let mut colored: Vec<(usize, EdgeId)> = split
            .edges()
            .iter()
            .zip(&colors)
            .map(|(edge, &color)| (color, edge.edge))
            .collect();
        colored.sort();

        info!(
            edges = split.edge_count(),
            aliases = split.aliases().len(),
            colors = self.color_count,
            max_degree = split.max_degree(),
            "Coloured capacity-split line graph"
        );

        colored.into_iter().map(|(_, id)| id).collect()
    }
}

impl Strategy for CapacitySplitColoring {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CapacitySplitColoring
    }

    fn gen_edges(&mut self, graph: &TransferGraph) -> TranschedResult<Vec<EdgeId>> {
        if self.plan.is_none() {
            self.plan = Some(self.build_plan(graph));
        }
        let plan = self.plan.get_or_insert_with(Vec::new);
        plan.retain(|&id| graph.contains_edge(id));
        Ok(plan.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::CapacityLedger;
    use transched_core::{topology, DeviceId, Fixture};

    fn is_proper(adjacency: &[Vec<usize>], colors: &[usize]) -> bool {
        adjacency
            .iter()
            .enumerate()
            .all(|(node, neighbors)| neighbors.iter().all(|&n| colors[n] != colors[node]))
    }

    #[test]
    fn test_line_graph_of_path() {
        let mut graph = TransferGraph::with_capacities(&[1, 1, 1]).unwrap();
        graph.add_edge(DeviceId(0), DeviceId(1)).unwrap();
        graph.add_edge(DeviceId(1), DeviceId(2)).unwrap();

        let adjacency = line_graph(&SplitGraph::build(&graph));
        assert_eq!(adjacency, vec![vec![1], vec![0]]);
    }

    #[test]
    fn test_coloring_is_proper_and_bounded_below() {
        let graph = topology::fixture(Fixture::TriangleParallel).unwrap();
        let split = SplitGraph::build(&graph);
        let adjacency = line_graph(&split);
        let colors = greedy_coloring(&adjacency);

        assert!(is_proper(&adjacency, &colors));
        let count = colors.iter().max().unwrap() + 1;
        assert!(count >= split.max_degree());
    }

    #[test]
    fn test_first_color_class_fits_one_round() {
        let mut graph = topology::fixture(Fixture::TriangleParallel).unwrap();
        let mut strategy = CapacitySplitColoring::new();
        let queue = strategy.gen_edges(&graph).unwrap();
        assert_eq!(queue.len(), 9);

        let mut ledger = CapacityLedger::new();
        let dispatched = strategy.do_work(&mut graph, &mut ledger, &queue).unwrap();
        assert!(!dispatched.is_empty());
        assert_eq!(graph.edge_count(), 9 - dispatched.len());

        let next = strategy.gen_edges(&graph).unwrap();
        assert_eq!(next.len(), graph.edge_count());
    }

    #[test]
    fn test_triangle_needs_three_colors() {
        let graph = topology::fixture(Fixture::Triangle).unwrap();
        let mut strategy = CapacitySplitColoring::new();
        strategy.gen_edges(&graph).unwrap();
        assert_eq!(strategy.color_count(), 3);
    }
}
