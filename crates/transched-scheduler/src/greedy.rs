//! Contention-ranked ordering fed to the in-order dispatch core

use transched_core::{EdgeId, StrategyKind, TransferGraph, TranschedResult};

use crate::strategy::Strategy;

/// Per-device demand: `ceil(pending_load / capacity)`
pub fn device_demand(graph: &TransferGraph) -> Vec<usize> {
    graph
        .loads()
        .into_iter()
        .zip(graph.devices())
        .map(|(load, device)| load.div_ceil(device.capacity() as usize))
        .collect()
}

/// Pending edges with their score, lowest contention first
///
/// An edge scores the sum of its endpoints' demand (a self-loop counts its
/// device once). Ties keep insertion order.
pub fn ranked_edges(graph: &TransferGraph) -> Vec<(EdgeId, usize)> {
    let demand = device_demand(graph);
    let mut ranked: Vec<(EdgeId, usize)> = graph
        .edges()
        .map(|e| {
            let score = e.endpoints().iter().map(|d| demand[d.index()]).sum();
            (e.id, score)
        })
        .collect();
    ranked.sort_by_key(|&(id, score)| (score, id));
    ranked
}

/// Dispatch low-contention edges first, re-ranking every round
#[derive(Debug, Default, Clone, Copy)]
pub struct Greedy;

impl Strategy for Greedy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Greedy
    }

    fn gen_edges(&mut self, graph: &TransferGraph) -> TranschedResult<Vec<EdgeId>> {
        Ok(ranked_edges(graph).into_iter().map(|(id, _)| id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transched_core::DeviceId;

    #[test]
    fn test_device_demand() {
        let mut graph = TransferGraph::with_capacities(&[2, 1, 1]).unwrap();
        graph.add_edge(DeviceId(0), DeviceId(1)).unwrap();
        graph.add_edge(DeviceId(0), DeviceId(1)).unwrap();
        graph.add_edge(DeviceId(0), DeviceId(2)).unwrap();
        assert_eq!(device_demand(&graph), vec![2, 2, 1]);
    }

    #[test]
    fn test_low_contention_edges_first() {
        // Hub 0 is congested; 4-5 is independent.
        let mut graph = TransferGraph::with_capacities(&[1; 6]).unwrap();
        let hub_a = graph.add_edge(DeviceId(0), DeviceId(1)).unwrap();
        let hub_b = graph.add_edge(DeviceId(0), DeviceId(2)).unwrap();
        let hub_c = graph.add_edge(DeviceId(0), DeviceId(3)).unwrap();
        let quiet = graph.add_edge(DeviceId(4), DeviceId(5)).unwrap();

        let order = Greedy.gen_edges(&graph).unwrap();
        assert_eq!(order, vec![quiet, hub_a, hub_b, hub_c]);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut graph = TransferGraph::with_capacities(&[1, 1, 1, 1]).unwrap();
        let first = graph.add_edge(DeviceId(2), DeviceId(3)).unwrap();
        let second = graph.add_edge(DeviceId(0), DeviceId(1)).unwrap();

        let ranked = ranked_edges(&graph);
        assert_eq!(ranked, vec![(first, 2), (second, 2)]);
    }

    #[test]
    fn test_self_loop_scores_device_once() {
        let mut graph = TransferGraph::with_capacities(&[1]).unwrap();
        graph.add_edge(DeviceId(0), DeviceId(0)).unwrap();
        assert_eq!(ranked_edges(&graph)[0].1, 1);
    }
}
