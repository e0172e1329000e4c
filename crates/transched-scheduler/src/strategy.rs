//! Scheduling strategy trait and the shared in-order dispatch core

use transched_core::{Edge, EdgeId, StrategyKind, TransferGraph, TranschedResult};
use tracing::debug;

use crate::coloring::CapacitySplitColoring;
use crate::flow::FlowBipartite;
use crate::greedy::Greedy;
use crate::ledger::CapacityLedger;
use crate::matching::CapacitySplitMatching;

/// Decides, round by round, which pending transfers to dispatch
///
/// The driver calls [`Strategy::gen_edges`] and then [`Strategy::do_work`]
/// once per round. A strategy may cache a one-time transform of the graph on
/// its first call; it must dispatch at least one edge per round while edges
/// remain, or clear the graph to end the run.
pub trait Strategy {
    /// Which variant this is
    fn kind(&self) -> StrategyKind;

    /// Candidate queue for the next round, most preferred first
    fn gen_edges(&mut self, graph: &TransferGraph) -> TranschedResult<Vec<EdgeId>>;

    /// Dispatch the feasible part of `queue`, removing dispatched edges
    fn do_work(
        &mut self,
        graph: &mut TransferGraph,
        ledger: &mut CapacityLedger,
        queue: &[EdgeId],
    ) -> TranschedResult<Vec<Edge>> {
        Ok(dispatch_in_order(graph, ledger, queue))
    }
}

/// Instantiate the strategy selected by configuration
pub fn build_strategy(kind: StrategyKind) -> Box<dyn Strategy> {
    match kind {
        StrategyKind::InOrder => Box::new(InOrder),
        StrategyKind::Greedy => Box::new(Greedy),
        StrategyKind::CapacitySplitColoring => Box::new(CapacitySplitColoring::new()),
        StrategyKind::CapacitySplitMatching => Box::new(CapacitySplitMatching::new()),
        StrategyKind::FlowBipartite => Box::new(FlowBipartite::new()),
    }
}

/// Dispatch each queued edge whose endpoints still have capacity
///
/// No look-ahead and no backtracking: earlier entries win contested
/// capacity. Entries no longer pending are skipped.
pub fn dispatch_in_order(
    graph: &mut TransferGraph,
    ledger: &mut CapacityLedger,
    queue: &[EdgeId],
) -> Vec<Edge> {
    let mut dispatched = Vec::new();
    for &id in queue {
        let Some(edge) = graph.edge(id).copied() else {
            continue;
        };
        if ledger.acquire_edge(graph, &edge) {
            graph.remove_edge(id);
            debug!(edge = %edge, "Dispatched transfer");
            dispatched.push(edge);
        }
    }
    dispatched
}

/// Visit pending edges in presented order
#[derive(Debug, Default, Clone, Copy)]
pub struct InOrder;

impl Strategy for InOrder {
    fn kind(&self) -> StrategyKind {
        StrategyKind::InOrder
    }

    fn gen_edges(&mut self, graph: &TransferGraph) -> TranschedResult<Vec<EdgeId>> {
        Ok(graph.edges().map(|e| e.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transched_core::{topology, DeviceId, Fixture};

    fn run_round(strategy: &mut dyn Strategy, graph: &mut TransferGraph) -> Vec<Edge> {
        let mut ledger = CapacityLedger::new();
        let queue = strategy.gen_edges(graph).unwrap();
        let dispatched = strategy.do_work(graph, &mut ledger, &queue).unwrap();
        ledger.release_all(graph);
        dispatched
    }

    #[test]
    fn test_in_order_triangle_one_edge_per_round() {
        let mut graph = topology::fixture(Fixture::Triangle).unwrap();
        let mut strategy = InOrder;

        let mut per_round = Vec::new();
        while !graph.is_empty() {
            per_round.push(run_round(&mut strategy, &mut graph).len());
        }
        assert_eq!(per_round, vec![1, 1, 1]);
    }

    #[test]
    fn test_in_order_triangle_parallel_trace() {
        let mut graph = topology::fixture(Fixture::TriangleParallel).unwrap();
        let mut strategy = InOrder;

        let mut per_round = Vec::new();
        while !graph.is_empty() {
            let dispatched = run_round(&mut strategy, &mut graph);
            per_round.push(dispatched.len());
        }
        assert_eq!(per_round, vec![2, 2, 2, 1, 1, 1]);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_in_order_earlier_edge_wins() {
        let mut graph = TransferGraph::with_capacities(&[1, 1, 1]).unwrap();
        let first = graph.add_edge(DeviceId(0), DeviceId(1)).unwrap();
        graph.add_edge(DeviceId(0), DeviceId(2)).unwrap();

        let dispatched = run_round(&mut InOrder, &mut graph);
        assert_eq!(dispatched.len(), 1);
        assert_eq!(dispatched[0].id, first);
    }

    #[test]
    fn test_self_loop_consumes_one_unit() {
        let mut graph = TransferGraph::with_capacities(&[1]).unwrap();
        graph.add_edge(DeviceId(0), DeviceId(0)).unwrap();

        let mut ledger = CapacityLedger::new();
        let queue = InOrder.gen_edges(&graph).unwrap();
        let dispatched = InOrder.do_work(&mut graph, &mut ledger, &queue).unwrap();

        assert_eq!(dispatched.len(), 1);
        assert_eq!(ledger.held_count(), 1);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_stale_queue_entries_skipped() {
        let mut graph = TransferGraph::with_capacities(&[2, 2]).unwrap();
        let id = graph.add_edge(DeviceId(0), DeviceId(1)).unwrap();
        graph.remove_edge(id);

        let mut ledger = CapacityLedger::new();
        assert!(dispatch_in_order(&mut graph, &mut ledger, &[id]).is_empty());
        assert_eq!(ledger.held_count(), 0);
    }

    #[test]
    fn test_build_strategy_kinds() {
        for kind in StrategyKind::ALL {
            assert_eq!(build_strategy(kind).kind(), kind);
        }
    }
}
