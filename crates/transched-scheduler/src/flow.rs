//! Flow-bipartite scheduling
//!
//! The graph is regularised to even degree `delta' * capacity`, oriented by
//! an Euler circuit, and split into an out-side and an in-side per device.
//! Each round is one integral maximum flow where a device may send and
//! receive up to half its capacity; the arcs carrying flow form that round's
//! slice and are removed before the next flow is computed.

use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info};
use transched_core::{
    DeviceId, DeviceRole, Edge, EdgeId, StrategyKind, TransferGraph, TranschedError,
    TranschedResult,
};

use crate::euler::{circuit_arcs, euler_circuits};
use crate::ledger::CapacityLedger;
use crate::maxflow::FlowNetwork;
use crate::strategy::{dispatch_in_order, Strategy};

type Pair = (DeviceId, DeviceId);

/// Result of regularising a graph for Euler decomposition
#[derive(Debug, Clone)]
pub struct Normalized {
    /// Capacity per device after relaxing odd capacities
    pub capacities: Vec<u32>,
    /// Rounds the regularised degrees are sized for
    pub target_rounds: usize,
    /// Original non-relay edges followed by padding, as vertex pairs
    pub edges: Vec<(usize, usize)>,
    /// Self-loops added as padding
    pub padding_loops: usize,
    /// Extra edges pairing up odd-deficit devices
    pub spare_edges: usize,
}

/// Capacity used by the flow reduction
///
/// Odd capacities above one lose one unit, which the plan then leaves
/// unused on those devices.
pub fn relaxed_capacity(capacity: u32) -> u32 {
    if capacity > 1 && capacity % 2 == 1 {
        capacity - 1
    } else {
        capacity
    }
}

/// Pad every normal device to degree `delta' * capacity`
///
/// Fails with `InvalidTopology` when the devices carrying transfers are not
/// connected.
pub fn normalize(graph: &TransferGraph) -> TranschedResult<Normalized> {
    let components = graph.components();
    if components.len() > 1 {
        return Err(TranschedError::InvalidTopology(format!(
            "flow-bipartite needs a connected graph, found {} components",
            components.len()
        )));
    }

    let capacities: Vec<u32> = graph
        .devices()
        .iter()
        .map(|d| relaxed_capacity(d.capacity()))
        .collect();
    let normal: Vec<DeviceId> = graph
        .devices()
        .iter()
        .filter(|d| d.role == DeviceRole::Normal)
        .map(|d| d.id)
        .collect();

    let mut degrees = vec![0usize; graph.device_count()];
    let mut edges = Vec::with_capacity(graph.edge_count());
    for edge in graph.edges() {
        degrees[edge.a.index()] += 1;
        degrees[edge.b.index()] += 1;
        edges.push((edge.a.index(), edge.b.index()));
    }

    let mut target_rounds = normal
        .iter()
        .map(|d| degrees[d.index()].div_ceil(capacities[d.index()] as usize))
        .max()
        .unwrap_or(0);
    // Capacity-1 devices would otherwise get an odd target degree.
    let has_odd_capacity = normal.iter().any(|d| capacities[d.index()] % 2 == 1);
    if has_odd_capacity && target_rounds % 2 == 1 {
        target_rounds += 1;
    }

    let mut padding_loops = 0;
    let mut spares = Vec::new();
    for d in &normal {
        let v = d.index();
        let target = target_rounds * capacities[v] as usize;
        while degrees[v] + 2 <= target {
            edges.push((v, v));
            degrees[v] += 2;
            padding_loops += 1;
        }
        if degrees[v] + 1 == target {
            spares.push(v);
        }
    }

    if spares.len() % 2 != 0 {
        return Err(TranschedError::Internal(format!(
            "odd number of spare devices ({}) after padding",
            spares.len()
        )));
    }
    for pair in spares.chunks_exact(2) {
        edges.push((pair[0], pair[1]));
        degrees[pair[0]] += 1;
        degrees[pair[1]] += 1;
    }

    Ok(Normalized {
        capacities,
        target_rounds,
        edges,
        padding_loops,
        spare_edges: spares.len() / 2,
    })
}

/// Per-round slices of device pairs, in dispatch order
pub fn plan_rounds(normalized: &Normalized) -> TranschedResult<Vec<Vec<Pair>>> {
    let n = normalized.capacities.len();
    let circuits = euler_circuits(n, &normalized.edges)?;
    let mut remaining: Vec<(usize, usize)> = circuit_arcs(&circuits)
        .into_iter()
        .filter(|&(u, v)| u != v)
        .collect();

    let source = 0;
    let sink = 1;
    let out_node = |d: usize| 2 + d;
    let in_node = |d: usize| 2 + n + d;

    let mut slices = Vec::new();
    while !remaining.is_empty() {
        let mut network = FlowNetwork::new(2 + 2 * n);
        for (d, &capacity) in normalized.capacities.iter().enumerate() {
            let half = u64::from(capacity.div_ceil(2));
            network.add_arc(source, out_node(d), half);
            network.add_arc(in_node(d), sink, half);
        }
        let arc_ids: Vec<_> = remaining
            .iter()
            .map(|&(u, v)| network.add_arc(out_node(u), in_node(v), 1))
            .collect();

        let flow = network.max_flow(source, sink);

        let mut slice = Vec::new();
        let mut rest = Vec::new();
        for (&(u, v), &arc) in remaining.iter().zip(&arc_ids) {
            if network.flow(arc) > 0 {
                slice.push((DeviceId(u), DeviceId(v)));
            } else {
                rest.push((u, v));
            }
        }
        if slice.is_empty() {
            return Err(TranschedError::Internal(format!(
                "max flow selected no arcs with {} remaining",
                rest.len()
            )));
        }

        debug!(round = slices.len() + 1, flow, arcs = slice.len(), "Planned flow round");
        slices.push(slice);
        remaining = rest;
    }

    Ok(slices)
}

/// Drains precomputed max-flow slices, one per round
#[derive(Debug, Default)]
pub struct FlowBipartite {
    plan: Option<VecDeque<Vec<Pair>>>,
    /// Planned pairs that did not fit last round
    carry: Vec<Pair>,
    /// Pair each queued edge was mapped from
    queued: HashMap<EdgeId, Pair>,
    target_rounds: usize,
}

impl FlowBipartite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rounds the regularised graph was sized for (zero before the first round)
    pub fn target_rounds(&self) -> usize {
        self.target_rounds
    }

    fn prepare(&mut self, graph: &TransferGraph) -> TranschedResult<()> {
        let normalized = normalize(graph)?;
        let slices = plan_rounds(&normalized)?;
        info!(
            target_rounds = normalized.target_rounds,
            padding_loops = normalized.padding_loops,
            spare_edges = normalized.spare_edges,
            slices = slices.len(),
            "Prepared flow-bipartite plan"
        );
        self.target_rounds = normalized.target_rounds;
        self.plan = Some(slices.into());
        Ok(())
    }

    /// Map planned pairs onto distinct pending edges
    fn map_pairs(&mut self, graph: &TransferGraph, pairs: Vec<Pair>) -> Vec<EdgeId> {
        let mut picked = HashSet::new();
        let mut queue = Vec::new();
        for (u, v) in pairs {
            let found = graph
                .edges_between(u, v)
                .map(|e| e.id)
                .find(|id| !picked.contains(id));
            if let Some(id) = found {
                picked.insert(id);
                self.queued.insert(id, (u, v));
                queue.push(id);
            }
        }
        queue
    }
}

impl Strategy for FlowBipartite {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FlowBipartite
    }

    fn gen_edges(&mut self, graph: &TransferGraph) -> TranschedResult<Vec<EdgeId>> {
        if self.plan.is_none() {
            self.prepare(graph)?;
        }
        self.queued.clear();

        // Carried pairs go first, followed by the next unconsumed slice.
        let mut pairs = std::mem::take(&mut self.carry);
        loop {
            let next = self.plan.as_mut().and_then(VecDeque::pop_front);
            let exhausted = next.is_none();
            pairs.extend(next.into_iter().flatten());

            let queue = self.map_pairs(graph, std::mem::take(&mut pairs));
            if !queue.is_empty() {
                return Ok(queue);
            }
            // Slices holding only padding pairs map to nothing; move on.
            if exhausted {
                break;
            }
        }

        // Plan exhausted: whatever is left (original self-loops) goes in order.
        Ok(graph.edges().map(|e| e.id).collect())
    }

    fn do_work(
        &mut self,
        graph: &mut TransferGraph,
        ledger: &mut CapacityLedger,
        queue: &[EdgeId],
    ) -> TranschedResult<Vec<Edge>> {
        let dispatched = dispatch_in_order(graph, ledger, queue);

        for id in queue {
            if graph.contains_edge(*id) {
                if let Some(&pair) = self.queued.get(id) {
                    self.carry.push(pair);
                }
            }
        }
        self.queued.clear();

        Ok(dispatched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transched_core::{topology, Fixture};

    #[test]
    fn test_relaxed_capacity() {
        assert_eq!(relaxed_capacity(1), 1);
        assert_eq!(relaxed_capacity(2), 2);
        assert_eq!(relaxed_capacity(3), 2);
        assert_eq!(relaxed_capacity(5), 4);
    }

    #[test]
    fn test_normalize_reaches_even_target_degrees() {
        let graph = topology::fixture(Fixture::TriangleParallel).unwrap();
        let normalized = normalize(&graph).unwrap();

        assert_eq!(normalized.capacities, vec![2, 1, 1]);
        assert_eq!(normalized.target_rounds, 6);

        let mut degrees = [0usize; 3];
        for &(u, v) in &normalized.edges {
            degrees[u] += 1;
            degrees[v] += 1;
        }
        assert_eq!(degrees, [12, 6, 6]);
        assert_eq!(normalized.padding_loops, 3);
    }

    #[test]
    fn test_normalize_pairs_spares() {
        // Path 0-1-2, capacity 2 everywhere: ends have degree 1, middle 2.
        let mut graph = TransferGraph::with_capacities(&[2, 2, 2]).unwrap();
        graph.add_edge(DeviceId(0), DeviceId(1)).unwrap();
        graph.add_edge(DeviceId(1), DeviceId(2)).unwrap();

        let normalized = normalize(&graph).unwrap();
        assert_eq!(normalized.target_rounds, 1);
        assert_eq!(normalized.spare_edges, 1);
        assert!(normalized.edges.contains(&(0, 2)));
    }

    #[test]
    fn test_disconnected_graph_rejected() {
        let mut graph = TransferGraph::with_capacities(&[1, 1, 1, 1]).unwrap();
        graph.add_edge(DeviceId(0), DeviceId(1)).unwrap();
        graph.add_edge(DeviceId(2), DeviceId(3)).unwrap();

        assert!(matches!(
            normalize(&graph),
            Err(TranschedError::InvalidTopology(_))
        ));
        let mut strategy = FlowBipartite::new();
        assert!(strategy.gen_edges(&graph).is_err());
    }

    #[test]
    fn test_slices_cover_every_real_transfer() {
        let graph = topology::fixture(Fixture::TriangleParallel).unwrap();
        let slices = plan_rounds(&normalize(&graph).unwrap()).unwrap();

        let mut planned: Vec<Pair> = slices
            .iter()
            .flatten()
            .map(|&(u, v)| if u <= v { (u, v) } else { (v, u) })
            .collect();
        planned.sort();
        let mut original: Vec<Pair> = graph.edges().map(|e| e.key()).collect();
        original.sort();
        assert_eq!(planned, original);
    }

    #[test]
    fn test_slice_respects_half_capacities() {
        let graph = topology::complete(&[2, 2, 2, 2, 2]).unwrap();
        let normalized = normalize(&graph).unwrap();
        for slice in plan_rounds(&normalized).unwrap() {
            let mut out = [0u32; 5];
            let mut inbound = [0u32; 5];
            for (u, v) in slice {
                out[u.index()] += 1;
                inbound[v.index()] += 1;
            }
            assert!(out.iter().all(|&c| c <= 1));
            assert!(inbound.iter().all(|&c| c <= 1));
        }
    }

    #[test]
    fn test_carry_is_followed_by_next_slice() {
        let graph = topology::fixture(Fixture::TriangleParallel).unwrap();
        let mut strategy = FlowBipartite::new();
        strategy.prepare(&graph).unwrap();
        let next_slice = strategy.plan.as_ref().unwrap()[0].clone();
        let planned = strategy.plan.as_ref().unwrap().len();
        strategy.carry = vec![(DeviceId(0), DeviceId(1))];

        let queue = strategy.gen_edges(&graph).unwrap();
        assert_eq!(queue.len(), 1 + next_slice.len());
        let first = graph.edge(queue[0]).unwrap();
        assert_eq!(first.key(), (DeviceId(0), DeviceId(1)));
        assert_eq!(strategy.plan.as_ref().unwrap().len(), planned - 1);
    }

    #[test]
    fn test_strategy_drains_graph() {
        let mut graph = topology::fixture(Fixture::TriangleParallel).unwrap();
        graph.add_edge(DeviceId(0), DeviceId(0)).unwrap();
        let mut strategy = FlowBipartite::new();
        let mut delivered = 0;

        for _ in 0..50 {
            if graph.is_empty() {
                break;
            }
            let mut ledger = CapacityLedger::new();
            let queue = strategy.gen_edges(&graph).unwrap();
            let dispatched = strategy.do_work(&mut graph, &mut ledger, &queue).unwrap();
            assert!(!dispatched.is_empty());
            ledger.release_all(&mut graph);
            delivered += dispatched.len();
        }

        assert!(graph.is_empty());
        assert_eq!(delivered, 10);
        assert_eq!(strategy.target_rounds(), 6);
    }
}
