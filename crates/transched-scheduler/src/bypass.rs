//! Bypass relay overlay
//!
//! One capacity-1 relay device is installed per triangle found in the input
//! graph. When a transfer between two triangle members is still pending
//! after the primary dispatch, the relay takes it as a hand-off: the first
//! half (sender to relay) lands this round, the second half (relay to
//! destination) is drained at the start of the next round.

use serde::Serialize;
use tracing::{debug, info};
use transched_core::{DeviceId, Edge, TransferGraph};

use crate::ledger::CapacityLedger;

/// One half of a relayed transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelayHop {
    /// Transfer being relayed
    pub edge: Edge,
    pub relay: DeviceId,
    pub from: DeviceId,
    pub to: DeviceId,
}

/// Relay attached to two members of a triangle
#[derive(Debug, Clone)]
pub struct BypassPair {
    pub relay: DeviceId,
    pub u: DeviceId,
    pub v: DeviceId,
    /// Third triangle member both ends share an edge with
    pub via: DeviceId,
    in_flight: Option<InFlight>,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    edge: Edge,
    to: DeviceId,
}

impl BypassPair {
    pub fn is_active(&self) -> bool {
        self.in_flight.is_some()
    }
}

/// Relay devices and their hand-off state
#[derive(Debug, Default)]
pub struct BypassOverlay {
    pairs: Vec<BypassPair>,
}

impl BypassOverlay {
    /// Add one relay per triangle of `graph`
    pub fn install(graph: &mut TransferGraph) -> Self {
        let triangles = graph.triangles();
        let pairs: Vec<BypassPair> = triangles
            .into_iter()
            .map(|[u, v, via]| BypassPair {
                relay: graph.add_relay(),
                u,
                v,
                via,
                in_flight: None,
            })
            .collect();

        info!(relays = pairs.len(), "Installed bypass relays");
        Self { pairs }
    }

    pub fn pairs(&self) -> &[BypassPair] {
        &self.pairs
    }

    /// Relay devices instantiated
    pub fn relay_count(&self) -> usize {
        self.pairs.len()
    }

    /// Whether any hand-off is waiting for its second half
    pub fn has_active(&self) -> bool {
        self.pairs.iter().any(BypassPair::is_active)
    }

    /// Deliver pending hand-offs from relay to destination
    ///
    /// Runs before primary dispatch. A hand-off whose destination has no
    /// capacity left stays active for the next round.
    pub fn drain(&mut self, graph: &mut TransferGraph, ledger: &mut CapacityLedger) -> Vec<RelayHop> {
        let mut completed = Vec::new();
        for pair in &mut self.pairs {
            let Some(InFlight { edge, to }) = pair.in_flight else {
                continue;
            };
            if ledger.acquire_all(graph, &[pair.relay, to]) {
                pair.in_flight = None;
                debug!(edge = %edge, relay = %pair.relay, to = %to, "Relay hand-off delivered");
                completed.push(RelayHop {
                    edge,
                    relay: pair.relay,
                    from: pair.relay,
                    to,
                });
            }
        }
        completed
    }

    /// Start hand-offs for transfers left blocked by the primary dispatch
    ///
    /// A pair qualifies when a transfer between its two members is pending
    /// and both still share a pending edge with the third member. The member
    /// with capacity left sends (the first member when both do) and the
    /// relay must be free; the receiver is only needed next round.
    pub fn hand_off(&mut self, graph: &mut TransferGraph, ledger: &mut CapacityLedger) -> Vec<RelayHop> {
        let mut started = Vec::new();
        for pair in &mut self.pairs {
            if pair.is_active() {
                continue;
            }
            let Some(edge) = graph.edges_between(pair.u, pair.v).next().copied() else {
                continue;
            };
            if !graph.has_edge_between(pair.u, pair.via) || !graph.has_edge_between(pair.v, pair.via) {
                continue;
            }
            let (from, to) = if graph.is_available(pair.u) {
                (pair.u, pair.v)
            } else {
                (pair.v, pair.u)
            };
            if !ledger.acquire_all(graph, &[from, pair.relay]) {
                continue;
            }

            graph.remove_edge(edge.id);
            pair.in_flight = Some(InFlight { edge, to });
            debug!(edge = %edge, relay = %pair.relay, from = %from, "Relay hand-off started");
            started.push(RelayHop {
                edge,
                relay: pair.relay,
                from,
                to: pair.relay,
            });
        }
        started
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transched_core::{topology, DeviceRole, Fixture};

    #[test]
    fn test_install_one_relay_per_triangle() {
        let mut graph = topology::complete(&[1, 1, 1, 1]).unwrap();
        let overlay = BypassOverlay::install(&mut graph);

        assert_eq!(overlay.relay_count(), 4);
        assert_eq!(graph.device_count(), 8);
        for pair in overlay.pairs() {
            let relay = graph.device(pair.relay).unwrap();
            assert_eq!(relay.role, DeviceRole::BypassRelay);
            assert_eq!(relay.capacity(), 1);
        }
    }

    #[test]
    fn test_no_triangle_no_relay() {
        let mut graph = TransferGraph::with_capacities(&[1, 1, 1]).unwrap();
        graph.add_edge(DeviceId(0), DeviceId(1)).unwrap();
        graph.add_edge(DeviceId(1), DeviceId(2)).unwrap();
        assert_eq!(BypassOverlay::install(&mut graph).relay_count(), 0);
    }

    #[test]
    fn test_hand_off_then_drain() {
        let mut graph = topology::fixture(Fixture::TriangleParallel).unwrap();
        let mut overlay = BypassOverlay::install(&mut graph);
        let pair = overlay.pairs()[0].clone();
        let before = graph.edge_count();

        let mut ledger = CapacityLedger::new();
        let started = overlay.hand_off(&mut graph, &mut ledger);
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].from, pair.u);
        assert!(overlay.has_active());
        assert_eq!(graph.edge_count(), before - 1);
        assert_eq!(ledger.held_on(pair.u), 1);
        assert_eq!(ledger.held_on(pair.v), 0);
        assert_eq!(ledger.held_on(pair.relay), 1);
        ledger.release_all(&mut graph);

        let completed = overlay.drain(&mut graph, &mut ledger);
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].to, pair.v);
        assert_eq!(completed[0].edge, started[0].edge);
        assert!(!overlay.has_active());
    }

    #[test]
    fn test_busy_sender_hands_off_from_other_member() {
        let mut graph = topology::fixture(Fixture::Triangle).unwrap();
        let mut overlay = BypassOverlay::install(&mut graph);
        let pair = overlay.pairs()[0].clone();
        let mut ledger = CapacityLedger::new();
        ledger.acquire_all(&mut graph, &[pair.u]);

        let started = overlay.hand_off(&mut graph, &mut ledger);
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].from, pair.v);
        ledger.release_all(&mut graph);

        let completed = overlay.drain(&mut graph, &mut ledger);
        assert_eq!(completed[0].to, pair.u);
    }

    #[test]
    fn test_hand_off_needs_free_member_and_relay() {
        let mut graph = topology::fixture(Fixture::Triangle).unwrap();
        let mut overlay = BypassOverlay::install(&mut graph);
        let pair = overlay.pairs()[0].clone();
        let mut ledger = CapacityLedger::new();
        ledger.acquire_all(&mut graph, &[pair.u, pair.v]);

        assert!(overlay.hand_off(&mut graph, &mut ledger).is_empty());
        assert_eq!(graph.edge_count(), 3);

        ledger.release_all(&mut graph);
        ledger.acquire_all(&mut graph, &[pair.relay]);
        assert!(overlay.hand_off(&mut graph, &mut ledger).is_empty());
    }
}
