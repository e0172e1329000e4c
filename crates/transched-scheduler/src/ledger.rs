//! Per-round capacity ledger
//!
//! Every unit acquired during a round is recorded here and released in one
//! pass when the round ends, so each acquire is paired with exactly one
//! release and no capacity is carried across rounds.

use transched_core::{DeviceId, Edge, TransferGraph};
use tracing::debug;

/// Tracks capacity units held by the current round
#[derive(Debug, Default)]
pub struct CapacityLedger {
    /// Devices acquired this round, one entry per unit
    held: Vec<DeviceId>,
}

impl CapacityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of units currently held
    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    /// Units held on one device
    #[cfg(test)]
    pub fn held_on(&self, device: DeviceId) -> usize {
        self.held.iter().filter(|&&d| d == device).count()
    }

    /// Acquire one unit on every listed device, or none of them
    ///
    /// Repeated entries acquire repeated units.
    pub fn acquire_all(&mut self, graph: &mut TransferGraph, devices: &[DeviceId]) -> bool {
        let mark = self.held.len();
        for &device in devices {
            if graph.acquire(device) {
                self.held.push(device);
            } else {
                for rolled_back in self.held.drain(mark..) {
                    graph.release(rolled_back);
                }
                return false;
            }
        }
        true
    }

    /// Acquire the endpoints of an edge; a self-loop takes a single unit
    pub fn acquire_edge(&mut self, graph: &mut TransferGraph, edge: &Edge) -> bool {
        self.acquire_all(graph, &edge.endpoints())
    }

    /// Release everything held this round
    pub fn release_all(&mut self, graph: &mut TransferGraph) -> usize {
        let released = self.held.len();
        for device in self.held.drain(..) {
            graph.release(device);
        }
        if released > 0 {
            debug!(units = released, "Released round capacity");
        }
        released
    }
}
