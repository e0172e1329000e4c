//! Capacity splitting
//!
//! A device of capacity `cv` becomes `cv` unit-capacity aliases: its own slot
//! plus `cv - 1` clones. Incident edges are spread round-robin over the
//! aliases, so any set of alias-disjoint edges respects every device's
//! capacity once mapped back. Aliases only refer to their canonical device by
//! index and never carry capacity state.

use std::collections::HashSet;
use transched_core::{DeviceId, EdgeId, TransferGraph};

/// Index of an alias inside a [`SplitGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AliasId(pub usize);

/// One unit of a device's capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alias {
    pub id: AliasId,
    pub canonical: DeviceId,
    /// 0 for the device's own slot, `1..cv` for clones
    pub slot: u32,
}

/// A pending edge re-attached to aliases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitEdge {
    pub edge: EdgeId,
    pub a: AliasId,
    pub b: AliasId,
}

impl SplitEdge {
    pub fn is_self_loop(&self) -> bool {
        self.a == self.b
    }
}

/// Unit-capacity view of a transfer graph
#[derive(Debug, Clone)]
pub struct SplitGraph {
    aliases: Vec<Alias>,
    edges: Vec<SplitEdge>,
    /// Number of clones created per device, indexed by device position
    clones: Vec<usize>,
}

impl SplitGraph {
    /// Split every device of `graph` and distribute its pending edges
    pub fn build(graph: &TransferGraph) -> Self {
        let mut aliases = Vec::new();
        let mut first_alias = Vec::with_capacity(graph.device_count());
        let mut clones = Vec::with_capacity(graph.device_count());

        for device in graph.devices() {
            first_alias.push(aliases.len());
            for slot in 0..device.capacity() {
                aliases.push(Alias {
                    id: AliasId(aliases.len()),
                    canonical: device.id,
                    slot,
                });
            }
            clones.push(device.capacity() as usize - 1);
        }

        let mut cursor = vec![0usize; graph.device_count()];
        let mut next_alias = |d: DeviceId| {
            let capacity = clones[d.index()] + 1;
            let slot = cursor[d.index()] % capacity;
            cursor[d.index()] += 1;
            AliasId(first_alias[d.index()] + slot)
        };

        let edges = graph
            .edges()
            .map(|e| {
                let a = next_alias(e.a);
                let b = if e.is_self_loop() { a } else { next_alias(e.b) };
                SplitEdge { edge: e.id, a, b }
            })
            .collect();

        Self {
            aliases,
            edges,
            clones,
        }
    }

    pub fn aliases(&self) -> &[Alias] {
        &self.aliases
    }

    pub fn edges(&self) -> &[SplitEdge] {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Clones created for each device (`cv - 1`)
    pub fn clone_counts(&self) -> &[usize] {
        &self.clones
    }

    /// Canonical device behind an alias
    pub fn canonical(&self, alias: AliasId) -> DeviceId {
        self.aliases[alias.0].canonical
    }

    /// Positions of split edges incident to each alias
    pub fn incidence(&self) -> Vec<Vec<usize>> {
        let mut incidence = vec![Vec::new(); self.aliases.len()];
        for (position, edge) in self.edges.iter().enumerate() {
            incidence[edge.a.0].push(position);
            if !edge.is_self_loop() {
                incidence[edge.b.0].push(position);
            }
        }
        incidence
    }

    /// Largest number of edges on a single alias
    pub fn max_degree(&self) -> usize {
        self.incidence().iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Drop split edges whose transfer is no longer pending
    pub fn retain_pending(&mut self, graph: &TransferGraph) {
        self.edges.retain(|e| graph.contains_edge(e.edge));
    }

    /// Drop the split edges for the given transfers
    pub fn remove_edges(&mut self, ids: &[EdgeId]) {
        let gone: HashSet<EdgeId> = ids.iter().copied().collect();
        self.edges.retain(|e| !gone.contains(&e.edge));
    }
}
