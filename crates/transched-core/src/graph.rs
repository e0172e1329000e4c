//! Transfer multigraph: devices plus the multiset of pending transfers

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::device::{Device, DeviceId};
use crate::{TranschedError, TranschedResult};

/// Identity of one transfer unit; also its stable ordering key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub usize);

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// One pending transfer between two devices (unordered, self-loop allowed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub a: DeviceId,
    pub b: DeviceId,
}

impl Edge {
    pub fn is_self_loop(&self) -> bool {
        self.a == self.b
    }

    pub fn touches(&self, device: DeviceId) -> bool {
        self.a == device || self.b == device
    }

    /// Endpoint opposite `device`; a self-loop returns the device itself
    pub fn other(&self, device: DeviceId) -> Option<DeviceId> {
        if self.a == device {
            Some(self.b)
        } else if self.b == device {
            Some(self.a)
        } else {
            None
        }
    }

    /// Endpoint pair with the smaller index first
    pub fn key(&self) -> (DeviceId, DeviceId) {
        if self.a <= self.b {
            (self.a, self.b)
        } else {
            (self.b, self.a)
        }
    }

    /// Distinct endpoints (one entry for a self-loop)
    pub fn endpoints(&self) -> Vec<DeviceId> {
        if self.is_self_loop() {
            vec![self.a]
        } else {
            vec![self.a, self.b]
        }
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({}-{})", self.id, self.a, self.b)
    }
}

/// Mutable multigraph of devices and pending transfers
///
/// The device list is fixed once scheduling starts; the edge multiset only
/// shrinks. Edges iterate in insertion order.
#[derive(Debug, Clone, Default)]
pub struct TransferGraph {
    devices: Vec<Device>,
    edges: BTreeMap<EdgeId, Edge>,
    next_edge: usize,
}

impl TransferGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph of normal devices with the given capacities
    pub fn with_capacities(capacities: &[u32]) -> TranschedResult<Self> {
        let mut graph = Self::new();
        for &capacity in capacities {
            graph.add_device(capacity)?;
        }
        Ok(graph)
    }

    /// Add a normal device with full availability
    pub fn add_device(&mut self, capacity: u32) -> TranschedResult<DeviceId> {
        let id = DeviceId(self.devices.len());
        self.devices.push(Device::new(id, capacity)?);
        Ok(id)
    }

    /// Add a device built elsewhere; its id is reassigned to its position
    pub fn push_device(&mut self, mut device: Device) -> DeviceId {
        let id = DeviceId(self.devices.len());
        device.id = id;
        self.devices.push(device);
        id
    }

    /// Add a capacity-1 bypass relay
    pub fn add_relay(&mut self) -> DeviceId {
        let id = DeviceId(self.devices.len());
        self.devices.push(Device::relay(id));
        id
    }

    /// Add one transfer between `a` and `b`
    pub fn add_edge(&mut self, a: DeviceId, b: DeviceId) -> TranschedResult<EdgeId> {
        for d in [a, b] {
            if d.index() >= self.devices.len() {
                return Err(TranschedError::UnknownDevice(format!(
                    "{} (graph has {} devices)",
                    d,
                    self.devices.len()
                )));
            }
        }

        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        self.edges.insert(id, Edge { id, a, b });
        Ok(id)
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(id.index())
    }

    pub fn device_mut(&mut self, id: DeviceId) -> Option<&mut Device> {
        self.devices.get_mut(id.index())
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Capacity of a device, zero when unknown
    pub fn capacity(&self, id: DeviceId) -> u32 {
        self.device(id).map(Device::capacity).unwrap_or(0)
    }

    pub fn is_available(&self, id: DeviceId) -> bool {
        self.device(id).is_some_and(Device::is_available)
    }

    /// Acquire one unit of `id`; unknown devices never succeed
    pub fn acquire(&mut self, id: DeviceId) -> bool {
        self.device_mut(id).is_some_and(Device::acquire)
    }

    pub fn release(&mut self, id: DeviceId) {
        if let Some(device) = self.device_mut(id) {
            device.release();
        }
    }

    /// Bring every device back to full capacity; returns how many were below it
    pub fn reset_availability(&mut self) -> usize {
        self.devices.iter_mut().map(Device::reset).filter(|&changed| changed).count()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Pending edges in insertion order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.edges.contains_key(&id)
    }

    /// Remove a dispatched edge permanently
    pub fn remove_edge(&mut self, id: EdgeId) -> Option<Edge> {
        self.edges.remove(&id)
    }

    /// Drop every pending edge, returning how many were discarded
    pub fn clear(&mut self) -> usize {
        let discarded = self.edges.len();
        self.edges.clear();
        discarded
    }

    /// Pending edges between `a` and `b` (either orientation)
    pub fn edges_between(&self, a: DeviceId, b: DeviceId) -> impl Iterator<Item = &Edge> {
        let wanted = if a <= b { (a, b) } else { (b, a) };
        self.edges.values().filter(move |e| e.key() == wanted)
    }

    pub fn has_edge_between(&self, a: DeviceId, b: DeviceId) -> bool {
        self.edges_between(a, b).next().is_some()
    }

    /// Distinct neighbours of `id`, excluding itself
    pub fn neighbors(&self, id: DeviceId) -> BTreeSet<DeviceId> {
        self.edges
            .values()
            .filter_map(|e| e.other(id))
            .filter(|&n| n != id)
            .collect()
    }

    /// Graph-theoretic degree; a self-loop counts twice
    pub fn degree(&self, id: DeviceId) -> usize {
        self.edges
            .values()
            .map(|e| usize::from(e.a == id) + usize::from(e.b == id))
            .sum()
    }

    /// Capacity units the pending edges need from `id`; a self-loop counts once
    pub fn load(&self, id: DeviceId) -> usize {
        self.edges.values().filter(|e| e.touches(id)).count()
    }

    /// Loads of every device, indexed by device position
    pub fn loads(&self) -> Vec<usize> {
        let mut loads = vec![0usize; self.devices.len()];
        for edge in self.edges.values() {
            for d in edge.endpoints() {
                loads[d.index()] += 1;
            }
        }
        loads
    }

    /// `ceil(load / capacity)` for one device
    pub fn normalized_degree(&self, id: DeviceId) -> usize {
        let capacity = self.capacity(id).max(1) as usize;
        self.load(id).div_ceil(capacity)
    }

    /// Maximum normalized degree over all devices (delta')
    pub fn delta_prime(&self) -> usize {
        let loads = self.loads();
        self.devices
            .iter()
            .map(|d| loads[d.id.index()].div_ceil(d.capacity().max(1) as usize))
            .max()
            .unwrap_or(0)
    }

    /// Whether the devices carrying non-loop edges form one component
    pub fn is_connected(&self) -> bool {
        self.components().len() <= 1
    }

    /// Connected components over devices that carry at least one non-loop edge
    pub fn components(&self) -> Vec<Vec<DeviceId>> {
        let n = self.devices.len();
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
        for edge in self.edges.values().filter(|e| !e.is_self_loop()) {
            adjacency[edge.a.index()].push(edge.b.index());
            adjacency[edge.b.index()].push(edge.a.index());
        }

        let mut seen = vec![false; n];
        let mut components = Vec::new();
        for start in 0..n {
            if seen[start] || adjacency[start].is_empty() {
                continue;
            }
            let mut component = Vec::new();
            let mut stack = vec![start];
            seen[start] = true;
            while let Some(v) = stack.pop() {
                component.push(DeviceId(v));
                for &w in &adjacency[v] {
                    if !seen[w] {
                        seen[w] = true;
                        stack.push(w);
                    }
                }
            }
            component.sort();
            components.push(component);
        }
        components
    }

    /// Every device triple that is pairwise connected, each reported once
    pub fn triangles(&self) -> Vec<[DeviceId; 3]> {
        let neighbors: Vec<BTreeSet<DeviceId>> =
            self.devices.iter().map(|d| self.neighbors(d.id)).collect();

        let mut found = Vec::new();
        for u in &self.devices {
            for &v in neighbors[u.id.index()].range(u.id..) {
                if v == u.id {
                    continue;
                }
                for &w in neighbors[v.index()].range(v..) {
                    if w != v && neighbors[u.id.index()].contains(&w) {
                        found.push([u.id, v, w]);
                    }
                }
            }
        }
        found
    }
}
