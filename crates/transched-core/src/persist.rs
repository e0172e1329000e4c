//! JSON persistence for transfer graphs

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::device::{Device, DeviceId, DeviceRole};
use crate::graph::TransferGraph;
use crate::{TranschedError, TranschedResult};

/// Serialized device entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: DeviceId,
    pub capacity: u32,
    pub available: u32,
    #[serde(default)]
    pub role: DeviceRole,
}

/// Serialized form of a [`TransferGraph`]
///
/// Edges are stored in pending order as endpoint pairs, so a round-trip keeps
/// the exact multiset and the order strategies see it in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub devices: Vec<DeviceRecord>,
    pub edges: Vec<(DeviceId, DeviceId)>,
}

impl TransferGraph {
    /// Capture devices and pending edges
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            devices: self
                .devices()
                .iter()
                .map(|d| DeviceRecord {
                    id: d.id,
                    capacity: d.capacity(),
                    available: d.available(),
                    role: d.role,
                })
                .collect(),
            edges: self.edges().map(|e| (e.a, e.b)).collect(),
        }
    }

    /// Rebuild a graph, validating capacities and device references
    pub fn from_snapshot(snapshot: &GraphSnapshot) -> TranschedResult<Self> {
        let mut graph = TransferGraph::new();
        for (position, record) in snapshot.devices.iter().enumerate() {
            if record.id.index() != position {
                return Err(TranschedError::Serialization(format!(
                    "device {} stored at position {}",
                    record.id, position
                )));
            }
            let mut device = Device::with_available(record.id, record.capacity, record.available)?;
            device.role = record.role;
            graph.push_device(device);
        }
        for &(a, b) in &snapshot.edges {
            graph.add_edge(a, b)?;
        }
        Ok(graph)
    }

    /// Write the graph as pretty-printed JSON
    pub fn save_json(&self, path: &Path) -> TranschedResult<()> {
        let content = serde_json::to_string_pretty(&self.snapshot())?;
        std::fs::write(path, content)?;
        debug!(path = %path.display(), edges = self.edge_count(), "Saved graph");
        Ok(())
    }

    /// Load a graph written by [`TransferGraph::save_json`]
    pub fn load_json(path: &Path) -> TranschedResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let snapshot: GraphSnapshot = serde_json::from_str(&content)?;
        let graph = Self::from_snapshot(&snapshot)?;
        debug!(
            path = %path.display(),
            devices = graph.device_count(),
            edges = graph.edge_count(),
            "Loaded graph"
        );
        Ok(graph)
    }
}
