//! Input graph generation
//!
//! Every random choice goes through a [`StdRng`] seeded from the topology
//! configuration, so a given config always yields the same graph.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::config::{CapacityConfig, CapacityMode, Fixture, RunConfig, TopologySource};
use crate::device::DeviceId;
use crate::graph::TransferGraph;
use crate::{TranschedError, TranschedResult};

/// Edges generated per device when no explicit count is configured
pub const DEFAULT_EDGES_PER_DEVICE: usize = 5;

/// Build the input graph described by `config`
pub fn build_graph(config: &RunConfig) -> TranschedResult<TransferGraph> {
    config.validate()?;

    let topology = &config.topology;
    let mut rng = StdRng::seed_from_u64(topology.seed);

    let graph = match topology.source {
        TopologySource::Fixture => fixture(topology.fixture)?,
        TopologySource::File => {
            let path = topology.path.as_deref().ok_or_else(|| {
                TranschedError::Config("file topology requires a path".to_string())
            })?;
            TransferGraph::load_json(path)?
        }
        TopologySource::RandomEdgeCount => {
            let caps = capacities(&config.capacity, topology.devices, &mut rng);
            let edges = topology
                .edges
                .unwrap_or(topology.devices * DEFAULT_EDGES_PER_DEVICE);
            random_edge_count(&caps, edges, &mut rng)?
        }
        TopologySource::RandomRegular => {
            let caps = capacities(&config.capacity, topology.devices, &mut rng);
            random_regular(&caps, topology.degree, &mut rng)?
        }
        TopologySource::Complete => {
            let caps = capacities(&config.capacity, topology.devices, &mut rng);
            complete(&caps)?
        }
    };

    info!(
        source = ?topology.source,
        seed = topology.seed,
        devices = graph.device_count(),
        edges = graph.edge_count(),
        "Built input graph"
    );

    Ok(graph)
}

/// Assign a capacity to each of `count` devices
pub fn capacities(config: &CapacityConfig, count: usize, rng: &mut StdRng) -> Vec<u32> {
    (0..count)
        .map(|_| match config.mode {
            CapacityMode::Fixed => config.value,
            CapacityMode::BoundedRandom => rng.random_range(1..=config.max.max(1)),
            CapacityMode::BoundedRandomEven => 2 * rng.random_range(1..=(config.max.max(2) / 2)),
        })
        .collect()
}

/// `edges` transfers with uniformly drawn endpoints; loops and parallels allowed
pub fn random_edge_count(
    capacities: &[u32],
    edges: usize,
    rng: &mut StdRng,
) -> TranschedResult<TransferGraph> {
    let mut graph = TransferGraph::with_capacities(capacities)?;
    let n = capacities.len();
    if n == 0 {
        return Ok(graph);
    }
    for _ in 0..edges {
        let a = rng.random_range(0..n);
        let b = rng.random_range(0..n);
        graph.add_edge(DeviceId(a), DeviceId(b))?;
    }
    Ok(graph)
}

/// Configuration-model multigraph where every device has `degree` edge ends
pub fn random_regular(
    capacities: &[u32],
    degree: usize,
    rng: &mut StdRng,
) -> TranschedResult<TransferGraph> {
    let n = capacities.len();
    if (n * degree) % 2 != 0 {
        return Err(TranschedError::InvalidTopology(format!(
            "cannot build a {}-regular graph on {} devices",
            degree, n
        )));
    }

    let mut graph = TransferGraph::with_capacities(capacities)?;
    let mut stubs: Vec<usize> = (0..n)
        .flat_map(|d| std::iter::repeat(d).take(degree))
        .collect();
    stubs.shuffle(rng);
    for pair in stubs.chunks_exact(2) {
        graph.add_edge(DeviceId(pair[0]), DeviceId(pair[1]))?;
    }
    Ok(graph)
}

/// One transfer between every pair of distinct devices
pub fn complete(capacities: &[u32]) -> TranschedResult<TransferGraph> {
    let mut graph = TransferGraph::with_capacities(capacities)?;
    let n = capacities.len();
    for a in 0..n {
        for b in (a + 1)..n {
            graph.add_edge(DeviceId(a), DeviceId(b))?;
        }
    }
    Ok(graph)
}

/// Built-in graphs with their own capacities
pub fn fixture(kind: Fixture) -> TranschedResult<TransferGraph> {
    let (caps, copies): (&[u32], usize) = match kind {
        Fixture::Triangle => (&[1, 1, 1], 1),
        Fixture::TriangleParallel => (&[3, 1, 1], 3),
    };

    let mut graph = TransferGraph::with_capacities(caps)?;
    for (a, b) in [(0, 1), (0, 2), (1, 2)] {
        for _ in 0..copies {
            graph.add_edge(DeviceId(a), DeviceId(b))?;
        }
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(11)
    }

    #[test]
    fn test_fixed_capacities() {
        let config = CapacityConfig {
            mode: CapacityMode::Fixed,
            value: 3,
            max: 0,
        };
        assert_eq!(capacities(&config, 4, &mut rng()), vec![3, 3, 3, 3]);
    }

    #[test]
    fn test_bounded_random_capacities_in_range() {
        let config = CapacityConfig {
            mode: CapacityMode::BoundedRandom,
            value: 1,
            max: 5,
        };
        let caps = capacities(&config, 200, &mut rng());
        assert!(caps.iter().all(|&c| (1..=5).contains(&c)));
    }

    #[test]
    fn test_bounded_random_even_capacities() {
        let config = CapacityConfig {
            mode: CapacityMode::BoundedRandomEven,
            value: 1,
            max: 7,
        };
        let caps = capacities(&config, 200, &mut rng());
        assert!(caps.iter().all(|&c| c % 2 == 0 && (2..=6).contains(&c)));

        let tiny = CapacityConfig { max: 1, ..config };
        assert!(capacities(&tiny, 10, &mut rng()).iter().all(|&c| c == 2));
    }

    #[test]
    fn test_random_edge_count_is_seeded() {
        let a = random_edge_count(&[1; 6], 30, &mut rng()).unwrap();
        let b = random_edge_count(&[1; 6], 30, &mut rng()).unwrap();
        assert_eq!(a.edge_count(), 30);
        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn test_random_regular_degrees() {
        let graph = random_regular(&[2; 6], 3, &mut rng()).unwrap();
        for d in graph.devices() {
            assert_eq!(graph.degree(d.id), 3);
        }
        assert!(random_regular(&[1; 5], 3, &mut rng()).is_err());
    }

    #[test]
    fn test_complete_graph() {
        let graph = complete(&[1; 5]).unwrap();
        assert_eq!(graph.edge_count(), 10);
        assert!(graph.edges().all(|e| !e.is_self_loop()));
    }

    #[test]
    fn test_fixtures() {
        let triangle = fixture(Fixture::Triangle).unwrap();
        assert_eq!(triangle.edge_count(), 3);

        let parallel = fixture(Fixture::TriangleParallel).unwrap();
        assert_eq!(parallel.edge_count(), 9);
        assert_eq!(parallel.capacity(DeviceId(0)), 3);
        assert_eq!(parallel.edges_between(DeviceId(1), DeviceId(2)).count(), 3);
    }

    #[test]
    fn test_build_graph_default_edge_count() {
        let config = RunConfig::default();
        let graph = build_graph(&config).unwrap();
        assert_eq!(graph.device_count(), 10);
        assert_eq!(graph.edge_count(), 50);
    }
}
