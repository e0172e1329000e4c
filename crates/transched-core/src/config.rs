//! Configuration types for transched

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::{TranschedError, TranschedResult};

/// Complete run configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Strategy selection
    pub scheduler: SchedulerConfig,
    /// Device capacity assignment
    pub capacity: CapacityConfig,
    /// Input graph source
    pub topology: TopologyConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl RunConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> TranschedResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TranschedError::Config(format!("Failed to read config file: {}", e)))?;
        toml::from_str(&content)
            .map_err(|e| TranschedError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Reject combinations that cannot produce a valid run
    pub fn validate(&self) -> TranschedResult<()> {
        match self.capacity.mode {
            CapacityMode::Fixed if self.capacity.value < 1 => {
                return Err(TranschedError::InvalidCapacity(format!(
                    "fixed capacity must be at least 1, got {}",
                    self.capacity.value
                )));
            }
            CapacityMode::BoundedRandom | CapacityMode::BoundedRandomEven
                if self.capacity.max < 1 =>
            {
                return Err(TranschedError::InvalidCapacity(format!(
                    "capacity bound must be at least 1, got {}",
                    self.capacity.max
                )));
            }
            _ => {}
        }

        let topology = &self.topology;
        match topology.source {
            TopologySource::RandomEdgeCount | TopologySource::Complete if topology.devices == 0 => {
                Err(TranschedError::Config(
                    "topology needs at least one device".to_string(),
                ))
            }
            TopologySource::RandomRegular if (topology.devices * topology.degree) % 2 != 0 => {
                Err(TranschedError::Config(format!(
                    "random regular graph needs devices * degree even, got {} * {}",
                    topology.devices, topology.degree
                )))
            }
            TopologySource::File if topology.path.is_none() => Err(TranschedError::Config(
                "file topology requires a path".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Strategy selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Scheduling strategy
    pub strategy: StrategyKind,
    /// Enable the bypass relay overlay
    pub bypass: bool,
}

/// Available scheduling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Dispatch edges in presented order when both ends have capacity
    #[default]
    InOrder,
    /// Order edges by endpoint contention before in-order dispatch
    Greedy,
    /// Split capacities into unit aliases and colour the line graph
    CapacitySplitColoring,
    /// Split capacities into unit aliases and dispatch maximal matchings
    CapacitySplitMatching,
    /// Euler decomposition plus max-flow rounds
    FlowBipartite,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::InOrder,
        StrategyKind::Greedy,
        StrategyKind::CapacitySplitColoring,
        StrategyKind::CapacitySplitMatching,
        StrategyKind::FlowBipartite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::InOrder => "in-order",
            StrategyKind::Greedy => "greedy",
            StrategyKind::CapacitySplitColoring => "capacity-split-coloring",
            StrategyKind::CapacitySplitMatching => "capacity-split-matching",
            StrategyKind::FlowBipartite => "flow-bipartite",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = StrategyKind::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown strategy '{}', expected one of: {}", s, names.join(", "))
            })
    }
}

/// Device capacity assignment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityConfig {
    /// How capacities are assigned
    pub mode: CapacityMode,
    /// Capacity for fixed mode
    pub value: u32,
    /// Upper bound for random modes
    pub max: u32,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            mode: CapacityMode::Fixed,
            value: 1,
            max: 4,
        }
    }
}

/// Capacity assignment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapacityMode {
    /// Every device gets the same capacity
    #[default]
    Fixed,
    /// Uniform in `1..=max`
    BoundedRandom,
    /// Uniform over even values in `2..=max`
    BoundedRandomEven,
}

impl FromStr for CapacityMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(CapacityMode::Fixed),
            "bounded-random" => Ok(CapacityMode::BoundedRandom),
            "bounded-random-even" => Ok(CapacityMode::BoundedRandomEven),
            other => Err(format!(
                "unknown capacity mode '{}', expected fixed, bounded-random or bounded-random-even",
                other
            )),
        }
    }
}

/// Input graph source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Where the graph comes from
    pub source: TopologySource,
    /// Number of devices for generated graphs
    pub devices: usize,
    /// Edge count for random-edge-count graphs (defaults to 5 per device)
    pub edges: Option<usize>,
    /// Per-device degree for random-regular graphs
    pub degree: usize,
    /// Built-in graph for fixture mode
    pub fixture: Fixture,
    /// Graph file for file mode
    pub path: Option<PathBuf>,
    /// Seed for every random choice made while building the input
    pub seed: u64,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            source: TopologySource::RandomEdgeCount,
            devices: 10,
            edges: None,
            degree: 4,
            fixture: Fixture::Triangle,
            path: None,
            seed: 0,
        }
    }
}

/// Input graph source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TopologySource {
    #[default]
    RandomEdgeCount,
    RandomRegular,
    Complete,
    Fixture,
    File,
}

impl FromStr for TopologySource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random-edge-count" => Ok(TopologySource::RandomEdgeCount),
            "random-regular" => Ok(TopologySource::RandomRegular),
            "complete" => Ok(TopologySource::Complete),
            "fixture" => Ok(TopologySource::Fixture),
            "file" => Ok(TopologySource::File),
            other => Err(format!("unknown topology source '{}'", other)),
        }
    }
}

/// Built-in graphs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Fixture {
    /// Three capacity-1 devices, one edge per pair
    #[default]
    Triangle,
    /// Device 0 with capacity 3, two capacity-1 devices, three edges per pair
    TriangleParallel,
}

impl FromStr for Fixture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "triangle" => Ok(Fixture::Triangle),
            "triangle-parallel" => Ok(Fixture::TriangleParallel),
            other => Err(format!("unknown fixture '{}'", other)),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}
