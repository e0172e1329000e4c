//! transched CLI
//!
//! Builds or loads a transfer graph and schedules it round by round.

mod commands;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use transched_core::{
    CapacityMode, Fixture, LogFormat, LoggingConfig, RunConfig, StrategyKind, TopologySource,
};

/// transched - round-based scheduling of capacity-bounded transfers
#[derive(Parser, Debug)]
#[command(name = "transched")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML configuration file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Schedule a graph and print the run report
    Run {
        /// Scheduling strategy (in-order, greedy, capacity-split-coloring,
        /// capacity-split-matching, flow-bipartite)
        #[arg(long)]
        strategy: Option<StrategyKind>,

        /// Enable the bypass relay overlay
        #[arg(long)]
        bypass: bool,

        /// Print every round's transfers
        #[arg(long)]
        trace_rounds: bool,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        graph: GraphArgs,
    },

    /// Build an input graph and write it as JSON
    Generate {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        graph: GraphArgs,
    },

    /// Show statistics for an input graph
    Inspect {
        #[command(flatten)]
        graph: GraphArgs,
    },
}

/// Input graph and capacity selection
#[derive(Args, Debug, Default)]
struct GraphArgs {
    /// Capacity mode (fixed, bounded-random, bounded-random-even)
    #[arg(long)]
    capacity_mode: Option<CapacityMode>,

    /// Capacity for fixed mode
    #[arg(long)]
    capacity: Option<u32>,

    /// Upper bound for random capacity modes
    #[arg(long)]
    max_capacity: Option<u32>,

    /// Topology source (random-edge-count, random-regular, complete, fixture, file)
    #[arg(long)]
    topology: Option<TopologySource>,

    /// Number of devices for generated graphs
    #[arg(long)]
    devices: Option<usize>,

    /// Edge count for random-edge-count graphs
    #[arg(long)]
    edges: Option<usize>,

    /// Per-device degree for random-regular graphs
    #[arg(long)]
    degree: Option<usize>,

    /// Built-in graph (triangle, triangle-parallel)
    #[arg(long)]
    fixture: Option<Fixture>,

    /// Graph file; implies the file topology
    #[arg(long)]
    graph: Option<PathBuf>,

    /// Seed for generated topologies and capacities
    #[arg(long)]
    seed: Option<u64>,
}

impl GraphArgs {
    fn apply(self, config: &mut RunConfig) {
        let capacity = &mut config.capacity;
        if let Some(mode) = self.capacity_mode {
            capacity.mode = mode;
        }
        if let Some(value) = self.capacity {
            capacity.value = value;
        }
        if let Some(max) = self.max_capacity {
            capacity.max = max;
        }

        let topology = &mut config.topology;
        if let Some(source) = self.topology {
            topology.source = source;
        }
        if let Some(fixture) = self.fixture {
            topology.source = TopologySource::Fixture;
            topology.fixture = fixture;
        }
        if let Some(path) = self.graph {
            topology.source = TopologySource::File;
            topology.path = Some(path);
        }
        if let Some(devices) = self.devices {
            topology.devices = devices;
        }
        if self.edges.is_some() {
            topology.edges = self.edges;
        }
        if let Some(degree) = self.degree {
            topology.degree = degree;
        }
        if let Some(seed) = self.seed {
            topology.seed = seed;
        }
    }
}

fn init_logging(verbose: bool, trace_rounds: bool, logging: &LoggingConfig) {
    let level = if verbose {
        "debug"
    } else if trace_rounds {
        "info"
    } else {
        logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => RunConfig::default(),
    };

    let trace_rounds = matches!(
        cli.command,
        Commands::Run {
            trace_rounds: true,
            ..
        }
    );
    init_logging(cli.verbose, trace_rounds, &config.logging);

    match cli.command {
        Commands::Run {
            strategy,
            bypass,
            trace_rounds,
            json,
            graph,
        } => {
            graph.apply(&mut config);
            if let Some(strategy) = strategy {
                config.scheduler.strategy = strategy;
            }
            config.scheduler.bypass |= bypass;
            commands::run(&config, trace_rounds, json)?;
        }
        Commands::Generate { output, graph } => {
            graph.apply(&mut config);
            commands::generate(&config, &output)?;
        }
        Commands::Inspect { graph } => {
            graph.apply(&mut config);
            commands::inspect(&config)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "transched",
            "run",
            "--strategy",
            "flow-bipartite",
            "--bypass",
            "--capacity-mode",
            "bounded-random-even",
            "--max-capacity",
            "6",
            "--seed",
            "9",
        ])
        .unwrap();

        let Commands::Run {
            strategy,
            bypass,
            graph,
            ..
        } = cli.command
        else {
            panic!("expected run command");
        };
        assert_eq!(strategy, Some(StrategyKind::FlowBipartite));
        assert!(bypass);

        let mut config = RunConfig::default();
        graph.apply(&mut config);
        assert_eq!(config.capacity.mode, CapacityMode::BoundedRandomEven);
        assert_eq!(config.capacity.max, 6);
        assert_eq!(config.topology.seed, 9);
    }

    #[test]
    fn test_graph_flag_selects_file_topology() {
        let args = GraphArgs {
            graph: Some(PathBuf::from("input.json")),
            ..GraphArgs::default()
        };
        let mut config = RunConfig::default();
        args.apply(&mut config);
        assert_eq!(config.topology.source, TopologySource::File);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let result = Cli::try_parse_from(["transched", "run", "--strategy", "random"]);
        assert!(result.is_err());
    }
}
