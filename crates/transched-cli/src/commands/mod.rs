//! CLI commands implementation

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::info;
use transched_core::{topology, RunConfig, TopologySource, TransferGraph};
use transched_scheduler::{RoundDriver, RoundObserver, RoundRecord, RunReport};

/// Logs each round's transfers as they happen
pub struct RoundLogger;

impl RoundObserver for RoundLogger {
    fn on_round(&mut self, record: &RoundRecord, graph: &TransferGraph) {
        info!(
            round = record.round,
            delivered = record.delivered().count(),
            pending = graph.edge_count(),
            "Round finished"
        );
        for edge in &record.dispatched {
            info!(round = record.round, edge = %edge.id, from = %edge.a, to = %edge.b, "Transfer");
        }
        for hop in record.relay_started.iter().chain(&record.relay_completed) {
            info!(
                round = record.round,
                edge = %hop.edge.id,
                from = %hop.from,
                to = %hop.to,
                relay = %hop.relay,
                "Relay hop"
            );
        }
    }
}

/// Report printed by `run --json`
#[derive(Debug, Serialize)]
struct RunOutput<'a> {
    seed: Option<u64>,
    #[serde(flatten)]
    report: &'a RunReport,
}

fn load_graph(config: &RunConfig) -> Result<TransferGraph> {
    topology::build_graph(config).context("building input graph")
}

/// Seed that influenced the input graph, if any
fn effective_seed(config: &RunConfig) -> Option<u64> {
    match config.topology.source {
        TopologySource::Fixture | TopologySource::File => None,
        _ => Some(config.topology.seed),
    }
}

/// Schedule the configured graph to completion
pub fn run(config: &RunConfig, trace_rounds: bool, json: bool) -> Result<()> {
    let mut graph = load_graph(config)?;

    let mut driver =
        RoundDriver::new(config.scheduler.strategy).bypass(config.scheduler.bypass);
    if trace_rounds {
        driver = driver.observer(Box::new(RoundLogger));
    }

    let report = driver
        .run(&mut graph)
        .with_context(|| format!("{} run failed", config.scheduler.strategy))?;

    if json {
        let output = RunOutput {
            seed: effective_seed(config),
            report: &report,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Run {} completed", report.run_id);
    println!("  Strategy: {}", report.strategy);
    if let Some(seed) = effective_seed(config) {
        println!("  Seed: {}", seed);
    }
    println!("  Rounds: {}", report.rounds);
    println!("  Delta': {}", report.delta_prime);
    println!("  Bypass devices: {}", report.bypass_devices);
    println!(
        "  Transfers: {}/{} ({} relayed)",
        report.delivered, report.initial_edges, report.relayed
    );
    Ok(())
}

/// Write the configured input graph to `output`
pub fn generate(config: &RunConfig, output: &Path) -> Result<()> {
    let graph = load_graph(config)?;
    graph
        .save_json(output)
        .with_context(|| format!("writing {}", output.display()))?;
    println!(
        "Wrote {} devices and {} transfers to {}",
        graph.device_count(),
        graph.edge_count(),
        output.display()
    );
    Ok(())
}

/// Show statistics for the configured input graph
pub fn inspect(config: &RunConfig) -> Result<()> {
    let graph = load_graph(config)?;

    println!("Devices: {}", graph.device_count());
    println!("Transfers: {}", graph.edge_count());
    println!("Delta': {}", graph.delta_prime());
    println!("Components: {}", graph.components().len());
    println!("Triangles: {}", graph.triangles().len());

    if !graph.devices().is_empty() {
        println!();
        println!("{:<8} {:<10} {:<8} {:<8}", "DEVICE", "CAPACITY", "LOAD", "DEGREE'");
        println!("{}", "-".repeat(36));
        for device in graph.devices() {
            println!(
                "{:<8} {:<10} {:<8} {:<8}",
                device.id.to_string(),
                device.capacity(),
                graph.load(device.id),
                graph.normalized_degree(device.id)
            );
        }
    }
    Ok(())
}
