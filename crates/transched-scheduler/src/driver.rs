//! Round driver: runs a strategy until every transfer is delivered

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use transched_core::{
    DeviceId, Edge, EdgeId, StrategyKind, TransferGraph, TranschedError, TranschedResult,
};
use uuid::Uuid;

use crate::bypass::{BypassOverlay, RelayHop};
use crate::ledger::CapacityLedger;
use crate::strategy::{build_strategy, Strategy};

/// Everything that happened in one round
#[derive(Debug, Clone, Default, Serialize)]
pub struct RoundRecord {
    /// 1-based round number
    pub round: usize,
    /// Transfers dispatched directly by the strategy
    pub dispatched: Vec<Edge>,
    /// Relay hand-offs started after primary dispatch
    pub relay_started: Vec<RelayHop>,
    /// Relay hand-offs delivered at the start of the round
    pub relay_completed: Vec<RelayHop>,
}

impl RoundRecord {
    fn new(round: usize) -> Self {
        Self {
            round,
            ..Self::default()
        }
    }

    /// Whether the round changed anything
    pub fn made_progress(&self) -> bool {
        !self.dispatched.is_empty()
            || !self.relay_started.is_empty()
            || !self.relay_completed.is_empty()
    }

    /// Transfers finished this round, direct or relayed
    pub fn delivered(&self) -> impl Iterator<Item = &Edge> {
        self.dispatched
            .iter()
            .chain(self.relay_completed.iter().map(|hop| &hop.edge))
    }

    /// Capacity units each device spent this round
    pub fn device_usage(&self) -> BTreeMap<DeviceId, usize> {
        let mut usage = BTreeMap::new();
        let mut bump = |d: DeviceId| *usage.entry(d).or_insert(0) += 1;
        for edge in &self.dispatched {
            for d in edge.endpoints() {
                bump(d);
            }
        }
        for hop in self.relay_started.iter().chain(&self.relay_completed) {
            bump(hop.from);
            bump(hop.to);
        }
        usage
    }
}

/// Receives each finished round; has no influence on scheduling
pub trait RoundObserver {
    fn on_round(&mut self, record: &RoundRecord, graph: &TransferGraph);
}

/// Outcome and diagnostics of a complete run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub strategy: StrategyKind,
    pub rounds: usize,
    /// Maximum normalized degree of the input graph
    pub delta_prime: usize,
    /// Relay devices instantiated by the bypass overlay
    pub bypass_devices: usize,
    /// Transfers delivered through a relay
    pub relayed: usize,
    pub initial_edges: usize,
    pub delivered: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub records: Vec<RoundRecord>,
}

impl RunReport {
    /// Ids of every delivered transfer, sorted
    pub fn delivered_ids(&self) -> Vec<EdgeId> {
        let mut ids: Vec<EdgeId> = self
            .records
            .iter()
            .flat_map(|r| r.delivered().map(|e| e.id))
            .collect();
        ids.sort();
        ids
    }

    /// Transfers dispatched per round, direct and relayed
    pub fn per_round_counts(&self) -> Vec<usize> {
        self.records.iter().map(|r| r.delivered().count()).collect()
    }
}

/// Drives a strategy round by round until the graph is empty
pub struct RoundDriver {
    strategy: Box<dyn Strategy>,
    bypass: bool,
    observers: Vec<Box<dyn RoundObserver>>,
}

impl RoundDriver {
    /// Driver for the configured strategy
    pub fn new(kind: StrategyKind) -> Self {
        Self::with_strategy(build_strategy(kind))
    }

    pub fn with_strategy(strategy: Box<dyn Strategy>) -> Self {
        Self {
            strategy,
            bypass: false,
            observers: Vec::new(),
        }
    }

    /// Enable or disable the bypass relay overlay
    pub fn bypass(mut self, enabled: bool) -> Self {
        self.bypass = enabled;
        self
    }

    pub fn observer(mut self, observer: Box<dyn RoundObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Run to completion, consuming every edge of `graph`
    pub fn run(&mut self, graph: &mut TransferGraph) -> TranschedResult<RunReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        // Rounds start from full capacity, whatever the input recorded.
        let restored = graph.reset_availability();
        if restored > 0 {
            warn!(run_id = %run_id, devices = restored, "Reset devices loaded below capacity");
        }

        let delta_prime = graph.delta_prime();
        let initial_edges = graph.edge_count();
        let kind = self.strategy.kind();

        info!(
            run_id = %run_id,
            strategy = %kind,
            devices = graph.device_count(),
            edges = initial_edges,
            delta_prime,
            bypass = self.bypass,
            "Starting scheduling run"
        );

        let mut overlay = self.bypass.then(|| BypassOverlay::install(graph));
        let mut ledger = CapacityLedger::new();
        let mut records = Vec::new();

        while !graph.is_empty() || overlay.as_ref().is_some_and(BypassOverlay::has_active) {
            let record = self.step(graph, &mut ledger, overlay.as_mut(), records.len() + 1)?;
            for observer in &mut self.observers {
                observer.on_round(&record, graph);
            }
            records.push(record);
        }

        let relayed = records.iter().map(|r| r.relay_completed.len()).sum();
        let delivered = records.iter().map(|r| r.delivered().count()).sum();
        let report = RunReport {
            run_id,
            strategy: kind,
            rounds: records.len(),
            delta_prime,
            bypass_devices: overlay.as_ref().map_or(0, BypassOverlay::relay_count),
            relayed,
            initial_edges,
            delivered,
            started_at,
            finished_at: Utc::now(),
            records,
        };

        if report.delivered != initial_edges {
            warn!(
                run_id = %run_id,
                delivered = report.delivered,
                initial_edges,
                "Run finished with transfers unaccounted for"
            );
        }
        info!(
            run_id = %run_id,
            rounds = report.rounds,
            delta_prime,
            bypass_devices = report.bypass_devices,
            relayed,
            "Scheduling run complete"
        );

        Ok(report)
    }

    /// Execute one round: drain relays, dispatch, start hand-offs, release
    fn step(
        &mut self,
        graph: &mut TransferGraph,
        ledger: &mut CapacityLedger,
        mut overlay: Option<&mut BypassOverlay>,
        round: usize,
    ) -> TranschedResult<RoundRecord> {
        let mut record = RoundRecord::new(round);

        if let Some(overlay) = overlay.as_deref_mut() {
            record.relay_completed = overlay.drain(graph, ledger);
        }

        if !graph.is_empty() {
            let queue = self.strategy.gen_edges(graph)?;
            record.dispatched = self.strategy.do_work(graph, ledger, &queue)?;
        }

        if let Some(overlay) = overlay.as_deref_mut() {
            record.relay_started = overlay.hand_off(graph, ledger);
        }

        ledger.release_all(graph);

        debug!(
            round,
            dispatched = record.dispatched.len(),
            relay_started = record.relay_started.len(),
            relay_completed = record.relay_completed.len(),
            remaining = graph.edge_count(),
            "Round complete"
        );

        if !record.made_progress() {
            return Err(TranschedError::Stalled(format!(
                "{} dispatched nothing in round {} with {} transfers pending",
                self.strategy.kind(),
                round,
                graph.edge_count()
            )));
        }

        Ok(record)
    }
}
