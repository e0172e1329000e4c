//! Capacity split followed by one maximal matching per round

use tracing::{info, warn};
use transched_core::{Edge, EdgeId, StrategyKind, TransferGraph, TranschedResult};

use crate::ledger::CapacityLedger;
use crate::split::SplitGraph;
use crate::strategy::{dispatch_in_order, Strategy};

/// Greedy maximal matching in edge order; returns split-edge positions
///
/// A self-loop matches its single alias.
pub fn maximal_matching(split: &SplitGraph) -> Vec<usize> {
    let mut matched = vec![false; split.aliases().len()];
    let mut chosen = Vec::new();
    for (position, edge) in split.edges().iter().enumerate() {
        if matched[edge.a.0] || matched[edge.b.0] {
            continue;
        }
        matched[edge.a.0] = true;
        matched[edge.b.0] = true;
        chosen.push(position);
    }
    chosen
}

/// Dispatches one maximal matching of the split graph per round
#[derive(Debug, Default)]
pub struct CapacitySplitMatching {
    split: Option<SplitGraph>,
}

impl CapacitySplitMatching {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Strategy for CapacitySplitMatching {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CapacitySplitMatching
    }

    fn gen_edges(&mut self, graph: &TransferGraph) -> TranschedResult<Vec<EdgeId>> {
        let split = self.split.get_or_insert_with(|| {
            let split = SplitGraph::build(graph);
            info!(
                edges = split.edge_count(),
                aliases = split.aliases().len(),
                "Built capacity-split graph"
            );
            split
        });
        split.retain_pending(graph);

        Ok(maximal_matching(split)
            .into_iter()
            .map(|position| split.edges()[position].edge)
            .collect())
    }

    fn do_work(
        &mut self,
        graph: &mut TransferGraph,
        ledger: &mut CapacityLedger,
        queue: &[EdgeId],
    ) -> TranschedResult<Vec<Edge>> {
        let dispatched = dispatch_in_order(graph, ledger, queue);

        if let Some(split) = self.split.as_mut() {
            let ids: Vec<EdgeId> = dispatched.iter().map(|e| e.id).collect();
            split.remove_edges(&ids);
            if split.is_empty() {
                let discarded = graph.clear();
                if discarded > 0 {
                    warn!(discarded, "Split graph exhausted with transfers still pending");
                }
            }
        }

        Ok(dispatched)
    }
}
