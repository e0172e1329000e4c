//! Integral maximum flow (Dinic)

use std::collections::VecDeque;

/// Handle to a forward arc added with [`FlowNetwork::add_arc`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArcId(usize);

/// Directed network with integer capacities
///
/// Arcs are stored in forward/reverse pairs: arc `2k` is the forward arc and
/// `2k + 1` its residual twin.
#[derive(Debug, Clone, Default)]
pub struct FlowNetwork {
    adjacency: Vec<Vec<usize>>,
    head: Vec<usize>,
    residual: Vec<u64>,
    capacity: Vec<u64>,
    level: Vec<Option<usize>>,
    next_arc: Vec<usize>,
}

impl FlowNetwork {
    pub fn new(node_count: usize) -> Self {
        Self {
            adjacency: vec![Vec::new(); node_count],
            ..Self::default()
        }
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn add_arc(&mut self, from: usize, to: usize, capacity: u64) -> ArcId {
        let id = self.head.len();
        self.head.push(to);
        self.residual.push(capacity);
        self.capacity.push(capacity);
        self.adjacency[from].push(id);

        self.head.push(from);
        self.residual.push(0);
        self.capacity.push(0);
        self.adjacency[to].push(id + 1);

        ArcId(id)
    }

    /// Flow currently carried by a forward arc
    pub fn flow(&self, arc: ArcId) -> u64 {
        self.capacity[arc.0] - self.residual[arc.0]
    }

    /// Push as much flow as possible from `source` to `sink`
    pub fn max_flow(&mut self, source: usize, sink: usize) -> u64 {
        if source == sink {
            return 0;
        }
        let mut total = 0;
        while self.build_levels(source, sink) {
            self.next_arc = vec![0; self.node_count()];
            loop {
                let pushed = self.augment(source, sink, u64::MAX);
                if pushed == 0 {
                    break;
                }
                total += pushed;
            }
        }
        total
    }

    fn build_levels(&mut self, source: usize, sink: usize) -> bool {
        self.level = vec![None; self.node_count()];
        self.level[source] = Some(0);
        let mut queue = VecDeque::from([source]);
        while let Some(v) = queue.pop_front() {
            let depth = self.level[v].unwrap_or(0);
            for &arc in &self.adjacency[v] {
                let w = self.head[arc];
                if self.residual[arc] > 0 && self.level[w].is_none() {
                    self.level[w] = Some(depth + 1);
                    queue.push_back(w);
                }
            }
        }
        self.level[sink].is_some()
    }

    fn augment(&mut self, v: usize, sink: usize, limit: u64) -> u64 {
        if v == sink {
            return limit;
        }
        while self.next_arc[v] < self.adjacency[v].len() {
            let arc = self.adjacency[v][self.next_arc[v]];
            let w = self.head[arc];
            let advances = match (self.level[v], self.level[w]) {
                (Some(lv), Some(lw)) => lw == lv + 1,
                _ => false,
            };
            if self.residual[arc] > 0 && advances {
                let pushed = self.augment(w, sink, limit.min(self.residual[arc]));
                if pushed > 0 {
                    self.residual[arc] -= pushed;
                    self.residual[arc ^ 1] += pushed;
                    return pushed;
                }
            }
            self.next_arc[v] += 1;
        }
        0
    }
}
