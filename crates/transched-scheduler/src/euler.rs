//! Euler circuits of even-degree multigraphs (Hierholzer)

use transched_core::{TranschedError, TranschedResult};

/// Closed walks covering every edge exactly once, one per component
///
/// Vertices are `0..vertex_count`; self-loops and parallel edges are allowed.
/// Each returned walk starts and ends on the same vertex. Fails with
/// `InvalidTopology` when a vertex has odd degree.
pub fn euler_circuits(
    vertex_count: usize,
    edges: &[(usize, usize)],
) -> TranschedResult<Vec<Vec<usize>>> {
    let mut adjacency: Vec<Vec<(usize, usize)>> = vec![Vec::new(); vertex_count];
    for (index, &(u, v)) in edges.iter().enumerate() {
        if u >= vertex_count || v >= vertex_count {
            return Err(TranschedError::InvalidTopology(format!(
                "edge {} references vertex outside 0..{}",
                index, vertex_count
            )));
        }
        adjacency[u].push((index, v));
        adjacency[v].push((index, u));
    }

    if let Some(odd) = adjacency.iter().position(|a| a.len() % 2 != 0) {
        return Err(TranschedError::InvalidTopology(format!(
            "vertex {} has odd degree {}",
            odd,
            adjacency[odd].len()
        )));
    }

    let mut used = vec![false; edges.len()];
    let mut cursor = vec![0usize; vertex_count];
    let mut circuits = Vec::new();

    for start in 0..vertex_count {
        let mut stack = vec![start];
        let mut circuit = Vec::new();
        while let Some(&v) = stack.last() {
            while cursor[v] < adjacency[v].len() && used[adjacency[v][cursor[v]].0] {
                cursor[v] += 1;
            }
            if let Some(&(edge, next)) = adjacency[v].get(cursor[v]) {
                used[edge] = true;
                stack.push(next);
            } else {
                circuit.push(v);
                stack.pop();
            }
        }
        if circuit.len() > 1 {
            circuit.reverse();
            circuits.push(circuit);
        }
    }

    Ok(circuits)
}

/// Consecutive vertex pairs of each walk, oriented along the walk
pub fn circuit_arcs(circuits: &[Vec<usize>]) -> Vec<(usize, usize)> {
    circuits
        .iter()
        .flat_map(|walk| walk.windows(2).map(|w| (w[0], w[1])))
        .collect()
}
