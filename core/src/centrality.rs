//! Whole-graph importance scores: weighted closeness (one Dijkstra per
//! source) or PageRank by power iteration. Both are recomputed from scratch
//! for every build.

use crate::config::{CentralityConfig, CentralityMode};
use crate::graph::SimilarityGraph;
use crate::DocId;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};
use std::time::Instant;

/// Per-document score, non-negative, larger means more central.
pub type CentralityScores = BTreeMap<DocId, f64>;

pub fn compute(graph: &SimilarityGraph, config: &CentralityConfig) -> CentralityScores {
    let start = Instant::now();
    let scores = match config.mode {
        CentralityMode::Closeness => closeness(graph),
        CentralityMode::PageRank => pagerank(graph, config.damping, config.max_iterations, config.tolerance),
    };
    tracing::info!(mode = ?config.mode, nodes = graph.node_count(), took_s = start.elapsed().as_secs_f64(), "centrality computed");
    scores
}

#[derive(Copy, Clone, PartialEq)]
struct State {
    cost: f64,
    node: usize,
}

impl Eq for State {}

// Reversed so `BinaryHeap` pops the smallest cost first.
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.total_cmp(&self.cost).then_with(|| self.node.cmp(&other.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest distances from `source` over edge distances; unreachable nodes
/// stay at infinity.
pub fn dijkstra(graph: &SimilarityGraph, source: usize) -> Vec<f64> {
    let mut dist = vec![f64::INFINITY; graph.node_count()];
    let mut heap = BinaryHeap::new();
    dist[source] = 0.0;
    heap.push(State { cost: 0.0, node: source });

    while let Some(State { cost, node }) = heap.pop() {
        if cost > dist[node] {
            continue;
        }
        for edge in graph.neighbors(node) {
            let next = State { cost: cost + edge.distance, node: edge.node };
            if next.cost < dist[next.node] {
                dist[next.node] = next.cost;
                heap.push(next);
            }
        }
    }
    dist
}

/// `reachable / total_distance`, left un-normalized (it can exceed 1 when
/// neighbours are very similar). Isolated nodes and zero total distance
/// score 0.
pub fn closeness(graph: &SimilarityGraph) -> CentralityScores {
    let scores: Vec<f64> = (0..graph.node_count())
        .into_par_iter()
        .map(|source| {
            if graph.neighbors(source).is_empty() {
                return 0.0;
            }
            let dist = dijkstra(graph, source);
            let (reachable, total) = dist
                .iter()
                .enumerate()
                .filter(|&(node, d)| node != source && d.is_finite())
                .fold((0usize, 0.0f64), |(n, sum), (_, d)| (n + 1, sum + d));
            if reachable == 0 || total <= 0.0 {
                0.0
            } else {
                reachable as f64 / total
            }
        })
        .collect();
    graph.nodes().iter().copied().zip(scores).collect()
}

/// Weighted PageRank. Transition probabilities are edge similarities
/// normalized per source node; mass on nodes without edges is spread
/// uniformly. Stops when the L1 change drops below `n * tolerance` or after
/// `max_iterations`.
pub fn pagerank(graph: &SimilarityGraph, damping: f64, max_iterations: usize, tolerance: f64) -> CentralityScores {
    let n = graph.node_count();
    if n == 0 {
        return CentralityScores::new();
    }
    let uniform = 1.0 / n as f64;
    let out_weight: Vec<f64> = (0..n).map(|u| graph.neighbors(u).iter().map(|e| e.similarity).sum()).collect();

    let mut rank = vec![uniform; n];
    let mut converged = false;
    for iteration in 0..max_iterations {
        let dangling: f64 = (0..n).filter(|&u| out_weight[u] <= 0.0).map(|u| rank[u]).sum();
        let base = (1.0 - damping) * uniform + damping * dangling * uniform;
        let mut next = vec![base; n];
        for u in 0..n {
            if out_weight[u] <= 0.0 {
                continue;
            }
            let share = damping * rank[u] / out_weight[u];
            for e in graph.neighbors(u) {
                next[e.node] += share * e.similarity;
            }
        }
        let delta: f64 = next.iter().zip(&rank).map(|(a, b)| (a - b).abs()).sum();
        rank = next;
        if delta < n as f64 * tolerance {
            tracing::debug!(iteration, delta, "pagerank converged");
            converged = true;
            break;
        }
    }
    if !converged {
        tracing::warn!(max_iterations, "pagerank did not converge, using last iterate");
    }
    graph.nodes().iter().copied().zip(rank).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SimilarityEdge;

    fn path_graph() -> SimilarityGraph {
        // 1 -(0.5)- 2 -(0.5)- 3, plus isolated 4
        SimilarityGraph::new(
            [1, 2, 3, 4],
            vec![SimilarityEdge::new(1, 2, 0.5), SimilarityEdge::new(2, 3, 0.5)],
        )
        .unwrap()
    }

    #[test]
    fn dijkstra_distances() {
        let g = path_graph();
        let d = dijkstra(&g, g.index_of(1).unwrap());
        assert_eq!(d[g.index_of(1).unwrap()], 0.0);
        assert!((d[g.index_of(3).unwrap()] - 1.0).abs() < 1e-12);
        assert!(d[g.index_of(4).unwrap()].is_infinite());
    }

    #[test]
    fn dijkstra_prefers_cheaper_detour() {
        // direct 1-3 distance 0.9, via 2 distance 0.2 + 0.2
        let g = SimilarityGraph::new(
            [1, 2, 3],
            vec![SimilarityEdge::new(1, 3, 0.1), SimilarityEdge::new(1, 2, 0.8), SimilarityEdge::new(2, 3, 0.8)],
        )
        .unwrap();
        let d = dijkstra(&g, g.index_of(1).unwrap());
        assert!((d[g.index_of(3).unwrap()] - 0.4).abs() < 1e-9);
    }

    #[test]
    fn closeness_values() {
        let g = path_graph();
        let c = closeness(&g);
        // middle node: 2 reachable at total distance 1.0
        assert!((c[&2] - 2.0).abs() < 1e-12);
        // ends: 2 reachable at 0.5 + 1.0
        assert!((c[&1] - 2.0 / 1.5).abs() < 1e-12);
        assert_eq!(c[&3], c[&1]);
        assert_eq!(c[&4], 0.0);
        assert!(c[&2] > c[&1]);
    }

    #[test]
    fn closeness_zero_distance_scores_zero() {
        let g = SimilarityGraph::new([1, 2], vec![SimilarityEdge::new(1, 2, 1.0)]).unwrap();
        let c = closeness(&g);
        assert_eq!(c[&1], 0.0);
        assert_eq!(c[&2], 0.0);
    }

    #[test]
    fn pagerank_sums_to_one_and_ranks_hub_first() {
        let g = SimilarityGraph::new(
            [1, 2, 3, 4, 5],
            vec![
                SimilarityEdge::new(1, 2, 0.5),
                SimilarityEdge::new(1, 3, 0.5),
                SimilarityEdge::new(1, 4, 0.5),
                SimilarityEdge::new(4, 5, 0.2),
            ],
        )
        .unwrap();
        let pr = pagerank(&g, 0.85, 100, 1e-9);
        let total: f64 = pr.values().sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!(pr.values().all(|&v| v >= 0.0));
        let top = pr.iter().max_by(|a, b| a.1.total_cmp(b.1)).unwrap();
        assert_eq!(*top.0, 1);
    }

    #[test]
    fn pagerank_isolated_nodes_share_mass() {
        let g = SimilarityGraph::new([1, 2], Vec::new()).unwrap();
        let pr = pagerank(&g, 0.85, 50, 1e-9);
        assert!((pr[&1] - 0.5).abs() < 1e-12);
        assert!((pr[&2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn empty_graph() {
        let g = SimilarityGraph::new(Vec::<DocId>::new(), Vec::new()).unwrap();
        assert!(closeness(&g).is_empty());
        assert!(pagerank(&g, 0.85, 10, 1e-6).is_empty());
    }

    #[test]
    fn compute_dispatches_on_mode() {
        let g = path_graph();
        let mut cfg = CentralityConfig::default();
        assert_eq!(compute(&g, &cfg), closeness(&g));
        cfg.mode = CentralityMode::PageRank;
        assert_eq!(compute(&g, &cfg), pagerank(&g, cfg.damping, cfg.max_iterations, cfg.tolerance));
    }
}
