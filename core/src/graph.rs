//! Undirected, loop-free similarity graph stored as a dense node arena with
//! per-node adjacency lists.

use crate::error::{Result, SearchError};
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unordered document pair with `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityEdge {
    pub a: DocId,
    pub b: DocId,
    /// Jaccard score in [0, 1].
    pub similarity: f64,
}

impl SimilarityEdge {
    pub fn new(x: DocId, y: DocId, similarity: f64) -> Self {
        let (a, b) = if x <= y { (x, y) } else { (y, x) };
        Self { a, b, similarity }
    }

    /// Shortest-path weight.
    pub fn distance(&self) -> f64 {
        1.0 - self.similarity
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub node: usize,
    pub similarity: f64,
    pub distance: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SimilarityGraph {
    nodes: Vec<DocId>,
    index_of: HashMap<DocId, usize>,
    edges: Vec<SimilarityEdge>,
    adjacency: Vec<Vec<Neighbor>>,
}

impl SimilarityGraph {
    /// Every document becomes a node, including ones without edges.
    pub fn new(nodes: impl IntoIterator<Item = DocId>, edges: Vec<SimilarityEdge>) -> Result<Self> {
        let mut nodes: Vec<DocId> = nodes.into_iter().collect();
        nodes.sort_unstable();
        nodes.dedup();
        let index_of: HashMap<DocId, usize> = nodes.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let mut edges: Vec<SimilarityEdge> = edges.into_iter().map(|e| SimilarityEdge::new(e.a, e.b, e.similarity)).collect();
        edges.sort_by(|x, y| (x.a, x.b).cmp(&(y.a, y.b)));

        let mut adjacency = vec![Vec::new(); nodes.len()];
        for (i, e) in edges.iter().enumerate() {
            if e.a == e.b {
                return Err(SearchError::inconsistent(format!("self-edge on document {}", e.a)));
            }
            if i > 0 && (edges[i - 1].a, edges[i - 1].b) == (e.a, e.b) {
                return Err(SearchError::inconsistent(format!("duplicate edge {}-{}", e.a, e.b)));
            }
            if !(0.0..=1.0).contains(&e.similarity) {
                return Err(SearchError::inconsistent(format!("edge {}-{} has similarity {}", e.a, e.b, e.similarity)));
            }
            let (Some(&ia), Some(&ib)) = (index_of.get(&e.a), index_of.get(&e.b)) else {
                return Err(SearchError::inconsistent(format!("edge {}-{} references an unknown document", e.a, e.b)));
            };
            let distance = e.distance();
            adjacency[ia].push(Neighbor { node: ib, similarity: e.similarity, distance });
            adjacency[ib].push(Neighbor { node: ia, similarity: e.similarity, distance });
        }

        Ok(Self { nodes, index_of, edges, adjacency })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> &[DocId] {
        &self.nodes
    }

    pub fn edges(&self) -> &[SimilarityEdge] {
        &self.edges
    }

    pub fn index_of(&self, id: DocId) -> Option<usize> {
        self.index_of.get(&id).copied()
    }

    pub fn doc_id(&self, node: usize) -> DocId {
        self.nodes[node]
    }

    pub fn neighbors(&self, node: usize) -> &[Neighbor] {
        &self.adjacency[node]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_adjacency() {
        let g = SimilarityGraph::new([3, 1, 2], vec![SimilarityEdge::new(3, 1, 0.4)]).unwrap();
        assert_eq!(g.nodes(), &[1, 2, 3]);
        assert_eq!(g.edges()[0].a, 1);
        let i1 = g.index_of(1).unwrap();
        let i3 = g.index_of(3).unwrap();
        assert_eq!(g.neighbors(i1)[0].node, i3);
        assert_eq!(g.neighbors(i3)[0].node, i1);
        assert!((g.neighbors(i1)[0].distance - 0.6).abs() < 1e-12);
        assert!(g.neighbors(g.index_of(2).unwrap()).is_empty());
    }

    #[test]
    fn rejects_loops_and_unknown_nodes() {
        assert!(SimilarityGraph::new([1], vec![SimilarityEdge::new(1, 1, 1.0)]).is_err());
        assert!(SimilarityGraph::new([1], vec![SimilarityEdge::new(1, 2, 0.5)]).is_err());
        assert!(SimilarityGraph::new([1, 2], vec![SimilarityEdge::new(1, 2, 0.5), SimilarityEdge::new(2, 1, 0.5)]).is_err());
    }
}
