//! Weighting trait and Dijkstra shortest-path solver.
//!
//! # Pluggability
//!
//! The graph stores opaque payloads; what they *cost* is decided by the graph's
//! owner through [`GraphWeights`].  Itinerary search uses this to charge port
//! costs, estimated walking legs and per-domain crowding penalties without the
//! solver knowing about any of them.
//!
//! # Relaxation
//!
//! ```text
//! candidate = dist[current] + edge_length(edge) + node_weight(edge.to)
//! ```
//!
//! The origin starts at zero; its own node weight is never charged.
//!
//! # Tie-breaking
//!
//! Heap entries carry a monotonically increasing discovery sequence number as
//! a secondary key, so among equal-distance candidates the one discovered
//! first is expanded first.  With a deterministic insertion order the result
//! is fully deterministic.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::hash::Hash;

use ordered_float::OrderedFloat;

use nav_core::{GraphEdgeId, GraphNodeId};

use crate::WeightedGraph;

// ── GraphWeights ──────────────────────────────────────────────────────────────

/// Owner-supplied cost model over node and edge payloads.
///
/// Both methods must be pure.  A non-finite edge length makes the edge
/// impassable for that solve.
pub trait GraphWeights<N, E> {
    /// Extra cost for entering `node`.  Default: free.
    fn node_weight(&self, _node: &N) -> f64 {
        0.0
    }

    fn edge_length(&self, edge: &E) -> f64;
}

/// [`GraphWeights`] built from two closures.
pub struct FnWeights<NW, EL> {
    pub node_weight: NW,
    pub edge_length: EL,
}

impl<N, E, NW, EL> GraphWeights<N, E> for FnWeights<NW, EL>
where
    NW: Fn(&N) -> f64,
    EL: Fn(&E) -> f64,
{
    fn node_weight(&self, node: &N) -> f64 {
        (self.node_weight)(node)
    }

    fn edge_length(&self, edge: &E) -> f64 {
        (self.edge_length)(edge)
    }
}

/// [`GraphWeights`] with free nodes and a closure for edge lengths.
pub struct EdgeLengths<EL>(pub EL);

impl<N, E, EL: Fn(&E) -> f64> GraphWeights<N, E> for EdgeLengths<EL> {
    fn edge_length(&self, edge: &E) -> f64 {
        (self.0)(edge)
    }
}

// ── GraphPath ─────────────────────────────────────────────────────────────────

/// Result of a solve: visited nodes, traversed edges and the total cost.
///
/// `nodes.len() == edges.len() + 1`; a trivial solve (origin = destination)
/// has one node and no edges.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphPath {
    pub nodes: Vec<GraphNodeId>,
    pub edges: Vec<GraphEdgeId>,
    pub cost:  f64,
}

impl GraphPath {
    pub fn is_trivial(&self) -> bool {
        self.edges.is_empty()
    }
}

// ── Solver ────────────────────────────────────────────────────────────────────

impl<N: Clone + Eq + Hash, E> WeightedGraph<N, E> {
    /// Cheapest route from `origin` to `destination` over passable edges.
    ///
    /// Returns `None` if either payload is not in the graph or no route
    /// exists.
    pub fn find_minimum_path<W: GraphWeights<N, E>>(
        &self,
        origin:      &N,
        destination: &N,
        weights:     &W,
    ) -> Option<GraphPath> {
        let from = self.node_id(origin)?;
        let to = self.node_id(destination)?;
        self.find_minimum_path_by_id(from, to, weights)
    }

    /// Like [`find_minimum_path`][Self::find_minimum_path] for known ids.
    pub fn find_minimum_path_by_id<W: GraphWeights<N, E>>(
        &self,
        from:    GraphNodeId,
        to:      GraphNodeId,
        weights: &W,
    ) -> Option<GraphPath> {
        let n = self.node_count();
        if from.index() >= n || to.index() >= n {
            return None;
        }
        if from == to {
            return Some(GraphPath { nodes: vec![from], edges: vec![], cost: 0.0 });
        }

        // dist[v] = best known cost to reach v.
        let mut dist = vec![f64::INFINITY; n];
        // prev_edge[v] = edge that reached v; INVALID for unreached nodes.
        let mut prev_edge = vec![GraphEdgeId::INVALID; n];
        let mut settled = vec![false; n];

        dist[from.index()] = 0.0;

        // Min-heap on (cost, discovery sequence).
        let mut heap: BinaryHeap<Reverse<(OrderedFloat<f64>, u64, GraphNodeId)>> = BinaryHeap::new();
        let mut seq: u64 = 0;
        heap.push(Reverse((OrderedFloat(0.0), seq, from)));

        while let Some(Reverse((OrderedFloat(cost), _, node))) = heap.pop() {
            if node == to {
                return Some(self.reconstruct(&prev_edge, from, to, cost));
            }
            if settled[node.index()] {
                continue;
            }
            settled[node.index()] = true;

            for edge_id in self.out_edges(node) {
                let Some(edge) = self.edge(edge_id) else { continue };
                if !edge.passable || settled[edge.to.index()] {
                    continue;
                }
                let length = weights.edge_length(&edge.data);
                if !length.is_finite() {
                    continue;
                }
                let Some(target) = self.node(edge.to) else { continue };
                let candidate = cost + length + weights.node_weight(target);

                if candidate < dist[edge.to.index()] {
                    dist[edge.to.index()] = candidate;
                    prev_edge[edge.to.index()] = edge_id;
                    seq += 1;
                    heap.push(Reverse((OrderedFloat(candidate), seq, edge.to)));
                }
            }
        }

        None
    }

    fn reconstruct(
        &self,
        prev_edge: &[GraphEdgeId],
        from:      GraphNodeId,
        to:        GraphNodeId,
        cost:      f64,
    ) -> GraphPath {
        let mut nodes = vec![to];
        let mut edges = Vec::new();
        let mut cur = to;
        while cur != from {
            let e = prev_edge[cur.index()];
            let Some(edge) = self.edge(e) else { break };
            edges.push(e);
            cur = edge.from;
            nodes.push(cur);
        }
        nodes.reverse();
        edges.reverse();
        GraphPath { nodes, edges, cost }
    }
}
