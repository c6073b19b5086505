//! Generic directed graph storage.
//!
//! # Data layout
//!
//! Node payloads live in a `Vec` indexed by [`GraphNodeId`]; a hash index maps
//! each payload back to its id so callers can address nodes by value.  Edges
//! live in a `Vec` indexed by [`GraphEdgeId`], and every node keeps the list of
//! its outgoing edge ids.  Unlike a CSR layout this supports incremental edge
//! insertion, which is what port graphs need: they are built once per search
//! and then only have edges toggled or re-weighted.

use std::hash::Hash;

use rustc_hash::FxHashMap;

use nav_core::{GraphEdgeId, GraphNodeId};

use crate::{GraphError, GraphResult};

/// A directed edge and its payload.
#[derive(Clone, Debug)]
pub struct Edge<E> {
    pub from: GraphNodeId,
    pub to:   GraphNodeId,
    pub data: E,
    /// Impassable edges are skipped by the solver.
    pub passable: bool,
}

/// Directed graph over node payloads `N` and edge payloads `E`.
///
/// Nodes are created on first reference by [`add_edge`][Self::add_edge] or
/// [`add_node`][Self::add_node]; adding the same payload twice returns the
/// existing id.
#[derive(Clone, Debug)]
pub struct WeightedGraph<N, E> {
    nodes:     Vec<N>,
    index:     FxHashMap<N, GraphNodeId>,
    edges:     Vec<Edge<E>>,
    out_edges: Vec<Vec<GraphEdgeId>>,
}

impl<N, E> Default for WeightedGraph<N, E> {
    fn default() -> Self {
        Self {
            nodes:     Vec::new(),
            index:     FxHashMap::default(),
            edges:     Vec::new(),
            out_edges: Vec::new(),
        }
    }
}

impl<N: Clone + Eq + Hash, E> WeightedGraph<N, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of `node`, inserting it if it is new.
    pub fn add_node(&mut self, node: N) -> GraphNodeId {
        if let Some(&id) = self.index.get(&node) {
            return id;
        }
        let id = GraphNodeId(self.nodes.len() as u32);
        self.index.insert(node.clone(), id);
        self.nodes.push(node);
        self.out_edges.push(Vec::new());
        id
    }

    /// Add a directed edge `from → to`, creating either node if needed.
    pub fn add_edge(&mut self, from: N, to: N, data: E) -> GraphEdgeId {
        let from = self.add_node(from);
        let to = self.add_node(to);
        let id = GraphEdgeId(self.edges.len() as u32);
        self.edges.push(Edge { from, to, data, passable: true });
        self.out_edges[from.index()].push(id);
        id
    }

    pub fn node_id(&self, node: &N) -> Option<GraphNodeId> {
        self.index.get(node).copied()
    }
}

impl<N, E> WeightedGraph<N, E> {
    pub fn node(&self, id: GraphNodeId) -> Option<&N> {
        self.nodes.get(id.index())
    }

    pub fn edge(&self, id: GraphEdgeId) -> Option<&Edge<E>> {
        self.edges.get(id.index())
    }

    pub fn edge_data_mut(&mut self, id: GraphEdgeId) -> GraphResult<&mut E> {
        self.edges
            .get_mut(id.index())
            .map(|e| &mut e.data)
            .ok_or(GraphError::EdgeNotFound(id))
    }

    /// Mark an edge passable or impassable for future solves.
    pub fn set_passable(&mut self, id: GraphEdgeId, passable: bool) -> GraphResult<()> {
        let edge = self.edges.get_mut(id.index()).ok_or(GraphError::EdgeNotFound(id))?;
        edge.passable = passable;
        Ok(())
    }

    /// Outgoing edge ids of `node` (empty for unknown ids).
    pub fn out_edges(&self, node: GraphNodeId) -> impl Iterator<Item = GraphEdgeId> + '_ {
        self.out_edges
            .get(node.index())
            .into_iter()
            .flat_map(|edges| edges.iter().copied())
    }

    pub fn out_degree(&self, node: GraphNodeId) -> usize {
        self.out_edges.get(node.index()).map_or(0, Vec::len)
    }

    pub fn nodes(&self) -> &[N] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge<E>] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
