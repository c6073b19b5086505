//! `nav-graph` — generic weighted graph and shortest-path solver.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                   |
//! |--------------|------------------------------------------------------------|
//! | [`graph`]    | `WeightedGraph<N, E>`, `Edge<E>`                           |
//! | [`dijkstra`] | `GraphWeights`, `FnWeights`, `EdgeLengths`, `GraphPath`, `find_minimum_path` |
//! | [`error`]    | `GraphError`, `GraphResult<T>`                             |
//!
//! The graph knows nothing about cells or ports: node and edge payloads are
//! opaque, and costs come from the caller's [`GraphWeights`].

pub mod dijkstra;
pub mod error;
pub mod graph;


pub use dijkstra::{EdgeLengths, FnWeights, GraphPath, GraphWeights};
pub use error::{GraphError, GraphResult};
pub use graph::{Edge, WeightedGraph};
