// src/topology/mod.rs

//! Graph topology over a compiled definition.
//!
//! [`GraphTopology`] keeps the full node definitions (proxies included) for
//! predecessor unwinding, plus an "effective" adjacency in which every proxy
//! node has been replaced by direct edges between the business nodes it
//! bridges. Path search and look-ahead run on the effective graph.

pub mod graph;

pub use graph::{EffectiveGraph, GraphTopology};
