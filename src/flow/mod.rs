// src/flow/mod.rs

//! Flow diagrams as drawn in the editor.
//!
//! - [`model`] holds the raw JSON shape and the typed diagram built from it.
//! - [`property`] decodes a node's or edge's free-form property bag into the
//!   typed shape for its kind.
//! - [`index`] is a lightweight predecessor/successor index over a typed
//!   diagram, used by the compiler to look at neighbours and grandparents.

pub mod index;
pub mod model;
pub mod property;

pub use index::DiagramIndex;
pub use model::{Diagram, DiagramEdge, DiagramNode, NodeId, NodeKind, RawDiagram, RawEdge, RawNode};
pub use property::{
    AutomationProperty, ConditionProperty, EdgeProperty, EndProperty, GatewayProperty,
    NodeProperties, StartProperty, UserProperty,
};
