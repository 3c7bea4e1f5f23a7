// src/types.rs

use serde::Deserialize;

/// What the diagram decoder does with a node whose `type` it does not know.
///
/// - `Skip` (default): drop the node and every edge touching it, with a
///   warning, so diagrams from a newer editor still deploy.
/// - `Reject`: abort decoding with [`FlowgateError::UnknownNodeType`].
///
/// [`FlowgateError::UnknownNodeType`]: crate::errors::FlowgateError::UnknownNodeType
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnknownNodePolicy {
    Reject,
    #[default]
    Skip,
}

/// Reserved approver id marking a node as system-auto-forwarding.
pub const SYSTEM_AUTO_USER: &str = "sys_auto";

/// Prefix of every synthesized proxy node id.
pub const PROXY_PREFIX: &str = "proxy_";
