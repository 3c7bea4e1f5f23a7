// src/flow/property.rs

//! Typed node and edge properties.
//!
//! Each node kind has one explicit decode path from its JSON property bag.
//! Missing fields (or a missing/`null` bag) decode to zero values; a field
//! of the wrong JSON type is a [`FlowgateError::PropertyDecode`].

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::{FlowgateError, Result};
use crate::flow::model::NodeKind;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StartProperty {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EndProperty {
    pub name: String,
}

/// Approval step assigned to people.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProperty {
    pub name: String,
    pub approved_user_ids: Vec<String>,
    /// All approvers must agree before the step passes.
    pub is_cosigned: bool,
    pub routing_rule: String,
    pub template_field: String,
    /// Carbon-copy step: approvers are notified as well as assigned.
    #[serde(rename = "isCC", alias = "isCc")]
    pub is_cc: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConditionProperty {
    pub name: String,
}

/// Parallel and inclusion gateways only carry a display name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewayProperty {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutomationProperty {
    pub name: String,
    pub is_notify: bool,
    pub notify_methods: Vec<String>,
}

/// Properties of an edge. Only edges leaving a condition node use
/// `expression`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EdgeProperty {
    pub name: String,
    #[serde(alias = "conditionExpression")]
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeProperties {
    Start(StartProperty),
    End(EndProperty),
    User(UserProperty),
    Condition(ConditionProperty),
    Gateway(GatewayProperty),
    Automation(AutomationProperty),
}

impl NodeProperties {
    pub fn name(&self) -> &str {
        match self {
            NodeProperties::Start(p) => &p.name,
            NodeProperties::End(p) => &p.name,
            NodeProperties::User(p) => &p.name,
            NodeProperties::Condition(p) => &p.name,
            NodeProperties::Gateway(p) => &p.name,
            NodeProperties::Automation(p) => &p.name,
        }
    }

    pub fn as_user(&self) -> Option<&UserProperty> {
        match self {
            NodeProperties::User(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_automation(&self) -> Option<&AutomationProperty> {
        match self {
            NodeProperties::Automation(p) => Some(p),
            _ => None,
        }
    }
}

/// Decode a node's property bag into the typed shape for `kind`.
pub fn decode_node_properties(node_id: &str, kind: NodeKind, bag: &Value) -> Result<NodeProperties> {
    let props = match kind {
        NodeKind::Start => NodeProperties::Start(decode_bag(node_id, kind.as_str(), bag)?),
        NodeKind::End => NodeProperties::End(decode_bag(node_id, kind.as_str(), bag)?),
        NodeKind::User => NodeProperties::User(decode_bag(node_id, kind.as_str(), bag)?),
        NodeKind::Condition => NodeProperties::Condition(decode_bag(node_id, kind.as_str(), bag)?),
        NodeKind::Parallel | NodeKind::Inclusion => {
            NodeProperties::Gateway(decode_bag(node_id, kind.as_str(), bag)?)
        }
        NodeKind::Automation => NodeProperties::Automation(decode_bag(node_id, kind.as_str(), bag)?),
    };
    Ok(props)
}

pub fn decode_edge_properties(edge_id: &str, bag: &Value) -> Result<EdgeProperty> {
    decode_bag(edge_id, "edge", bag)
}

fn decode_bag<T>(owner_id: &str, kind: &str, bag: &Value) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if bag.is_null() {
        return Ok(T::default());
    }
    T::deserialize(bag).map_err(|e| FlowgateError::PropertyDecode {
        node_id: owner_id.to_string(),
        kind: kind.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_property_reads_camel_case_fields() {
        let bag = json!({
            "name": "Manager",
            "approvedUserIds": ["u1", "u2"],
            "isCosigned": true,
            "isCC": true,
            "someEditorOnlyField": 42
        });
        let props = decode_node_properties("U1", NodeKind::User, &bag).unwrap();
        let user = props.as_user().unwrap();
        assert_eq!(user.approved_user_ids, vec!["u1", "u2"]);
        assert!(user.is_cosigned);
        assert!(user.is_cc);
        assert_eq!(user.routing_rule, "");
    }

    #[test]
    fn wrong_field_type_is_a_property_error() {
        let bag = json!({ "approvedUserIds": "u1" });
        let err = decode_node_properties("U1", NodeKind::User, &bag).unwrap_err();
        match err {
            FlowgateError::PropertyDecode { node_id, kind, .. } => {
                assert_eq!(node_id, "U1");
                assert_eq!(kind, "user");
            }
            other => panic!("expected PropertyDecode, got {other:?}"),
        }
    }

    #[test]
    fn edge_expression_accepts_legacy_alias() {
        let edge = decode_edge_properties("e1", &json!({"conditionExpression": "amount > 10"})).unwrap();
        assert_eq!(edge.expression, "amount > 10");
        assert_eq!(decode_edge_properties("e2", &Value::Null).unwrap(), EdgeProperty::default());
    }
}
