//! DefNode - the definition tree
//!
//! A definition document is a tree whose nodes are exactly one of:
//! - a scalar (null, bool, integer, float, string)
//! - an ordered sequence of nodes
//! - an ordered mapping of field name to node
//!
//! Mapping field order is preserved for deterministic serialization but is
//! not significant for equality: two mappings holding the same entries in a
//! different order compare equal.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered mapping of field name to node.
pub type DefMap = IndexMap<String, DefNode>;

/// A scalar leaf value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// One node of a definition tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefNode {
    Scalar(Scalar),
    Seq(Vec<DefNode>),
    Map(DefMap),
}

impl Default for DefNode {
    fn default() -> Self {
        DefNode::Scalar(Scalar::Null)
    }
}

impl DefNode {
    /// Creates an empty mapping node.
    pub fn map() -> Self {
        DefNode::Map(DefMap::new())
    }

    /// Creates a string scalar node.
    pub fn string(value: impl Into<String>) -> Self {
        DefNode::Scalar(Scalar::Str(value.into()))
    }

    /// Creates an integer scalar node.
    pub fn int(value: i64) -> Self {
        DefNode::Scalar(Scalar::Int(value))
    }

    /// Returns the shape name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            DefNode::Scalar(Scalar::Null) => "null",
            DefNode::Scalar(Scalar::Bool(_)) => "bool",
            DefNode::Scalar(Scalar::Int(_)) => "int",
            DefNode::Scalar(Scalar::Float(_)) => "float",
            DefNode::Scalar(Scalar::Str(_)) => "string",
            DefNode::Seq(_) => "sequence",
            DefNode::Map(_) => "mapping",
        }
    }

    #[inline]
    pub fn is_map(&self) -> bool {
        matches!(self, DefNode::Map(_))
    }

    pub fn as_map(&self) -> Option<&DefMap> {
        match self {
            DefNode::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut DefMap> {
        match self {
            DefNode::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[DefNode]> {
        match self {
            DefNode::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_seq_mut(&mut self) -> Option<&mut Vec<DefNode>> {
        match self {
            DefNode::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DefNode::Scalar(Scalar::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer value of an int scalar or a numeric string.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DefNode::Scalar(Scalar::Int(i)) => Some(*i),
            DefNode::Scalar(Scalar::Str(s)) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Renders a non-null scalar as text. Containers and null yield `None`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            DefNode::Scalar(Scalar::Str(s)) => Some(s.clone()),
            DefNode::Scalar(Scalar::Int(i)) => Some(i.to_string()),
            DefNode::Scalar(Scalar::Float(f)) => Some(f.to_string()),
            DefNode::Scalar(Scalar::Bool(b)) => Some(b.to_string()),
            DefNode::Scalar(Scalar::Null) | DefNode::Seq(_) | DefNode::Map(_) => None,
        }
    }

    /// Looks up a field of a mapping node.
    pub fn get(&self, key: &str) -> Option<&DefNode> {
        self.as_map().and_then(|map| map.get(key))
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut DefNode> {
        self.as_map_mut().and_then(|map| map.get_mut(key))
    }

    /// Resolves a `/`-separated pointer of mapping keys and sequence indices.
    ///
    /// The empty pointer resolves to `self`.
    pub fn at(&self, pointer: &str) -> Option<&DefNode> {
        pointer
            .split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |node, segment| match node {
                DefNode::Map(map) => map.get(segment),
                DefNode::Seq(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                DefNode::Scalar(_) => None,
            })
    }

    /// Converts to a `serde_json::Value` for schema validation.
    pub fn to_json_value(&self) -> serde_json::Value {
        // Untagged serialization of this enum is infallible except for
        // non-finite floats, which JSON has no representation for.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Serializes to compact JSON, preserving mapping order.
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parses a JSON document.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Parses a YAML (or JSON) document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Renders as YAML.
    pub fn to_yaml_string(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

impl From<&str> for DefNode {
    fn from(value: &str) -> Self {
        DefNode::string(value)
    }
}

impl From<i64> for DefNode {
    fn from(value: i64) -> Self {
        DefNode::int(value)
    }
}

impl From<DefMap> for DefNode {
    fn from(map: DefMap) -> Self {
        DefNode::Map(map)
    }
}

impl From<Vec<DefNode>> for DefNode {
    fn from(items: Vec<DefNode>) -> Self {
        DefNode::Seq(items)
    }
}

impl From<serde_json::Value> for DefNode {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => DefNode::Scalar(Scalar::Null),
            serde_json::Value::Bool(b) => DefNode::Scalar(Scalar::Bool(b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => DefNode::Scalar(Scalar::Int(i)),
                None => DefNode::Scalar(Scalar::Float(n.as_f64().unwrap_or(f64::NAN))),
            },
            serde_json::Value::String(s) => DefNode::Scalar(Scalar::Str(s)),
            serde_json::Value::Array(items) => {
                DefNode::Seq(items.into_iter().map(DefNode::from).collect())
            }
            serde_json::Value::Object(map) => DefNode::Map(
                map.into_iter()
                    .map(|(k, v)| (k, DefNode::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_yaml_parses_into_tagged_shapes() {
        let node = DefNode::from_yaml_str(
            "name: acme\ncount: 3\nratio: 1.5\nflag: true\nnothing: ~\nitems: [a, b]\n",
        )
        .unwrap();

        assert_eq!(node.get("name"), Some(&DefNode::string("acme")));
        assert_eq!(node.get("count"), Some(&DefNode::int(3)));
        assert_eq!(node.get("ratio").unwrap().kind_name(), "float");
        assert_eq!(node.get("flag").unwrap().kind_name(), "bool");
        assert_eq!(node.get("nothing").unwrap().kind_name(), "null");
        assert_eq!(node.get("items").unwrap().as_seq().unwrap().len(), 2);
    }

    #[test]
    fn test_mapping_order_preserved_in_serialization() {
        let node = DefNode::from_yaml_str("zeta: 1\nalpha: 2\nmid: 3\n").unwrap();
        assert_eq!(node.to_json_string().unwrap(), r#"{"zeta":1,"alpha":2,"mid":3}"#);
    }

    #[test]
    fn test_mapping_equality_ignores_order() {
        let a = DefNode::from_yaml_str("x: 1\ny: 2\n").unwrap();
        let b = DefNode::from_yaml_str("y: 2\nx: 1\n").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_pointer_lookup() {
        let node = DefNode::from(json!({
            "dataDefs": { "price": { "axis": { "row": { "members": [ { "name": "high" } ] } } } }
        }));

        assert_eq!(
            node.at("/dataDefs/price/axis/row/members/0/name"),
            Some(&DefNode::string("high"))
        );
        assert!(node.at("/dataDefs/price/axis/col").is_none());
        assert_eq!(node.at(""), Some(&node));
    }

    #[test]
    fn test_as_text_and_as_i64() {
        assert_eq!(DefNode::int(7).as_text().as_deref(), Some("7"));
        assert_eq!(DefNode::string("12").as_i64(), Some(12));
        assert_eq!(DefNode::map().as_text(), None);
        assert_eq!(DefNode::default().as_text(), None);
    }

    #[test]
    fn test_json_value_conversion_round_trip() {
        let value = json!({ "a": [1, "two", { "b": false }], "c": null });
        let node = DefNode::from(value.clone());
        assert_eq!(node.to_json_value(), value);
    }
}
