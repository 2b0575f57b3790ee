//! Axis model - the dimensional view of a DataDef
//!
//! Member declarations under `axis/<kind>/members` become [`Axis`] values,
//! grouped per [`AxisKind`]. The cartesian product across kinds gives the
//! [`Member`] tuples a scraper extracts, one value per kind.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::model::DataDef;
use crate::errors::{DefsError, DefsResult};
use crate::tree::DefNode;

/// Dimension kinds. Variant order is the product order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisKind {
    Fact,
    Col,
    Row,
}

impl AxisKind {
    pub const ALL: [AxisKind; 3] = [AxisKind::Fact, AxisKind::Col, AxisKind::Row];

    /// Key used in definition trees.
    pub fn key(&self) -> &'static str {
        match self {
            AxisKind::Fact => "fact",
            AxisKind::Col => "col",
            AxisKind::Row => "row",
        }
    }

    /// Display form used in query keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            AxisKind::Fact => "FACT",
            AxisKind::Col => "COL",
            AxisKind::Row => "ROW",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.key() == key)
    }
}

impl fmt::Display for AxisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared member of one axis kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Axis {
    pub kind: AxisKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl Axis {
    fn from_decl(kind: AxisKind, decl: &DefNode) -> Self {
        let text = |key: &str| decl.get(key).and_then(DefNode::as_text);
        let int = |key: &str| decl.get(key).and_then(DefNode::as_i64);
        Self {
            kind,
            name: text("name"),
            value: text("value"),
            pattern: text("match"),
            index: int("index"),
            order: int("order"),
        }
    }
}

/// Distinct axes per kind, in declaration order.
pub type AxisSets = BTreeMap<AxisKind, Vec<Axis>>;

/// One element of the cartesian product: exactly one axis per present kind,
/// ordered by kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    axes: Vec<Axis>,
}

impl Member {
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn axis(&self, kind: AxisKind) -> Option<&Axis> {
        self.axes.iter().find(|a| a.kind == kind)
    }
}

/// Member tuples of one DataDef.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Data {
    pub name: String,
    pub members: Vec<Member>,
}

impl Data {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AxisModelBuilder;

impl AxisModelBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Collects the distinct axes of each declared kind.
    ///
    /// A kind declared without members maps to an empty set.
    pub fn build_axis_sets(&self, data_def: &DataDef) -> DefsResult<AxisSets> {
        let axes = data_def
            .def()
            .get("axis")
            .and_then(DefNode::as_map)
            .ok_or_else(|| DefsError::definition_not_found("axis", data_def.name()))?;

        let mut sets = AxisSets::new();
        for (key, decl) in axes {
            let kind = AxisKind::from_key(key).ok_or_else(|| {
                DefsError::malformed(data_def.name(), format!("unknown axis kind '{key}'"))
            })?;
            let set = sets.entry(kind).or_default();
            let members = decl.get("members").and_then(DefNode::as_seq).unwrap_or(&[]);
            for member in members {
                let axis = Axis::from_decl(kind, member);
                if !set.contains(&axis) {
                    set.push(axis);
                }
            }
        }
        Ok(sets)
    }

    /// Cartesian product of the axis sets. Earlier kinds vary slowest.
    ///
    /// Empty when there are no kinds or any kind has no axes.
    pub fn build_data(&self, data_def: &DataDef, sets: &AxisSets) -> Data {
        let mut tuples: Vec<Vec<Axis>> = if sets.is_empty() {
            Vec::new()
        } else {
            vec![Vec::new()]
        };

        for axes in sets.values() {
            let mut next = Vec::with_capacity(tuples.len() * axes.len());
            for prefix in &tuples {
                for axis in axes {
                    let mut tuple = prefix.clone();
                    tuple.push(axis.clone());
                    next.push(tuple);
                }
            }
            tuples = next;
        }

        Data {
            name: data_def.name().to_string(),
            members: tuples.into_iter().map(|axes| Member { axes }).collect(),
        }
    }

    /// Builds the axis sets and their product in one call.
    pub fn data(&self, data_def: &DataDef) -> DefsResult<Data> {
        let sets = self.build_axis_sets(data_def)?;
        Ok(self.build_data(data_def, &sets))
    }

    /// Query string declared at `axis/<kind>/query/<query_type>`.
    pub fn get_query(
        &self,
        data_def: &DataDef,
        kind: AxisKind,
        query_type: &str,
    ) -> DefsResult<String> {
        let pointer = format!("/axis/{}/query/{}", kind.key(), query_type);
        data_def
            .def()
            .at(&pointer)
            .and_then(DefNode::as_text)
            .ok_or_else(|| DefsError::QueryNotFound {
                key: format!("{}:{}:{}", data_def.name(), kind, query_type),
            })
    }
}
