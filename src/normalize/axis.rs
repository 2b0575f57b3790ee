//! Axis normalization passes
//!
//! - add_fact_dim: every definition gets a `fact` axis
//! - add_item_index: members without `index` get their zero-based position
//! - add_item_order: members without `order` get their index

use crate::datadef::AxisKind;
use crate::tree::{DefMap, DefNode};

/// Name and value of the member injected into an implicit fact axis.
pub const FACT_MEMBER: &str = "fact";

/// Calls `f` with each definition body under `dataDefs`.
fn for_each_data_def(defs: &mut DefNode, mut f: impl FnMut(&mut DefMap)) {
    let Some(data_defs) = defs.get_mut("dataDefs").and_then(DefNode::as_map_mut) else {
        return;
    };
    for body in data_defs.values_mut() {
        if let Some(body) = body.as_map_mut() {
            f(body);
        }
    }
}

/// Calls `f` with the position and mapping of every member declaration,
/// scoped per axis kind per definition.
fn for_each_member(defs: &mut DefNode, mut f: impl FnMut(usize, &mut DefMap)) {
    for_each_data_def(defs, |body| {
        let Some(axes) = body.get_mut("axis").and_then(DefNode::as_map_mut) else {
            return;
        };
        for axis in axes.values_mut() {
            let Some(members) = axis.get_mut("members").and_then(DefNode::as_seq_mut) else {
                continue;
            };
            for (position, member) in members.iter_mut().enumerate() {
                if let Some(member) = member.as_map_mut() {
                    f(position, member);
                }
            }
        }
    });
}

fn fact_axis() -> DefNode {
    let mut member = DefMap::new();
    member.insert("name".into(), DefNode::string(FACT_MEMBER));
    member.insert("value".into(), DefNode::string(FACT_MEMBER));

    let mut axis = DefMap::new();
    axis.insert("members".into(), DefNode::Seq(vec![DefNode::Map(member)]));
    DefNode::Map(axis)
}

pub(crate) fn add_fact_dim(defs: &mut DefNode) {
    let fact = AxisKind::Fact.key();
    for_each_data_def(defs, |body| {
        let axes = body.entry("axis".to_string()).or_insert_with(DefNode::map);
        if let Some(axes) = axes.as_map_mut() {
            if !axes.contains_key(fact) {
                axes.insert(fact.to_string(), fact_axis());
            }
        }
    });
}

pub(crate) fn add_item_index(defs: &mut DefNode) {
    for_each_member(defs, |position, member| {
        if !member.contains_key("index") {
            member.insert("index".into(), DefNode::int(position as i64));
        }
    });
}

pub(crate) fn add_item_order(defs: &mut DefNode) {
    for_each_member(defs, |position, member| {
        if !member.contains_key("order") {
            let order = member
                .get("index")
                .and_then(DefNode::as_i64)
                .unwrap_or(position as i64);
            member.insert("order".into(), DefNode::int(order));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defs() -> DefNode {
        DefNode::from(json!({
            "dataDefs": {
                "price": {
                    "axis": {
                        "row": { "members": [
                            { "name": "price", "match": "Price" },
                            { "name": "high", "value": "High", "index": 7 },
                            { "name": "low", "value": "Low", "order": 1 }
                        ] },
                        "col": { "members": [ { "name": "date", "value": "Date" } ] }
                    }
                },
                "withFact": {
                    "axis": { "fact": { "members": [ { "name": "value", "value": "v" } ] } }
                }
            }
        }))
    }

    #[test]
    fn test_fact_dim_added_only_when_missing() {
        let mut tree = defs();
        add_fact_dim(&mut tree);

        assert_eq!(
            tree.at("/dataDefs/price/axis/fact/members/0/name"),
            Some(&DefNode::string("fact"))
        );
        assert_eq!(
            tree.at("/dataDefs/withFact/axis/fact/members/0/name"),
            Some(&DefNode::string("value"))
        );
    }

    #[test]
    fn test_index_is_positional_and_scoped_per_axis() {
        let mut tree = defs();
        add_item_index(&mut tree);

        assert_eq!(tree.at("/dataDefs/price/axis/row/members/0/index"), Some(&DefNode::int(0)));
        assert_eq!(tree.at("/dataDefs/price/axis/row/members/1/index"), Some(&DefNode::int(7)));
        assert_eq!(tree.at("/dataDefs/price/axis/row/members/2/index"), Some(&DefNode::int(2)));
        assert_eq!(tree.at("/dataDefs/price/axis/col/members/0/index"), Some(&DefNode::int(0)));
    }

    #[test]
    fn test_order_defaults_to_index() {
        let mut tree = defs();
        add_item_index(&mut tree);
        add_item_order(&mut tree);

        assert_eq!(tree.at("/dataDefs/price/axis/row/members/0/order"), Some(&DefNode::int(0)));
        assert_eq!(tree.at("/dataDefs/price/axis/row/members/1/order"), Some(&DefNode::int(7)));
        assert_eq!(tree.at("/dataDefs/price/axis/row/members/2/order"), Some(&DefNode::int(1)));
    }

    #[test]
    fn test_axis_passes_tolerate_missing_sections() {
        let mut tree = DefNode::from(json!({ "steps": {} }));
        let before = tree.clone();
        add_fact_dim(&mut tree);
        add_item_index(&mut tree);
        add_item_order(&mut tree);
        assert_eq!(tree, before);
    }
}
