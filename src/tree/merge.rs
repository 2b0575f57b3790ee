//! Deep merge of definition trees
//!
//! Mappings merge recursively key by key. For a key present on both sides,
//! two mappings merge; any other combination takes the later value wholesale.
//! Sequences and scalars are never merged element-wise.

use super::node::DefNode;

/// Merges `overlay` onto `base`, the overlay winning on conflicts.
///
/// Keys already present in `base` keep their position; new keys are appended
/// in overlay order.
pub fn merge(base: DefNode, overlay: DefNode) -> DefNode {
    match (base, overlay) {
        (DefNode::Map(mut base), DefNode::Map(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => {
                        let previous = std::mem::take(existing);
                        *existing = merge(previous, value);
                    }
                    None => {
                        base.insert(key, value);
                    }
                }
            }
            DefNode::Map(base)
        }
        (_, overlay) => overlay,
    }
}

/// Merges a list of trees left to right. Returns `None` for an empty list.
pub fn merge_all<I>(nodes: I) -> Option<DefNode>
where
    I: IntoIterator<Item = DefNode>,
{
    nodes.into_iter().reduce(merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(value: serde_json::Value) -> DefNode {
        DefNode::from(value)
    }

    #[test]
    fn test_mappings_merge_recursively() {
        let merged = merge(
            node(json!({ "dataDefs": { "price": { "query": "a" } } })),
            node(json!({ "dataDefs": { "bs": { "query": "b" } } })),
        );
        assert_eq!(
            merged,
            node(json!({ "dataDefs": { "price": { "query": "a" }, "bs": { "query": "b" } } }))
        );
    }

    #[test]
    fn test_sequences_replaced_wholesale() {
        let merged = merge(
            node(json!({ "steps": { "g": [1, 2, 3] } })),
            node(json!({ "steps": { "g": [9] } })),
        );
        assert_eq!(merged, node(json!({ "steps": { "g": [9] } })));
    }

    #[test]
    fn test_scalar_replaces_mapping_and_vice_versa() {
        let merged = merge(node(json!({ "a": { "x": 1 } })), node(json!({ "a": "flat" })));
        assert_eq!(merged, node(json!({ "a": "flat" })));

        let merged = merge(node(json!({ "a": "flat" })), node(json!({ "a": { "x": 1 } })));
        assert_eq!(merged, node(json!({ "a": { "x": 1 } })));
    }

    #[test]
    fn test_existing_keys_keep_position() {
        let merged = merge(
            node(json!({ "first": 1, "second": 2 })),
            node(json!({ "third": 3, "first": 10 })),
        );
        let keys: Vec<_> = merged.as_map().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["first", "second", "third"]);
        assert_eq!(merged.get("first"), Some(&DefNode::int(10)));
    }

    #[test]
    fn test_merge_all_empty_is_none() {
        assert!(merge_all(Vec::new()).is_none());
    }
}
