//! Axis Model Tests
//!
//! - Member tuples are the cartesian product across axis kinds
//! - Each tuple holds exactly one axis per declared kind
//! - Query lookups fail with a key naming the DataDef, kind and type
//! - A serialized body re-parses to the same axis model

use chrono::{TimeZone, Utc};
use scrapedef::datadef::{
    AxisKind, AxisModelBuilder, DataDef, DataDefCompiler, DataDefStore, MemoryDataDefStore,
};
use scrapedef::normalize::Normalizer;
use scrapedef::{DefNode, DefsError};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn compiled(defined: serde_json::Value) -> Vec<DataDef> {
    let high = Utc.with_ymd_and_hms(2037, 12, 31, 23, 59, 59).unwrap();
    let run = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
    let effective = Normalizer::new("jsoupDefault")
        .normalize(&DefNode::from(defined))
        .unwrap();
    DataDefCompiler::new(high).compile(&effective, run).unwrap()
}

fn acme() -> DataDef {
    compiled(json!({
        "dataDefs": {
            "acme": {
                "axis": {
                    "col": {
                        "query": { "selector": "tr:nth-child(1) td" },
                        "members": [ { "name": "date", "value": "Date" } ]
                    },
                    "row": {
                        "query": { "selector": "tr td:nth-child(1)" },
                        "members": [
                            { "name": "price", "match": "Price" },
                            { "name": "high", "value": "High" }
                        ]
                    }
                }
            }
        }
    }))
    .remove(0)
}

fn axis_name(member: &scrapedef::datadef::Member, kind: AxisKind) -> String {
    member.axis(kind).and_then(|a| a.name.clone()).unwrap()
}

// =============================================================================
// Product Tests
// =============================================================================

/// 2 rows x 1 col (x implicit fact) gives 2 tuples.
#[test]
fn test_two_rows_one_col_gives_two_members() {
    let data = AxisModelBuilder::new().data(&acme()).unwrap();
    assert_eq!(data.name, "acme");
    assert_eq!(data.len(), 2);

    let pairs: Vec<_> = data
        .members
        .iter()
        .map(|m| (axis_name(m, AxisKind::Row), axis_name(m, AxisKind::Col)))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("price".to_string(), "date".to_string()),
            ("high".to_string(), "date".to_string())
        ]
    );

    for member in &data.members {
        assert_eq!(member.axes().len(), 3);
        assert_eq!(axis_name(member, AxisKind::Fact), "fact");
    }
}

#[test]
fn test_product_size_is_product_of_set_sizes() {
    let def = compiled(json!({
        "dataDefs": {
            "grid": {
                "axis": {
                    "fact": { "members": [ { "name": "open", "value": "Open" }, { "name": "close", "value": "Close" } ] },
                    "col": { "members": [ { "name": "y1", "value": "2022" }, { "name": "y2", "value": "2023" }, { "name": "y3", "value": "2024" } ] },
                    "row": { "members": [ { "name": "r1", "value": "R1" }, { "name": "r2", "value": "R2" } ] }
                }
            }
        }
    }))
    .remove(0);

    let builder = AxisModelBuilder::new();
    let sets = builder.build_axis_sets(&def).unwrap();
    assert_eq!(sets[&AxisKind::Fact].len(), 2);
    assert_eq!(sets[&AxisKind::Col].len(), 3);
    assert_eq!(sets[&AxisKind::Row].len(), 2);

    let data = builder.build_data(&def, &sets);
    assert_eq!(data.len(), 12);

    // no duplicate tuples
    let mut seen = std::collections::HashSet::new();
    for member in &data.members {
        assert!(seen.insert(member.clone()));
    }
}

#[test]
fn test_normalized_members_carry_index_and_order() {
    let sets = AxisModelBuilder::new().build_axis_sets(&acme()).unwrap();
    let rows = &sets[&AxisKind::Row];
    assert_eq!(rows[0].index, Some(0));
    assert_eq!(rows[1].index, Some(1));
    assert_eq!(rows[1].order, Some(1));
    assert_eq!(rows[0].pattern.as_deref(), Some("Price"));
}

// =============================================================================
// Query Tests
// =============================================================================

#[test]
fn test_query_lookup() {
    let builder = AxisModelBuilder::new();
    assert_eq!(
        builder.get_query(&acme(), AxisKind::Col, "selector").unwrap(),
        "tr:nth-child(1) td"
    );
}

#[test]
fn test_missing_query_type_names_key() {
    let err = AxisModelBuilder::new()
        .get_query(&acme(), AxisKind::Row, "script")
        .unwrap_err();
    match err {
        DefsError::QueryNotFound { key } => assert_eq!(key, "acme:ROW:script"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_fact_axis_without_query() {
    let err = AxisModelBuilder::new()
        .get_query(&acme(), AxisKind::Fact, "selector")
        .unwrap_err();
    assert_eq!(err.code(), "DEFS_QUERY_NOT_FOUND");
    assert!(err.to_string().contains("acme:FACT:selector"));
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_reparsed_body_builds_same_data() {
    let def = acme();
    let reparsed =
        DataDef::from_json(def.name(), def.from_date(), def.to_date(), def.def_json()).unwrap();

    let builder = AxisModelBuilder::new();
    assert_eq!(
        builder.build_axis_sets(&reparsed).unwrap(),
        builder.build_axis_sets(&def).unwrap()
    );
    assert_eq!(builder.data(&reparsed).unwrap(), builder.data(&def).unwrap());
}

#[test]
fn test_stored_def_builds_same_data() {
    let def = acme();
    let store = MemoryDataDefStore::new(def.to_date());
    store.store_or_update(&def).unwrap();

    let json = serde_json::to_string(&store.find_open_by_name("acme").unwrap().unwrap()).unwrap();
    let reloaded: DataDef = serde_json::from_str(&json).unwrap();

    let builder = AxisModelBuilder::new();
    let data = builder.data(&reloaded).unwrap();
    assert_eq!(data, builder.data(&def).unwrap());
    assert_eq!(data.len(), 2);
}
