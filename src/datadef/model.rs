//! DataDef - one named, time-versioned compiled definition
//!
//! A DataDef is valid over `[from_date, to_date]` at one-second granularity.
//! The version whose `to_date` equals the configured high date is the
//! currently active one. The body is kept both serialized (the persisted
//! form) and parsed (used for comparison and axis modeling).

use std::collections::HashMap;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{DefsError, DefsResult};
use crate::tree::DefNode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DataDefRecord", into = "DataDefRecord")]
pub struct DataDef {
    name: String,
    from_date: DateTime<Utc>,
    to_date: DateTime<Utc>,
    def_json: String,
    def: DefNode,
}

/// Persisted form: the parsed body is rebuilt from `def_json` on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DataDefRecord {
    name: String,
    from_date: DateTime<Utc>,
    to_date: DateTime<Utc>,
    def_json: String,
}

impl TryFrom<DataDefRecord> for DataDef {
    type Error = DefsError;

    fn try_from(record: DataDefRecord) -> Result<Self, Self::Error> {
        DataDef::from_json(record.name, record.from_date, record.to_date, record.def_json)
    }
}

impl From<DataDef> for DataDefRecord {
    fn from(def: DataDef) -> Self {
        Self {
            name: def.name,
            from_date: def.from_date,
            to_date: def.to_date,
            def_json: def.def_json,
        }
    }
}

impl DataDef {
    /// Creates a DataDef from a parsed body, serializing it.
    pub fn new(
        name: impl Into<String>,
        from_date: DateTime<Utc>,
        to_date: DateTime<Utc>,
        def: DefNode,
    ) -> DefsResult<Self> {
        let name = name.into();
        let def_json = def
            .to_json_string()
            .map_err(|e| DefsError::malformed(&name, e))?;
        Ok(Self {
            name,
            from_date,
            to_date,
            def_json,
            def,
        })
    }

    /// Creates a DataDef from a serialized body, parsing it.
    pub fn from_json(
        name: impl Into<String>,
        from_date: DateTime<Utc>,
        to_date: DateTime<Utc>,
        def_json: impl Into<String>,
    ) -> DefsResult<Self> {
        let name = name.into();
        let def_json = def_json.into();
        let def = DefNode::from_json_str(&def_json).map_err(|e| DefsError::malformed(&name, e))?;
        Ok(Self {
            name,
            from_date,
            to_date,
            def_json,
            def,
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn from_date(&self) -> DateTime<Utc> {
        self.from_date
    }

    #[inline]
    pub fn to_date(&self) -> DateTime<Utc> {
        self.to_date
    }

    /// Serialized body.
    #[inline]
    pub fn def_json(&self) -> &str {
        &self.def_json
    }

    /// Parsed body.
    #[inline]
    pub fn def(&self) -> &DefNode {
        &self.def
    }

    /// True if this version is open-ended.
    pub fn is_open(&self, high_date: DateTime<Utc>) -> bool {
        self.to_date == high_date
    }

    /// True if `instant` falls inside this version's validity. The last
    /// second of the range is covered in full.
    pub fn covers(&self, instant: DateTime<Utc>) -> bool {
        self.from_date <= instant && instant.trunc_subsecs(0) <= self.to_date
    }

    /// Structural equality of the parsed bodies, ignoring serialized form.
    pub fn same_definition(&self, other: &DataDef) -> bool {
        self.def == other.def
    }

    /// True if both denote the same stored version (name and validity).
    pub fn same_version(&self, other: &DataDef) -> bool {
        self.name == other.name
            && self.from_date == other.from_date
            && self.to_date == other.to_date
    }

    pub(crate) fn close(&mut self, to_date: DateTime<Utc>) {
        self.to_date = to_date;
    }
}

/// Indexes DataDefs by name. Later entries win for duplicate names.
pub fn to_map(data_defs: &[DataDef]) -> HashMap<&str, &DataDef> {
    data_defs.iter().map(|d| (d.name(), d)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_new_serializes_body() {
        let body = DefNode::from_json_str(r#"{"b":1,"a":2}"#).unwrap();
        let def = DataDef::new("acme", at(1), at(31), body).unwrap();
        assert_eq!(def.def_json(), r#"{"b":1,"a":2}"#);
        assert!(def.is_open(at(31)));
        assert!(!def.is_open(at(30)));
    }

    #[test]
    fn test_same_definition_ignores_field_order() {
        let a = DataDef::from_json("acme", at(1), at(31), r#"{"x":1,"y":2}"#).unwrap();
        let b = DataDef::from_json("acme", at(2), at(31), r#"{"y":2,"x":1}"#).unwrap();
        assert!(a.same_definition(&b));
        assert!(!a.same_version(&b));
    }

    #[test]
    fn test_covers_is_inclusive() {
        let def = DataDef::from_json("acme", at(1), at(10), "{}").unwrap();
        assert!(def.covers(at(1)));
        assert!(def.covers(at(10)));
        assert!(!def.covers(at(11)));
        assert!(def.covers(at(10) + chrono::Duration::milliseconds(999)));
        assert!(!def.covers(at(1) - chrono::Duration::milliseconds(1)));
    }

    #[test]
    fn test_serde_rebuilds_parsed_body() {
        let def = DataDef::new("acme", at(1), at(31), DefNode::from(json!({ "axis": {} }))).unwrap();
        let text = serde_json::to_string(&def).unwrap();
        assert!(text.contains("def_json"));

        let back: DataDef = serde_json::from_str(&text).unwrap();
        assert_eq!(back, def);
        assert!(back.def().get("axis").is_some());
    }

    #[test]
    fn test_corrupt_body_rejected() {
        let err = DataDef::from_json("acme", at(1), at(31), "{oops").unwrap_err();
        assert_eq!(err.code(), "DEFS_MALFORMED_SOURCE");
    }

    #[test]
    fn test_to_map() {
        let defs = vec![
            DataDef::from_json("acme", at(1), at(31), "{}").unwrap(),
            DataDef::from_json("goog", at(1), at(31), "{}").unwrap(),
        ];
        let map = to_map(&defs);
        assert_eq!(map.len(), 2);
        assert_eq!(map["goog"].name(), "goog");
    }
}
