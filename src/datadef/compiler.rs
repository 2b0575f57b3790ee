//! DataDefCompiler - extracts versioned DataDefs from an effective tree

use chrono::{DateTime, SubsecRound, Utc};
use tracing::debug;

use super::model::DataDef;
use crate::errors::{DefsError, DefsResult};
use crate::tree::DefNode;

#[derive(Debug, Clone)]
pub struct DataDefCompiler {
    high_date: DateTime<Utc>,
}

impl DataDefCompiler {
    pub fn new(high_date: DateTime<Utc>) -> Self {
        Self { high_date }
    }

    pub fn high_date(&self) -> DateTime<Utc> {
        self.high_date
    }

    /// One DataDef per entry of `dataDefs`, in declaration order, each
    /// valid from `run_timestamp` (truncated to the second) until the high date.
    pub fn compile(&self, effective: &DefNode, run_timestamp: DateTime<Utc>) -> DefsResult<Vec<DataDef>> {
        let run_timestamp = run_timestamp.trunc_subsecs(0);
        if run_timestamp >= self.high_date {
            return Err(DefsError::InvalidValidity {
                name: "<run>".to_string(),
                reason: format!(
                    "run timestamp {} is not before high date {}",
                    run_timestamp, self.high_date
                ),
            });
        }

        let Some(entries) = effective.get("dataDefs").and_then(DefNode::as_map) else {
            return Ok(Vec::new());
        };

        let mut data_defs = Vec::with_capacity(entries.len());
        for (name, body) in entries {
            let data_def = DataDef::new(name.clone(), run_timestamp, self.high_date, body.clone())?;
            debug!(name = %name, from = %run_timestamp, "data def compiled");
            data_defs.push(data_def);
        }
        Ok(data_defs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn high() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2037, 12, 31, 23, 59, 59).unwrap()
    }

    fn run() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_one_def_per_entry_in_order() {
        let effective = DefNode::from_yaml_str(
            "dataDefs:\n  zeta: { axis: { fact: { members: [] } } }\n  alpha: { axis: { fact: { members: [] } } }\n",
        )
        .unwrap();
        let defs = DataDefCompiler::new(high()).compile(&effective, run()).unwrap();

        let names: Vec<_> = defs.iter().map(DataDef::name).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        for def in &defs {
            assert_eq!(def.from_date(), run());
            assert!(def.is_open(high()));
        }
        assert_eq!(defs[0].def_json(), r#"{"axis":{"fact":{"members":[]}}}"#);
    }

    #[test]
    fn test_no_data_defs_compiles_to_nothing() {
        let effective = DefNode::from(json!({ "steps": {} }));
        assert!(DataDefCompiler::new(high()).compile(&effective, run()).unwrap().is_empty());
    }

    #[test]
    fn test_run_timestamp_truncated_to_second() {
        let effective = DefNode::from(json!({ "dataDefs": { "price": { "v": 1 } } }));
        let defs = DataDefCompiler::new(high())
            .compile(&effective, run() + chrono::Duration::milliseconds(750))
            .unwrap();
        assert_eq!(defs[0].from_date(), run());
    }

    #[test]
    fn test_run_at_high_date_rejected() {
        let effective = DefNode::from(json!({ "dataDefs": {} }));
        let err = DataDefCompiler::new(high()).compile(&effective, high()).unwrap_err();
        assert_eq!(err.code(), "DEFS_INVALID_VALIDITY");
    }
}
