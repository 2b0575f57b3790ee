//! VersionReconciler - merges newly compiled DataDefs into stored history
//!
//! For each new DataDef, against the open version of the same name:
//! - none open: the new one is inserted
//! - same definition: nothing changes, the new one is discarded
//! - different definition: the open one is closed one time unit before the
//!   new one starts, then the new one is inserted
//!
//! Reconciliation is pure. Persisting the result is the caller's job; see
//! [`Reconciliation::writes`].

use chrono::{DateTime, Duration, Timelike, Utc};
use tracing::debug;

use super::model::DataDef;
use crate::errors::{DefsError, DefsResult};

/// What happened to one new DataDef.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Inserted,
    Unchanged,
    /// The previous open version was closed at the given instant.
    Superseded { closed_at: DateTime<Utc> },
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Inserted => "inserted",
            Outcome::Unchanged => "unchanged",
            Outcome::Superseded { .. } => "superseded",
        }
    }

    pub fn is_change(&self) -> bool {
        !matches!(self, Outcome::Unchanged)
    }
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Full reconciled collection.
    pub defs: Vec<DataDef>,
    pub changed: bool,
    pub outcomes: Vec<(String, Outcome)>,
    touched: Vec<usize>,
}

impl Reconciliation {
    /// Entries that were inserted or closed, in the order they changed.
    pub fn writes(&self) -> impl Iterator<Item = &DataDef> + '_ {
        self.touched.iter().filter_map(|&i| self.defs.get(i))
    }
}

#[derive(Debug, Clone)]
pub struct VersionReconciler {
    high_date: DateTime<Utc>,
    time_unit: Duration,
}

impl VersionReconciler {
    pub fn new(high_date: DateTime<Utc>) -> Self {
        Self {
            high_date,
            time_unit: Duration::seconds(1),
        }
    }

    pub fn high_date(&self) -> DateTime<Utc> {
        self.high_date
    }

    pub fn reconcile(&self, new_defs: &[DataDef], existing: Vec<DataDef>) -> DefsResult<Reconciliation> {
        let mut defs = existing;
        let mut touched = Vec::new();
        let mut outcomes = Vec::with_capacity(new_defs.len());

        for new_def in new_defs {
            if !new_def.is_open(self.high_date) {
                return Err(DefsError::InvalidValidity {
                    name: new_def.name().to_string(),
                    reason: format!("new version ends at {} instead of the high date", new_def.to_date()),
                });
            }
            if new_def.from_date().nanosecond() != 0 {
                return Err(DefsError::InvalidValidity {
                    name: new_def.name().to_string(),
                    reason: format!("new version starts at {}, inside a second", new_def.from_date()),
                });
            }

            let open = defs
                .iter()
                .position(|d| d.name() == new_def.name() && d.is_open(self.high_date));

            let outcome = match open {
                None => Outcome::Inserted,
                Some(i) if defs[i].same_definition(new_def) => Outcome::Unchanged,
                Some(i) => {
                    let closed_at = new_def.from_date() - self.time_unit;
                    if closed_at < defs[i].from_date() {
                        return Err(DefsError::InvalidValidity {
                            name: new_def.name().to_string(),
                            reason: format!(
                                "new version from {} does not follow open version from {}",
                                new_def.from_date(),
                                defs[i].from_date()
                            ),
                        });
                    }
                    defs[i].close(closed_at);
                    if !touched.contains(&i) {
                        touched.push(i);
                    }
                    Outcome::Superseded { closed_at }
                }
            };

            if outcome.is_change() {
                touched.push(defs.len());
                defs.push(new_def.clone());
            }
            debug!(name = new_def.name(), outcome = outcome.as_str(), "data def reconciled");
            outcomes.push((new_def.name().to_string(), outcome));
        }

        Ok(Reconciliation {
            changed: !touched.is_empty(),
            defs,
            outcomes,
            touched,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn high() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2037, 12, 31, 23, 59, 59).unwrap()
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn def(name: &str, from: DateTime<Utc>, json: &str) -> DataDef {
        DataDef::from_json(name, from, high(), json).unwrap()
    }

    #[test]
    fn test_insert_into_empty() {
        let rec = VersionReconciler::new(high())
            .reconcile(&[def("acme", at(1), r#"{"x":1}"#)], Vec::new())
            .unwrap();
        assert!(rec.changed);
        assert_eq!(rec.defs.len(), 1);
        assert_eq!(rec.outcomes[0].1, Outcome::Inserted);
        assert_eq!(rec.writes().count(), 1);
    }

    #[test]
    fn test_same_definition_is_unchanged() {
        let existing = vec![def("acme", at(1), r#"{"x":1,"y":2}"#)];
        let rec = VersionReconciler::new(high())
            .reconcile(&[def("acme", at(5), r#"{"y":2,"x":1}"#)], existing.clone())
            .unwrap();
        assert!(!rec.changed);
        assert_eq!(rec.defs, existing);
        assert_eq!(rec.writes().count(), 0);
    }

    #[test]
    fn test_changed_definition_closes_previous() {
        let existing = vec![def("acme", at(1), r#"{"x":1}"#)];
        let rec = VersionReconciler::new(high())
            .reconcile(&[def("acme", at(5), r#"{"x":2}"#)], existing)
            .unwrap();

        assert!(rec.changed);
        assert_eq!(rec.defs.len(), 2);
        let closed_at = at(5) - Duration::seconds(1);
        assert_eq!(rec.defs[0].to_date(), closed_at);
        assert!(rec.defs[1].is_open(high()));
        assert_eq!(rec.outcomes[0].1, Outcome::Superseded { closed_at });

        let open = rec.defs.iter().filter(|d| d.is_open(high())).count();
        assert_eq!(open, 1);

        let writes: Vec<_> = rec.writes().map(|d| d.from_date()).collect();
        assert_eq!(writes, vec![at(1), at(5)]);
    }

    #[test]
    fn test_closed_versions_are_left_alone() {
        let closed = DataDef::from_json("acme", at(1), at(2), r#"{"x":0}"#).unwrap();
        let rec = VersionReconciler::new(high())
            .reconcile(&[def("acme", at(5), r#"{"x":0}"#)], vec![closed.clone()])
            .unwrap();
        assert_eq!(rec.outcomes[0].1, Outcome::Inserted);
        assert_eq!(rec.defs[0], closed);
    }

    #[test]
    fn test_other_names_untouched() {
        let existing = vec![def("goog", at(1), r#"{"x":1}"#)];
        let rec = VersionReconciler::new(high())
            .reconcile(&[def("acme", at(5), r#"{"x":2}"#)], existing.clone())
            .unwrap();
        assert_eq!(rec.defs[0], existing[0]);
        assert_eq!(rec.defs.len(), 2);
    }

    #[test]
    fn test_same_instant_supersede_rejected() {
        let existing = vec![def("acme", at(5), r#"{"x":1}"#)];
        let err = VersionReconciler::new(high())
            .reconcile(&[def("acme", at(5), r#"{"x":2}"#)], existing)
            .unwrap_err();
        assert_eq!(err.code(), "DEFS_INVALID_VALIDITY");
    }

    #[test]
    fn test_one_second_after_is_accepted() {
        let existing = vec![def("acme", at(5), r#"{"x":1}"#)];
        let next = at(5) + Duration::seconds(1);
        let rec = VersionReconciler::new(high())
            .reconcile(&[def("acme", next, r#"{"x":2}"#)], existing)
            .unwrap();
        assert_eq!(rec.defs[0].to_date(), at(5));
        assert_eq!(rec.defs[0].from_date(), at(5));
    }

    #[test]
    fn test_sub_second_start_rejected() {
        let existing = vec![def("acme", at(1), r#"{"x":1}"#)];
        let err = VersionReconciler::new(high())
            .reconcile(
                &[def("acme", at(2) + Duration::milliseconds(750), r#"{"x":2}"#)],
                existing.clone(),
            )
            .unwrap_err();
        assert_eq!(err.code(), "DEFS_INVALID_VALIDITY");
        assert!(existing[0].is_open(high()));
    }
}
