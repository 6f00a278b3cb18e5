//! Field-by-field comparison of two JSON object snapshots.
//!
//! Edit sessions serialize their baseline and draft and compare them here;
//! the changed fields become the save payload.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The status of a field in a diff comparison.
///
/// - `Added`     -- present only in the draft.
/// - `Removed`   -- present only in the baseline.
/// - `Changed`   -- present in both with different values.
/// - `Unchanged` -- present in both with identical values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    Added,
    Removed,
    Changed,
    Unchanged,
}

impl DiffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Changed => "changed",
            Self::Unchanged => "unchanged",
        }
    }
}

impl std::fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One compared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDiff {
    pub field: String,
    pub status: DiffStatus,
}

/// Compare every key present on either side, in key order.
pub fn diff_fields(baseline: &Map<String, Value>, draft: &Map<String, Value>) -> Vec<FieldDiff> {
    let keys: BTreeSet<&String> = baseline.keys().chain(draft.keys()).collect();

    keys.into_iter()
        .map(|key| {
            let status = match (baseline.get(key), draft.get(key)) {
                (None, Some(_)) => DiffStatus::Added,
                (Some(_), None) => DiffStatus::Removed,
                (Some(old), Some(new)) if old == new => DiffStatus::Unchanged,
                _ => DiffStatus::Changed,
            };
            FieldDiff {
                field: key.clone(),
                status,
            }
        })
        .collect()
}

/// Collect the draft's value for every field that differs from the
/// baseline. Removed fields are reported as `null`.
pub fn changed_fields(baseline: &Map<String, Value>, draft: &Map<String, Value>) -> Map<String, Value> {
    diff_fields(baseline, draft)
        .into_iter()
        .filter(|d| d.status != DiffStatus::Unchanged)
        .map(|d| {
            let value = draft.get(&d.field).cloned().unwrap_or(Value::Null);
            (d.field, value)
        })
        .collect()
}
