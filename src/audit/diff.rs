//! Structural diff between two configuration snapshots.
//!
//! Only top-level keys are reported. A key is in the diff if and only if its
//! presence differs between the snapshots or its values are not deep-equal;
//! nested changes surface as an update of the enclosing top-level key.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigSnapshot, ConfigValue, Scalar};

/// Classification of a single changed key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Add,
    Delete,
    Update,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Add => "ADD",
            ChangeKind::Delete => "DELETE",
            ChangeKind::Update => "UPDATE",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One top-level key whose value differs between two snapshots.
///
/// `old: None` means the key did not exist before; `new: None` means it was
/// removed. Both are never `None` at once.
#[derive(Debug, Clone, Copy)]
pub struct DiffEntry<'a> {
    pub key: &'a str,
    pub old: Option<&'a ConfigValue>,
    pub new: Option<&'a ConfigValue>,
}

impl DiffEntry<'_> {
    /// Derived from presence only, never from the (possibly redacted)
    /// rendering.
    pub fn change_kind(&self) -> ChangeKind {
        match (self.old, self.new) {
            (None, _) => ChangeKind::Add,
            (_, None) => ChangeKind::Delete,
            _ => ChangeKind::Update,
        }
    }
}

/// Changed keys mapped to their entry. Each key appears at most once.
pub type ConfigDiff<'a> = BTreeMap<&'a str, DiffEntry<'a>>;

/// Compute the set of top-level keys that were added, removed or updated
/// going from `old` to `new`.
pub fn compute_diff<'a>(old: &'a ConfigSnapshot, new: &'a ConfigSnapshot) -> ConfigDiff<'a> {
    let mut diff = ConfigDiff::new();

    for (key, new_value) in new {
        let old_value = old.entry(key);
        let unchanged = old_value.is_some_and(|old_value| deep_equal(old_value, new_value));
        if !unchanged {
            diff.insert(
                key.as_str(),
                DiffEntry {
                    key: key.as_str(),
                    old: old_value,
                    new: Some(new_value),
                },
            );
        }
    }

    for (key, old_value) in old {
        if !new.contains_key(key) {
            diff.insert(
                key.as_str(),
                DiffEntry {
                    key: key.as_str(),
                    old: Some(old_value),
                    new: None,
                },
            );
        }
    }

    diff
}

/// Recursive structural equality. Shape mismatches are decisive; scalars
/// compare without cross-type coercion.
pub(crate) fn deep_equal(a: &ConfigValue, b: &ConfigValue) -> bool {
    match (a, b) {
        (ConfigValue::Mapping(left), ConfigValue::Mapping(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .all(|(key, l)| right.get(key).is_some_and(|r| deep_equal(l, r)))
                && right.keys().all(|key| left.contains_key(key))
        }
        (ConfigValue::Sequence(left), ConfigValue::Sequence(right)) => {
            left.len() == right.len() && left.iter().zip(right).all(|(l, r)| deep_equal(l, r))
        }
        (ConfigValue::Scalar(left), ConfigValue::Scalar(right)) => scalar_equal(left, right),
        _ => false,
    }
}

/// Integers compare by mathematical value whatever width they were parsed
/// from. Integers never equal floats.
fn scalar_equal(a: &Scalar, b: &Scalar) -> bool {
    match (a, b) {
        (Scalar::Null, Scalar::Null) => true,
        (Scalar::Bool(x), Scalar::Bool(y)) => x == y,
        (Scalar::Int(x), Scalar::Int(y)) => x == y,
        (Scalar::UInt(x), Scalar::UInt(y)) => x == y,
        (Scalar::Int(i), Scalar::UInt(u)) | (Scalar::UInt(u), Scalar::Int(i)) => {
            u64::try_from(*i).is_ok_and(|i| i == *u)
        }
        (Scalar::Float(x), Scalar::Float(y)) => x == y,
        (Scalar::String(x), Scalar::String(y)) => x == y,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(value: serde_json::Value) -> ConfigSnapshot {
        ConfigSnapshot::try_from(ConfigValue::from(value)).unwrap()
    }

    #[test]
    fn test_update_of_single_key() {
        let old = snapshot(json!({"a": 1, "b": 2}));
        let new = snapshot(json!({"a": 1, "b": 3}));
        let diff = compute_diff(&old, &new);

        assert_eq!(diff.len(), 1);
        let entry = diff["b"];
        assert_eq!(entry.old.unwrap().to_string(), "2");
        assert_eq!(entry.new.unwrap().to_string(), "3");
        assert_eq!(entry.change_kind(), ChangeKind::Update);
    }

    #[test]
    fn test_added_key() {
        let old = snapshot(json!({"a": 1}));
        let new = snapshot(json!({"a": 1, "c": "x"}));
        let diff = compute_diff(&old, &new);

        assert_eq!(diff.len(), 1);
        assert!(diff["c"].old.is_none());
        assert_eq!(diff["c"].new.unwrap().as_str(), Some("x"));
        assert_eq!(diff["c"].change_kind(), ChangeKind::Add);
    }

    #[test]
    fn test_removed_key() {
        let old = snapshot(json!({"a": 1, "password": "p1"}));
        let new = snapshot(json!({"a": 1}));
        let diff = compute_diff(&old, &new);

        assert_eq!(diff.len(), 1);
        assert_eq!(diff["password"].old.unwrap().as_str(), Some("p1"));
        assert!(diff["password"].new.is_none());
        assert_eq!(diff["password"].change_kind(), ChangeKind::Delete);
    }

    #[test]
    fn test_mapping_order_is_irrelevant() {
        let old = snapshot(json!({"nested": {"x": 1, "y": 2}}));
        let new: ConfigSnapshot =
            serde_yaml::from_str("nested:\n  y: 2\n  x: 1\n").unwrap();
        assert!(compute_diff(&old, &new).is_empty());
    }

    #[test]
    fn test_sequence_order_is_significant() {
        let old = snapshot(json!({"list": [1, 2, 3]}));
        let new = snapshot(json!({"list": [1, 3, 2]}));
        let diff = compute_diff(&old, &new);

        assert_eq!(diff.len(), 1);
        assert_eq!(diff["list"].old.unwrap().to_string(), "[1,2,3]");
        assert_eq!(diff["list"].new.unwrap().to_string(), "[1,3,2]");
        assert_eq!(diff["list"].change_kind(), ChangeKind::Update);
    }

    #[test]
    fn test_identical_and_equal_copies_produce_no_diff() {
        let snap = snapshot(json!({
            "server": {"port": 8080, "hosts": ["a", "b"]},
            "debug": false,
            "ratio": 0.5,
            "none": null,
        }));
        assert!(compute_diff(&snap, &snap).is_empty());

        let copy = snap.clone();
        assert!(compute_diff(&snap, &copy).is_empty());

        let empty = ConfigSnapshot::new();
        assert!(compute_diff(&empty, &empty).is_empty());
    }

    #[test]
    fn test_nested_change_reports_top_level_key() {
        let old = snapshot(json!({"db": {"host": "a", "port": 1}, "x": 1}));
        let new = snapshot(json!({"db": {"host": "b", "port": 1}, "x": 1}));
        let diff = compute_diff(&old, &new);
        assert_eq!(diff.keys().copied().collect::<Vec<_>>(), vec!["db"]);
    }

    #[test]
    fn test_sensitive_keys_are_still_detected() {
        let old = snapshot(json!({"api_token": "t1", "db_password": "p1", "secretKey": 1}));
        let new = snapshot(json!({"api_token": "t2", "db_password": "p2", "secretKey": 2}));
        assert_eq!(compute_diff(&old, &new).len(), 3);
    }

    #[test]
    fn test_no_cross_type_coercion() {
        assert!(!deep_equal(&ConfigValue::from(1), &ConfigValue::from("1")));
        assert!(!deep_equal(&ConfigValue::from(1), &ConfigValue::from(1.0)));
        assert!(!deep_equal(&ConfigValue::from(true), &ConfigValue::from(1)));
        assert!(!deep_equal(&ConfigValue::NULL, &ConfigValue::from("")));
        assert!(deep_equal(&ConfigValue::NULL, &ConfigValue::NULL));
    }

    #[test]
    fn test_integer_width_does_not_matter() {
        assert!(deep_equal(&ConfigValue::from(5i32), &ConfigValue::from(5i64)));
        assert!(deep_equal(
            &ConfigValue::Scalar(Scalar::Int(5)),
            &ConfigValue::Scalar(Scalar::UInt(5))
        ));
        assert!(!deep_equal(
            &ConfigValue::Scalar(Scalar::Int(-1)),
            &ConfigValue::Scalar(Scalar::UInt(u64::MAX))
        ));
        assert!(deep_equal(&ConfigValue::from(0.5f32), &ConfigValue::from(0.5f64)));
    }

    #[test]
    fn test_shape_mismatch_is_decisive() {
        let mapping = ConfigValue::from(json!({"a": 1}));
        let sequence = ConfigValue::from(json!([1]));
        let scalar = ConfigValue::from(1);
        assert!(!deep_equal(&mapping, &sequence));
        assert!(!deep_equal(&sequence, &scalar));
        assert!(!deep_equal(&mapping, &scalar));
        assert!(!deep_equal(&ConfigValue::from(json!({})), &ConfigValue::NULL));
    }

    #[test]
    fn test_mapping_containment_is_symmetric() {
        let left = ConfigValue::from(json!({"a": 1, "b": 2}));
        let right = ConfigValue::from(json!({"a": 1, "c": 2}));
        assert!(!deep_equal(&left, &right));
        assert!(!deep_equal(&right, &left));
    }

    #[test]
    fn test_explicit_null_vs_absent() {
        let old = snapshot(json!({"a": null}));
        let new = snapshot(json!({}));
        let diff = compute_diff(&old, &new);
        assert_eq!(diff["a"].change_kind(), ChangeKind::Delete);

        let diff = compute_diff(&new, &old);
        assert_eq!(diff["a"].change_kind(), ChangeKind::Add);
    }

    #[test]
    fn test_change_kind_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&ChangeKind::Update).unwrap(), "\"UPDATE\"");
        assert_eq!(ChangeKind::Delete.to_string(), "DELETE");
    }
}
