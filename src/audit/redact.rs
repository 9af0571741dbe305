//! Display-time masking of sensitive configuration values.
//!
//! Redaction is applied to rendered values after the diff has been computed;
//! it never influences whether a change is detected.

use std::collections::BTreeMap;

use crate::config::{ConfigSnapshot, ConfigValue};

/// Replacement for any sensitive value, regardless of its length.
pub const MASK: &str = "******";

/// Substrings that mark a key as sensitive (matched case-insensitively).
pub const SENSITIVE_TERMS: [&str; 4] = ["password", "secret", "token", "key"];

pub fn is_sensitive(key: &str) -> bool {
    let lower = key.to_lowercase();
    SENSITIVE_TERMS.iter().any(|term| lower.contains(term))
}

/// Mask `rendered` if `key` is sensitive, otherwise pass it through.
pub fn redact(key: &str, rendered: String) -> String {
    if is_sensitive(key) {
        MASK.to_owned()
    } else {
        rendered
    }
}

/// Mask sensitive keys at any depth of a value tree.
///
/// Sequence elements inherit the key of the sequence they belong to.
pub fn redact_value(key: &str, value: &ConfigValue) -> ConfigValue {
    if is_sensitive(key) {
        return ConfigValue::from(MASK);
    }
    match value {
        ConfigValue::Mapping(entries) => ConfigValue::Mapping(redact_entries(entries)),
        ConfigValue::Sequence(items) => {
            ConfigValue::Sequence(items.iter().map(|item| redact_value(key, item)).collect())
        }
        scalar => scalar.clone(),
    }
}

/// A copy of `snapshot` that is safe to display.
pub fn redact_snapshot(snapshot: &ConfigSnapshot) -> ConfigSnapshot {
    snapshot
        .iter()
        .map(|(key, value)| (key.clone(), redact_value(key, value)))
        .collect()
}

fn redact_entries(entries: &BTreeMap<String, ConfigValue>) -> BTreeMap<String, ConfigValue> {
    entries
        .iter()
        .map(|(key, value)| (key.clone(), redact_value(key, value)))
        .collect()
}
