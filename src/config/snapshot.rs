//! Immutable configuration snapshots.

use std::collections::btree_map;
use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::error::ConfigError;
use crate::config::value::{ConfigValue, Scalar};

/// Separator for nested lookups (`"server.port"`).
pub const PATH_DELIMITER: char = '.';

/// A point-in-time configuration tree rooted at a string-keyed mapping.
///
/// Snapshots are produced by the loader (or a remote provider) and then only
/// read. Building one by hand is done through [`ConfigSnapshot::set`] before
/// it is handed to the store.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ConfigSnapshot {
    entries: BTreeMap<String, ConfigValue>,
}

impl ConfigSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over top-level keys and values.
    pub fn iter(&self) -> btree_map::Iter<'_, String, ConfigValue> {
        self.entries.iter()
    }

    /// Top-level entry, without path splitting.
    pub fn entry(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Look up a dotted path, descending through mappings.
    pub fn get(&self, path: &str) -> Option<&ConfigValue> {
        let mut segments = path.split(PATH_DELIMITER);
        let first = segments.next()?;
        let mut current = self.entries.get(first)?;
        for segment in segments {
            current = current.as_mapping()?.get(segment)?;
        }
        Some(current)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Insert a value at a dotted path, creating (or overwriting with)
    /// intermediate mappings as needed.
    pub fn set(&mut self, path: &str, value: impl Into<ConfigValue>) -> &mut Self {
        let segments: Vec<&str> = path.split(PATH_DELIMITER).collect();
        insert_path(&mut self.entries, &segments, value.into());
        self
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, path: &str, value: impl Into<ConfigValue>) -> Self {
        self.set(path, value);
        self
    }

    /// Returns a new snapshot with `overlay` layered on top of `self`.
    ///
    /// Mappings merge recursively; any other value in `overlay` replaces the
    /// base value outright.
    pub fn merge(&self, overlay: &ConfigSnapshot) -> ConfigSnapshot {
        let mut entries = self.entries.clone();
        merge_entries(&mut entries, &overlay.entries);
        ConfigSnapshot { entries }
    }

    // -----------------------------------------------------------------------
    // Typed getters
    // -----------------------------------------------------------------------

    /// Scalars are rendered; mappings, sequences and null yield `None`.
    pub fn get_string(&self, path: &str) -> Option<String> {
        match self.get(path)? {
            ConfigValue::Scalar(Scalar::Null) => None,
            ConfigValue::Scalar(scalar) => Some(scalar.to_string()),
            _ => None,
        }
    }

    /// Floats truncate, numeric strings parse, booleans map to 0/1.
    pub fn get_int(&self, path: &str) -> Option<i64> {
        match self.get(path)? {
            ConfigValue::Scalar(Scalar::Int(i)) => Some(*i),
            ConfigValue::Scalar(Scalar::UInt(u)) => i64::try_from(*u).ok(),
            ConfigValue::Scalar(Scalar::Float(x)) if x.is_finite() => Some(x.trunc() as i64),
            ConfigValue::Scalar(Scalar::String(s)) => s.trim().parse().ok(),
            ConfigValue::Scalar(Scalar::Bool(b)) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn get_float(&self, path: &str) -> Option<f64> {
        match self.get(path)? {
            ConfigValue::Scalar(Scalar::Int(i)) => Some(*i as f64),
            ConfigValue::Scalar(Scalar::UInt(u)) => Some(*u as f64),
            ConfigValue::Scalar(Scalar::Float(x)) => Some(*x),
            ConfigValue::Scalar(Scalar::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Accepts the usual spellings: `true`/`false`, `t`/`f`, `1`/`0`,
    /// case-insensitively. Numbers are true when non-zero.
    pub fn get_bool(&self, path: &str) -> Option<bool> {
        match self.get(path)? {
            ConfigValue::Scalar(Scalar::Bool(b)) => Some(*b),
            ConfigValue::Scalar(Scalar::Int(i)) => Some(*i != 0),
            ConfigValue::Scalar(Scalar::UInt(u)) => Some(*u != 0),
            ConfigValue::Scalar(Scalar::String(s)) => parse_bool(s),
            _ => None,
        }
    }

    /// Sequences render element-wise; a string is split on commas so that
    /// list-valued settings can be overridden from the environment.
    pub fn get_string_slice(&self, path: &str) -> Option<Vec<String>> {
        match self.get(path)? {
            ConfigValue::Sequence(items) => Some(items.iter().map(ToString::to_string).collect()),
            ConfigValue::Scalar(Scalar::String(s)) => Some(
                s.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(str::to_owned)
                    .collect(),
            ),
            _ => None,
        }
    }

    pub fn get_string_or(&self, path: &str, default: &str) -> String {
        if !self.exists(path) {
            return default.to_owned();
        }
        self.get_string(path).unwrap_or_default()
    }

    pub fn get_int_or(&self, path: &str, default: i64) -> i64 {
        if !self.exists(path) {
            return default;
        }
        self.get_int(path).unwrap_or_default()
    }

    pub fn get_float_or(&self, path: &str, default: f64) -> f64 {
        if !self.exists(path) {
            return default;
        }
        self.get_float(path).unwrap_or_default()
    }

    pub fn get_bool_or(&self, path: &str, default: bool) -> bool {
        if !self.exists(path) {
            return default;
        }
        self.get_bool(path).unwrap_or_default()
    }

    pub fn get_string_slice_or(&self, path: &str, default: &[&str]) -> Vec<String> {
        if !self.exists(path) {
            return default.iter().map(|s| (*s).to_owned()).collect();
        }
        self.get_string_slice(path).unwrap_or_default()
    }

    /// Deserialize the subtree at `path` (the whole snapshot for `""`).
    pub fn unmarshal<T: DeserializeOwned>(&self, path: &str) -> Result<T, ConfigError> {
        let json = if path.is_empty() {
            serde_json::to_value(self)
        } else {
            match self.get(path) {
                Some(value) => serde_json::to_value(value),
                None => Ok(serde_json::Value::Null),
            }
        };

        json.and_then(serde_json::from_value)
            .map_err(|source| ConfigError::Unmarshal {
                path: path.to_owned(),
                source,
            })
    }
}

impl TryFrom<ConfigValue> for ConfigSnapshot {
    type Error = ConfigError;

    fn try_from(value: ConfigValue) -> Result<Self, Self::Error> {
        match value {
            ConfigValue::Mapping(entries) => Ok(ConfigSnapshot { entries }),
            ConfigValue::Scalar(Scalar::Null) => Ok(ConfigSnapshot::default()),
            other => Err(ConfigError::NotAMapping(other.kind_name())),
        }
    }
}

impl From<BTreeMap<String, ConfigValue>> for ConfigSnapshot {
    fn from(entries: BTreeMap<String, ConfigValue>) -> Self {
        ConfigSnapshot { entries }
    }
}

impl FromIterator<(String, ConfigValue)> for ConfigSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, ConfigValue)>>(iter: I) -> Self {
        ConfigSnapshot {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ConfigSnapshot {
    type Item = (&'a String, &'a ConfigValue);
    type IntoIter = btree_map::Iter<'a, String, ConfigValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<'de> Deserialize<'de> for ConfigSnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = ConfigValue::deserialize(deserializer)?;
        ConfigSnapshot::try_from(value).map_err(serde::de::Error::custom)
    }
}

fn insert_path(entries: &mut BTreeMap<String, ConfigValue>, segments: &[&str], value: ConfigValue) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };

    if rest.is_empty() {
        entries.insert((*first).to_owned(), value);
        return;
    }

    let child = entries
        .entry((*first).to_owned())
        .or_insert_with(|| ConfigValue::Mapping(BTreeMap::new()));
    if !matches!(child, ConfigValue::Mapping(_)) {
        *child = ConfigValue::Mapping(BTreeMap::new());
    }
    if let ConfigValue::Mapping(nested) = child {
        insert_path(nested, rest, value);
    }
}

fn merge_entries(base: &mut BTreeMap<String, ConfigValue>, overlay: &BTreeMap<String, ConfigValue>) {
    for (key, incoming) in overlay {
        match (base.get_mut(key), incoming) {
            (Some(ConfigValue::Mapping(existing)), ConfigValue::Mapping(nested)) => {
                merge_entries(existing, nested);
            }
            _ => {
                base.insert(key.clone(), incoming.clone());
            }
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Some(true),
        "false" | "f" | "0" => Some(false),
        _ => None,
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
    fn test_dotted_path_lookup() {
        let snap = snapshot(json!({"server": {"host": "0.0.0.0", "port": 8080}}));
        assert_eq!(snap.get_string("server.host").as_deref(), Some("0.0.0.0"));
        assert_eq!(snap.get_int("server.port"), Some(8080));
        assert!(snap.exists("server"));
        assert!(!snap.exists("server.missing"));
        assert!(!snap.exists("server.port.deeper"));
    }

    #[test]
    fn test_lenient_coercion() {
        let snap = snapshot(json!({
            "port": "9090",
            "ratio": "0.25",
            "debug": "TRUE",
            "count": 3.9,
            "hosts": "a, b,,c",
        }));
        assert_eq!(snap.get_int("port"), Some(9090));
        assert_eq!(snap.get_float("ratio"), Some(0.25));
        assert_eq!(snap.get_bool("debug"), Some(true));
        assert_eq!(snap.get_int("count"), Some(3));
        assert_eq!(snap.get_string("count").as_deref(), Some("3.9"));
        assert_eq!(
            snap.get_string_slice("hosts"),
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn test_or_variants_fall_back_only_when_missing() {
        let snap = snapshot(json!({"name": "svc", "port": "not-a-number"}));
        assert_eq!(snap.get_string_or("name", "default"), "svc");
        assert_eq!(snap.get_string_or("other", "default"), "default");
        assert_eq!(snap.get_int_or("timeout", 30), 30);
        // Present but unparsable yields the zero value, not the default.
        assert_eq!(snap.get_int_or("port", 8080), 0);
        assert_eq!(snap.get_string_slice_or("tags", &["x"]), vec!["x".to_string()]);
    }

    #[test]
    fn test_merge_is_recursive_for_mappings_only() {
        let base = snapshot(json!({
            "db": {"host": "localhost", "port": 3306},
            "tags": ["a", "b"],
        }));
        let overlay = snapshot(json!({
            "db": {"port": 3307},
            "tags": ["c"],
        }));
        let merged = base.merge(&overlay);
        assert_eq!(merged.get_string("db.host").as_deref(), Some("localhost"));
        assert_eq!(merged.get_int("db.port"), Some(3307));
        assert_eq!(merged.get_string_slice("tags"), Some(vec!["c".to_string()]));
        // Base is untouched.
        assert_eq!(base.get_int("db.port"), Some(3306));
    }

    #[test]
    fn test_set_creates_and_replaces_intermediates() {
        let mut snap = ConfigSnapshot::new();
        snap.set("a", 1).set("b.c.d", "deep");
        assert_eq!(snap.get_string("b.c.d").as_deref(), Some("deep"));

        snap.set("a.x", true);
        assert_eq!(snap.get_bool("a.x"), Some(true));
        assert_eq!(snap.len(), 2);
    }

    #[test]
    fn test_unmarshal_subtree() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Database {
            host: String,
            port: u16,
        }

        let snap = snapshot(json!({"database": {"host": "db", "port": 5432}}));
        let db: Database = snap.unmarshal("database").unwrap();
        assert_eq!(db, Database { host: "db".into(), port: 5432 });

        let err = snap.unmarshal::<Database>("missing").unwrap_err();
        assert!(matches!(err, ConfigError::Unmarshal { .. }));
    }

    #[test]
    fn test_root_must_be_mapping() {
        let err = ConfigSnapshot::try_from(ConfigValue::from(vec![ConfigValue::from(1)])).unwrap_err();
        assert!(matches!(err, ConfigError::NotAMapping("sequence")));
        assert!(ConfigSnapshot::try_from(ConfigValue::NULL).unwrap().is_empty());
    }
}
