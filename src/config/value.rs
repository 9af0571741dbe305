//! Dynamically-typed configuration values.
//!
//! Every supported document format (YAML, JSON, TOML) deserializes into the
//! same [`ConfigValue`] tree, so snapshots from different sources can be
//! merged and diffed without caring where they came from.
//!
//! # Numeric representation
//! Integers are normalized at ingestion: anything that fits in `i64` becomes
//! [`Scalar::Int`], only values above `i64::MAX` use [`Scalar::UInt`]. Floats
//! are widened to `f64`. Integer and float values are never coerced into each
//! other.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, Serializer};

/// Field name the `toml` crate uses to smuggle datetimes through serde.
const TOML_DATETIME_FIELD: &str = "$__toml_private_datetime";

/// A leaf value.
#[derive(Debug, Clone)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
}

/// A node in a configuration tree.
#[derive(Debug, Clone)]
pub enum ConfigValue {
    Scalar(Scalar),
    /// Key order is irrelevant; `BTreeMap` only keeps rendering stable.
    Mapping(BTreeMap<String, ConfigValue>),
    /// Index order is significant.
    Sequence(Vec<ConfigValue>),
}

impl ConfigValue {
    pub const NULL: ConfigValue = ConfigValue::Scalar(Scalar::Null);

    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Scalar(Scalar::Null))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&BTreeMap<String, ConfigValue>> {
        match self {
            ConfigValue::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Short human-readable name of the value's shape, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ConfigValue::Scalar(Scalar::Null) => "null",
            ConfigValue::Scalar(Scalar::Bool(_)) => "bool",
            ConfigValue::Scalar(Scalar::Int(_)) | ConfigValue::Scalar(Scalar::UInt(_)) => "integer",
            ConfigValue::Scalar(Scalar::Float(_)) => "float",
            ConfigValue::Scalar(Scalar::String(_)) => "string",
            ConfigValue::Mapping(_) => "mapping",
            ConfigValue::Sequence(_) => "sequence",
        }
    }
}

impl Default for ConfigValue {
    fn default() -> Self {
        ConfigValue::NULL
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::UInt(u) => write!(f, "{}", u),
            // Keeps the ".0" so 1.0 never renders like the integer 1.
            Scalar::Float(x) => write!(f, "{:?}", x),
            Scalar::String(s) => f.write_str(s),
        }
    }
}

/// Scalars render in their natural form (strings unquoted), nested values as
/// compact JSON with sorted keys.
impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Scalar(scalar) => scalar.fmt(f),
            nested => {
                let json = serde_json::to_string(nested).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<Scalar> for ConfigValue {
    fn from(scalar: Scalar) -> Self {
        ConfigValue::Scalar(scalar)
    }
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        ConfigValue::Scalar(Scalar::Bool(v))
    }
}

impl From<i64> for ConfigValue {
    fn from(v: i64) -> Self {
        ConfigValue::Scalar(Scalar::Int(v))
    }
}

impl From<i32> for ConfigValue {
    fn from(v: i32) -> Self {
        ConfigValue::Scalar(Scalar::Int(v.into()))
    }
}

impl From<u32> for ConfigValue {
    fn from(v: u32) -> Self {
        ConfigValue::Scalar(Scalar::Int(v.into()))
    }
}

impl From<u64> for ConfigValue {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(i) => ConfigValue::Scalar(Scalar::Int(i)),
            Err(_) => ConfigValue::Scalar(Scalar::UInt(v)),
        }
    }
}

impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        ConfigValue::Scalar(Scalar::Float(v))
    }
}

impl From<f32> for ConfigValue {
    fn from(v: f32) -> Self {
        ConfigValue::Scalar(Scalar::Float(v.into()))
    }
}

impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        ConfigValue::Scalar(Scalar::String(v.to_owned()))
    }
}

impl From<String> for ConfigValue {
    fn from(v: String) -> Self {
        ConfigValue::Scalar(Scalar::String(v))
    }
}

impl From<Vec<ConfigValue>> for ConfigValue {
    fn from(items: Vec<ConfigValue>) -> Self {
        ConfigValue::Sequence(items)
    }
}

impl From<BTreeMap<String, ConfigValue>> for ConfigValue {
    fn from(entries: BTreeMap<String, ConfigValue>) -> Self {
        ConfigValue::Mapping(entries)
    }
}

impl From<serde_json::Value> for ConfigValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => ConfigValue::NULL,
            Value::Bool(b) => b.into(),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i.into()
                } else if let Some(u) = n.as_u64() {
                    u.into()
                } else {
                    n.as_f64().map_or(ConfigValue::NULL, ConfigValue::from)
                }
            }
            Value::String(s) => s.into(),
            Value::Array(items) => {
                ConfigValue::Sequence(items.into_iter().map(ConfigValue::from).collect())
            }
            Value::Object(entries) => ConfigValue::Mapping(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, ConfigValue::from(v)))
                    .collect(),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde
// ---------------------------------------------------------------------------

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Null => serializer.serialize_unit(),
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::Int(i) => serializer.serialize_i64(*i),
            Scalar::UInt(u) => serializer.serialize_u64(*u),
            Scalar::Float(x) => serializer.serialize_f64(*x),
            Scalar::String(s) => serializer.serialize_str(s),
        }
    }
}

impl Serialize for ConfigValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ConfigValue::Scalar(scalar) => scalar.serialize(serializer),
            ConfigValue::Mapping(entries) => serializer.collect_map(entries),
            ConfigValue::Sequence(items) => serializer.collect_seq(items),
        }
    }
}

impl<'de> Deserialize<'de> for ConfigValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = ConfigValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a configuration value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<ConfigValue, E> {
        Ok(v.into())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<ConfigValue, E> {
        Ok(v.into())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<ConfigValue, E> {
        Ok(v.into())
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<ConfigValue, E> {
        Ok(v.into())
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<ConfigValue, E> {
        Ok(v.into())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<ConfigValue, E> {
        Ok(v.into())
    }

    fn visit_none<E: de::Error>(self) -> Result<ConfigValue, E> {
        Ok(ConfigValue::NULL)
    }

    fn visit_unit<E: de::Error>(self) -> Result<ConfigValue, E> {
        Ok(ConfigValue::NULL)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<ConfigValue, D::Error> {
        ConfigValue::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<ConfigValue, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<ConfigValue>()? {
            items.push(item);
        }
        Ok(ConfigValue::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ConfigValue, A::Error> {
        let mut entries = BTreeMap::new();
        while let Some(MapKey(key)) = map.next_key::<MapKey>()? {
            let value = map.next_value::<ConfigValue>()?;
            entries.insert(key, value);
        }

        // TOML datetimes arrive as a single-entry map; keep them as strings.
        if entries.len() == 1 {
            match entries.remove(TOML_DATETIME_FIELD) {
                Some(datetime @ ConfigValue::Scalar(Scalar::String(_))) => return Ok(datetime),
                Some(other) => {
                    entries.insert(TOML_DATETIME_FIELD.to_owned(), other);
                }
                None => {}
            }
        }

        Ok(ConfigValue::Mapping(entries))
    }
}

/// Mapping keys are always strings; YAML allows scalars of any type as keys.
struct MapKey(String);

impl<'de> Deserialize<'de> for MapKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MapKeyVisitor)
    }
}

struct MapKeyVisitor;

impl<'de> Visitor<'de> for MapKeyVisitor {
    type Value = MapKey;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a scalar mapping key")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<MapKey, E> {
        Ok(MapKey(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<MapKey, E> {
        Ok(MapKey(v))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<MapKey, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<MapKey, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<MapKey, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<MapKey, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_unit<E: de::Error>(self) -> Result<MapKey, E> {
        Ok(MapKey("null".to_owned()))
    }
}
