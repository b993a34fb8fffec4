//! Scalar request parameters with a form-encoding view.

use std::collections::BTreeMap;
use std::fmt;

/// A single scalar parameter value.
///
/// Only scalars exist on the form-encoded wire, so non-scalar values are
/// unrepresentable by construction.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    UInt(u64),
    Bool(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(s) => f.write_str(s),
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::UInt(u) => write!(f, "{u}"),
            ParamValue::Bool(b) => write!(f, "{}", *b as u8),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        ParamValue::UInt(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::UInt(value.into())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

/// An ordered map of request parameters.
///
/// Keys are kept sorted so the encoded form is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    /// Create an empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parameter, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Look up a parameter by key.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    /// Whether a parameter with this key exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Iterate over the parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The form-encoding view consumed by the HTTP layer.
    pub fn to_form(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }
}

impl FromIterator<(String, ParamValue)> for Params {
    fn from_iter<T: IntoIterator<Item = (String, ParamValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_view() {
        let params = Params::new()
            .with("ts", "10")
            .with("act", "a_check")
            .with("wait", 25u64);

        let form = params.to_form();
        assert_eq!(
            form,
            vec![
                ("act".to_string(), "a_check".to_string()),
                ("ts".to_string(), "10".to_string()),
                ("wait".to_string(), "25".to_string()),
            ]
        );
    }

    #[test]
    fn test_value_rendering() {
        assert_eq!(ParamValue::from(-5i64).to_string(), "-5");
        assert_eq!(ParamValue::from(7u32).to_string(), "7");
        assert_eq!(ParamValue::from(true).to_string(), "1");
        assert_eq!(ParamValue::from(false).to_string(), "0");
        assert_eq!(ParamValue::from("x").to_string(), "x");
    }

    #[test]
    fn test_insert_replaces() {
        let mut params = Params::new().with("group_id", 1);
        params.insert("group_id", 2);
        assert_eq!(params.get("group_id"), Some(&ParamValue::Int(2)));
        assert_eq!(params.len(), 1);
    }
}
