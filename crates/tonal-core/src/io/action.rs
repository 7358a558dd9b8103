//! Named-parameter bag recorded in the undo log for each applied filter.

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ToneError};

/// One named value. Blobs are kept base64-encoded so the bag stays plain
/// text when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
    Blob(String),
}

impl ParamValue {
    pub fn blob(bytes: &[u8]) -> Self {
        Self::Blob(STANDARD.encode(bytes))
    }
}

/// A filter invocation: identifier, version and its parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterAction {
    identifier: String,
    version: u32,
    params: BTreeMap<String, ParamValue>,
}

impl FilterAction {
    pub fn new(identifier: impl Into<String>, version: u32) -> Self {
        Self {
            identifier: identifier.into(),
            version,
            params: BTreeMap::new(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: ParamValue) {
        self.params.insert(name.into(), value);
    }

    pub fn set_bool(&mut self, name: impl Into<String>, value: bool) {
        self.set(name, ParamValue::Bool(value));
    }

    pub fn set_int(&mut self, name: impl Into<String>, value: i64) {
        self.set(name, ParamValue::Int(value));
    }

    pub fn set_double(&mut self, name: impl Into<String>, value: f64) {
        self.set(name, ParamValue::Double(value));
    }

    pub fn set_blob(&mut self, name: impl Into<String>, bytes: &[u8]) {
        self.set(name, ParamValue::blob(bytes));
    }

    // Typed getters: `Ok(None)` when the parameter is absent, an error when
    // it holds another type.

    pub fn bool(&self, name: &str) -> Result<Option<bool>> {
        match self.get(name) {
            None => Ok(None),
            Some(ParamValue::Bool(v)) => Ok(Some(*v)),
            Some(_) => Err(ToneError::ParameterType(name.to_owned())),
        }
    }

    pub fn int(&self, name: &str) -> Result<Option<i64>> {
        match self.get(name) {
            None => Ok(None),
            Some(ParamValue::Int(v)) => Ok(Some(*v)),
            Some(_) => Err(ToneError::ParameterType(name.to_owned())),
        }
    }

    /// Doubles also accept integer values.
    pub fn double(&self, name: &str) -> Result<Option<f64>> {
        match self.get(name) {
            None => Ok(None),
            Some(ParamValue::Double(v)) => Ok(Some(*v)),
            Some(ParamValue::Int(v)) => Ok(Some(*v as f64)),
            Some(_) => Err(ToneError::ParameterType(name.to_owned())),
        }
    }

    /// Decoded bytes of a blob parameter.
    pub fn blob(&self, name: &str) -> Result<Option<Vec<u8>>> {
        match self.get(name) {
            None => Ok(None),
            Some(ParamValue::Blob(encoded)) => Ok(Some(STANDARD.decode(encoded)?)),
            Some(_) => Err(ToneError::ParameterType(name.to_owned())),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_access() {
        let mut action = FilterAction::new("tonal:curves", 1);
        action.set_int("depth", 16);
        action.set_bool("flag", true);
        action.set_blob("data", &[0, 1, 254, 255]);

        assert_eq!(action.int("depth").unwrap(), Some(16));
        assert_eq!(action.double("depth").unwrap(), Some(16.0));
        assert_eq!(action.bool("flag").unwrap(), Some(true));
        assert_eq!(action.blob("data").unwrap(), Some(vec![0, 1, 254, 255]));
        assert_eq!(action.int("missing").unwrap(), None);
        assert!(matches!(action.int("flag"), Err(ToneError::ParameterType(_))));
        assert_eq!(action.len(), 3);
    }

    #[test]
    fn test_bad_base64_reported() {
        let mut action = FilterAction::default();
        action.set("data", ParamValue::Blob("not base64!".into()));
        assert!(matches!(action.blob("data"), Err(ToneError::Base64(_))));
    }

    #[test]
    fn test_json_roundtrip() {
        let mut action = FilterAction::new("tonal:levels", 2);
        action.set_double("gamma", 1.25);
        action.set_blob("blob", b"curve");
        let json = action.to_json().unwrap();
        assert!(json.contains("\"type\": \"Double\""));
        assert_eq!(FilterAction::from_json(&json).unwrap(), action);
    }
}
