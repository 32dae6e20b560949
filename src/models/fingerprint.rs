use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

/// One field as handed over by a passive fingerprint source.
///
/// Sources are loosely typed: fixed-width C strings come back as NUL
/// padded bytes, others are already text, and some fields are simply
/// not observed. Only the normalizer looks inside this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Bytes(Vec<u8>),
    Text(String),
    Absent,
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&[u8]> for FieldValue {
    fn from(value: &[u8]) -> Self {
        FieldValue::Bytes(value.to_vec())
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map(FieldValue::Text).unwrap_or(FieldValue::Absent)
    }
}

/// Un-normalized answer from a fingerprint source.
pub type RawFingerprint = HashMap<String, FieldValue>;

/// Normalized passive fingerprint: field name to lowercase trimmed text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PassiveFingerprint {
    fields: BTreeMap<String, String>,
}

impl PassiveFingerprint {
    pub const OS_NAME: &'static str = "os_name";

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(|s| s.as_str())
    }

    /// Observed OS name, empty when the source did not report one.
    pub fn os_name(&self) -> &str {
        self.get(Self::OS_NAME).unwrap_or("")
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PassiveFingerprint {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
