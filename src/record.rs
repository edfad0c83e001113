//! The canonical tripartite document stored at coordinator znodes.
//!
//! Every value the protocol persists (messages, live instances, current
//! states, ideal states, configs, state model definitions) is one `Record`.
//! The wire format is a JSON object with keys `id`, `simpleFields`,
//! `listFields` and `mapFields`; all scalar values are encoded as JSON
//! strings, even ints and bools. Encoding is canonical (sorted keys) so
//! `decode(encode(r)) == r`, and decoding tolerates unknown fields.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::Deserialize;
use serde::Serialize;

use crate::CodecError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,

    #[serde(default, rename = "simpleFields")]
    pub simple_fields: BTreeMap<String, String>,

    #[serde(default, rename = "listFields")]
    pub list_fields: BTreeMap<String, Vec<String>>,

    #[serde(default, rename = "mapFields")]
    pub map_fields: BTreeMap<String, BTreeMap<String, String>>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Record {
            id: id.into(),
            ..Record::default()
        }
    }

    /// Decode a record from its JSON payload. Unknown keys are ignored and
    /// missing field sections default to empty.
    pub fn from_bytes(data: &[u8]) -> std::result::Result<Self, CodecError> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Encode to the canonical JSON payload (sorted keys, pretty-printed the
    /// way the reference implementation writes znodes).
    pub fn to_bytes(&self) -> std::result::Result<Bytes, CodecError> {
        Ok(Bytes::from(serde_json::to_vec_pretty(self)?))
    }

    pub fn get_simple_field(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.simple_fields.get(key).map(String::as_str)
    }

    pub fn set_simple_field(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.simple_fields.insert(key.into(), value.into());
    }

    /// Scalar ints are stored as strings on the wire; unparsable or missing
    /// values fall back to `default`.
    pub fn get_int_field(
        &self,
        key: &str,
        default: i64,
    ) -> i64 {
        self.get_simple_field(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    pub fn set_int_field(
        &mut self,
        key: impl Into<String>,
        value: i64,
    ) {
        self.set_simple_field(key, value.to_string());
    }

    pub fn get_bool_field(
        &self,
        key: &str,
        default: bool,
    ) -> bool {
        self.get_simple_field(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(default)
    }

    pub fn set_bool_field(
        &mut self,
        key: impl Into<String>,
        value: bool,
    ) {
        self.set_simple_field(key, value.to_string());
    }

    pub fn get_list_field(
        &self,
        key: &str,
    ) -> Option<&[String]> {
        self.list_fields.get(key).map(Vec::as_slice)
    }

    pub fn set_list_field(
        &mut self,
        key: impl Into<String>,
        values: Vec<String>,
    ) {
        self.list_fields.insert(key.into(), values);
    }

    pub fn get_map_field(
        &self,
        key: &str,
        property: &str,
    ) -> Option<&str> {
        self.map_fields
            .get(key)
            .and_then(|m| m.get(property))
            .map(String::as_str)
    }

    /// Upsert one `(key, property) -> value` tuple; other entries untouched.
    pub fn set_map_field(
        &mut self,
        key: impl Into<String>,
        property: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.map_fields
            .entry(key.into())
            .or_default()
            .insert(property.into(), value.into());
    }

    /// Remove an entire top-level map-field key.
    pub fn remove_map_field(
        &mut self,
        key: &str,
    ) {
        self.map_fields.remove(key);
    }

    /// Accessor for fields the protocol requires to be present.
    pub fn require_simple_field(
        &self,
        key: &str,
    ) -> std::result::Result<&str, CodecError> {
        self.get_simple_field(key).ok_or_else(|| CodecError::MissingField {
            id: self.id.clone(),
            field: key.to_string(),
        })
    }
}

impl std::fmt::Display for Record {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match serde_json::to_string_pretty(self) {
            Ok(s) => write!(f, "{s}"),
            Err(_) => write!(f, "Record({})", self.id),
        }
    }
}
