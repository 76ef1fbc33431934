//! String-keyed request and response data.
//!
//! A [`Payload`] holds the decoded parameters of a request (query string and body)
//! or the structured data a controller wants to send back. Values are
//! [`serde_json::Value`]s, so any serializer can render them without knowing
//! where they came from.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// An ordered map of payload keys to JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Payload {
    inner: Map<String, Value>,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `key` is acceptable as a payload key: one or more of
    /// ASCII word characters, `-`, `+` or `.`.
    pub fn is_valid_key(key: &str) -> bool {
        !key.is_empty() && key.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'+' | b'.'))
    }

    /// Builds a payload from decoded key/value pairs, dropping pairs whose key is not
    /// a valid payload key. Later pairs overwrite earlier ones.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut payload = Self::new();
        for (key, value) in pairs {
            let key = key.into();
            if Self::is_valid_key(&key) {
                payload.inner.insert(key, value.into());
            }
        }
        payload
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    /// Returns the value under `key` if it is a JSON string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.inner.get(key).and_then(Value::as_str)
    }

    /// Deserializes the value under `key` into `T`.
    ///
    /// Returns `Ok(None)` when the key is absent.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, serde_json::Error> {
        self.inner.get(key).map(|value| T::deserialize(value)).transpose()
    }

    pub fn has(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.inner.insert(key.into(), value.into());
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.inner.remove(key)
    }

    /// Copies every entry of `other` into `self`, replacing existing keys.
    pub fn merge(&mut self, other: Payload) {
        self.inner.extend(other.inner);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.inner.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.inner
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(inner: Map<String, Value>) -> Self {
        Self { inner }
    }
}
