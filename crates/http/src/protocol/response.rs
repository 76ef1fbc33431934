//! Outbound response values.
//!
//! A [`Response`] is built up by controllers and handed to a serializer once the
//! controller chain has finished. It carries a status code (200 unless changed),
//! a header table, a structured payload and an optional raw body. A non-empty raw
//! body takes precedence over the payload when the response is serialized.

use crate::protocol::Payload;
use bytes::{Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    payload: Payload,
    body: BytesMut,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Sets header `key` to `value`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns error if `key` is not a valid header name or `value` not a valid
    /// header value.
    pub fn header<K, V>(&mut self, key: K, value: V) -> Result<&mut Self, http::Error>
    where
        K: TryInto<HeaderName>,
        <K as TryInto<HeaderName>>::Error: Into<http::Error>,
        V: TryInto<HeaderValue>,
        <V as TryInto<HeaderValue>>::Error: Into<http::Error>,
    {
        let name = key.try_into().map_err(Into::into)?;
        let value = value.try_into().map_err(Into::into)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// The explicit `Content-Type` header of this response, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|value| value.to_str().ok())
    }

    /// Sets payload entry `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.payload.set(key, value);
        self
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut Payload {
        &mut self.payload
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut BytesMut {
        &mut self.body
    }

    /// Replaces the raw body.
    pub fn set_body(&mut self, body: impl AsRef<[u8]>) -> &mut Self {
        self.body.clear();
        self.body.extend_from_slice(body.as_ref());
        self
    }

    pub fn has_body(&self) -> bool {
        !self.body.is_empty()
    }

    /// Returns a copy of the raw body.
    pub fn body_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.body)
    }
}
