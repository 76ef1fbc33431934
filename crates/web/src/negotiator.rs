//! Response serialization by content negotiation.
//!
//! The [`ResponseNegotiator`] owns one serializer per media type plus a default.
//! When a response is sent, the effective content type is the explicit
//! `Content-Type` response header if one was set, otherwise it is negotiated from
//! the request `Accept` header:
//!
//! 1. the first candidate, if a serializer is registered for it
//! 2. else the first later candidate with a registered serializer
//! 3. else the first candidate as-is, which falls through to the default serializer
//!
//! A negotiated type is written back into the response `Content-Type` header
//! before the headers are sent.

use crate::error::ValidationError;
use bytes::Bytes;
use http::header;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, trace};
use vireo_http::protocol::{Request, Response, SendError};
use vireo_http::transport::Transport;

/// Turns a finished response into body bytes.
pub type Serializer = Box<dyn Fn(&Response) -> Result<Bytes, SendError> + Send + Sync>;

pub struct ResponseNegotiator {
    serializers: HashMap<String, Serializer>,
    default: Serializer,
}

impl ResponseNegotiator {
    /// A negotiator with the built-in default and `application/json` serializers.
    pub fn new() -> Self {
        let mut serializers: HashMap<String, Serializer> = HashMap::new();
        serializers.insert(mime::APPLICATION_JSON.essence_str().to_string(), Box::new(serialize_json));
        Self { serializers, default: Box::new(serialize_default) }
    }

    /// Registers `serializer` for `content_type`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns error if `content_type` is not a plain `type/subtype` media type:
    /// parameters and `*` wildcards are rejected.
    pub fn register<F>(&mut self, content_type: &str, serializer: F) -> Result<&mut Self, ValidationError>
    where
        F: Fn(&Response) -> Result<Bytes, SendError> + Send + Sync + 'static,
    {
        let trimmed = content_type.trim();
        let media_type = trimmed
            .parse::<mime::Mime>()
            .ok()
            .filter(|m| is_plain_media_type(m, trimmed))
            .ok_or_else(|| ValidationError::InvalidContentType { content_type: content_type.to_string() })?;

        let key = media_type.essence_str().to_ascii_lowercase();
        debug!(content_type = %key, "registered serializer");
        self.serializers.insert(key, Box::new(serializer));
        Ok(self)
    }

    /// Replaces the serializer used when no registered one applies.
    pub fn set_default<F>(&mut self, serializer: F) -> &mut Self
    where
        F: Fn(&Response) -> Result<Bytes, SendError> + Send + Sync + 'static,
    {
        self.default = Box::new(serializer);
        self
    }

    /// Returns true if a serializer is registered for `content_type`, ignoring
    /// parameters and case.
    pub fn has_serializer(&self, content_type: &str) -> bool {
        self.serializer_for(content_type).is_some()
    }

    /// Picks a content type for `request` from its `Accept` header.
    ///
    /// Returns `None` when the header is absent or empty, or when nothing is
    /// registered and the first candidate is a wildcard range.
    pub fn negotiate(&self, request: &Request) -> Option<String> {
        let accept = request.header(header::ACCEPT)?;
        let candidates = accept
            .split(',')
            .map(|candidate| candidate.split(';').next().unwrap_or_default().trim())
            .filter(|candidate| !candidate.is_empty())
            .collect::<Vec<_>>();

        let (&first, rest) = candidates.split_first()?;
        if self.has_serializer(first) {
            return Some(first.to_string());
        }

        if let Some(&registered) = rest.iter().find(|candidate| self.has_serializer(candidate)) {
            return Some(registered.to_string());
        }

        trace!(accept, "no registered serializer accepted, using first candidate");
        (!first.contains('*')).then(|| first.to_string())
    }

    /// Writes `response` to `transport`: status, headers, then the serialized body.
    ///
    /// # Errors
    ///
    /// Returns error if the negotiated content type is not a valid header value,
    /// if the serializer fails, or if a transport write fails.
    pub fn send(&self, response: &mut Response, request: &Request, transport: &mut dyn Transport) -> Result<(), SendError> {
        transport.send_status(response.status())?;

        let content_type = match response.headers().get(header::CONTENT_TYPE) {
            Some(explicit) => explicit.to_str().ok().map(str::to_string),
            None => {
                let negotiated = self.negotiate(request);
                if let Some(content_type) = &negotiated {
                    response.header(header::CONTENT_TYPE, content_type.as_str()).map_err(SendError::invalid_header)?;
                }
                negotiated
            }
        };

        for (name, value) in response.headers() {
            transport.send_header(name, value)?;
        }

        let serializer = content_type.as_deref().and_then(|content_type| self.serializer_for(content_type));
        debug!(
            status = response.status().as_u16(),
            content_type = content_type.as_deref().unwrap_or("-"),
            registered = serializer.is_some(),
            "sending response"
        );

        let body = serializer.unwrap_or(&self.default)(response)?;
        transport.send_body(body)
    }

    fn serializer_for(&self, content_type: &str) -> Option<&Serializer> {
        let media_type = content_type.split(';').next().unwrap_or_default().trim();
        self.serializers.get(&media_type.to_ascii_lowercase())
    }
}

impl Default for ResponseNegotiator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ResponseNegotiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseNegotiator").field("content_types", &self.serializers.keys().collect::<Vec<_>>()).finish()
    }
}

/// `type/subtype` with both parts non-empty, no `*` and nothing after the subtype.
fn is_plain_media_type(media_type: &mime::Mime, raw: &str) -> bool {
    !media_type.type_().as_str().is_empty()
        && !media_type.subtype().as_str().is_empty()
        && media_type.type_() != mime::STAR
        && media_type.subtype() != mime::STAR
        && media_type.essence_str().eq_ignore_ascii_case(raw)
}

/// The raw body if there is one, otherwise the payload as indented JSON.
fn serialize_default(response: &Response) -> Result<Bytes, SendError> {
    if response.has_body() {
        return Ok(response.body_bytes());
    }
    Ok(Bytes::from(serde_json::to_vec_pretty(response.payload())?))
}

fn serialize_json(response: &Response) -> Result<Bytes, SendError> {
    if response.has_body() {
        return Ok(response.body_bytes());
    }
    Ok(Bytes::from(serde_json::to_vec(response.payload())?))
}
