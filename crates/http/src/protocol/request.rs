//! Inbound request values.
//!
//! A [`Request`] is what the router consumes: the method, the parsed URI, the
//! header table, the decoded payload and the raw body bytes. It is built either
//! directly with [`Request::new`] or from a wire-level `http::Request<Bytes>`
//! through [`Request::from_http`], which decodes the query string and body into
//! the payload.

use crate::ensure;
use crate::protocol::{ParseError, Payload};
use bytes::Bytes;
use http::{HeaderMap, Method, Uri, header};
use serde_json::Value;
use tracing::{debug, trace};

/// Payload key holding a JSON body that is not an object.
pub const JSON_SCALAR_KEY: &str = "_json";

#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    payload: Payload,
    body: Bytes,
    content_type: Option<String>,
}

impl Request {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, payload: Payload, body: Bytes) -> Self {
        let content_type = content_type_of(&headers);
        Self { method, uri, headers, payload, body, content_type }
    }

    /// Decodes a wire-level request.
    ///
    /// The query string and, depending on the request content type, the body are
    /// decoded into the payload. Body parameters are merged first so query
    /// parameters win on key collision. The raw body is always kept as-is.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - the method is not one of GET, POST, PUT, DELETE, OPTIONS
    /// - the query string or a form body cannot be decoded
    /// - a JSON body is not valid JSON
    pub fn from_http(request: http::Request<Bytes>) -> Result<Self, ParseError> {
        let (parts, body) = request.into_parts();
        ensure!(is_supported_method(&parts.method), ParseError::unsupported_method(&parts.method));

        let content_type = content_type_of(&parts.headers);

        let mut payload = if body.is_empty() { Payload::new() } else { decode_body(content_type.as_deref(), &body)? };

        if let Some(query) = parts.uri.query() {
            payload.merge(decode_form(query).map_err(ParseError::invalid_query)?);
        }

        debug!(method = %parts.method, path = parts.uri.path(), params = payload.len(), "decoded request");
        Ok(Self { method: parts.method, uri: parts.uri, headers: parts.headers, payload, body, content_type })
    }

    /// Clones this request for an internal forward, optionally replacing the method
    /// and the target URI. Headers, payload and body are carried over.
    #[must_use]
    pub fn forwarded(&self, method: Option<Method>, uri: Option<Uri>) -> Self {
        Self {
            method: method.unwrap_or_else(|| self.method.clone()),
            uri: uri.unwrap_or_else(|| self.uri.clone()),
            headers: self.headers.clone(),
            payload: self.payload.clone(),
            body: self.body.clone(),
            content_type: self.content_type.clone(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The path component of the request URI, without query string.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the value of header `name` if it is present and valid visible ASCII.
    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The media type of the request body: the `Content-Type` header up to the
    /// first `;`, trimmed.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

/// Returns true for the methods the router accepts from the wire.
pub fn is_supported_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::POST | Method::PUT | Method::DELETE | Method::OPTIONS)
}

fn content_type_of(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    let media_type = value.split(';').next().unwrap_or_default().trim();
    Some(media_type.to_string())
}

fn decode_form(input: &str) -> Result<Payload, serde_urlencoded::de::Error> {
    let pairs = serde_urlencoded::from_str::<Vec<(String, String)>>(input)?;
    Ok(Payload::from_pairs(pairs))
}

fn decode_body(content_type: Option<&str>, body: &[u8]) -> Result<Payload, ParseError> {
    let Some(content_type) = content_type else {
        return Ok(Payload::new());
    };

    if content_type.eq_ignore_ascii_case(mime::APPLICATION_JSON.as_ref()) {
        let json = serde_json::from_slice::<Value>(body).map_err(ParseError::invalid_body)?;
        return Ok(match json {
            Value::Object(map) => Payload::from_pairs(map),
            other => Payload::from_pairs([(JSON_SCALAR_KEY, other)]),
        });
    }

    if content_type.eq_ignore_ascii_case(mime::APPLICATION_WWW_FORM_URLENCODED.as_ref()) {
        let form = std::str::from_utf8(body).map_err(ParseError::invalid_body)?;
        return decode_form(form).map_err(ParseError::invalid_body);
    }

    trace!(content_type, "body kept raw, no payload decoding for content type");
    Ok(Payload::new())
}
