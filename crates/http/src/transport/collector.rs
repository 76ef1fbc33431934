use crate::protocol::SendError;
use crate::transport::Transport;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode};

/// Collects a written response into an `http::Response<Bytes>`.
///
/// Repeated headers are appended, not replaced, in the order they were sent.
#[derive(Debug, Default)]
pub struct ResponseCollector {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl ResponseCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once the body has been written.
    pub fn is_complete(&self) -> bool {
        self.body.is_some()
    }

    pub fn into_response(self) -> Response<Bytes> {
        let mut response = Response::new(self.body.unwrap_or_default());
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl Transport for ResponseCollector {
    fn send_status(&mut self, status: StatusCode) -> Result<(), SendError> {
        if self.is_complete() {
            return Err(SendError::HeadAlreadySent);
        }
        self.status = status;
        Ok(())
    }

    fn send_header(&mut self, name: &HeaderName, value: &HeaderValue) -> Result<(), SendError> {
        if self.is_complete() {
            return Err(SendError::HeadAlreadySent);
        }
        self.headers.append(name.clone(), value.clone());
        Ok(())
    }

    fn send_body(&mut self, body: Bytes) -> Result<(), SendError> {
        if self.is_complete() {
            return Err(SendError::HeadAlreadySent);
        }
        self.body = Some(body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ResponseCollector;
    use crate::transport::Transport;
    use bytes::Bytes;
    use http::{HeaderValue, StatusCode, header};

    #[test]
    fn test_collect() {
        let mut collector = ResponseCollector::new();
        collector.send_status(StatusCode::ACCEPTED).unwrap();
        collector.send_header(&header::CONTENT_TYPE, &HeaderValue::from_static("application/json")).unwrap();
        collector.send_body(Bytes::from_static(b"{}")).unwrap();
        assert!(collector.is_complete());

        let response = collector.into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(response.body().as_ref(), b"{}");
    }
}
