//! The write side of a response.
//!
//! A [`Transport`] receives a finished response in wire order: the status code,
//! then each header, then the body. Two implementations are provided:
//!
//! - [`Http1Writer`] renders an HTTP/1.1 response onto any [`std::io::Write`]
//! - [`ResponseCollector`] assembles an `http::Response<Bytes>`, for embedding
//!   the router inside another server or inspecting output in tests

mod collector;
mod http1_writer;

pub use collector::ResponseCollector;
pub use http1_writer::Http1Writer;

use crate::protocol::SendError;
use bytes::Bytes;
use http::{HeaderName, HeaderValue, StatusCode};

/// A sink for one response, written in the order status, headers, body.
pub trait Transport {
    fn send_status(&mut self, status: StatusCode) -> Result<(), SendError>;

    fn send_header(&mut self, name: &HeaderName, value: &HeaderValue) -> Result<(), SendError>;

    /// Writes the body and completes the response.
    fn send_body(&mut self, body: Bytes) -> Result<(), SendError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send_status(&mut self, status: StatusCode) -> Result<(), SendError> {
        (**self).send_status(status)
    }

    fn send_header(&mut self, name: &HeaderName, value: &HeaderValue) -> Result<(), SendError> {
        (**self).send_header(name, value)
    }

    fn send_body(&mut self, body: Bytes) -> Result<(), SendError> {
        (**self).send_body(body)
    }
}
