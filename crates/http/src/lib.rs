//! Request, response and transport values for the vireo router
//!
//! This crate holds the values that flow in and out of the routing core in
//! `vireo-web`. It owns no routing logic itself.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use http::StatusCode;
//! use vireo_http::protocol::{Request, Response};
//! use vireo_http::transport::{ResponseCollector, Transport};
//!
//! let wire = http::Request::builder()
//!     .method("POST")
//!     .uri("/users?notify=1")
//!     .header("content-type", "application/json")
//!     .body(Bytes::from_static(br#"{"name":"ada"}"#))
//!     .unwrap();
//!
//! let request = Request::from_http(wire).unwrap();
//! assert_eq!(request.payload().get_str("name"), Some("ada"));
//! assert_eq!(request.payload().get_str("notify"), Some("1"));
//!
//! let mut response = Response::new();
//! response.set_status(StatusCode::CREATED).set_body("created");
//!
//! let mut collector = ResponseCollector::new();
//! collector.send_status(response.status()).unwrap();
//! collector.send_body(response.body_bytes()).unwrap();
//! assert_eq!(collector.into_response().status(), StatusCode::CREATED);
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: [`Request`](protocol::Request), [`Response`](protocol::Response),
//!   [`Payload`](protocol::Payload) and the protocol error types
//! - [`transport`]: the [`Transport`](transport::Transport) write seam with an
//!   HTTP/1.1 writer and an in-memory collector
//!
//! # Limitations
//!
//! - Only GET, POST, PUT, DELETE and OPTIONS are accepted by [`Request::from_http`](protocol::Request::from_http)
//! - Multipart bodies are kept raw and not decoded into the payload
//! - No TLS support

pub mod protocol;
pub mod transport;

mod utils;
pub(crate) use utils::ensure;
