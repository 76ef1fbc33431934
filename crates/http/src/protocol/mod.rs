//! Protocol values exchanged between the transport and the router.
//!
//! # Components
//!
//! - **Requests** (`request`): [`Request`] wraps the method, URI, headers,
//!   decoded [`Payload`] and raw body of an inbound call, and knows how to decode
//!   itself from an `http::Request<Bytes>`.
//! - **Responses** (`response`): [`Response`] is the mutable output a chain of
//!   controllers writes into.
//! - **Payloads** (`payload`): [`Payload`] is the string-keyed map of JSON
//!   values shared by both.
//! - **Errors** (`error`): [`ParseError`] for ingestion, [`SendError`] for
//!   serialization and transport writes.

mod error;
pub use error::ParseError;
pub use error::SendError;

mod payload;
pub use payload::Payload;

mod request;
pub use request::JSON_SCALAR_KEY;
pub use request::Request;
pub use request::is_supported_method;

mod response;
pub use response::Response;
