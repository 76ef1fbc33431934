use std::io;
use thiserror::Error;

/// Errors raised while turning a wire-level request into a [`Request`](crate::protocol::Request).
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("unsupported http method: {method}")]
    UnsupportedMethod { method: String },

    #[error("invalid query string: {reason}")]
    InvalidQuery { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },
}

impl ParseError {
    pub fn unsupported_method<S: ToString>(method: S) -> Self {
        Self::UnsupportedMethod { method: method.to_string() }
    }

    pub fn invalid_query<S: ToString>(str: S) -> Self {
        Self::InvalidQuery { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }
}

/// Errors raised while serializing or writing a response to a transport.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("response head already sent")]
    HeadAlreadySent,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }
}

impl From<serde_json::Error> for SendError {
    fn from(e: serde_json::Error) -> Self {
        Self::invalid_body(e)
    }
}
