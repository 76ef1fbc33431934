//! Error taxonomy of the routing core.
//!
//! - [`ValidationError`]: raised at registration time, never deferred
//! - [`AuthError`]: raised by an [`Authenticator`](crate::auth::Authenticator) gate
//! - [`RoutingError`]: no controller could be resolved for a request
//! - [`ConfigError`]: a named entry point does not exist on a controller
//! - [`DispatchError`]: everything a call to [`Router::dispatch`](crate::Router::dispatch) can fail with
//!
//! A route whose pattern does not match a request is not an error at all; the
//! router simply tries the next route.

use http::StatusCode;
use std::error::Error;
use std::fmt;
use thiserror::Error;
use vireo_http::protocol::{ParseError, SendError};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("route path must not be empty")]
    EmptyPath,

    #[error("route path `{path}` contains an illegal character")]
    IllegalPath { path: String },

    #[error("route path `{path}` could not be compiled: {source}")]
    Pattern {
        path: String,
        #[source]
        source: regex::Error,
    },

    #[error("controller class or namespace `{target}` contains an illegal character")]
    IllegalTarget { target: String },

    #[error("route path `{path}` must end with \"/*\" to bind namespace `{target}`")]
    WildcardMismatch { path: String, target: String },

    #[error("controller `{id}` is not registered")]
    UnknownController { id: String },

    #[error("controller `{id}` is already registered")]
    DuplicateController { id: String },

    #[error("controller `{id}` declares an illegal or duplicate entry point `{entry_point}`")]
    IllegalEntryPoint { id: String, entry_point: &'static str },

    #[error("invalid content type `{content_type}`")]
    InvalidContentType { content_type: String },
}

/// Why an [`Authenticator`](crate::auth::Authenticator) refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// no `Authorization` header
    Missing,
    /// header present but not in the scheme's format
    Malformed,
    /// well-formed credentials that do not match a known user
    Rejected,
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthErrorKind::Missing => f.write_str("authentication required"),
            AuthErrorKind::Malformed => f.write_str("malformed authorization header"),
            AuthErrorKind::Rejected => f.write_str("invalid credentials"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{kind} for realm \"{realm}\"")]
pub struct AuthError {
    kind: AuthErrorKind,
    scheme: &'static str,
    realm: String,
}

impl AuthError {
    pub fn new(kind: AuthErrorKind, scheme: &'static str, realm: impl Into<String>) -> Self {
        Self { kind, scheme, realm: realm.into() }
    }

    pub fn kind(&self) -> AuthErrorKind {
        self.kind
    }

    pub fn scheme(&self) -> &'static str {
        self.scheme
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Value for a `WWW-Authenticate` response header.
    pub fn challenge(&self) -> String {
        format!("{} realm=\"{}\"", self.scheme, self.realm)
    }
}

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("could not route request `{path}` to any controller")]
    NoController { path: String },

    #[error("controller `{id}` is not registered")]
    UnknownController { id: String },

    #[error("cannot forward to `{path}`: {reason}")]
    InvalidForwardPath { path: String, reason: String },

    #[error("forward chain exceeded {max_depth} controllers")]
    ForwardLoop { max_depth: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("entry point `{entry_point}` does not exist in controller `{controller}`")]
    UnknownEntryPoint { controller: String, entry_point: String },
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("request error: {0}")]
    Parse(#[from] ParseError),

    #[error("response error: {0}")]
    Send(#[from] SendError),

    #[error("controller error: {0}")]
    Controller(#[source] Box<dyn Error + Send + Sync>),

    /// Returned by [`Context::redirect`](crate::Context::redirect) to stop the
    /// running controller. Construction treats it as normal completion.
    #[error("controller halted")]
    Halted,
}

impl DispatchError {
    /// Wraps an application error raised by a controller.
    pub fn controller<E: Into<Box<dyn Error + Send + Sync>>>(e: E) -> Self {
        Self::Controller(e.into())
    }

    pub fn is_halted(&self) -> bool {
        matches!(self, Self::Halted)
    }

    /// The status a transport should answer with when dispatch fails with this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Parse(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<http::Error> for DispatchError {
    fn from(e: http::Error) -> Self {
        Self::Send(SendError::invalid_header(e))
    }
}
