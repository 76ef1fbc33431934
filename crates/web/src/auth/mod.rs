//! Authentication gates for routes.
//!
//! A route may carry an [`Authenticator`]. When the route matches a request, the
//! gate is handed the raw `Authorization` header value before any controller is
//! resolved; a refusal aborts the whole dispatch instead of moving on to the next
//! route.
//!
//! [`HttpBasic`] implements the `Basic` scheme over a table of [`AuthUser`]s.

mod basic;

pub use basic::HttpBasic;

use crate::error::AuthError;

/// A strategy that accepts or refuses the credentials of a request.
///
/// Gates are shared by every request dispatched through a router, so they must be
/// `Send + Sync`.
pub trait Authenticator: Send + Sync {
    /// The protection space reported back to clients.
    fn realm(&self) -> &str;

    /// Checks the raw `Authorization` header value, `None` when the header is absent.
    fn authenticate(&self, authorization: Option<&str>) -> Result<(), AuthError>;
}

/// A username and password pair known to a gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    username: String,
    password: String,
}

impl AuthUser {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}
