use crate::auth::{AuthUser, Authenticator};
use crate::error::{AuthError, AuthErrorKind};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

const SCHEME: &str = "Basic";

type UnauthorizedCallback = Box<dyn Fn(&AuthError) + Send + Sync>;

/// HTTP `Basic` authentication over a fixed user table.
///
/// # Example
///
/// ```
/// use vireo_web::auth::{Authenticator, HttpBasic};
///
/// let gate = HttpBasic::new("back office").user("ada", "lovelace");
///
/// // "ada:lovelace"
/// assert!(gate.authenticate(Some("Basic YWRhOmxvdmVsYWNl")).is_ok());
/// assert!(gate.authenticate(None).is_err());
/// ```
pub struct HttpBasic {
    realm: String,
    users: HashMap<String, AuthUser>,
    unauthorized: Option<UnauthorizedCallback>,
}

impl HttpBasic {
    pub fn new(realm: impl Into<String>) -> Self {
        Self { realm: realm.into(), users: HashMap::new(), unauthorized: None }
    }

    /// Adds or replaces a user.
    #[must_use]
    pub fn user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        let user = AuthUser::new(username, password);
        self.users.insert(user.username().to_string(), user);
        self
    }

    /// Sets a callback invoked with every refusal, before the error is returned.
    #[must_use]
    pub fn unauthorized<F>(mut self, callback: F) -> Self
    where
        F: Fn(&AuthError) + Send + Sync + 'static,
    {
        self.unauthorized = Some(Box::new(callback));
        self
    }

    pub fn users(&self) -> impl Iterator<Item = &AuthUser> {
        self.users.values()
    }

    fn refuse(&self, kind: AuthErrorKind) -> AuthError {
        let error = AuthError::new(kind, SCHEME, self.realm.as_str());
        warn!(realm = %self.realm, reason = %kind, "basic authentication refused");
        if let Some(callback) = &self.unauthorized {
            callback(&error);
        }
        error
    }
}

/// Splits `Basic <base64>` into username and password.
fn decode_credentials(authorization: &str) -> Option<(String, String)> {
    let (scheme, encoded) = authorization.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case(SCHEME) {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

impl Authenticator for HttpBasic {
    fn realm(&self) -> &str {
        &self.realm
    }

    fn authenticate(&self, authorization: Option<&str>) -> Result<(), AuthError> {
        let Some(authorization) = authorization.filter(|value| !value.trim().is_empty()) else {
            return Err(self.refuse(AuthErrorKind::Missing));
        };

        let Some((username, password)) = decode_credentials(authorization) else {
            return Err(self.refuse(AuthErrorKind::Malformed));
        };

        match self.users.get(&username) {
            Some(user) if user.password() == password => {
                debug!(realm = %self.realm, username = %username, "basic authentication accepted");
                Ok(())
            }
            _ => Err(self.refuse(AuthErrorKind::Rejected)),
        }
    }
}

impl fmt::Debug for HttpBasic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBasic")
            .field("realm", &self.realm)
            .field("users", &self.users.keys().collect::<Vec<_>>())
            .field("unauthorized", &self.unauthorized.is_some())
            .finish()
    }
}
