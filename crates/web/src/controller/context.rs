use crate::controller::{ControllerHandle, SharedResponse};
use crate::error::{DispatchError, RoutingError};
use crate::router::Router;
use http::{Method, StatusCode, Uri, header};
use std::cell::RefMut;
use std::rc::Rc;
use tracing::debug;
use vireo_http::protocol::{Payload, Request, Response};

/// What a running controller sees: the request, the in-progress response and the
/// router that dispatched it.
///
/// The response is borrowed on demand through [`output`](Self::output) and
/// [`response`](Self::response). Drop those guards before forwarding, since the
/// forwarded controller writes into the same response.
pub struct Context<'r> {
    router: &'r Router,
    request: Rc<Request>,
    response: SharedResponse,
    entry_point: Option<&'static str>,
    depth: usize,
}

impl<'r> Context<'r> {
    pub(crate) fn new(
        router: &'r Router,
        request: Rc<Request>,
        response: SharedResponse,
        entry_point: Option<&'static str>,
        depth: usize,
    ) -> Self {
        Self { router, request, response, entry_point, depth }
    }

    pub fn router(&self) -> &'r Router {
        self.router
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// The request payload.
    pub fn input(&self) -> &Payload {
        self.request.payload()
    }

    /// The response payload.
    ///
    /// # Panics
    ///
    /// Panics if the response is already borrowed through another guard.
    pub fn output(&self) -> RefMut<'_, Payload> {
        RefMut::map(self.response.borrow_mut(), Response::payload_mut)
    }

    /// The in-progress response.
    ///
    /// # Panics
    ///
    /// Panics if the response is already borrowed through another guard.
    pub fn response(&self) -> RefMut<'_, Response> {
        self.response.borrow_mut()
    }

    /// The entry point this controller was constructed with.
    pub fn entry_point(&self) -> Option<&'static str> {
        self.entry_point
    }

    /// Re-dispatches the current request to `path` without authentication.
    ///
    /// Headers, payload and body are carried over; `method` replaces the request
    /// method when given. The target controller writes into this controller's
    /// response.
    ///
    /// # Errors
    ///
    /// Returns error if `path` is not a valid URI, if no controller resolves for it,
    /// or if the target controller fails. Returns [`DispatchError::Halted`] if the
    /// target controller redirected, so `?` stops this controller as well.
    pub fn forward(&mut self, path: &str, method: Option<Method>) -> Result<ControllerHandle<'r>, DispatchError> {
        self.forward_with(path, method, true)
    }

    /// Like [`forward`](Self::forward), with explicit control over authentication.
    ///
    /// # Errors
    ///
    /// See [`forward`](Self::forward). An authentication gate on the target route
    /// may also refuse the request when `bypass_auth` is false.
    pub fn forward_with(
        &mut self,
        path: &str,
        method: Option<Method>,
        bypass_auth: bool,
    ) -> Result<ControllerHandle<'r>, DispatchError> {
        if !path.starts_with('/') {
            return Err(RoutingError::InvalidForwardPath {
                path: path.to_string(),
                reason: "path must be absolute".to_string(),
            }
            .into());
        }
        let uri = path
            .parse::<Uri>()
            .map_err(|e| RoutingError::InvalidForwardPath { path: path.to_string(), reason: e.to_string() })?;

        debug!(from = self.request.path(), to = uri.path(), bypass_auth, "forwarding request");
        let request = Rc::new(self.request.forwarded(method, Some(uri)));
        let handle = self.router.dispatch_with(request, bypass_auth, Rc::clone(&self.response), self.depth + 1)?;
        halt_if_redirected(handle)
    }

    /// Constructs controller `id` directly, skipping route resolution and
    /// authentication, optionally through one of its entry points.
    ///
    /// # Errors
    ///
    /// Returns error if `id` is not registered, if `entry_point` is not declared by
    /// that controller, or if the controller fails. Returns
    /// [`DispatchError::Halted`] if the controller redirected.
    pub fn forward_to_controller(
        &mut self,
        id: &str,
        entry_point: Option<&str>,
    ) -> Result<ControllerHandle<'r>, DispatchError> {
        debug!(from = self.request.path(), controller = id, entry_point, "forwarding to controller");
        let handle =
            self.router.instantiate(id, Rc::clone(&self.request), Rc::clone(&self.response), entry_point, self.depth + 1)?;
        halt_if_redirected(handle)
    }

    /// Points the client at `url` and stops the running controller.
    ///
    /// The status is replaced when given, otherwise the current status is kept.
    /// Always returns `Err`, so `ctx.redirect(..)?` ends `run` right there; the
    /// router treats the halt as a normal completion.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Halted`], or a header error if `url` is not a valid
    /// header value.
    pub fn redirect(&mut self, url: &str, status: Option<StatusCode>) -> Result<(), DispatchError> {
        let mut response = self.response.borrow_mut();
        if let Some(status) = status {
            response.set_status(status);
        }
        response.header(header::LOCATION, url)?;

        debug!(location = url, status = response.status().as_u16(), "redirecting");
        Err(DispatchError::Halted)
    }
}

/// A redirect further down the chain ends the forwarding controller too.
fn halt_if_redirected(handle: ControllerHandle<'_>) -> Result<ControllerHandle<'_>, DispatchError> {
    if handle.is_halted() {
        debug!(controller = handle.id(), "forwarded controller redirected, halting");
        return Err(DispatchError::Halted);
    }
    Ok(handle)
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("method", self.request.method())
            .field("path", &self.request.path())
            .field("entry_point", &self.entry_point)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}
