use crate::controller::SharedResponse;
use crate::router::Router;
use std::any::Any;
use std::cell::Ref;
use std::fmt;
use std::rc::Rc;
use vireo_http::protocol::{Request, Response, SendError};
use vireo_http::transport::Transport;

/// A controller that has been constructed and run.
///
/// Dispatch hands one of these back once the controller chain is complete. The
/// response it exposes is final unless the caller keeps writing to it.
pub struct ControllerHandle<'r> {
    router: &'r Router,
    id: String,
    request: Rc<Request>,
    response: SharedResponse,
    controller: Box<dyn Any>,
    halted: bool,
}

impl<'r> ControllerHandle<'r> {
    pub(crate) fn new(
        router: &'r Router,
        id: String,
        request: Rc<Request>,
        response: SharedResponse,
        controller: Box<dyn Any>,
        halted: bool,
    ) -> Self {
        Self { router, id, request, response, controller, halted }
    }

    /// The controller identifier in its registered spelling.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn response(&self) -> Ref<'_, Response> {
        self.response.borrow()
    }

    /// Returns true if the chain stopped at a redirect, in this controller or in
    /// one it forwarded to.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Returns the controller if it is of type `C`.
    pub fn downcast_ref<C: Any>(&self) -> Option<&C> {
        self.controller.downcast_ref::<C>()
    }

    /// Serializes the response through the router's negotiator onto `transport`.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or a transport write fails.
    pub fn send(&self, transport: &mut dyn Transport) -> Result<(), SendError> {
        let mut response = self.response.borrow_mut();
        self.router.negotiator().send(&mut response, &self.request, transport)
    }

    /// Takes the response out of the chain.
    pub fn into_response(self) -> Response {
        Rc::try_unwrap(self.response).map_or_else(|shared| shared.borrow().clone(), std::cell::RefCell::into_inner)
    }
}

impl fmt::Debug for ControllerHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerHandle")
            .field("id", &self.id)
            .field("path", &self.request.path())
            .field("status", &self.response.borrow().status())
            .field("halted", &self.halted)
            .finish_non_exhaustive()
    }
}
