//! Ordered routing of requests to controllers.
//!
//! Routes are tried in registration order and the first one that resolves a
//! controller wins, even when a later route would also match. A route whose
//! pattern does not match is skipped; an authentication refusal is not, it ends
//! the dispatch. When no route resolves, the router level fallback controller is
//! used if one is set.
//!
//! ```
//! use vireo_web::{Context, Controller, ControllerRegistry, DispatchError, Router};
//! use bytes::Bytes;
//!
//! #[derive(Default)]
//! struct Orders;
//!
//! impl Controller for Orders {
//!     fn run(&mut self, ctx: &mut Context<'_>) -> Result<(), DispatchError> {
//!         ctx.output().set("count", 3);
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = ControllerRegistry::new();
//! registry.register::<Orders>("App\\Shop\\Orders").unwrap();
//!
//! let mut router = Router::new(registry);
//! router.route("/shop/*", "App\\Shop\\*").unwrap();
//!
//! let request = http::Request::get("/shop/orders").header("accept", "application/json").body(Bytes::new()).unwrap();
//! let response = router.respond(request);
//! assert_eq!(response.status(), 200);
//! assert_eq!(response.body().as_ref(), br#"{"count":3}"#);
//! ```

mod pattern;
mod route;

pub use pattern::PathPattern;
pub use route::Route;

use crate::controller::{Context, ControllerHandle, ControllerRegistry, SharedResponse};
use crate::error::{ConfigError, DispatchError, RoutingError, ValidationError};
use crate::negotiator::ResponseNegotiator;
use bytes::Bytes;
use http::{HeaderValue, Method, header};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, error, warn};
use vireo_http::protocol::{Request, Response};
use vireo_http::transport::ResponseCollector;

/// How many controllers one forward chain may construct.
pub const MAX_FORWARD_DEPTH: usize = 32;

#[derive(Debug)]
pub struct Router {
    routes: Vec<Route>,
    fallback: Option<String>,
    negotiator: ResponseNegotiator,
    registry: Arc<ControllerRegistry>,
}

impl Router {
    pub fn new(registry: ControllerRegistry) -> Self {
        Self { routes: Vec::new(), fallback: None, negotiator: ResponseNegotiator::new(), registry: Arc::new(registry) }
    }

    /// Appends a route binding `path` to `target`, a controller identifier or a
    /// namespace ending in `\*`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `path` is empty or contains characters outside the path grammar
    /// - `target` contains characters outside the identifier grammar
    /// - `target` is a namespace and `path` does not end with `/*`
    pub fn route(&mut self, path: &str, target: &str) -> Result<&mut Route, ValidationError> {
        let id = self.routes.len() + 1;
        let route = Route::new(id, Arc::clone(&self.registry), path, target)?;
        debug!(route_id = id, path = route.path(), controller = %route.controller(), "registered route");

        self.routes.push(route);
        Ok(&mut self.routes[id - 1])
    }

    /// Sets the controller used when no route resolves.
    ///
    /// # Errors
    ///
    /// Returns error if `controller` is not registered.
    pub fn fallback_controller(&mut self, controller: &str) -> Result<&mut Self, ValidationError> {
        if !self.registry.contains(controller) {
            return Err(ValidationError::UnknownController { id: controller.to_string() });
        }
        self.fallback = Some(controller.to_string());
        Ok(self)
    }

    pub fn routes_count(&self) -> usize {
        self.routes.len()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn registry(&self) -> &ControllerRegistry {
        &self.registry
    }

    pub fn negotiator(&self) -> &ResponseNegotiator {
        &self.negotiator
    }

    pub fn negotiator_mut(&mut self) -> &mut ResponseNegotiator {
        &mut self.negotiator
    }

    /// Resolves, constructs and runs the controller for `request`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - an authentication gate refuses the request and `bypass_auth` is false
    /// - no route resolves and no fallback controller is set
    /// - the resolved identifier is not registered
    /// - the controller, or a controller it forwards to, fails
    pub fn dispatch(&self, request: Request, bypass_auth: bool) -> Result<ControllerHandle<'_>, DispatchError> {
        self.dispatch_with(Rc::new(request), bypass_auth, Rc::new(RefCell::new(Response::new())), 0)
    }

    /// Ingests a wire-level request and dispatches it. `OPTIONS` requests bypass
    /// authentication.
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be decoded, or see [`dispatch`](Self::dispatch).
    pub fn handle(&self, request: http::Request<Bytes>) -> Result<ControllerHandle<'_>, DispatchError> {
        let request = Request::from_http(request)?;
        let bypass_auth = *request.method() == Method::OPTIONS;
        self.dispatch(request, bypass_auth)
    }

    /// Handles a wire-level request end to end, mapping failures onto error
    /// responses: 401 with a challenge for refused credentials, 400 for
    /// undecodable requests and 500 for everything else.
    pub fn respond(&self, request: http::Request<Bytes>) -> http::Response<Bytes> {
        let mut collector = ResponseCollector::new();
        let result =
            self.handle(request).and_then(|handle| handle.send(&mut collector).map_err(DispatchError::from));

        match result {
            Ok(()) => collector.into_response(),
            Err(e) => error_response(&e),
        }
    }

    pub(crate) fn dispatch_with(
        &self,
        request: Rc<Request>,
        bypass_auth: bool,
        response: SharedResponse,
        depth: usize,
    ) -> Result<ControllerHandle<'_>, DispatchError> {
        let id = self.resolve(&request, bypass_auth)?;
        self.instantiate(&id, request, response, None, depth)
    }

    fn resolve(&self, request: &Request, bypass_auth: bool) -> Result<String, DispatchError> {
        for route in &self.routes {
            if let Some(id) = route.try_resolve(request, bypass_auth)? {
                debug!(route_id = route.id(), path = request.path(), controller = %id, "route matched");
                return Ok(id);
            }
        }

        if let Some(fallback) = &self.fallback {
            debug!(path = request.path(), controller = %fallback, "no route matched, using fallback controller");
            return Ok(fallback.clone());
        }

        error!(method = %request.method(), path = request.path(), "no controller for request");
        Err(RoutingError::NoController { path: request.path().to_string() }.into())
    }

    pub(crate) fn instantiate(
        &self,
        id: &str,
        request: Rc<Request>,
        response: SharedResponse,
        entry_point: Option<&str>,
        depth: usize,
    ) -> Result<ControllerHandle<'_>, DispatchError> {
        if depth > MAX_FORWARD_DEPTH {
            error!(controller = id, depth, "forward chain too deep");
            return Err(RoutingError::ForwardLoop { max_depth: MAX_FORWARD_DEPTH }.into());
        }

        let Some(registration) = self.registry.get(id) else {
            error!(controller = id, path = request.path(), "resolved controller is not registered");
            return Err(RoutingError::UnknownController { id: id.to_string() }.into());
        };

        let entry_point = match entry_point {
            Some(name) => Some(registration.entry_point(name).ok_or_else(|| ConfigError::UnknownEntryPoint {
                controller: registration.id().to_string(),
                entry_point: name.to_string(),
            })?),
            None => None,
        };

        let mut ctx = Context::new(self, Rc::clone(&request), Rc::clone(&response), entry_point, depth);
        let (controller, halted) = registration.construct(&mut ctx)?;

        Ok(ControllerHandle::new(self, registration.id().to_string(), request, response, controller, halted))
    }
}

fn error_response(e: &DispatchError) -> http::Response<Bytes> {
    let status = e.status_code();
    if status.is_server_error() {
        error!(status = status.as_u16(), error = %e, "request failed");
    } else {
        warn!(status = status.as_u16(), error = %e, "request refused");
    }

    let mut response = http::Response::new(Bytes::from(e.to_string()));
    *response.status_mut() = status;
    response.headers_mut().insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));

    if let DispatchError::Auth(auth) = e
        && let Ok(challenge) = HeaderValue::from_str(&auth.challenge())
    {
        response.headers_mut().insert(header::WWW_AUTHENTICATE, challenge);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::{MAX_FORWARD_DEPTH, Router};
    use crate::auth::HttpBasic;
    use crate::controller::{Context, Controller, ControllerRegistry, EntryPoint};
    use crate::error::{ConfigError, DispatchError, RoutingError, ValidationError};
    use bytes::Bytes;
    use http::{HeaderMap, Method, StatusCode, Uri, header};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vireo_http::protocol::{Payload, Request};

    /// Records its own name in the response.
    struct Tag(&'static str);

    impl Controller for Tag {
        fn run(&mut self, ctx: &mut Context<'_>) -> Result<(), DispatchError> {
            ctx.output().set(self.0, true);
            ctx.output().set("last", self.0);
            Ok(())
        }
    }

    struct Forward(&'static str);

    impl Controller for Forward {
        fn run(&mut self, ctx: &mut Context<'_>) -> Result<(), DispatchError> {
            ctx.output().set("forwarder", true);
            ctx.forward(self.0, None)?;
            Ok(())
        }
    }

    #[derive(Default)]
    struct Redirect;

    impl Controller for Redirect {
        fn run(&mut self, ctx: &mut Context<'_>) -> Result<(), DispatchError> {
            ctx.redirect("/login", Some(StatusCode::FOUND))?;
            ctx.output().set("after_redirect", true);
            Ok(())
        }
    }

    #[derive(Default)]
    struct Failing;

    impl Controller for Failing {
        fn run(&mut self, _ctx: &mut Context<'_>) -> Result<(), DispatchError> {
            Err(DispatchError::controller("database unavailable"))
        }
    }

    #[derive(Default)]
    struct Account {
        closed: bool,
    }

    impl Account {
        fn close(&mut self, ctx: &mut Context<'_>) -> Result<(), DispatchError> {
            self.closed = true;
            ctx.output().set("action", "close");
            Ok(())
        }
    }

    impl Controller for Account {
        const ENTRY_POINTS: &'static [(&'static str, EntryPoint<Self>)] = &[("close", Self::close)];

        fn run(&mut self, ctx: &mut Context<'_>) -> Result<(), DispatchError> {
            if let Some(result) = self.call_entry_point(ctx) {
                return result;
            }
            ctx.output().set("action", "show");
            Ok(())
        }
    }

    struct Delegate(Option<&'static str>);

    impl Controller for Delegate {
        fn run(&mut self, ctx: &mut Context<'_>) -> Result<(), DispatchError> {
            ctx.response().set_status(StatusCode::ACCEPTED);
            ctx.forward_to_controller("app\\account", self.0)?;
            Ok(())
        }
    }

    fn registry() -> ControllerRegistry {
        let mut registry = ControllerRegistry::new();
        registry
            .register_with("App\\Home", || Tag("home"))
            .unwrap()
            .register_with("App\\First", || Tag("first"))
            .unwrap()
            .register_with("App\\Second", || Tag("second"))
            .unwrap()
            .register_with("App\\Admin", || Tag("admin"))
            .unwrap()
            .register_with("App\\NotFound", || Tag("not_found"))
            .unwrap()
            .register_with("App\\Users\\42\\Profile", || Tag("profile"))
            .unwrap()
            .register_with("App\\Controllers\\Orders\\List", || Tag("orders"))
            .unwrap()
            .register_with("App\\Public", || Forward("/admin/panel"))
            .unwrap()
            .register_with("App\\Loop", || Forward("/loop"))
            .unwrap()
            .register_with("App\\Close", || Delegate(Some("close")))
            .unwrap()
            .register_with("App\\Bogus", || Delegate(Some("delete")))
            .unwrap()
            .register::<Redirect>("App\\Redirect")
            .unwrap()
            .register::<Failing>("App\\Failing")
            .unwrap()
            .register::<Account>("App\\Account")
            .unwrap();
        registry
    }

    fn request(method: Method, path: &str) -> Request {
        Request::new(method, path.parse::<Uri>().unwrap(), HeaderMap::new(), Payload::new(), Bytes::new())
    }

    fn get(path: &str) -> Request {
        request(Method::GET, path)
    }

    fn refusals(router: &mut Router, path: &str) -> Arc<AtomicUsize> {
        let refusals = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&refusals);
        let gate = HttpBasic::new("admin").user("ada", "lovelace").unauthorized(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        router.route(path, "App\\Admin").unwrap().with_authentication(Arc::new(gate));
        refusals
    }

    #[test]
    fn test_route_ids_are_sequential() {
        let mut router = Router::new(registry());
        router.route("/", "App\\Home").unwrap();
        router.route("/shop/*", "App\\Controllers\\*").unwrap();

        assert_eq!(router.routes_count(), 2);
        assert_eq!(router.routes().iter().map(|route| route.id()).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(router.routes()[1].path(), "/shop/*");
    }

    #[test]
    fn test_invalid_route_not_registered() {
        let mut router = Router::new(registry());

        assert!(matches!(router.route("/a?b", "App\\Home"), Err(ValidationError::IllegalPath { .. })));
        assert!(matches!(router.route("/a", "App\\*"), Err(ValidationError::WildcardMismatch { .. })));
        assert_eq!(router.routes_count(), 0);
    }

    #[test]
    fn test_first_registered_route_wins() {
        let mut router = Router::new(registry());
        router.route("/a/*", "App\\First").unwrap();
        router.route("/a/b", "App\\Second").unwrap();

        for path in ["/a/b", "/a/b/", "/A/B"] {
            let handle = router.dispatch(get(path), false).unwrap();
            assert_eq!(handle.id(), "App\\First", "{path}");
        }
    }

    #[test]
    fn test_namespace_route_resolves_derived_controller() {
        let mut router = Router::new(registry());
        router.route("/shop/*", "App\\Controllers\\*").unwrap();

        let handle = router.dispatch(get("/shop/orders/list?page=2"), false).unwrap();

        assert_eq!(handle.id(), "App\\Controllers\\Orders\\List");
        assert_eq!(handle.response().payload().get_str("last"), Some("orders"));
        assert!(handle.downcast_ref::<Tag>().is_some());
    }

    #[test]
    fn test_numeric_segment_passes_through() {
        let mut router = Router::new(registry());
        router.route("/users/*", "App\\Users\\*").unwrap();

        let handle = router.dispatch(get("/users/42/profile"), false).unwrap();
        assert_eq!(handle.id(), "App\\Users\\42\\Profile");
    }

    #[test]
    fn test_unresolved_namespace_uses_router_fallback() {
        let mut router = Router::new(registry());
        router.route("/users/*", "App\\Users\\*").unwrap();
        router.fallback_controller("App\\NotFound").unwrap();

        let handle = router.dispatch(get("/users/43/profile"), false).unwrap();
        assert_eq!(handle.id(), "App\\NotFound");
    }

    #[test]
    fn test_no_controller() {
        let mut router = Router::new(registry());
        router.route("/users/*", "App\\Users\\*").unwrap();

        let error = router.dispatch(get("/users/43/profile"), false).unwrap_err();
        assert!(matches!(error, DispatchError::Routing(RoutingError::NoController { .. })));
        assert!(matches!(router.fallback_controller("App\\Nope"), Err(ValidationError::UnknownController { .. })));
    }

    #[test]
    fn test_unregistered_fixed_target_fails_at_dispatch() {
        let mut router = Router::new(registry());
        router.route("/ghost", "App\\Ghost").unwrap();

        let error = router.dispatch(get("/ghost"), false).unwrap_err();
        assert!(matches!(error, DispatchError::Routing(RoutingError::UnknownController { .. })));
    }

    #[test]
    fn test_auth_failure_halts_iteration() {
        let mut router = Router::new(registry());
        let refusals = refusals(&mut router, "/admin/*");
        router.route("/*", "App\\Home").unwrap();

        let error = router.dispatch(get("/admin/panel"), false).unwrap_err();

        assert!(matches!(error, DispatchError::Auth(_)));
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(refusals.load(Ordering::SeqCst), 1);
        assert_eq!(router.dispatch(get("/elsewhere"), false).unwrap().id(), "App\\Home");
    }

    #[test]
    fn test_forward_bypasses_authentication() {
        let mut router = Router::new(registry());
        let refusals = refusals(&mut router, "/admin/*");
        router.route("/public", "App\\Public").unwrap();

        let handle = router.dispatch(get("/public"), false).unwrap();
        let response = handle.response();

        assert_eq!(refusals.load(Ordering::SeqCst), 0);
        assert_eq!(response.payload().get_str("last"), Some("admin"));
        assert!(response.payload().has("forwarder"));
    }

    #[test]
    fn test_forward_with_authentication() {
        struct StrictForward;

        impl Controller for StrictForward {
            fn run(&mut self, ctx: &mut Context<'_>) -> Result<(), DispatchError> {
                ctx.forward_with("/admin/panel", Some(Method::POST), false)?;
                Ok(())
            }
        }

        let mut registry = registry();
        registry.register_with("App\\Strict", || StrictForward).unwrap();
        let mut router = Router::new(registry);
        let refusals = refusals(&mut router, "/admin/*");
        router.route("/strict", "App\\Strict").unwrap();

        assert!(matches!(router.dispatch(get("/strict"), false), Err(DispatchError::Auth(_))));
        assert_eq!(refusals.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_forward_loop_is_cut() {
        let mut router = Router::new(registry());
        router.route("/loop", "App\\Loop").unwrap();

        let error = router.dispatch(get("/loop"), false).unwrap_err();
        assert!(matches!(error, DispatchError::Routing(RoutingError::ForwardLoop { max_depth: MAX_FORWARD_DEPTH })));
    }

    #[test]
    fn test_forward_to_controller_entry_point_shares_response() {
        let mut router = Router::new(registry());
        router.route("/close", "App\\Close").unwrap();

        let handle = router.dispatch(get("/close"), false).unwrap();

        assert_eq!(handle.id(), "App\\Close");
        let response = handle.into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.payload().get_str("action"), Some("close"));
    }

    #[test]
    fn test_unknown_entry_point() {
        let mut router = Router::new(registry());
        router.route("/bogus", "App\\Bogus").unwrap();

        let error = router.dispatch(get("/bogus"), false).unwrap_err();
        assert!(matches!(error, DispatchError::Config(ConfigError::UnknownEntryPoint { .. })));
    }

    #[test]
    fn test_redirect_stops_controller() {
        let mut router = Router::new(registry());
        router.route("/old", "App\\Redirect").unwrap();

        let handle = router.dispatch(get("/old"), false).unwrap();
        let response = handle.response();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/login");
        assert!(!response.payload().has("after_redirect"));
    }

    #[test]
    fn test_controller_error_propagates() {
        let mut router = Router::new(registry());
        router.route("/fail", "App\\Failing").unwrap();

        let error = router.dispatch(get("/fail"), false).unwrap_err();
        assert!(matches!(error, DispatchError::Controller(_)));
        assert_eq!(error.to_string(), "controller error: database unavailable");
    }

    #[test]
    fn test_respond_maps_errors() {
        let mut router = Router::new(registry());
        refusals(&mut router, "/admin/*");
        router.route("/", "App\\Home").unwrap();

        let wire = |method: Method, path: &str| http::Request::builder().method(method).uri(path).body(Bytes::new()).unwrap();

        let ok = router.respond(wire(Method::GET, "/"));
        assert_eq!(ok.status(), StatusCode::OK);

        let unauthorized = router.respond(wire(Method::GET, "/admin"));
        assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unauthorized.headers()[header::WWW_AUTHENTICATE], "Basic realm=\"admin\"");

        let preflight = router.respond(wire(Method::OPTIONS, "/admin"));
        assert_eq!(preflight.status(), StatusCode::OK);

        let unsupported = router.respond(wire(Method::PATCH, "/"));
        assert_eq!(unsupported.status(), StatusCode::BAD_REQUEST);

        let missing = router.respond(wire(Method::GET, "/nowhere"));
        assert_eq!(missing.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_router_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Router>();
    }

    #[test]
    fn test_dispatch_from_shared_router() {
        let mut router = Router::new(registry());
        router.route("/", "App\\Home").unwrap();
        let router = Arc::new(router);

        let workers = (0..4)
            .map(|_| {
                let router = Arc::clone(&router);
                std::thread::spawn(move || router.dispatch(get("/"), false).map(|handle| handle.id().to_string()).ok())
            })
            .collect::<Vec<_>>();

        for worker in workers {
            assert_eq!(worker.join().unwrap().as_deref(), Some("App\\Home"));
        }
    }

    #[test]
    fn test_request_method_reaches_controller() {
        struct Echo;

        impl Controller for Echo {
            fn run(&mut self, ctx: &mut Context<'_>) -> Result<(), DispatchError> {
                let method = ctx.request().method().to_string();
                ctx.output().set("method", method);
                Ok(())
            }
        }

        let mut registry = ControllerRegistry::new();
        registry.register_with("Echo", || Echo).unwrap();
        let mut router = Router::new(registry);
        router.route("/*", "Echo").unwrap();

        let handle = router.dispatch(request(Method::DELETE, "/items/3"), false).unwrap();
        assert_eq!(handle.response().payload().get_str("method"), Some("DELETE"));
    }
}
