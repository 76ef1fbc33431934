//! Pattern routing, controller dispatch and content negotiation for vireo.
//!
//! The pipeline for one request is synchronous and runs to completion on the
//! calling thread:
//!
//! 1. the [`Router`] tries its [`Route`]s in registration order
//! 2. the first matching route checks its authentication gate, if any, and
//!    resolves a controller identifier, either fixed or derived from the path
//! 3. the controller is built from the [`ControllerRegistry`] and run
//! 4. the [`ResponseNegotiator`] serializes the response onto a
//!   [`Transport`](vireo_http::transport::Transport)
//!
//! A router is configured once at startup and is then shared read-only between
//! threads; every dispatch owns its request, response and controllers.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use vireo_web::auth::HttpBasic;
//! use vireo_web::{Context, Controller, ControllerRegistry, DispatchError, Router};
//!
//! #[derive(Default)]
//! struct Dashboard;
//!
//! impl Controller for Dashboard {
//!     fn run(&mut self, ctx: &mut Context<'_>) -> Result<(), DispatchError> {
//!         ctx.response().set_body("welcome back");
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = ControllerRegistry::new();
//! registry.register::<Dashboard>("Admin\\Dashboard").unwrap();
//!
//! let mut router = Router::new(registry);
//! router
//!     .route("/admin/*", "Admin\\*")
//!     .unwrap()
//!     .with_authentication(Arc::new(HttpBasic::new("admin").user("ada", "lovelace")));
//!
//! let request = http::Request::get("/admin/dashboard").body(bytes::Bytes::new()).unwrap();
//! assert_eq!(router.respond(request).status(), 401);
//! ```

pub mod auth;
pub mod controller;
pub mod error;
pub mod negotiator;
pub mod router;

pub use controller::{Context, Controller, ControllerHandle, ControllerRegistry, EntryPoint, SharedResponse};
pub use error::{AuthError, ConfigError, DispatchError, RoutingError, ValidationError};
pub use negotiator::ResponseNegotiator;
pub use router::{PathPattern, Route, Router};
