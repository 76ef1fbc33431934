//! Controller lifecycle.
//!
//! A controller is the unit of application logic a route resolves to. The router
//! constructs it through the [`ControllerRegistry`] and runs it to completion
//! before [`Router::dispatch`](crate::Router::dispatch) returns; a controller is
//! never left unexecuted.
//!
//! Every controller of one dispatch chain writes into the same [`Response`]:
//! forwarding hands the in-progress response to the next controller instead of
//! starting a new one, so the chain accumulates into one final response.
//!
//! # Example
//!
//! ```
//! use vireo_web::{Context, Controller, ControllerRegistry, DispatchError, EntryPoint};
//!
//! #[derive(Default)]
//! struct Profile;
//!
//! impl Profile {
//!     fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), DispatchError> {
//!         ctx.output().set("updated", true);
//!         Ok(())
//!     }
//! }
//!
//! impl Controller for Profile {
//!     const ENTRY_POINTS: &'static [(&'static str, EntryPoint<Self>)] = &[("update", Self::update)];
//!
//!     fn run(&mut self, ctx: &mut Context<'_>) -> Result<(), DispatchError> {
//!         if let Some(result) = self.call_entry_point(ctx) {
//!             return result;
//!         }
//!         ctx.output().set("name", "ada");
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = ControllerRegistry::new();
//! registry.register::<Profile>("App\\Users\\Profile").unwrap();
//! assert!(registry.contains("app\\users\\profile"));
//! ```

mod context;
mod handle;
mod registry;

pub use context::Context;
pub use handle::ControllerHandle;
pub use registry::ControllerRegistry;

use crate::error::DispatchError;
use std::cell::RefCell;
use std::rc::Rc;
use vireo_http::protocol::Response;

/// The response shared by every controller of one dispatch chain.
pub type SharedResponse = Rc<RefCell<Response>>;

/// A named alternative entry into a controller.
pub type EntryPoint<C> = fn(&mut C, &mut Context<'_>) -> Result<(), DispatchError>;

/// The contract every request handler implements.
pub trait Controller: Sized + 'static {
    /// Entry points that [`Context::forward_to_controller`] may name, keyed by name.
    ///
    /// Names are checked when the controller type is registered.
    const ENTRY_POINTS: &'static [(&'static str, EntryPoint<Self>)] = &[];

    /// Runs the controller. Called exactly once, right after construction.
    ///
    /// # Errors
    ///
    /// Application errors are returned as [`DispatchError::Controller`] and propagate
    /// to whoever called dispatch.
    fn run(&mut self, ctx: &mut Context<'_>) -> Result<(), DispatchError>;

    /// Invokes the entry point this controller was constructed with, if any.
    fn call_entry_point(&mut self, ctx: &mut Context<'_>) -> Option<Result<(), DispatchError>> {
        let name = ctx.entry_point()?;
        let (_, entry_point) = Self::ENTRY_POINTS.iter().find(|(candidate, _)| *candidate == name)?;
        Some(entry_point(self, ctx))
    }
}
