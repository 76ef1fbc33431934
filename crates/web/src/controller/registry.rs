use crate::controller::{Context, Controller};
use crate::error::{DispatchError, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

static CONTROLLER_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+(\\[A-Za-z0-9_]+)*$").expect("controller id grammar must compile"));

static ENTRY_POINT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("entry point grammar must compile"));

/// A finished controller and whether it stopped at a redirect.
pub(crate) type Constructed = (Box<dyn Any>, bool);

type Construct = Box<dyn Fn(&mut Context<'_>) -> Result<Constructed, DispatchError> + Send + Sync>;

/// A controller type known to the registry.
pub(crate) struct Registration {
    id: String,
    entry_points: Vec<&'static str>,
    construct: Construct,
}

impl Registration {
    /// The identifier as it was registered.
    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn entry_point(&self, name: &str) -> Option<&'static str> {
        self.entry_points.iter().copied().find(|candidate| *candidate == name)
    }

    /// Builds the controller and runs it to completion. A redirect counts as
    /// completion and is reported in the returned flag.
    pub(crate) fn construct(&self, ctx: &mut Context<'_>) -> Result<Constructed, DispatchError> {
        (self.construct)(ctx)
    }
}

/// Maps controller identifiers to factories.
///
/// Identifiers are backslash separated namespace paths such as
/// `App\Users\Profile`. Lookups ignore ASCII case.
#[derive(Default)]
pub struct ControllerRegistry {
    controllers: HashMap<String, Registration>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers controller type `C` under `id`, built with `C::default()`.
    ///
    /// # Errors
    ///
    /// See [`register_with`](Self::register_with).
    pub fn register<C>(&mut self, id: &str) -> Result<&mut Self, ValidationError>
    where
        C: Controller + Default,
    {
        self.register_with(id, C::default)
    }

    /// Registers controller type `C` under `id`, built by `factory`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `id` is not a backslash separated list of word segments
    /// - `id` is already registered, ignoring case
    /// - an entry point of `C` has an illegal name or appears twice
    pub fn register_with<C, F>(&mut self, id: &str, factory: F) -> Result<&mut Self, ValidationError>
    where
        C: Controller,
        F: Fn() -> C + Send + Sync + 'static,
    {
        let id = id.trim_start_matches('\\');
        if !CONTROLLER_ID.is_match(id) {
            return Err(ValidationError::IllegalTarget { target: id.to_string() });
        }

        let key = id.to_ascii_lowercase();
        if self.controllers.contains_key(&key) {
            return Err(ValidationError::DuplicateController { id: id.to_string() });
        }

        let mut entry_points = Vec::with_capacity(C::ENTRY_POINTS.len());
        for (name, _) in C::ENTRY_POINTS {
            if !ENTRY_POINT_NAME.is_match(name) || entry_points.contains(name) {
                return Err(ValidationError::IllegalEntryPoint { id: id.to_string(), entry_point: *name });
            }
            entry_points.push(*name);
        }

        let construct: Construct = Box::new(move |ctx: &mut Context<'_>| {
            let mut controller = factory();
            match controller.run(ctx) {
                Ok(()) => Ok((Box::new(controller) as Box<dyn Any>, false)),
                Err(DispatchError::Halted) => Ok((Box::new(controller) as Box<dyn Any>, true)),
                Err(e) => Err(e),
            }
        });

        debug!(controller = id, entry_points = entry_points.len(), "registered controller");
        self.controllers.insert(key, Registration { id: id.to_string(), entry_points, construct });
        Ok(self)
    }

    /// Returns true if `id` is registered, ignoring case.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Registered identifiers in their registered spelling, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.controllers.values().map(Registration::id)
    }

    pub(crate) fn get(&self, id: &str) -> Option<&Registration> {
        self.controllers.get(&id.trim_start_matches('\\').to_ascii_lowercase())
    }
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.ids()).finish()
    }
}
