use crate::auth::Authenticator;
use crate::controller::ControllerRegistry;
use crate::error::{AuthError, ValidationError};
use crate::router::PathPattern;
use http::header;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use vireo_http::protocol::Request;

const NAMESPACE_SEPARATOR: char = '\\';

static TARGET_SPEC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+(\\[A-Za-z0-9_]+)*(\\\*)?$").expect("target spec grammar must compile"));

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    /// a fixed controller identifier
    Controller(String),
    /// base namespace a controller identifier is derived under
    Namespace(String),
}

/// One path pattern bound to a controller, or to a namespace controllers are
/// looked up in.
///
/// Routes are created through [`Router::route`](crate::Router::route) and
/// configured with the chained builder methods below.
pub struct Route {
    id: usize,
    pattern: PathPattern,
    target: Target,
    ignored_indexes: BTreeSet<usize>,
    fallback: Option<String>,
    auth: Option<Arc<dyn Authenticator>>,
    registry: Arc<ControllerRegistry>,
}

impl Route {
    pub(crate) fn new(
        id: usize,
        registry: Arc<ControllerRegistry>,
        path: &str,
        target: &str,
    ) -> Result<Self, ValidationError> {
        let pattern = PathPattern::compile(path)?;

        let target = target.trim_start_matches(NAMESPACE_SEPARATOR);
        if !TARGET_SPEC.is_match(target) {
            return Err(ValidationError::IllegalTarget { target: target.to_string() });
        }

        let target = match target.strip_suffix("\\*") {
            Some(base) => {
                if !pattern.is_wildcard() {
                    return Err(ValidationError::WildcardMismatch {
                        path: pattern.path().to_string(),
                        target: target.to_string(),
                    });
                }
                Target::Namespace(base.to_string())
            }
            None => Target::Controller(target.to_string()),
        };

        Ok(Self { id, pattern, target, ignored_indexes: BTreeSet::new(), fallback: None, auth: None, registry })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// The normalized path spec.
    pub fn path(&self) -> &str {
        self.pattern.path()
    }

    /// The compiled regular expression source.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// The fixed controller, or the namespace template ending in `\*`.
    pub fn controller(&self) -> String {
        match &self.target {
            Target::Controller(id) => id.clone(),
            Target::Namespace(base) => format!("{base}\\*"),
        }
    }

    /// Skips the path segments at these zero-based indexes when deriving a
    /// controller identifier from a namespace target.
    pub fn ignore_path_indexes<I: IntoIterator<Item = usize>>(&mut self, indexes: I) -> &mut Self {
        self.ignored_indexes.extend(indexes);
        self
    }

    /// Guards this route: matching requests must pass `gate` before a controller
    /// is resolved.
    pub fn with_authentication(&mut self, gate: Arc<dyn Authenticator>) -> &mut Self {
        self.auth = Some(gate);
        self
    }

    /// Used when a namespace target derives an identifier that is not registered.
    ///
    /// # Errors
    ///
    /// Returns error if `controller` is not registered.
    pub fn with_fallback(&mut self, controller: &str) -> Result<&mut Self, ValidationError> {
        if !self.registry.contains(controller) {
            return Err(ValidationError::UnknownController { id: controller.to_string() });
        }
        self.fallback = Some(controller.to_string());
        Ok(self)
    }

    /// Resolves the controller identifier for `request`.
    ///
    /// Returns `Ok(None)` when the path does not match this route, or when a
    /// namespace target yields no registered controller and no fallback is set.
    ///
    /// # Errors
    ///
    /// Returns error if an authentication gate is attached, `bypass_auth` is false
    /// and the gate refuses the request.
    pub fn try_resolve(&self, request: &Request, bypass_auth: bool) -> Result<Option<String>, AuthError> {
        let path = request.path();
        if !self.pattern.is_match(path) {
            trace!(route_id = self.id, route = self.pattern.path(), path, "route skipped");
            return Ok(None);
        }

        if let Some(gate) = self.auth.as_ref().filter(|_| !bypass_auth) {
            gate.authenticate(request.header(header::AUTHORIZATION))?;
        }

        let base = match &self.target {
            Target::Controller(id) => return Ok(Some(id.clone())),
            Target::Namespace(base) => base,
        };

        let candidate = self.derive(base, path);
        if self.registry.contains(&candidate) {
            debug!(route_id = self.id, path, controller = %candidate, "namespace resolved");
            return Ok(Some(candidate));
        }

        match &self.fallback {
            Some(fallback) => {
                warn!(route_id = self.id, path, candidate = %candidate, fallback = %fallback, "namespace miss, using route fallback");
                Ok(Some(fallback.clone()))
            }
            None => {
                debug!(route_id = self.id, path, candidate = %candidate, "namespace miss");
                Ok(None)
            }
        }
    }

    /// Appends the PascalCased path segments after the route's literal prefix to
    /// `base`, skipping ignored indexes.
    fn derive(&self, base: &str, path: &str) -> String {
        let mut candidate = base.to_string();
        let segments = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .enumerate()
            .skip(self.pattern.literal_segments())
            .filter(|(index, _)| !self.ignored_indexes.contains(index));

        for (_, segment) in segments {
            let segment = pascal_case(segment);
            if segment.is_empty() {
                continue;
            }
            candidate.push(NAMESPACE_SEPARATOR);
            candidate.push_str(&segment);
        }

        candidate.trim_end_matches(NAMESPACE_SEPARATOR).to_string()
    }
}

/// `user-profile` becomes `UserProfile`, `42` stays `42`.
fn pascal_case(segment: &str) -> String {
    segment
        .split(['-', '_', '.'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect()
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("id", &self.id)
            .field("path", &self.pattern.path())
            .field("pattern", &self.pattern.as_str())
            .field("controller", &self.controller())
            .field("ignored_indexes", &self.ignored_indexes)
            .field("fallback", &self.fallback)
            .field("auth", &self.auth.as_ref().map(|gate| gate.realm().to_string()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{Route, pascal_case};
    use crate::auth::{Authenticator, HttpBasic};
    use crate::controller::{Context, Controller, ControllerRegistry};
    use crate::error::{AuthError, AuthErrorKind, DispatchError, ValidationError};
    use bytes::Bytes;
    use http::{HeaderMap, Method, Uri};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use vireo_http::protocol::{Payload, Request};

    #[derive(Default)]
    struct Noop;

    impl Controller for Noop {
        fn run(&mut self, _ctx: &mut Context<'_>) -> Result<(), DispatchError> {
            Ok(())
        }
    }

    /// Counts calls and refuses or accepts everything.
    struct CountingGate {
        accept: bool,
        calls: AtomicUsize,
    }

    impl CountingGate {
        fn new(accept: bool) -> Arc<Self> {
            Arc::new(Self { accept, calls: AtomicUsize::new(0) })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Authenticator for CountingGate {
        fn realm(&self) -> &str {
            "admin"
        }

        fn authenticate(&self, _authorization: Option<&str>) -> Result<(), AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.accept { Ok(()) } else { Err(AuthError::new(AuthErrorKind::Missing, "Basic", "admin")) }
        }
    }

    fn registry() -> Arc<ControllerRegistry> {
        let mut registry = ControllerRegistry::new();
        registry
            .register::<Noop>("App\\Controllers\\Orders\\List")
            .unwrap()
            .register::<Noop>("App\\Controllers\\NotFound")
            .unwrap()
            .register::<Noop>("App\\Users\\Profile")
            .unwrap();
        Arc::new(registry)
    }

    fn get(path: &str) -> Request {
        Request::new(Method::GET, path.parse::<Uri>().unwrap(), HeaderMap::new(), Payload::new(), Bytes::new())
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("orders"), "Orders");
        assert_eq!(pascal_case("user-profile"), "UserProfile");
        assert_eq!(pascal_case("SNAKE_case.v2"), "SnakeCaseV2");
        assert_eq!(pascal_case("42"), "42");
        assert_eq!(pascal_case("--"), "");
    }

    #[test]
    fn test_target_validation() {
        let registry = registry();

        assert!(Route::new(1, Arc::clone(&registry), "/a/*", "App\\*").is_ok());
        assert!(Route::new(1, Arc::clone(&registry), "/a/*", "\\App\\Home").is_ok());
        assert!(matches!(
            Route::new(1, Arc::clone(&registry), "/a", "App\\*"),
            Err(ValidationError::WildcardMismatch { .. })
        ));
        for target in ["App\\Home!", "App/Home", "App\\*\\Home", "", "*"] {
            assert!(
                matches!(Route::new(1, Arc::clone(&registry), "/a/*", target), Err(ValidationError::IllegalTarget { .. })),
                "target {target:?} should be rejected"
            );
        }
        assert!(matches!(Route::new(1, registry, "/a b", "App\\Home"), Err(ValidationError::IllegalPath { .. })));
    }

    #[test]
    fn test_fixed_target_resolves_directly() {
        let route = Route::new(1, registry(), "/a/*", "App\\Missing").unwrap();

        assert_eq!(route.try_resolve(&get("/a/b/c?x=1"), false).unwrap().as_deref(), Some("App\\Missing"));
        assert_eq!(route.try_resolve(&get("/b"), false).unwrap(), None);
    }

    #[test]
    fn test_namespace_derivation() {
        let route = Route::new(1, registry(), "/shop/*", "App\\Controllers\\*").unwrap();

        assert_eq!(route.controller(), "App\\Controllers\\*");
        assert_eq!(route.try_resolve(&get("/shop/orders/list"), false).unwrap().as_deref(), Some("App\\Controllers\\Orders\\List"));
        assert_eq!(route.try_resolve(&get("/shop/orders/list/"), false).unwrap().as_deref(), Some("App\\Controllers\\Orders\\List"));
        assert_eq!(route.try_resolve(&get("/shop/orders/missing"), false).unwrap(), None);
    }

    #[test]
    fn test_ignored_indexes_are_skipped() {
        let mut route = Route::new(1, registry(), "/*", "App\\*").unwrap();
        route.ignore_path_indexes([1]);

        assert_eq!(route.try_resolve(&get("/users/42/profile"), false).unwrap().as_deref(), Some("App\\Users\\Profile"));
    }

    #[test]
    fn test_namespace_fallback() {
        let registry = registry();
        let mut route = Route::new(1, Arc::clone(&registry), "/shop/*", "App\\Controllers\\*").unwrap();

        assert!(matches!(route.with_fallback("App\\Nope"), Err(ValidationError::UnknownController { .. })));
        route.with_fallback("App\\Controllers\\NotFound").unwrap();

        assert_eq!(
            route.try_resolve(&get("/shop/orders/missing"), false).unwrap().as_deref(),
            Some("App\\Controllers\\NotFound")
        );
    }

    #[test]
    fn test_gate_consulted_only_on_match() {
        let gate = CountingGate::new(false);
        let mut route = Route::new(1, registry(), "/admin/*", "App\\Users\\Profile").unwrap();
        route.with_authentication(Arc::clone(&gate) as Arc<dyn Authenticator>);

        assert_eq!(route.try_resolve(&get("/public"), false).unwrap(), None);
        assert_eq!(gate.calls(), 0);
        assert_eq!(route.try_resolve(&get("/admin"), false).unwrap_err().kind(), AuthErrorKind::Missing);
        assert_eq!(gate.calls(), 1);
    }

    #[test]
    fn test_gate_bypassed() {
        let gate = CountingGate::new(false);
        let mut route = Route::new(1, registry(), "/admin/*", "App\\Users\\Profile").unwrap();
        route.with_authentication(Arc::clone(&gate) as Arc<dyn Authenticator>);

        assert_eq!(route.try_resolve(&get("/admin/x"), true).unwrap().as_deref(), Some("App\\Users\\Profile"));
        assert_eq!(gate.calls(), 0);
    }

    #[test]
    fn test_basic_gate_reads_authorization_header() {
        let mut route = Route::new(1, registry(), "/admin/*", "App\\Users\\Profile").unwrap();
        route.with_authentication(Arc::new(HttpBasic::new("admin").user("ada", "lovelace")));

        let mut request = http::Request::builder().uri("/admin");
        request = request.header(http::header::AUTHORIZATION, "Basic YWRhOmxvdmVsYWNl");
        let request = Request::from_http(request.body(Bytes::new()).unwrap()).unwrap();

        assert!(route.try_resolve(&request, false).unwrap().is_some());
        assert!(route.try_resolve(&get("/admin"), false).is_err());
    }
}
