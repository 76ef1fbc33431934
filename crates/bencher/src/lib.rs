/// A request path to route, tagged with the benchmark group it belongs to.
#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    path: &'static str,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, path: &'static str) -> Self {
        Self { name, group, path }
    }

    pub fn hit(name: &'static str, path: &'static str) -> Self {
        Self::new(name, TestGroup::Hit, path)
    }

    pub fn fallback(name: &'static str, path: &'static str) -> Self {
        Self::new(name, TestGroup::Fallback, path)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn path(&self) -> &'static str {
        self.path
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TestGroup {
    /// resolved by a route
    Hit,
    /// resolved by the router fallback after every route missed
    Fallback,
}

/// Route specs registered by the benchmarks, in registration order. The last
/// one is a namespace route.
pub const ROUTES: &[(&str, &str)] = &[
    ("/", "Bench\\Home"),
    ("/about", "Bench\\Home"),
    ("/users/*/profile", "Bench\\Home"),
    ("/blog/posts/*/comments", "Bench\\Home"),
    ("/static/*", "Bench\\Home"),
    ("/api/*", "Bench\\Api\\*"),
];

/// Controllers the namespace route in [`ROUTES`] resolves to.
pub const NAMESPACE_CONTROLLERS: &[&str] = &["Bench\\Api\\V1\\Orders", "Bench\\Api\\V1\\Orders\\Items"];

pub fn test_cases() -> Vec<TestCase> {
    vec![
        TestCase::hit("root", "/"),
        TestCase::hit("middle_wildcard", "/blog/posts/routing-in-rust/comments"),
        TestCase::hit("trailing_wildcard", "/static/css/site.min.css"),
        TestCase::hit("namespace", "/api/v1/orders/items"),
        TestCase::fallback("miss", "/unknown/deeply/nested/path"),
    ]
}
