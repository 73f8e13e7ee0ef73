//! In-memory registry of declared routes.
//!
//! The registry is built once at startup and then handed, by reference, to the
//! reconciler. It only ever grows: there is no removal, and registration never
//! fails.

use std::collections::HashMap;

use crate::route::{HttpMethod, Route};

/// Ordered, append-only collection of routes.
#[derive(Debug, Clone, Default)]
pub struct RouteRegistry {
    routes: Vec<Route>,
}

impl RouteRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route.
    ///
    /// Duplicate names are accepted. The gateway keys routes by name, so the
    /// last one applied wins; a warning is logged to make that visible.
    pub fn register(&mut self, route: Route) {
        if self.routes.iter().any(|r| r.name == route.name) {
            tracing::warn!(
                route = %route.name,
                "Route name already registered, the gateway will keep the last one applied"
            );
        }
        tracing::debug!(
            route = %route.name,
            method = %route.method,
            path = %route.path,
            auth = route.auth,
            "Registered route"
        );
        self.routes.push(route);
    }

    /// Append every route declared on a controller, in declaration order.
    pub fn register_controller(&mut self, controller: Controller) {
        for route in controller.routes {
            self.register(route);
        }
    }

    /// All registered routes, in registration order.
    #[must_use]
    pub fn all(&self) -> &[Route] {
        &self.routes
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no route has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Names registered more than once, in order of first appearance.
    #[must_use]
    pub fn duplicate_names(&self) -> Vec<&str> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for route in &self.routes {
            *counts.entry(route.name.as_str()).or_default() += 1;
        }

        let mut duplicates = Vec::new();
        for route in &self.routes {
            let name = route.name.as_str();
            if counts.get(name).copied().unwrap_or_default() > 1 && !duplicates.contains(&name) {
                duplicates.push(name);
            }
        }
        duplicates
    }
}

impl FromIterator<Route> for RouteRegistry {
    fn from_iter<I: IntoIterator<Item = Route>>(iter: I) -> Self {
        let mut registry = Self::new();
        for route in iter {
            registry.register(route);
        }
        registry
    }
}

/// Builder for routes sharing a path prefix.
///
/// Paths are rewritten for the gateway's regex matcher: the route's leading
/// slash is dropped, each `:param` segment becomes `.+`, and the result is
/// joined as `/{prefix}/{path}`.
#[derive(Debug, Clone)]
pub struct Controller {
    prefix: String,
    routes: Vec<Route>,
}

impl Controller {
    /// Start a controller mounted at `prefix`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            routes: Vec::new(),
        }
    }

    /// Declare a route that requires JWT authentication.
    #[must_use]
    pub fn route(self, name: impl Into<String>, method: HttpMethod, path: &str) -> Self {
        self.route_with_auth(name, method, path, true)
    }

    /// Declare a route without JWT authentication.
    #[must_use]
    pub fn public_route(self, name: impl Into<String>, method: HttpMethod, path: &str) -> Self {
        self.route_with_auth(name, method, path, false)
    }

    /// Declare a route with an explicit auth requirement.
    #[must_use]
    pub fn route_with_auth(
        mut self,
        name: impl Into<String>,
        method: HttpMethod,
        path: &str,
        auth: bool,
    ) -> Self {
        let relative = path.strip_prefix('/').unwrap_or(path);
        let path = format!("/{}/{}", self.prefix, params_to_pattern(relative));
        self.routes.push(Route::new(name, method, path, auth));
        self
    }

    /// The prefix this controller is mounted at.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Routes declared so far.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

/// Replace every `:name` parameter with the `.+` pattern.
fn params_to_pattern(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ':' && chars.peek().is_some_and(|n| is_word(*n)) {
            while chars.peek().is_some_and(|n| is_word(*n)) {
                chars.next();
            }
            out.push_str(".+");
        } else {
            out.push(c);
        }
    }
    out
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(name: &str) -> Route {
        Route::new(name, HttpMethod::Get, name, true)
    }

    #[test]
    fn register_preserves_order() {
        let mut registry = RouteRegistry::new();
        assert!(registry.is_empty());

        registry.register(route("a"));
        registry.register(route("b"));
        registry.register(route("c"));

        let names: Vec<_> = registry.all().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn register_accepts_duplicates() {
        let mut registry = RouteRegistry::new();
        registry.register(Route::new("getUser", HttpMethod::Get, "users/:id", true));
        registry.register(Route::new("getUser", HttpMethod::Post, "users", false));
        registry.register(route("other"));

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.duplicate_names(), ["getUser"]);
    }

    #[test]
    fn no_duplicates_reported_for_unique_names() {
        let registry: RouteRegistry = ["a", "b"].into_iter().map(route).collect();
        assert!(registry.duplicate_names().is_empty());
    }

    #[test]
    fn controller_rewrites_params() {
        let controller = Controller::new("users")
            .route("getUser", HttpMethod::Get, "/:id")
            .route("getPost", HttpMethod::Get, ":user_id/posts/:postId");

        let routes = controller.routes();
        assert_eq!(routes[0].path, "/users/.+");
        assert_eq!(routes[1].path, "/users/.+/posts/.+");
        assert!(routes.iter().all(|r| r.auth));
    }

    #[test]
    fn controller_keeps_lone_colons() {
        assert_eq!(params_to_pattern("a:/b:"), "a:/b:");
        assert_eq!(params_to_pattern("files/:name.json"), "files/.+.json");
    }

    #[test]
    fn controller_public_route() {
        let mut registry = RouteRegistry::new();
        registry.register_controller(
            Controller::new("auth")
                .public_route("login", HttpMethod::Post, "/login")
                .route_with_auth("me", HttpMethod::Get, "me", true),
        );

        let routes = registry.all();
        assert_eq!(routes[0].path, "/auth/login");
        assert!(!routes[0].auth);
        assert_eq!(routes[1].path, "/auth/me");
        assert!(routes[1].auth);
    }

    #[test]
    fn controller_with_empty_prefix_normalizes() {
        let controller = Controller::new("").route("root", HttpMethod::Get, "/status");
        assert_eq!(controller.routes()[0].path, "//status");
        assert_eq!(controller.routes()[0].gateway_path(), "/status");
    }
}
