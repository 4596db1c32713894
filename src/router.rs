//! Exact-match route table.
//!
//! One map per HTTP method, keyed by the literal request path. No patterns,
//! no parameters, no trailing-slash folding: `/widgets` and `/widgets/` are
//! different routes. Build the table once at startup and hand it to the
//! dispatcher; it is never mutated afterwards, so lookups need no lock.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;

use crate::error::Error;
use crate::handler::{BoxedHandler, RouteHandler};

/// The application's routes.
///
/// Each [`RouteTable::on`] call returns `self` so registrations chain
/// naturally. Registering the same `(method, path)` twice is rejected.
#[derive(Default)]
pub struct RouteTable {
    routes: HashMap<Method, HashMap<String, BoxedHandler>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Registers `handler` for `method` + `path`. Returns `self` for chaining.
    ///
    /// # Panics
    ///
    /// Panics if the route is already registered. Use [`RouteTable::try_on`]
    /// when the table is built from external input.
    ///
    /// ```rust,ignore
    /// RouteTable::new()
    ///     .on(Method::GET,  "/widgets", ListWidgets)
    ///     .on(Method::POST, "/widgets", CreateWidget);
    /// ```
    pub fn on(self, method: Method, path: &str, handler: impl RouteHandler) -> Self {
        self.try_on(method, path, handler)
            .unwrap_or_else(|e| panic!("invalid route table: {e}"))
    }

    /// Like [`RouteTable::on`], but reports a duplicate instead of panicking.
    pub fn try_on(self, method: Method, path: &str, handler: impl RouteHandler) -> Result<Self, Error> {
        self.try_insert(method, path, Arc::new(handler))
    }

    /// Registers an already shared handler, e.g. one instance serving several
    /// routes.
    pub fn try_insert(mut self, method: Method, path: &str, handler: BoxedHandler) -> Result<Self, Error> {
        let paths = self.routes.entry(method.clone()).or_default();
        if paths.contains_key(path) {
            return Err(Error::DuplicateRoute { method, path: path.to_owned() });
        }
        paths.insert(path.to_owned(), handler);
        Ok(self)
    }

    /// Finds the handler registered for exactly this method and path.
    pub fn lookup(&self, method: &Method, path: &str) -> Option<&BoxedHandler> {
        self.routes.get(method)?.get(path)
    }

    pub fn len(&self) -> usize {
        self.routes.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every registered `(method, path)`, in no particular order.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str)> {
        self.routes
            .iter()
            .flat_map(|(m, paths)| paths.keys().map(move |p| (m, p.as_str())))
    }
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.routes().map(|(m, p)| format!("{m} {p}")))
            .finish()
    }
}
