use crate::{server::handlers::NotFound, Handler, Request, Response};
use crossbeam::sync::{ShardedLock, ShardedLockReadGuard, ShardedLockWriteGuard};
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, PoisonError},
};

/// Path-based request router.
///
/// Patterns follow three rules:
/// - a pattern ending in `/` matches every path starting with it (`/static/`
///   matches `/static/css/site.css`);
/// - any other pattern matches only the identical path (`/login`);
/// - the empty pattern matches only `/`.
///
/// When several patterns match, the longest one wins; registration order
/// doesn't matter. Paths are compared without the query string. Requests that
/// match nothing go to the not-found handler, [`NotFound`] by default.
///
/// Clones share one route table, so routes can be changed while a server is
/// running with another clone of the muxer.
///
/// # Examples
/// ```
/// use plain_http::{Muxer, Request, Response};
///
/// let mux = Muxer::new();
/// mux.set_handler("/", |_: &Request| Response::text("root"));
/// mux.set_handler("/api/", |_: &Request| Response::text("api"));
/// mux.set_handler("/api/health", |_: &Request| Response::text("ok"));
///
/// assert!(mux.match_path("/api/users/1").is_some());
/// assert_eq!(mux.matched_pattern("/api/users/1").as_deref(), Some("/api/"));
/// assert_eq!(mux.matched_pattern("/api/health").as_deref(), Some("/api/health"));
/// assert_eq!(mux.matched_pattern("/api/health/x").as_deref(), Some("/api/"));
/// assert_eq!(mux.matched_pattern("/anything").as_deref(), Some("/"));
/// ```
#[derive(Clone, Default)]
pub struct Muxer {
    routes: Arc<ShardedLock<Routes>>,
}

struct Routes {
    handlers: HashMap<String, Arc<dyn Handler>>,
    not_found: Arc<dyn Handler>,
}

impl Default for Routes {
    fn default() -> Self {
        Routes {
            handlers: HashMap::new(),
            not_found: Arc::new(NotFound),
        }
    }
}

impl Muxer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `pattern`, replacing any previous one.
    pub fn set_handler<P: Into<String>, H: Handler>(&self, pattern: P, handler: H) -> &Self {
        self.write().handlers.insert(pattern.into(), Arc::new(handler));
        self
    }

    /// Removes the handler for exactly `pattern`; returns whether it existed.
    pub fn remove_handler(&self, pattern: &str) -> bool {
        self.write().handlers.remove(pattern).is_some()
    }

    /// Replaces the handler used when no pattern matches.
    pub fn set_not_found_handler<H: Handler>(&self, handler: H) -> &Self {
        self.write().not_found = Arc::new(handler);
        self
    }

    /// Handler registered under the longest pattern matching `path`.
    pub fn match_path(&self, path: &str) -> Option<Arc<dyn Handler>> {
        let routes = self.read();
        longest_match(&routes.handlers, path).map(|(_, handler)| handler.clone())
    }

    /// Pattern that [`match_path`](Self::match_path) would pick.
    pub fn matched_pattern(&self, path: &str) -> Option<String> {
        let routes = self.read();
        longest_match(&routes.handlers, path).map(|(pattern, _)| pattern.clone())
    }

    // Matching handler, or the not-found one. The lock is released before the
    // handler runs so handlers may register routes.
    fn resolve(&self, path: &str) -> Arc<dyn Handler> {
        let routes = self.read();
        match longest_match(&routes.handlers, path) {
            Some((_, handler)) => handler.clone(),
            None => routes.not_found.clone(),
        }
    }

    // Writers only do single map operations, so a poisoned table is still
    // consistent.
    #[inline]
    fn read(&self) -> ShardedLockReadGuard<'_, Routes> {
        self.routes.read().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    fn write(&self) -> ShardedLockWriteGuard<'_, Routes> {
        self.routes.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Handler for Muxer {
    fn handle(&self, request: &Request) -> Response {
        let handler = self.resolve(request.path());
        handler.handle(request)
    }
}

impl fmt::Debug for Muxer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let routes = self.read();
        let mut patterns: Vec<&str> = routes.handlers.keys().map(String::as_str).collect();
        patterns.sort_unstable();

        f.debug_struct("Muxer").field("patterns", &patterns).finish()
    }
}

fn matches(pattern: &str, path: &str) -> bool {
    if pattern.is_empty() {
        path == "/"
    } else if pattern.ends_with('/') {
        path.starts_with(pattern)
    } else {
        pattern == path
    }
}

fn longest_match<'a>(
    handlers: &'a HashMap<String, Arc<dyn Handler>>,
    path: &str,
) -> Option<(&'a String, &'a Arc<dyn Handler>)> {
    handlers
        .iter()
        .filter(|(pattern, _)| matches(pattern, path))
        .max_by_key(|(pattern, _)| pattern.len())
}
