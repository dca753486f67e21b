//! The route table.
//!
//! Routes are kept in registration order and matched by a linear scan, so
//! the earliest registered route wins when several patterns fit the same
//! path. Routes and middleware live behind one lock; registration may race
//! with request dispatch.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::context::Context;
use crate::error::{HandlerResult, RouteError};
use crate::middleware::{handler, Handler, Middleware, MiddlewareChain};
use crate::pattern::{Params, Pattern};
use crate::static_files::{StaticFiles, FILEPATH_PARAM};
use crate::types::HttpMethod;

struct Route {
    method: HttpMethod,
    pattern: Pattern,
    handler: Handler,
}

#[derive(Default)]
struct RouteTable {
    routes: Vec<Route>,
    middleware: MiddlewareChain,
}

/// Outcome of a successful lookup: the handler already wrapped in the
/// middleware chain, plus what the pattern captured.
pub struct Resolved {
    pub handler: Handler,
    pub params: Params,
    pub pattern: String,
}

impl std::fmt::Debug for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolved")
            .field("params", &self.params)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// Mutex-guarded route table and middleware chain.
#[derive(Default)]
pub struct Router {
    table: Mutex<RouteTable>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    // A handler panicking never leaves the table half-written, so a
    // poisoned lock is still safe to read.
    fn lock(&self) -> MutexGuard<'_, RouteTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a route.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidPattern`] if `pattern` does not compile.
    pub fn register<F>(&self, method: HttpMethod, pattern: &str, f: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Context<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.register_handler(method, pattern, handler(f))
    }

    /// Append a route with an already boxed handler.
    pub fn register_handler(
        &self,
        method: HttpMethod,
        pattern: &str,
        handler: Handler,
    ) -> Result<(), RouteError> {
        let pattern = Pattern::parse(pattern)?;
        tracing::debug!(%method, pattern = %pattern, "route registered");
        self.lock().routes.push(Route {
            method,
            pattern,
            handler,
        });
        Ok(())
    }

    pub fn get<F>(&self, pattern: &str, f: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Context<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(HttpMethod::GET, pattern, f)
    }

    pub fn post<F>(&self, pattern: &str, f: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Context<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(HttpMethod::POST, pattern, f)
    }

    pub fn put<F>(&self, pattern: &str, f: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Context<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(HttpMethod::PUT, pattern, f)
    }

    pub fn delete<F>(&self, pattern: &str, f: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Context<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(HttpMethod::DELETE, pattern, f)
    }

    pub fn patch<F>(&self, pattern: &str, f: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Context<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(HttpMethod::PATCH, pattern, f)
    }

    /// Scoped registrar that prepends `prefix` to every pattern.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidPrefix`] unless `prefix` starts with `/`.
    pub fn group(&self, prefix: &str) -> Result<Group<'_>, RouteError> {
        Ok(Group {
            router: self,
            prefix: normalize_prefix(prefix)?,
        })
    }

    /// Append a middleware. The first one added is outermost.
    pub fn use_middleware(&self, mw: Middleware) {
        self.lock().middleware.push(mw);
    }

    /// Serve files under `root` for `GET {prefix}/...`.
    pub fn serve_static(&self, prefix: &str, root: impl Into<PathBuf>) -> Result<(), RouteError> {
        let prefix = normalize_prefix(prefix)?;
        let files = StaticFiles::new(root);
        tracing::info!(prefix = %prefix, root = %files.root().display(), "static mount");
        self.register_handler(
            HttpMethod::GET,
            &format!("{prefix}/:{FILEPATH_PARAM}*"),
            files.into_handler(),
        )
    }

    /// Find the first route matching `method` and `path`.
    ///
    /// The lock is held only for the scan; the returned handler is wrapped
    /// in the middleware chain after it is released.
    pub fn resolve(&self, method: &HttpMethod, path: &str) -> Option<Resolved> {
        let (handler, params, pattern, chain) = {
            let table = self.lock();
            let (route, params) = table
                .routes
                .iter()
                .filter(|r| &r.method == method)
                .find_map(|r| r.pattern.matches(path).map(|p| (r, p)))?;
            (
                route.handler.clone(),
                params,
                route.pattern.as_str().to_string(),
                table.middleware.clone(),
            )
        };

        Some(Resolved {
            handler: chain.apply(handler),
            params,
            pattern,
        })
    }

    pub fn len(&self) -> usize {
        self.lock().routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().routes.is_empty()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.lock();
        f.debug_struct("Router")
            .field("routes", &table.routes.len())
            .field("middleware", &table.middleware)
            .finish()
    }
}

/// Registrar bound to a path prefix.
#[derive(Debug, Clone)]
pub struct Group<'r> {
    router: &'r Router,
    prefix: String,
}

impl<'r> Group<'r> {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn register<F>(&self, method: HttpMethod, pattern: &str, f: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Context<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.router
            .register(method, &format!("{}{}", self.prefix, pattern), f)
    }

    pub fn get<F>(&self, pattern: &str, f: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Context<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(HttpMethod::GET, pattern, f)
    }

    pub fn post<F>(&self, pattern: &str, f: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Context<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(HttpMethod::POST, pattern, f)
    }

    pub fn put<F>(&self, pattern: &str, f: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Context<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(HttpMethod::PUT, pattern, f)
    }

    pub fn delete<F>(&self, pattern: &str, f: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Context<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(HttpMethod::DELETE, pattern, f)
    }

    pub fn patch<F>(&self, pattern: &str, f: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Context<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(HttpMethod::PATCH, pattern, f)
    }

    /// Nested group; prefixes concatenate.
    pub fn group(&self, prefix: &str) -> Result<Group<'r>, RouteError> {
        Ok(Group {
            router: self.router,
            prefix: format!("{}{}", self.prefix, normalize_prefix(prefix)?),
        })
    }
}

/// Check the leading `/` and drop one trailing `/`.
fn normalize_prefix(prefix: &str) -> Result<String, RouteError> {
    if !prefix.starts_with('/') {
        return Err(RouteError::InvalidPrefix(prefix.to_string()));
    }
    Ok(prefix.strip_suffix('/').unwrap_or(prefix).to_string())
}
