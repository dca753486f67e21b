//! Handlers and the middleware chain.
//!
//! A middleware turns one handler into another. The chain keeps them in
//! registration order and applies them in reverse, so the first registered
//! middleware ends up outermost:
//!
//! ```text
//! handler' = mw[0](mw[1](... mw[n-1](handler)))
//! ```
//!
//! It sees the request before every other middleware and the response after
//! all of them.

use std::sync::Arc;
use std::time::Instant;

use crate::context::Context;
use crate::error::HandlerResult;
use crate::output::format_headers_only;

/// A route handler.
pub type Handler = Arc<dyn Fn(&mut Context<'_>) -> HandlerResult + Send + Sync>;

/// A handler transformer.
pub type Middleware = Arc<dyn Fn(Handler) -> Handler + Send + Sync>;

/// Box a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut Context<'_>) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Box a closure as a [`Middleware`].
pub fn middleware<F>(f: F) -> Middleware
where
    F: Fn(Handler) -> Handler + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Ordered list of middleware.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    layers: Vec<Middleware>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mw: Middleware) {
        self.layers.push(mw);
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Wrap `handler` so that the first pushed middleware is outermost.
    pub fn apply(&self, handler: Handler) -> Handler {
        self.layers
            .iter()
            .rev()
            .fold(handler, |inner, mw| mw(inner))
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("len", &self.layers.len())
            .finish()
    }
}

/// Logs one `info` event per request with method, path, final status and
/// elapsed time. The full request head is logged at `trace`.
pub fn request_logger() -> Middleware {
    middleware(|next: Handler| {
        handler(move |ctx| {
            let started = Instant::now();
            tracing::trace!(head = %format_headers_only(ctx.request()), "request head");

            let result = next(ctx);

            let status = ctx.response().sent_status();
            tracing::info!(
                method = %ctx.method(),
                path = ctx.path(),
                status = status.unwrap_or_default(),
                elapsed_us = started.elapsed().as_micros() as u64,
                failed = result.is_err(),
                "request handled"
            );
            result
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::pattern::Params;
    use crate::request::Request;
    use crate::response::ResponseWriter;
    use crate::types::{HttpMethod, HttpVersion, ParsedRequest};

    fn tracing_mw(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> Middleware {
        middleware(move |next: Handler| {
            let log = Arc::clone(&log);
            handler(move |ctx| {
                log.lock().unwrap().push(format!("{name}:before"));
                let r = next(ctx);
                log.lock().unwrap().push(format!("{name}:after"));
                r
            })
        })
    }

    fn run(h: &Handler) {
        let request = Request::from(ParsedRequest {
            method: HttpMethod::GET,
            target: "/".into(),
            version: HttpVersion::Http11,
            headers: Vec::new(),
            body: Vec::new(),
        });
        let mut out = Vec::new();
        let mut ctx = Context::new(request, Params::default(), ResponseWriter::new(&mut out));
        h(&mut ctx).unwrap();
    }

    #[test]
    fn first_registered_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = MiddlewareChain::new();
        chain.push(tracing_mw("A", Arc::clone(&log)));
        chain.push(tracing_mw("B", Arc::clone(&log)));

        let inner_log = Arc::clone(&log);
        let h = chain.apply(handler(move |_ctx| {
            inner_log.lock().unwrap().push("H".into());
            Ok(())
        }));
        run(&h);

        assert_eq!(
            *log.lock().unwrap(),
            vec!["A:before", "B:before", "H", "B:after", "A:after"]
        );
    }

    #[test]
    fn empty_chain_returns_handler_unchanged() {
        let chain = MiddlewareChain::new();
        assert!(chain.is_empty());
        let called = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&called);
        let h = chain.apply(handler(move |_ctx| {
            *flag.lock().unwrap() = true;
            Ok(())
        }));
        run(&h);
        assert!(*called.lock().unwrap());
    }
}
