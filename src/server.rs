//! Listener loop and per-connection dispatch.
//!
//! Every accepted connection gets its own thread, serves exactly one
//! request and is closed. The router is the only state shared between
//! connections.

use std::io::{BufWriter, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crate::config::ServerConfig;
use crate::context::Context;
use crate::error::{HandlerResult, ParseError, ServerError};
use crate::request::Request;
use crate::response::ResponseWriter;
use crate::router::Router;
use crate::types::{reason_phrase, STATUS_INTERNAL_SERVER_ERROR, STATUS_NOT_FOUND};
use crate::wire::WireReader;

static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Process-unique connection number used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Routes plus configuration, ready to accept connections.
#[derive(Debug, Clone)]
pub struct Server {
    router: Arc<Router>,
    config: Arc<ServerConfig>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_router(Arc::new(Router::new()), config)
    }

    pub fn with_router(router: Arc<Router>, config: ServerConfig) -> Self {
        Self {
            router,
            config: Arc::new(config),
        }
    }

    /// The route table. Registration is allowed while serving.
    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn router_handle(&self) -> Arc<Router> {
        Arc::clone(&self.router)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind to the configured `bind_address` and serve.
    pub fn run(&self) -> Result<(), ServerError> {
        self.start(self.config.bind_address.as_str())
    }

    /// Bind to `addr` and serve. Blocks until the listener fails.
    pub fn start<A: ToSocketAddrs>(&self, addr: A) -> Result<(), ServerError> {
        let listener = TcpListener::bind(addr).map_err(ServerError::Bind)?;
        self.serve(listener)
    }

    /// Bind to `port` on every interface and serve.
    pub fn listen(&self, port: u16) -> Result<(), ServerError> {
        self.start(("0.0.0.0", port))
    }

    /// Accept connections from an already bound listener.
    ///
    /// Transient accept failures are logged and skipped; any other accept
    /// error ends the loop and is returned.
    pub fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, routes = self.router.len(), "listening");
        }

        loop {
            match listener.accept() {
                Ok((stream, peer)) => self.spawn_connection(stream, peer),
                Err(e) if is_transient_accept_error(&e) => {
                    tracing::debug!(error = %e, "transient accept failure");
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed, stopping listener");
                    return Err(ServerError::Accept(e));
                }
            }
        }
    }

    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr) {
        if let Err(e) = stream.set_read_timeout(self.config.read_timeout()) {
            tracing::warn!(error = %e, "failed to set read timeout");
        }
        if let Err(e) = stream.set_write_timeout(self.config.write_timeout()) {
            tracing::warn!(error = %e, "failed to set write timeout");
        }

        let id = ConnectionId::new();
        let router = Arc::clone(&self.router);
        let config = Arc::clone(&self.config);
        let spawned = thread::Builder::new()
            .name(format!("tapster-{id}"))
            .spawn(move || {
                let span = tracing::info_span!("connection", id = %id, %peer);
                let _guard = span.enter();
                serve_connection(&router, stream, &config);
            });

        if let Err(e) = spawned {
            tracing::error!(error = %e, %peer, "failed to spawn connection thread");
        }
    }
}

fn is_transient_accept_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::Interrupted | ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset
    )
}

fn serve_connection(router: &Router, stream: TcpStream, config: &ServerConfig) {
    dispatch(router, &stream, config);
    if let Err(e) = stream.shutdown(Shutdown::Both) {
        if e.kind() != ErrorKind::NotConnected {
            tracing::debug!(error = %e, "shutdown failed");
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Serve exactly one request from `stream`.
///
/// Returns the status written, or `None` if nothing was written: the peer
/// went away, the connection failed, or a handler wrote a raw response.
pub fn dispatch<S: Read + Write>(
    router: &Router,
    mut stream: S,
    config: &ServerConfig,
) -> Option<u16> {
    let parsed = WireReader::with_config(
        &mut stream,
        config.read_buffer_size,
        config.parser_config(),
    )
    .read_request();

    let mut out = BufWriter::new(&mut stream);
    let mut response = ResponseWriter::new(&mut out);

    let request = match parsed {
        Ok(parsed) => Request::from(parsed),
        Err(err) => return reject(&mut response, &err),
    };

    let Some(resolved) = router.resolve(request.method(), request.path()) else {
        tracing::debug!(method = %request.method(), path = request.path(), "no route");
        return match response.not_found() {
            Ok(()) => Some(STATUS_NOT_FOUND),
            Err(e) => {
                tracing::debug!(error = %e, "failed to write 404");
                None
            }
        };
    };

    tracing::debug!(pattern = %resolved.pattern, "route matched");
    let mut ctx = Context::new(request, resolved.params, response);
    let result = (resolved.handler)(&mut ctx);
    finish(&mut ctx, result)
}

/// Answer a request that could not be decoded.
fn reject(response: &mut ResponseWriter<'_>, err: &ParseError) -> Option<u16> {
    let Some(status) = err.status() else {
        tracing::debug!(error = %err, "connection closed without a request");
        return None;
    };

    tracing::warn!(error = %err, status, "rejecting request");
    let body = format!("{status} {}", reason_phrase(status));
    match response.text(status, body) {
        Ok(()) => Some(status),
        Err(e) => {
            tracing::debug!(error = %e, "failed to write rejection");
            None
        }
    }
}

/// Map the handler outcome onto what is left of the response.
fn finish(ctx: &mut Context<'_>, result: HandlerResult) -> Option<u16> {
    let sent = ctx.response().headers_sent();
    match result {
        Ok(()) if sent => return ctx.response().sent_status(),
        Ok(()) => {
            tracing::warn!(path = ctx.path(), "handler returned without responding");
        }
        Err(e) if sent => {
            tracing::error!(error = %e, path = ctx.path(), "handler failed after responding");
            return ctx.response().sent_status();
        }
        Err(e) => {
            tracing::error!(error = %e, path = ctx.path(), "handler failed");
        }
    }

    match ctx.text(
        STATUS_INTERNAL_SERVER_ERROR,
        reason_phrase(STATUS_INTERNAL_SERVER_ERROR),
    ) {
        Ok(()) => Some(STATUS_INTERNAL_SERVER_ERROR),
        Err(e) => {
            tracing::debug!(error = %e, "failed to write 500");
            None
        }
    }
}
