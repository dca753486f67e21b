//! # tapster
//!
//! A **small HTTP/1.x server** built directly on byte streams.
//!
//! Each accepted connection is read incrementally by a [`WireReader`],
//! decoded into a [`Request`], matched against the [`Router`]'s patterns,
//! run through the middleware chain and answered through a
//! [`ResponseWriter`] that frames exactly one response. The connection is
//! closed afterwards.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use tapster::{request_logger, Server, ServerConfig};
//!
//! let server = Server::new(ServerConfig::default());
//! let router = server.router();
//!
//! router.use_middleware(request_logger());
//! router
//!     .get("/hello/:name", |ctx| {
//!         let greeting = format!("hello, {}", ctx.param("name").unwrap_or("stranger"));
//!         ctx.text(200, greeting)?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! server.start("127.0.0.1:8080").unwrap();
//! ```
//!
//! ## Decoding a request without a socket
//!
//! ```rust
//! use tapster::read_request;
//!
//! let raw: &[u8] = b"GET /hello?x=1 HTTP/1.1\r\nHost: example.com\r\n\r\n";
//! let request = read_request(raw).expect("valid request");
//! assert_eq!(request.method.as_str(), "GET");
//! assert_eq!(request.target, "/hello?x=1");
//! ```

mod config;
mod context;
mod error;
mod middleware;
mod output;
mod parser;
mod pattern;
mod request;
mod response;
mod router;
mod server;
mod static_files;
mod types;
mod wire;

// Re-export public API.
pub use config::{load_config, parse_config, validate_config, ServerConfig, StaticMount};
pub use context::Context;
pub use error::{
    BodyError, ConfigError, HandlerError, HandlerResult, ParseError, ResponseError, RouteError,
    ServerError, StaticError,
};
pub use middleware::{handler, middleware, request_logger, Handler, Middleware, MiddlewareChain};
pub use output::{format_debug, format_headers_only, format_json, RequestSummary};
pub use parser::{ParseStatus, Parser, ParserConfig};
pub use pattern::{Params, Pattern, Segment};
pub use request::{Body, Form, Request};
pub use response::{FrameState, ResponseWriter, NOT_FOUND_BODY};
pub use router::{Group, Resolved, Router};
pub use server::{dispatch, ConnectionId, Server};
pub use static_files::{content_type_for, StaticFiles, FILEPATH_PARAM};
pub use types::{
    reason_phrase, Header, HttpMethod, HttpVersion, ParsedRequest, STATUS_BAD_REQUEST,
    STATUS_FOUND, STATUS_HEADER_FIELDS_TOO_LARGE, STATUS_INTERNAL_SERVER_ERROR,
    STATUS_NOT_FOUND, STATUS_NOT_IMPLEMENTED, STATUS_NO_CONTENT, STATUS_OK,
    STATUS_PAYLOAD_TOO_LARGE,
};
pub use wire::{read_request, WireReader, DEFAULT_READ_BUFFER_SIZE};
