use std::fmt;
use std::io;

use crate::types::{
    STATUS_BAD_REQUEST, STATUS_HEADER_FIELDS_TOO_LARGE, STATUS_NOT_IMPLEMENTED,
    STATUS_PAYLOAD_TOO_LARGE,
};

// ---------------------------------------------------------------------------
// ParseError
// ---------------------------------------------------------------------------

/// Errors raised while reading and decoding a request off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The request line does not carry at least a method and a target.
    MalformedRequestLine,
    /// The method token is not one of the supported methods.
    InvalidMethod(String),
    /// The version token is not `HTTP/1.0` or `HTTP/1.1`.
    InvalidVersion(String),
    /// The request target is empty or too long.
    InvalidUri(String),
    InvalidContentLength(String),
    /// The request declares a transfer coding the decoder does not handle.
    UnsupportedTransferEncoding(String),
    UnexpectedByte {
        /// Human-readable description of what was expected.
        expected: &'static str,
        found: u8,
    },
    /// A single header name or value exceeds its limit.
    HeaderTooLarge,
    TooManyHeaders,
    /// Request line plus headers exceed the configured head size.
    RequestTooLarge,
    /// The declared body exceeds the configured maximum.
    BodyTooLarge,
    /// The peer stopped sending before the request was complete.
    IncompleteRequest,
    /// The peer closed the connection without sending a single byte.
    ConnectionClosed,
    /// The underlying read failed.
    Io(io::ErrorKind, String),
}

impl ParseError {
    /// Status code the dispatcher answers with, or `None` when the
    /// connection should simply be closed.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ConnectionClosed | Self::Io(..) => None,
            Self::RequestTooLarge | Self::HeaderTooLarge | Self::TooManyHeaders => {
                Some(STATUS_HEADER_FIELDS_TOO_LARGE)
            }
            Self::BodyTooLarge => Some(STATUS_PAYLOAD_TOO_LARGE),
            Self::UnsupportedTransferEncoding(_) => Some(STATUS_NOT_IMPLEMENTED),
            _ => Some(STATUS_BAD_REQUEST),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedRequestLine => write!(f, "malformed request line"),
            Self::InvalidMethod(m) => write!(f, "invalid HTTP method: '{m}'"),
            Self::InvalidVersion(v) => write!(f, "invalid HTTP version: '{v}'"),
            Self::InvalidUri(u) => write!(f, "invalid request target: '{u}'"),
            Self::InvalidContentLength(v) => write!(f, "invalid Content-Length: '{v}'"),
            Self::UnsupportedTransferEncoding(te) => {
                write!(f, "unsupported Transfer-Encoding: '{te}'")
            }
            Self::UnexpectedByte { expected, found } => {
                write!(f, "unexpected byte 0x{found:02X} (expected {expected})")
            }
            Self::HeaderTooLarge => write!(f, "header exceeds maximum allowed size"),
            Self::TooManyHeaders => write!(f, "number of headers exceeds maximum"),
            Self::RequestTooLarge => write!(f, "request head exceeds maximum allowed size"),
            Self::BodyTooLarge => write!(f, "body exceeds maximum allowed size"),
            Self::IncompleteRequest => write!(f, "incomplete HTTP request"),
            Self::ConnectionClosed => write!(f, "connection closed before request"),
            Self::Io(kind, msg) => write!(f, "read failed ({kind:?}): {msg}"),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<io::Error> for ParseError {
    fn from(err: io::Error) -> Self {
        Self::Io(err.kind(), err.to_string())
    }
}

// ---------------------------------------------------------------------------
// BodyError
// ---------------------------------------------------------------------------

/// Failure to decode the request body.
#[derive(Debug)]
pub enum BodyError {
    /// A previous decode call already consumed the body.
    AlreadyConsumed,
    Json(serde_json::Error),
    /// The body is not valid UTF-8 where text was required.
    Utf8,
}

impl fmt::Display for BodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyConsumed => write!(f, "request body already consumed"),
            Self::Json(e) => write!(f, "invalid JSON body: {e}"),
            Self::Utf8 => write!(f, "request body is not valid UTF-8"),
        }
    }
}

impl std::error::Error for BodyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ResponseError
// ---------------------------------------------------------------------------

/// Violations of the response framing order and write failures.
#[derive(Debug)]
pub enum ResponseError {
    /// Headers or a status line were requested after the status line went out.
    HeadersAlreadySent,
    /// The response body has already been written.
    AlreadyFlushed,
    /// A header name that is not a token, or a value carrying CR, LF or NUL.
    InvalidHeader(String),
    /// The value handed to `json` could not be encoded.
    Encode(serde_json::Error),
    Io(io::Error),
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HeadersAlreadySent => write!(f, "response headers already sent"),
            Self::AlreadyFlushed => write!(f, "response already flushed"),
            Self::InvalidHeader(name) => write!(f, "invalid response header: '{name}'"),
            Self::Encode(e) => write!(f, "failed to encode response body: {e}"),
            Self::Io(e) => write!(f, "failed to write response: {e}"),
        }
    }
}

impl std::error::Error for ResponseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Encode(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ResponseError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

// ---------------------------------------------------------------------------
// StaticError
// ---------------------------------------------------------------------------

/// Static asset resolution failures. Both variants are answered with 404.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaticError {
    NotFound(String),
    /// The requested path contains a `..` segment.
    TraversalRejected(String),
}

impl fmt::Display for StaticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(p) => write!(f, "asset not found: '{p}'"),
            Self::TraversalRejected(p) => write!(f, "path traversal rejected: '{p}'"),
        }
    }
}

impl std::error::Error for StaticError {}

// ---------------------------------------------------------------------------
// RouteError
// ---------------------------------------------------------------------------

/// Invalid input to route registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// Group prefixes must start with `/`.
    InvalidPrefix(String),
    /// Patterns must start with `/` and name every capture.
    InvalidPattern(String),
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPrefix(p) => write!(f, "group prefix must start with '/': '{p}'"),
            Self::InvalidPattern(p) => write!(f, "invalid route pattern: '{p}'"),
        }
    }
}

impl std::error::Error for RouteError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Parse(toml::de::Error),
    /// Every semantic violation found, not just the first.
    Validation(Vec<String>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Parse(e) => write!(f, "parse error: {e}"),
            Self::Validation(errors) => write!(f, "validation failed: {}", errors.join(", ")),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// ServerError
// ---------------------------------------------------------------------------

/// Fatal listener failures, handed back to whoever called `start`.
#[derive(Debug)]
pub enum ServerError {
    Bind(io::Error),
    Accept(io::Error),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind(e) => write!(f, "failed to bind: {e}"),
            Self::Accept(e) => write!(f, "failed to accept: {e}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bind(e) | Self::Accept(e) => Some(e),
        }
    }
}

/// Error type handlers and middleware may return.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type of a handler invocation.
pub type HandlerResult = Result<(), HandlerError>;
