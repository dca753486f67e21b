use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::ParseError;
use crate::parser::is_tchar;

// ---------------------------------------------------------------------------
// HttpMethod
// ---------------------------------------------------------------------------

/// Request method. The standard methods get their own variants; any other
/// token (`PURGE`, `MKCOL`, a lowercase `get`) is carried verbatim in
/// [`HttpMethod::Extension`]. Comparison is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    GET,
    HEAD,
    POST,
    PUT,
    DELETE,
    CONNECT,
    OPTIONS,
    TRACE,
    PATCH,
    Extension(String),
}

impl HttpMethod {
    /// Parse a method token.
    ///
    /// # Errors
    ///
    /// [`ParseError::InvalidMethod`] if `bytes` is empty or contains a byte
    /// that is not a token character.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        match bytes {
            b"GET" => Ok(Self::GET),
            b"HEAD" => Ok(Self::HEAD),
            b"POST" => Ok(Self::POST),
            b"PUT" => Ok(Self::PUT),
            b"DELETE" => Ok(Self::DELETE),
            b"CONNECT" => Ok(Self::CONNECT),
            b"OPTIONS" => Ok(Self::OPTIONS),
            b"TRACE" => Ok(Self::TRACE),
            b"PATCH" => Ok(Self::PATCH),
            _ if !bytes.is_empty() && bytes.iter().all(|&b| is_tchar(b)) => {
                // Token characters are ASCII, so this never replaces anything.
                Ok(Self::Extension(String::from_utf8_lossy(bytes).into_owned()))
            }
            _ => Err(ParseError::InvalidMethod(
                String::from_utf8_lossy(bytes).into_owned(),
            )),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::GET => "GET",
            Self::HEAD => "HEAD",
            Self::POST => "POST",
            Self::PUT => "PUT",
            Self::DELETE => "DELETE",
            Self::CONNECT => "CONNECT",
            Self::OPTIONS => "OPTIONS",
            Self::TRACE => "TRACE",
            Self::PATCH => "PATCH",
            Self::Extension(token) => token,
        }
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(s.as_bytes())
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for HttpMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// HttpVersion
// ---------------------------------------------------------------------------

/// Protocol version named on the request line.
///
/// A request line without a version token (`GET /`) decodes as `Http10`.
/// Responses are always framed as `HTTP/1.1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVersion {
    Http10,
    Http11,
}

impl HttpVersion {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        match bytes {
            b"HTTP/1.0" => Ok(Self::Http10),
            b"HTTP/1.1" => Ok(Self::Http11),
            _ => Err(ParseError::InvalidVersion(
                String::from_utf8_lossy(bytes).into_owned(),
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http10 => "HTTP/1.0",
            Self::Http11 => "HTTP/1.1",
        }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for HttpVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// A single header field, name kept as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub name: String,
    /// Value with surrounding whitespace trimmed.
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Case-insensitive lookup of the first header named `name`.
pub(crate) fn find_header<'h>(headers: &'h [Header], name: &str) -> Option<&'h str> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

// ---------------------------------------------------------------------------
// ParsedRequest
// ---------------------------------------------------------------------------

/// What the decoder produces for one connection: request line, header
/// fields and the declared body bytes.
///
/// Handlers never see this type directly; it is turned into a
/// [`Request`](crate::Request) by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub method: HttpMethod,
    /// Request target exactly as it appeared on the request line.
    pub target: String,
    pub version: HttpVersion,
    pub headers: Vec<Header>,
    pub body: Vec<u8>,
}

impl ParsedRequest {
    pub fn header_value(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Return all values for headers matching `name` (case-insensitive).
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
            .collect()
    }

    pub fn content_length(&self) -> Option<usize> {
        self.header_value("content-length")
            .and_then(|v| v.trim().parse().ok())
    }
}

// ---------------------------------------------------------------------------
// Status codes
// ---------------------------------------------------------------------------

pub const STATUS_OK: u16 = 200;
pub const STATUS_NO_CONTENT: u16 = 204;
pub const STATUS_FOUND: u16 = 302;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_PAYLOAD_TOO_LARGE: u16 = 413;
pub const STATUS_HEADER_FIELDS_TOO_LARGE: u16 = 431;
pub const STATUS_INTERNAL_SERVER_ERROR: u16 = 500;
pub const STATUS_NOT_IMPLEMENTED: u16 = 501;

/// Reason phrase written after the status code on the status line.
///
/// Unknown codes get an empty phrase, which is still a well-formed
/// status line.
pub fn reason_phrase(code: u16) -> &'static str {
    match code {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        206 => "Partial Content",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        409 => "Conflict",
        411 => "Length Required",
        413 => "Payload Too Large",
        414 => "URI Too Long",
        415 => "Unsupported Media Type",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        431 => "Request Header Fields Too Large",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_phrases_for_common_codes() {
        assert_eq!(reason_phrase(200), "OK");
        assert_eq!(reason_phrase(302), "Found");
        assert_eq!(reason_phrase(404), "Not Found");
        assert_eq!(reason_phrase(799), "");
    }

    #[test]
    fn non_standard_methods_are_kept_verbatim() {
        assert_eq!(HttpMethod::from_bytes(b"GET").unwrap(), HttpMethod::GET);
        assert_eq!(
            HttpMethod::from_bytes(b"PURGE").unwrap(),
            HttpMethod::Extension("PURGE".into())
        );
        let lower: HttpMethod = "get".parse().unwrap();
        assert_ne!(lower, HttpMethod::GET);
        assert_eq!(lower.as_str(), "get");
        assert!(HttpMethod::from_bytes(b"").is_err());
        assert!(HttpMethod::from_bytes(b"BAD METHOD").is_err());
    }

    #[test]
    fn header_lookup_ignores_case() {
        let headers = vec![Header::new("Content-Type", "text/plain")];
        assert_eq!(find_header(&headers, "content-type"), Some("text/plain"));
        assert_eq!(find_header(&headers, "accept"), None);
    }
}
