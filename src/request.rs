//! The request as handlers see it.
//!
//! Everything is read-only except the body, which is consumed by the first
//! decode call.

use serde::de::DeserializeOwned;

use crate::error::BodyError;
use crate::types::{find_header, Header, HttpMethod, HttpVersion, ParsedRequest};

// ---------------------------------------------------------------------------
// Body
// ---------------------------------------------------------------------------

/// Request body that can be decoded exactly once.
#[derive(Debug, Default)]
pub struct Body {
    bytes: Option<Vec<u8>>,
}

impl Body {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes: Some(bytes) }
    }

    /// `true` once any decode call has taken the bytes.
    pub fn is_consumed(&self) -> bool {
        self.bytes.is_none()
    }

    /// Length of the unread body, `None` after consumption.
    pub fn len(&self) -> Option<usize> {
        self.bytes.as_ref().map(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len().is_none_or(|n| n == 0)
    }

    /// Take the raw bytes.
    pub fn take(&mut self) -> Result<Vec<u8>, BodyError> {
        self.bytes.take().ok_or(BodyError::AlreadyConsumed)
    }

    pub fn json<T: DeserializeOwned>(&mut self) -> Result<T, BodyError> {
        let bytes = self.take()?;
        serde_json::from_slice(&bytes).map_err(BodyError::Json)
    }

    pub fn form(&mut self) -> Result<Form, BodyError> {
        let bytes = self.take()?;
        Ok(Form::parse(&bytes))
    }

    pub fn text(&mut self) -> Result<String, BodyError> {
        let bytes = self.take()?;
        String::from_utf8(bytes).map_err(|_| BodyError::Utf8)
    }
}

// ---------------------------------------------------------------------------
// Form
// ---------------------------------------------------------------------------

/// Decoded `application/x-www-form-urlencoded` pairs, in wire order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    pairs: Vec<(String, String)>,
}

impl Form {
    pub fn parse(input: &[u8]) -> Self {
        Self {
            pairs: url::form_urlencoded::parse(input).into_owned().collect(),
        }
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A decoded request, built once per connection.
#[derive(Debug)]
pub struct Request {
    method: HttpMethod,
    target: String,
    path_len: usize,
    version: HttpVersion,
    headers: Vec<Header>,
    body: Body,
}

impl Request {
    pub fn method(&self) -> &HttpMethod {
        &self.method
    }

    /// Path component of the target, without the query string. This is
    /// what routes are matched against.
    pub fn path(&self) -> &str {
        &self.target[..self.path_len]
    }

    /// Raw query string after `?`, if any.
    pub fn query(&self) -> Option<&str> {
        if self.path_len < self.target.len() {
            Some(&self.target[self.path_len + 1..])
        } else {
            None
        }
    }

    /// Percent-decoded query pairs.
    pub fn query_pairs(&self) -> Form {
        Form::parse(self.query().unwrap_or_default().as_bytes())
    }

    /// Target exactly as sent on the request line.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn version(&self) -> HttpVersion {
        self.version
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// `Host` header, empty when absent.
    pub fn host(&self) -> &str {
        self.header("host").unwrap_or_default()
    }

    /// `User-Agent` header, empty when absent.
    pub fn user_agent(&self) -> &str {
        self.header("user-agent").unwrap_or_default()
    }

    /// `Accept` header, empty when absent.
    pub fn accept(&self) -> &str {
        self.header("accept").unwrap_or_default()
    }

    /// Client platform from the `Sec-CH-UA-Platform` hint, quotes removed.
    pub fn platform(&self) -> &str {
        self.header("sec-ch-ua-platform")
            .map(|p| p.trim_matches('"'))
            .unwrap_or_default()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Decode the body as JSON. Consumes the body.
    pub fn json<T: DeserializeOwned>(&mut self) -> Result<T, BodyError> {
        self.body.json()
    }

    /// Decode the body as URL-encoded form data. Consumes the body.
    pub fn form(&mut self) -> Result<Form, BodyError> {
        self.body.form()
    }

    /// Take the raw body bytes. Consumes the body.
    pub fn bytes(&mut self) -> Result<Vec<u8>, BodyError> {
        self.body.take()
    }

    /// Take the body as UTF-8 text. Consumes the body.
    pub fn text(&mut self) -> Result<String, BodyError> {
        self.body.text()
    }
}

impl From<ParsedRequest> for Request {
    fn from(parsed: ParsedRequest) -> Self {
        let path_len = parsed.target.find('?').unwrap_or(parsed.target.len());
        Self {
            method: parsed.method,
            target: parsed.target,
            path_len,
            version: parsed.version,
            headers: parsed.headers,
            body: Body::new(parsed.body),
        }
    }
}
