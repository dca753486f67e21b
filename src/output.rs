use std::fmt::Write as _;

use serde::Serialize;

use crate::request::Request;
use crate::types::{Header, HttpMethod, HttpVersion};

/// Serializable view of a [`Request`]. The body is described by its length
/// only, since it may already have been consumed.
#[derive(Debug, Serialize)]
pub struct RequestSummary<'r> {
    pub method: &'r HttpMethod,
    pub target: &'r str,
    pub path: &'r str,
    pub query: Option<&'r str>,
    pub version: HttpVersion,
    pub headers: &'r [Header],
    pub body_len: Option<usize>,
}

impl<'r> From<&'r Request> for RequestSummary<'r> {
    fn from(request: &'r Request) -> Self {
        Self {
            method: request.method(),
            target: request.target(),
            path: request.path(),
            query: request.query(),
            version: request.version(),
            headers: request.headers(),
            body_len: request.body().len(),
        }
    }
}

/// Serialize a [`Request`] summary to a JSON string.
///
/// When `pretty` is `true` the output is indented for readability.
pub fn format_json(request: &Request, pretty: bool) -> String {
    let summary = RequestSummary::from(request);
    let encoded = if pretty {
        serde_json::to_string_pretty(&summary)
    } else {
        serde_json::to_string(&summary)
    };
    encoded.unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

/// Render a [`Request`] in a human-readable debug format.
pub fn format_debug(request: &Request) -> String {
    let mut out = String::with_capacity(256);

    let _ = writeln!(out, "=== Request ===");
    let _ = writeln!(out, "Method:  {}", request.method());
    let _ = writeln!(out, "Path:    {}", request.path());
    if let Some(query) = request.query() {
        let _ = writeln!(out, "Query:   {query}");
    }
    let _ = writeln!(out, "Version: {}", request.version());

    let _ = writeln!(out, "\n--- Headers ({}) ---", request.headers().len());
    for header in request.headers() {
        let _ = writeln!(out, "  {}: {}", header.name, header.value);
    }

    match request.body().len() {
        Some(0) => out.push_str("\n--- No Body ---\n"),
        Some(n) => {
            let _ = writeln!(out, "\n--- Body ({n} bytes) ---");
        }
        None => out.push_str("\n--- Body (consumed) ---\n"),
    }

    out.push_str("===============\n");
    out
}

/// Render only the request line and headers.
pub fn format_headers_only(request: &Request) -> String {
    let mut out = String::with_capacity(64 + request.headers().len() * 40);

    let _ = writeln!(
        out,
        "{} {} {}",
        request.method(),
        request.target(),
        request.version()
    );
    for header in request.headers() {
        let _ = writeln!(out, "{}: {}", header.name, header.value);
    }

    out
}
