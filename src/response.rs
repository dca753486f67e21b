//! Response framing.
//!
//! A [`ResponseWriter`] moves through three states:
//!
//! ```text
//! Unstarted ──status line──▶ HeaderSent ──headers, blank line, body──▶ Flushed
//! ```
//!
//! Headers may only be changed while `Unstarted`. Every response method
//! sets `Content-Type` and `Content-Length` before the status line goes out,
//! and any attempt to start a second response is refused with
//! [`ResponseError::HeadersAlreadySent`] instead of corrupting the stream.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::ResponseError;
use crate::parser::is_tchar;
use crate::static_files::content_type_for;
use crate::types::{reason_phrase, Header, STATUS_FOUND, STATUS_NOT_FOUND, STATUS_OK};

/// Body written by [`ResponseWriter::not_found`] and for unmatched routes.
pub const NOT_FOUND_BODY: &str = "<h1>Error 404 Not Found</h1>";

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";
const OCTET_STREAM: &str = "application/octet-stream";

/// Framing progress of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Nothing written yet; headers are still mutable.
    Unstarted,
    /// The status line is on the wire.
    HeaderSent,
    /// Headers and body are on the wire. Terminal.
    Flushed,
}

/// Per-request response state bound to one connection.
pub struct ResponseWriter<'a> {
    out: &'a mut dyn Write,
    headers: Vec<Header>,
    state: FrameState,
    status: Option<u16>,
}

impl<'a> ResponseWriter<'a> {
    pub fn new(out: &'a mut dyn Write) -> Self {
        Self {
            out,
            headers: Vec::new(),
            state: FrameState::Unstarted,
            status: None,
        }
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// `true` once the status line has been written.
    pub fn headers_sent(&self) -> bool {
        self.state != FrameState::Unstarted
    }

    /// Status chosen for this response: the one on the wire once started,
    /// otherwise the one set with [`status`](Self::status).
    pub fn sent_status(&self) -> Option<u16> {
        self.status
    }

    /// Accumulated headers, in the order they will be written.
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// Set a header, replacing any existing one with the same name
    /// (compared case-insensitively).
    ///
    /// # Errors
    ///
    /// [`ResponseError::InvalidHeader`] if `name` is not a token or `value`
    /// contains CR, LF or NUL. Nothing is recorded in that case.
    pub fn set_header(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ResponseError> {
        self.ensure_unstarted()?;
        let name = name.into();
        let value = value.into();
        if name.is_empty() || !name.bytes().all(is_tchar) {
            return Err(ResponseError::InvalidHeader(name));
        }
        if value.bytes().any(|b| matches!(b, b'\r' | b'\n' | 0)) {
            return Err(ResponseError::InvalidHeader(name));
        }
        match self
            .headers
            .iter_mut()
            .find(|h| h.name.eq_ignore_ascii_case(&name))
        {
            Some(existing) => *existing = Header { name, value },
            None => self.headers.push(Header { name, value }),
        }
        Ok(())
    }

    /// Choose the status used by [`write`](Self::write).
    pub fn status(&mut self, code: u16) -> Result<(), ResponseError> {
        self.ensure_unstarted()?;
        self.status = Some(code);
        Ok(())
    }

    pub fn text(&mut self, status: u16, body: impl AsRef<str>) -> Result<(), ResponseError> {
        self.send(status, Some(TEXT_PLAIN), body.as_ref().as_bytes())
    }

    pub fn html(&mut self, status: u16, body: impl AsRef<str>) -> Result<(), ResponseError> {
        self.send(status, Some(TEXT_HTML), body.as_ref().as_bytes())
    }

    /// Encode `value` as JSON and send it. Encoding happens before anything
    /// is written, so an encode failure leaves the response unstarted.
    pub fn json<T: Serialize + ?Sized>(
        &mut self,
        status: u16,
        value: &T,
    ) -> Result<(), ResponseError> {
        self.ensure_unstarted()?;
        let body = serde_json::to_vec(value).map_err(ResponseError::Encode)?;
        self.send(status, Some(APPLICATION_JSON), &body)
    }

    /// Send the contents of the file at `path`, typed by its extension.
    pub fn file(&mut self, status: u16, path: impl AsRef<Path>) -> Result<(), ResponseError> {
        self.ensure_unstarted()?;
        let path = path.as_ref();
        let body = std::fs::read(path)?;
        self.send(status, Some(content_type_for(path)), &body)
    }

    pub fn not_found(&mut self) -> Result<(), ResponseError> {
        self.html(STATUS_NOT_FOUND, NOT_FOUND_BODY)
    }

    /// `302 Found` with a `Location` header and an empty body. The
    /// response is complete afterwards and the connection is closed by the
    /// dispatcher.
    pub fn redirect(&mut self, location: impl Into<String>) -> Result<(), ResponseError> {
        self.set_header("Location", location)?;
        self.send(STATUS_FOUND, Some(TEXT_PLAIN), b"")
    }

    /// Send `bytes` as the body, with the status from
    /// [`status`](Self::status) (default 200) and the `Content-Type` set
    /// earlier (default `application/octet-stream`).
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), ResponseError> {
        let status = self.status.unwrap_or(STATUS_OK);
        self.send(status, None, bytes)
    }

    /// Write `bytes` straight to the connection with no framing at all.
    /// The caller is responsible for a well-formed response.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<(), ResponseError> {
        self.ensure_unstarted()?;
        self.state = FrameState::Flushed;
        self.out.write_all(bytes)?;
        self.out.flush()?;
        Ok(())
    }

    /// Frame one complete response.
    pub fn send(
        &mut self,
        status: u16,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<(), ResponseError> {
        self.ensure_unstarted()?;

        match content_type {
            Some(ct) => self.set_header("Content-Type", ct)?,
            None if !self.has_header("content-type") => {
                self.set_header("Content-Type", OCTET_STREAM)?
            }
            None => {}
        }
        self.set_header("Content-Length", body.len().to_string())?;
        if !self.has_header("connection") {
            self.set_header("Connection", "close")?;
        }

        self.write_status_line(status)?;
        self.write_head_and_body(body)
    }

    // ----- state transitions ----------------------------------------------

    fn write_status_line(&mut self, status: u16) -> Result<(), ResponseError> {
        self.ensure_unstarted()?;
        self.state = FrameState::HeaderSent;
        self.status = Some(status);
        write!(self.out, "HTTP/1.1 {} {}\r\n", status, reason_phrase(status))?;
        Ok(())
    }

    fn write_head_and_body(&mut self, body: &[u8]) -> Result<(), ResponseError> {
        debug_assert_eq!(self.state, FrameState::HeaderSent);
        self.state = FrameState::Flushed;
        for header in &self.headers {
            write!(self.out, "{}: {}\r\n", header.name, header.value)?;
        }
        self.out.write_all(b"\r\n")?;
        self.out.write_all(body)?;
        self.out.flush()?;
        Ok(())
    }

    fn ensure_unstarted(&self) -> Result<(), ResponseError> {
        match self.state {
            FrameState::Unstarted => Ok(()),
            FrameState::HeaderSent => Err(ResponseError::HeadersAlreadySent),
            FrameState::Flushed => Err(ResponseError::AlreadyFlushed),
        }
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h.name.eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Debug for ResponseWriter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseWriter")
            .field("headers", &self.headers)
            .field("state", &self.state)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}
