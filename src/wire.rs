//! Pulling request bytes off a connection.
//!
//! The reader asks the connection for at most `read_buffer_size` bytes at a
//! time and hands every chunk to the [`Parser`], which frames the CRLF lines.
//! Reading stops as soon as the parser reports a complete request, so a peer
//! that keeps the socket open after its request does not stall dispatch.

use std::io::{ErrorKind, Read};

use crate::error::ParseError;
use crate::parser::{ParseStatus, Parser, ParserConfig};
use crate::types::ParsedRequest;

/// Default size of a single read call.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

/// Incremental request reader over any byte source.
#[derive(Debug)]
pub struct WireReader<R> {
    inner: R,
    buf: Vec<u8>,
    config: ParserConfig,
}

impl<R: Read> WireReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, DEFAULT_READ_BUFFER_SIZE, ParserConfig::default())
    }

    /// `read_buffer_size` of zero is bumped to one byte per read.
    pub fn with_config(inner: R, read_buffer_size: usize, config: ParserConfig) -> Self {
        Self {
            inner,
            buf: vec![0; read_buffer_size.max(1)],
            config,
        }
    }

    /// Read until one complete request has been decoded.
    ///
    /// # Errors
    ///
    /// - [`ParseError::ConnectionClosed`] if the peer closed before sending
    ///   anything.
    /// - [`ParseError::IncompleteRequest`] if it closed mid-request.
    /// - [`ParseError::RequestTooLarge`] once the head outgrows
    ///   `max_head_size`, instead of silently truncating.
    /// - Any decode error raised by the parser, or [`ParseError::Io`].
    pub fn read_request(&mut self) -> Result<ParsedRequest, ParseError> {
        let mut parser = Parser::with_config(self.config.clone());

        loop {
            let n = match self.inner.read(&mut self.buf) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            if n == 0 {
                return Err(if parser.bytes_consumed() == 0 {
                    ParseError::ConnectionClosed
                } else {
                    ParseError::IncompleteRequest
                });
            }

            if let ParseStatus::Complete(_) = parser.feed(&self.buf[..n])? {
                return parser.finish();
            }
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Decode one request from `reader` with default limits.
pub fn read_request<R: Read>(reader: R) -> Result<ParsedRequest, ParseError> {
    WireReader::new(reader).read_request()
}
