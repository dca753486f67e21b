use crate::error::ParseError;
use crate::types::{Header, HttpMethod, HttpVersion, ParsedRequest};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Limits enforced while decoding a request.
///
/// All sizes are in bytes unless stated otherwise.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Maximum length of the method token (default: 16).
    pub max_method_len: usize,
    /// Maximum length of the request target (default: 4 096).
    pub max_uri_len: usize,
    /// Maximum length of a single header field name (default: 256).
    pub max_header_name_len: usize,
    /// Maximum length of a single header field value (default: 4 096).
    pub max_header_value_len: usize,
    /// Maximum number of header fields (default: 128).
    pub max_headers_count: usize,
    /// Maximum size of request line plus headers, terminators included
    /// (default: 8 192).
    pub max_head_size: usize,
    /// Maximum declared body size (default: 10 MiB).
    pub max_body_size: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_method_len: 16,
            max_uri_len: 4_096,
            max_header_name_len: 256,
            max_header_value_len: 4_096,
            max_headers_count: 128,
            max_head_size: 8_192,
            max_body_size: 10 * 1024 * 1024,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse status
// ---------------------------------------------------------------------------

/// Outcome of a [`Parser::feed`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    /// A complete request has been consumed. The value is the total number
    /// of bytes consumed across all `feed` calls; anything after it is
    /// ignored, since one connection carries one request.
    Complete(usize),
    /// More bytes are needed.
    Incomplete,
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    // ---- Request line ----
    Method,
    Uri,
    Version,
    RequestLineLf,

    // ---- Header lines ----
    HeaderStart,
    HeaderName,
    HeaderValueOws,
    HeaderValue,
    HeaderValueLf,

    // ---- Blank line ----
    EndHeadersLf,

    // ---- Content-Length body ----
    Body,

    Complete,
}

impl State {
    fn in_head(self) -> bool {
        !matches!(self, Self::Body | Self::Complete)
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Incremental request decoder.
///
/// Bytes are fed in whatever chunks the connection yields. The request line
/// and each header line are framed by CRLF; the first empty line ends the
/// head, after which exactly `Content-Length` body bytes are collected.
///
/// ```rust
/// use tapster::{Parser, ParseStatus};
///
/// let mut parser = Parser::new();
/// assert_eq!(parser.feed(b"GET /users/7 HTTP/1.1\r\n").unwrap(), ParseStatus::Incomplete);
/// assert!(matches!(
///     parser.feed(b"Host: localhost\r\n\r\n").unwrap(),
///     ParseStatus::Complete(_)
/// ));
///
/// let request = parser.finish().unwrap();
/// assert_eq!(request.target, "/users/7");
/// ```
pub struct Parser {
    state: State,
    config: ParserConfig,
    bytes_consumed: usize,

    method_buf: Vec<u8>,
    uri_buf: Vec<u8>,
    version_buf: Vec<u8>,
    header_name_buf: Vec<u8>,
    header_value_buf: Vec<u8>,
    body_buf: Vec<u8>,

    method: Option<HttpMethod>,
    target: Option<String>,
    version: Option<HttpVersion>,
    headers: Vec<Header>,

    body_remaining: usize,
}

impl Parser {
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            state: State::Method,
            config,
            bytes_consumed: 0,
            method_buf: Vec::with_capacity(8),
            uri_buf: Vec::with_capacity(128),
            version_buf: Vec::with_capacity(8),
            header_name_buf: Vec::with_capacity(32),
            header_value_buf: Vec::with_capacity(128),
            body_buf: Vec::new(),
            method: None,
            target: None,
            version: None,
            headers: Vec::new(),
            body_remaining: 0,
        }
    }

    /// Feed the next slice of bytes read off the connection.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] on any framing violation or limit breach.
    pub fn feed(&mut self, data: &[u8]) -> Result<ParseStatus, ParseError> {
        let mut i = 0;

        while i < data.len() {
            match self.state {
                State::Complete => break,
                State::Body => {
                    let to_copy = (data.len() - i).min(self.body_remaining);
                    self.body_buf.extend_from_slice(&data[i..i + to_copy]);
                    self.body_remaining -= to_copy;
                    self.bytes_consumed += to_copy;
                    i += to_copy;

                    if self.body_remaining == 0 {
                        self.state = State::Complete;
                    }
                    continue;
                }
                _ => {}
            }

            let byte = data[i];
            self.bytes_consumed += 1;
            i += 1;

            if self.bytes_consumed > self.config.max_head_size {
                return Err(ParseError::RequestTooLarge);
            }

            self.step(byte)?;
        }

        if self.state == State::Complete {
            Ok(ParseStatus::Complete(self.bytes_consumed))
        } else {
            Ok(ParseStatus::Incomplete)
        }
    }

    /// Advance the head state machine by one byte.
    fn step(&mut self, byte: u8) -> Result<(), ParseError> {
        match self.state {
            // ===================== REQUEST LINE =====================
            State::Method => {
                if byte == b' ' {
                    if self.method_buf.is_empty() {
                        return Err(ParseError::MalformedRequestLine);
                    }
                    self.method = Some(HttpMethod::from_bytes(&self.method_buf)?);
                    self.state = State::Uri;
                } else if byte == b'\r' || byte == b'\n' {
                    // Only one token on the line.
                    return Err(ParseError::MalformedRequestLine);
                } else if is_tchar(byte) {
                    if self.method_buf.len() >= self.config.max_method_len {
                        return Err(ParseError::InvalidMethod("method too long".into()));
                    }
                    self.method_buf.push(byte);
                } else {
                    return Err(ParseError::UnexpectedByte {
                        expected: "token character or SP in request method",
                        found: byte,
                    });
                }
            }

            State::Uri => {
                if byte == b' ' {
                    self.take_target()?;
                    self.state = State::Version;
                } else if byte == b'\r' {
                    if self.uri_buf.is_empty() {
                        return Err(ParseError::MalformedRequestLine);
                    }
                    // Two-token request line: no version given.
                    self.take_target()?;
                    self.version = Some(HttpVersion::Http10);
                    self.state = State::RequestLineLf;
                } else if byte > b' ' && byte != 0x7F {
                    if self.uri_buf.len() >= self.config.max_uri_len {
                        return Err(ParseError::InvalidUri("target too long".into()));
                    }
                    self.uri_buf.push(byte);
                } else {
                    return Err(ParseError::UnexpectedByte {
                        expected: "visible character, SP or CR in request target",
                        found: byte,
                    });
                }
            }

            State::Version => {
                if byte == b'\r' {
                    self.version = Some(HttpVersion::from_bytes(&self.version_buf)?);
                    self.state = State::RequestLineLf;
                } else if byte > b' ' && byte != 0x7F {
                    if self.version_buf.len() >= 16 {
                        return Err(ParseError::InvalidVersion("version string too long".into()));
                    }
                    self.version_buf.push(byte);
                } else {
                    return Err(ParseError::UnexpectedByte {
                        expected: "version character or CR",
                        found: byte,
                    });
                }
            }

            State::RequestLineLf => {
                self.expect_lf(byte, "LF after request line CR")?;
                self.state = State::HeaderStart;
            }

            // ===================== HEADERS =====================
            State::HeaderStart => {
                if byte == b'\r' {
                    self.state = State::EndHeadersLf;
                } else if is_tchar(byte) {
                    if self.headers.len() >= self.config.max_headers_count {
                        return Err(ParseError::TooManyHeaders);
                    }
                    self.header_name_buf.clear();
                    self.header_name_buf.push(byte);
                    self.state = State::HeaderName;
                } else {
                    return Err(ParseError::UnexpectedByte {
                        expected: "header name character or CR",
                        found: byte,
                    });
                }
            }

            State::HeaderName => {
                if byte == b':' {
                    self.header_value_buf.clear();
                    self.state = State::HeaderValueOws;
                } else if is_tchar(byte) {
                    if self.header_name_buf.len() >= self.config.max_header_name_len {
                        return Err(ParseError::HeaderTooLarge);
                    }
                    self.header_name_buf.push(byte);
                } else {
                    return Err(ParseError::UnexpectedByte {
                        expected: "header name character or ':'",
                        found: byte,
                    });
                }
            }

            State::HeaderValueOws => {
                if byte == b' ' || byte == b'\t' {
                    // leading OWS
                } else if byte == b'\r' {
                    self.store_current_header();
                    self.state = State::HeaderValueLf;
                } else if is_field_content_byte(byte) {
                    self.header_value_buf.push(byte);
                    self.state = State::HeaderValue;
                } else {
                    return Err(ParseError::UnexpectedByte {
                        expected: "header value character, OWS, or CR",
                        found: byte,
                    });
                }
            }

            State::HeaderValue => {
                if byte == b'\r' {
                    while self
                        .header_value_buf
                        .last()
                        .is_some_and(|&b| b == b' ' || b == b'\t')
                    {
                        self.header_value_buf.pop();
                    }
                    self.store_current_header();
                    self.state = State::HeaderValueLf;
                } else if is_field_content_byte(byte) {
                    if self.header_value_buf.len() >= self.config.max_header_value_len {
                        return Err(ParseError::HeaderTooLarge);
                    }
                    self.header_value_buf.push(byte);
                } else {
                    return Err(ParseError::UnexpectedByte {
                        expected: "header value character or CR",
                        found: byte,
                    });
                }
            }

            State::HeaderValueLf => {
                self.expect_lf(byte, "LF after header value CR")?;
                self.state = State::HeaderStart;
            }

            // ===================== BLANK LINE =====================
            State::EndHeadersLf => {
                self.expect_lf(byte, "LF after end-of-headers CR")?;
                self.determine_body_handling()?;
            }

            State::Body | State::Complete => {
                unreachable!("body bytes are copied in bulk by feed");
            }
        }
        Ok(())
    }

    // ----- helpers --------------------------------------------------------

    fn expect_lf(&self, byte: u8, expected: &'static str) -> Result<(), ParseError> {
        if byte == b'\n' {
            Ok(())
        } else {
            Err(ParseError::UnexpectedByte {
                expected,
                found: byte,
            })
        }
    }

    fn take_target(&mut self) -> Result<(), ParseError> {
        if self.uri_buf.is_empty() {
            return Err(ParseError::InvalidUri("empty target".into()));
        }
        self.target = Some(String::from_utf8_lossy(&self.uri_buf).into_owned());
        Ok(())
    }

    fn store_current_header(&mut self) {
        let name = String::from_utf8_lossy(&self.header_name_buf).into_owned();
        let value = String::from_utf8_lossy(&self.header_value_buf).into_owned();
        self.headers.push(Header { name, value });
    }

    /// Decide from the headers how many body bytes follow the blank line.
    fn determine_body_handling(&mut self) -> Result<(), ParseError> {
        if let Some(te) = self
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case("transfer-encoding"))
            .filter(|h| !h.value.trim().eq_ignore_ascii_case("identity"))
        {
            return Err(ParseError::UnsupportedTransferEncoding(te.value.clone()));
        }

        let cl_values: Vec<&str> = self
            .headers
            .iter()
            .filter(|h| h.name.eq_ignore_ascii_case("content-length"))
            .map(|h| h.value.trim())
            .collect();

        if let Some(first) = cl_values.first() {
            if cl_values.iter().any(|v| v != first) {
                return Err(ParseError::InvalidContentLength(
                    "multiple differing Content-Length values".into(),
                ));
            }

            // 1*DIGIT only; `usize::from_str` would also take a leading `+`.
            let length: usize = Some(*first)
                .filter(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| ParseError::InvalidContentLength(first.to_string()))?;

            if length > self.config.max_body_size {
                return Err(ParseError::BodyTooLarge);
            }

            if length == 0 {
                self.state = State::Complete;
            } else {
                self.body_remaining = length;
                self.body_buf.reserve(length.min(65_536));
                self.state = State::Body;
            }
        } else {
            self.state = State::Complete;
        }

        Ok(())
    }

    // ----- public query / finalization ------------------------------------

    /// Consume the parser and return the decoded request.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::IncompleteRequest`] unless `feed` has reported
    /// [`ParseStatus::Complete`].
    pub fn finish(self) -> Result<ParsedRequest, ParseError> {
        if self.state != State::Complete {
            return Err(ParseError::IncompleteRequest);
        }

        Ok(ParsedRequest {
            method: self.method.ok_or(ParseError::IncompleteRequest)?,
            target: self.target.ok_or(ParseError::IncompleteRequest)?,
            version: self.version.ok_or(ParseError::IncompleteRequest)?,
            headers: self.headers,
            body: self.body_buf,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.state == State::Complete
    }

    /// `true` while the request line or headers are still being read.
    pub fn in_head(&self) -> bool {
        self.state.in_head()
    }

    pub fn bytes_consumed(&self) -> usize {
        self.bytes_consumed
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Character classification helpers
// ---------------------------------------------------------------------------

/// `tchar`: characters allowed in method tokens and header names.
#[inline]
pub(crate) fn is_tchar(b: u8) -> bool {
    matches!(
        b,
        b'!' | b'#'
            | b'$'
            | b'%'
            | b'&'
            | b'\''
            | b'*'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~'
            | b'0'..=b'9'
            | b'a'..=b'z'
            | b'A'..=b'Z'
    )
}

/// `SP / HTAB / VCHAR / obs-text`.
#[inline]
fn is_field_content_byte(b: u8) -> bool {
    b == b' ' || b == b'\t' || (0x21..=0x7E).contains(&b) || b >= 0x80
}
