use std::io::{self, Cursor, Read};

use tapster::{
    read_request, HttpMethod, HttpVersion, ParseError, ParseStatus, Parser, ParserConfig,
    WireReader,
};

fn parse(raw: &[u8]) -> Result<tapster::ParsedRequest, ParseError> {
    read_request(raw)
}

fn parse_with(raw: &[u8], config: ParserConfig) -> Result<tapster::ParsedRequest, ParseError> {
    WireReader::with_config(raw, 1024, config).read_request()
}

// =========================================================================
// Request line
// =========================================================================

#[test]
fn simple_get_request() {
    let req = parse(b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n").expect("should parse");
    assert_eq!(req.method, HttpMethod::GET);
    assert_eq!(req.target, "/");
    assert_eq!(req.version, HttpVersion::Http11);
    assert_eq!(req.headers.len(), 1);
    assert_eq!(req.headers[0].name, "Host");
    assert_eq!(req.headers[0].value, "example.com");
    assert!(req.body.is_empty());
}

#[test]
fn target_keeps_query_string() {
    let raw = b"GET /api/users?page=1&limit=10 HTTP/1.1\r\nAccept: application/json\r\n\r\n";
    let req = parse(raw).expect("should parse");
    assert_eq!(req.target, "/api/users?page=1&limit=10");
    assert_eq!(req.header_value("accept"), Some("application/json"));
}

#[test]
fn http_10_version() {
    let req = parse(b"GET /legacy HTTP/1.0\r\n\r\n").expect("should parse");
    assert_eq!(req.version, HttpVersion::Http10);
}

#[test]
fn two_token_request_line_is_http_10() {
    let req = parse(b"GET /old\r\n\r\n").expect("should parse");
    assert_eq!(req.target, "/old");
    assert_eq!(req.version, HttpVersion::Http10);
}

#[test]
fn all_supported_methods() {
    let methods = [
        ("GET", HttpMethod::GET),
        ("HEAD", HttpMethod::HEAD),
        ("POST", HttpMethod::POST),
        ("PUT", HttpMethod::PUT),
        ("DELETE", HttpMethod::DELETE),
        ("CONNECT", HttpMethod::CONNECT),
        ("OPTIONS", HttpMethod::OPTIONS),
        ("TRACE", HttpMethod::TRACE),
        ("PATCH", HttpMethod::PATCH),
    ];

    for (name, expected) in methods {
        let raw = format!("{name} / HTTP/1.1\r\n\r\n");
        let req = parse(raw.as_bytes()).unwrap_or_else(|e| panic!("{name}: {e}"));
        assert_eq!(req.method, expected);
    }
}

#[test]
fn single_token_line_is_malformed() {
    assert_eq!(parse(b"GET\r\n\r\n"), Err(ParseError::MalformedRequestLine));
    assert_eq!(parse(b" / HTTP/1.1\r\n\r\n"), Err(ParseError::MalformedRequestLine));
}

#[test]
fn extension_methods_decode_verbatim() {
    let req = parse(b"PURGE /cache/logo.png HTTP/1.1\r\n\r\n").unwrap();
    assert_eq!(req.method, HttpMethod::Extension("PURGE".into()));
    assert_eq!(req.method.as_str(), "PURGE");

    // Method names are case-sensitive: `get` is not GET.
    let req = parse(b"get / HTTP/1.1\r\n\r\n").unwrap();
    assert_eq!(req.method, HttpMethod::Extension("get".into()));
    assert_ne!(req.method, HttpMethod::GET);
}

#[test]
fn method_with_non_token_bytes_is_rejected() {
    assert!(matches!(
        parse(b"GE(T / HTTP/1.1\r\n\r\n"),
        Err(ParseError::UnexpectedByte { found: b'(', .. })
    ));
    assert!(matches!(
        parse(b"AVERYLONGMETHODNAME / HTTP/1.1\r\n\r\n"),
        Err(ParseError::InvalidMethod(_))
    ));
}

#[test]
fn unsupported_version_is_rejected() {
    assert!(matches!(
        parse(b"GET / HTTP/2.0\r\n\r\n"),
        Err(ParseError::InvalidVersion(_))
    ));
}

#[test]
fn bare_lf_line_ending_is_rejected() {
    assert!(matches!(
        parse(b"GET / HTTP/1.1\nHost: x\n\n"),
        Err(ParseError::UnexpectedByte { found: b'\n', .. })
    ));
}

#[test]
fn overlong_target_is_rejected() {
    let config = ParserConfig {
        max_uri_len: 8,
        ..ParserConfig::default()
    };
    assert!(matches!(
        parse_with(b"GET /a/very/long/path HTTP/1.1\r\n\r\n", config),
        Err(ParseError::InvalidUri(_))
    ));
}

// =========================================================================
// Headers
// =========================================================================

#[test]
fn header_values_are_trimmed() {
    let req = parse(b"GET / HTTP/1.1\r\nX-Pad: \t value with space \t\r\nX-Empty:\r\n\r\n")
        .expect("should parse");
    assert_eq!(req.header_value("x-pad"), Some("value with space"));
    assert_eq!(req.header_value("X-EMPTY"), Some(""));
}

#[test]
fn repeated_headers_are_all_kept() {
    let req = parse(b"GET / HTTP/1.1\r\nAccept: a\r\nAccept: b\r\n\r\n").expect("should parse");
    assert_eq!(req.header_values("accept"), vec!["a", "b"]);
    assert_eq!(req.header_value("accept"), Some("a"));
}

#[test]
fn space_before_colon_is_rejected() {
    assert!(matches!(
        parse(b"GET / HTTP/1.1\r\nHost : x\r\n\r\n"),
        Err(ParseError::UnexpectedByte { found: b' ', .. })
    ));
}

#[test]
fn too_many_headers() {
    let config = ParserConfig {
        max_headers_count: 2,
        ..ParserConfig::default()
    };
    assert_eq!(
        parse_with(b"GET / HTTP/1.1\r\nA: 1\r\nB: 2\r\nC: 3\r\n\r\n", config),
        Err(ParseError::TooManyHeaders)
    );
}

#[test]
fn oversized_head_is_rejected_not_truncated() {
    let config = ParserConfig {
        max_head_size: 48,
        ..ParserConfig::default()
    };
    let raw = format!("GET / HTTP/1.1\r\nX-Long: {}\r\n\r\n", "v".repeat(64));
    assert_eq!(
        parse_with(raw.as_bytes(), config),
        Err(ParseError::RequestTooLarge)
    );
}

#[test]
fn head_exactly_at_limit_is_accepted() {
    let raw = b"GET / HTTP/1.1\r\nHost: x\r\n\r\n";
    let config = ParserConfig {
        max_head_size: raw.len(),
        ..ParserConfig::default()
    };
    assert!(parse_with(raw, config).is_ok());
}

// =========================================================================
// Body
// =========================================================================

#[test]
fn content_length_body() {
    let req = parse(b"POST /submit HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello")
        .expect("should parse");
    assert_eq!(req.method, HttpMethod::POST);
    assert_eq!(req.content_length(), Some(5));
    assert_eq!(req.body, b"hello");
}

#[test]
fn body_stops_at_declared_length() {
    let req = parse(b"POST / HTTP/1.1\r\nContent-Length: 3\r\n\r\nabcdef").expect("should parse");
    assert_eq!(req.body, b"abc");
}

#[test]
fn zero_content_length_is_empty_body() {
    let req = parse(b"POST / HTTP/1.1\r\nContent-Length: 0\r\n\r\n").expect("should parse");
    assert!(req.body.is_empty());
}

#[test]
fn short_body_is_incomplete() {
    assert_eq!(
        parse(b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nshort"),
        Err(ParseError::IncompleteRequest)
    );
}

#[test]
fn invalid_content_length() {
    assert!(matches!(
        parse(b"POST / HTTP/1.1\r\nContent-Length: ten\r\n\r\n"),
        Err(ParseError::InvalidContentLength(_))
    ));
    assert!(matches!(
        parse(b"POST / HTTP/1.1\r\nContent-Length: 3\r\nContent-Length: 4\r\n\r\nabcd"),
        Err(ParseError::InvalidContentLength(_))
    ));
}

#[test]
fn identical_duplicate_content_length_is_accepted() {
    let req = parse(b"POST / HTTP/1.1\r\nContent-Length: 2\r\nContent-Length: 2\r\n\r\nok")
        .expect("should parse");
    assert_eq!(req.body, b"ok");
}

#[test]
fn chunked_body_is_unsupported() {
    let raw = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n";
    let err = parse(raw).unwrap_err();
    assert_eq!(err, ParseError::UnsupportedTransferEncoding("chunked".into()));
    assert_eq!(err.status(), Some(501));
}

#[test]
fn body_over_limit_is_rejected_before_reading() {
    let config = ParserConfig {
        max_body_size: 4,
        ..ParserConfig::default()
    };
    let err = parse_with(b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\n", config).unwrap_err();
    assert_eq!(err, ParseError::BodyTooLarge);
    assert_eq!(err.status(), Some(413));
}

// =========================================================================
// Incremental feeding
// =========================================================================

#[test]
fn byte_at_a_time() {
    let raw = b"PUT /item HTTP/1.1\r\nContent-Length: 2\r\n\r\nhi";
    let mut parser = Parser::new();
    for (i, byte) in raw.iter().enumerate() {
        let status = parser.feed(std::slice::from_ref(byte)).unwrap();
        if i + 1 < raw.len() {
            assert_eq!(status, ParseStatus::Incomplete, "at byte {i}");
        } else {
            assert_eq!(status, ParseStatus::Complete(raw.len()));
        }
    }
    let req = parser.finish().unwrap();
    assert_eq!(req.body, b"hi");
}

#[test]
fn split_across_feeds() {
    let mut parser = Parser::new();
    assert_eq!(parser.feed(b"GET /sp").unwrap(), ParseStatus::Incomplete);
    assert_eq!(parser.feed(b"lit HTTP/1.1\r\nHo").unwrap(), ParseStatus::Incomplete);
    assert!(matches!(
        parser.feed(b"st: a\r\n\r\n").unwrap(),
        ParseStatus::Complete(_)
    ));
    assert_eq!(parser.finish().unwrap().target, "/split");
}

#[test]
fn finish_before_complete_fails() {
    let mut parser = Parser::new();
    parser.feed(b"GET / HTTP/1.1\r\n").unwrap();
    assert!(parser.in_head());
    assert_eq!(parser.finish(), Err(ParseError::IncompleteRequest));
}

// =========================================================================
// Wire reader
// =========================================================================

/// Hands out at most `step` bytes per read, with an interruption first.
struct Trickle {
    data: Cursor<Vec<u8>>,
    step: usize,
    interrupted: bool,
}

impl Trickle {
    fn new(data: &[u8], step: usize) -> Self {
        Self {
            data: Cursor::new(data.to_vec()),
            step,
            interrupted: false,
        }
    }
}

impl Read for Trickle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.interrupted {
            self.interrupted = true;
            return Err(io::Error::from(io::ErrorKind::Interrupted));
        }
        let n = buf.len().min(self.step);
        self.data.read(&mut buf[..n])
    }
}

#[test]
fn reader_assembles_small_reads() {
    let raw = b"POST /form HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: 7\r\n\r\na=1&b=2";
    let req = WireReader::new(Trickle::new(raw, 3)).read_request().unwrap();
    assert_eq!(req.target, "/form");
    assert_eq!(req.body, b"a=1&b=2");
}

#[test]
fn reader_with_one_byte_buffer() {
    let raw = b"GET /tiny HTTP/1.1\r\nHost: h\r\n\r\n";
    let req = WireReader::with_config(&raw[..], 1, ParserConfig::default())
        .read_request()
        .unwrap();
    assert_eq!(req.target, "/tiny");
}

#[test]
fn reader_distinguishes_silent_peer_from_truncated_request() {
    let err = read_request(&b""[..]).unwrap_err();
    assert_eq!(err, ParseError::ConnectionClosed);
    assert_eq!(err.status(), None);

    let err = read_request(&b"GET / HTT"[..]).unwrap_err();
    assert_eq!(err, ParseError::IncompleteRequest);
    assert_eq!(err.status(), Some(400));
}

#[test]
fn reader_does_not_wait_for_eof() {
    struct NeverEof<'a>(&'a [u8]);
    impl Read for NeverEof<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            assert!(!self.0.is_empty(), "read past the end of the request");
            let n = buf.len().min(self.0.len());
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    let req = WireReader::new(NeverEof(b"GET /open HTTP/1.1\r\n\r\n"))
        .read_request()
        .unwrap();
    assert_eq!(req.target, "/open");
}

#[test]
fn read_errors_surface_as_io() {
    struct Broken;
    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        }
    }
    let err = WireReader::new(Broken).read_request().unwrap_err();
    assert!(matches!(err, ParseError::Io(io::ErrorKind::ConnectionReset, _)));
    assert_eq!(err.status(), None);
}
