//! Request-line and header parsing (spec 4.A).
//!
//! Unlike the zero-copy, pool-reused parser this module is descended from,
//! each request owns its header bytes outright (`head`): there is no
//! connection pool to borrow a `'static` buffer from, since a connection
//! handles exactly one request and is dropped afterward (§9: keep-alive is
//! not implemented here). Parsed fields are stored as byte ranges into
//! `head` rather than slices, which sidesteps any self-referential-struct
//! trouble without reaching for `unsafe`.

use crate::errors::ErrorKind;
use crate::http::types::{self, Method, Version};
use crate::limits::ReqLimits;
use memchr::{memchr, memchr_iter};
use std::net::SocketAddr;
use std::ops::Range;

/// A fully parsed request line + header block, plus whatever body bytes have
/// been read so far (filled in by the connection task after parsing the head).
#[derive(Debug)]
pub struct Request {
    head: Vec<u8>,
    method: Method,
    method_range: Range<usize>,
    target: Range<usize>,
    path: Range<usize>,
    query: Option<Range<usize>>,
    version: Version,
    headers: Vec<(Range<usize>, Range<usize>)>,
    content_length: Option<usize>,
    chunked: bool,

    pub body: Vec<u8>,
    pub client_addr: SocketAddr,
    pub server_addr: SocketAddr,
}

const UNSPECIFIED: SocketAddr = SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), 0);

impl Request {
    #[inline]
    fn slice(&self, range: &Range<usize>) -> &[u8] {
        &self.head[range.clone()]
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Raw method token as sent on the wire (useful for `Method::Other`).
    pub fn method_str(&self) -> &str {
        std::str::from_utf8(self.slice(&self.method_range)).unwrap_or("")
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Full request target including any query string, e.g. `/a/b?x=1`.
    pub fn target(&self) -> &[u8] {
        self.slice(&self.target)
    }

    /// Request target without the query string.
    pub fn path(&self) -> &[u8] {
        self.slice(&self.path)
    }

    /// Query string without the leading `?`, if present.
    pub fn query(&self) -> Option<&[u8]> {
        self.query.as_ref().map(|r| self.slice(r))
    }

    pub fn content_length(&self) -> Option<usize> {
        self.content_length
    }

    pub fn is_chunked(&self) -> bool {
        self.chunked
    }

    /// Case-insensitive header lookup (`name` must already be lowercase ascii).
    pub fn header(&self, name: &[u8]) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|(n, _)| self.slice(n).eq_ignore_ascii_case(name))
            .map(|(_, v)| self.slice(v))
    }

    pub fn headers(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.headers.iter().map(|(n, v)| (self.slice(n), self.slice(v)))
    }
}

/// Parses the request-line and headers out of `head`, which must contain
/// exactly the bytes up to and including the terminating blank line
/// (`\r\n\r\n`). Ownership of `head` moves into the returned [`Request`].
pub(crate) fn parse_head(mut head: Vec<u8>, limits: &ReqLimits) -> Result<Request, ErrorKind> {
    if head.len() > limits.max_head_size {
        return Err(ErrorKind::TooManyHeaders);
    }

    let first_line_end = memchr(b'\n', &head).ok_or(ErrorKind::InvalidUrl)?;
    let line_len = if first_line_end > 0 && head[first_line_end - 1] == b'\r' {
        first_line_end - 1
    } else {
        first_line_end
    };

    let sp1 = memchr(b' ', &head[..line_len]).ok_or(ErrorKind::InvalidMethod)?;
    let rest = &head[sp1 + 1..line_len];
    let sp2 = memchr(b' ', rest).ok_or(ErrorKind::InvalidUrl)?;

    let method_range = 0..sp1;
    let target_start = sp1 + 1;
    let target_end = target_start + sp2;
    let version_start = target_end + 1;
    let version_end = line_len;

    if target_end <= target_start || version_end <= version_start {
        return Err(ErrorKind::InvalidUrl);
    }
    if target_end - target_start > limits.url_size {
        return Err(ErrorKind::InvalidUrl);
    }

    let method = Method::from_bytes(&head[method_range.clone()]);
    let version = Version::from_bytes(&head[version_start..version_end])?;

    let target_bytes = &head[target_start..target_end];
    if target_bytes.first() != Some(&b'/') {
        return Err(ErrorKind::BadTarget);
    }
    let (path_len, query_range) = match memchr(b'?', target_bytes) {
        Some(pos) => (pos, Some(target_start + pos + 1..target_end)),
        None => (target_bytes.len(), None),
    };
    let target = target_start..target_end;
    let path = target_start..target_start + path_len;

    // Header block starts right after the request line's terminator.
    let mut cursor = first_line_end + 1;
    let mut headers = Vec::new();
    let mut content_length = None;
    let mut chunked = false;
    let mut host_seen = false;

    loop {
        let Some(rel_nl) = memchr(b'\n', &head[cursor..]) else {
            return Err(ErrorKind::InvalidHeader);
        };
        let nl = cursor + rel_nl;
        let line_end = if nl > cursor && head[nl - 1] == b'\r' { nl - 1 } else { nl };

        if line_end == cursor {
            cursor = nl + 1;
            break; // blank line: end of headers
        }

        if head[cursor] == b' ' || head[cursor] == b'\t' {
            // Obsolete line folding is not supported.
            return Err(ErrorKind::InvalidHeader);
        }

        let colon = memchr(b':', &head[cursor..line_end]).ok_or(ErrorKind::InvalidHeader)?;
        if colon == 0 {
            return Err(ErrorKind::InvalidHeader);
        }
        let name_end = cursor + colon;
        if name_end - cursor > limits.header_name_size {
            return Err(ErrorKind::TooManyHeaders);
        }
        if head[cursor..name_end].iter().any(|&b| b == b' ' || b == b'\t') {
            return Err(ErrorKind::InvalidHeader);
        }

        let mut value_start = name_end + 1;
        while value_start < line_end && (head[value_start] == b' ' || head[value_start] == b'\t') {
            value_start += 1;
        }
        let mut value_end = line_end;
        while value_end > value_start && (head[value_end - 1] == b' ' || head[value_end - 1] == b'\t') {
            value_end -= 1;
        }
        if value_end - value_start > limits.header_value_size {
            return Err(ErrorKind::TooManyHeaders);
        }

        types::to_lower_case(&mut head[cursor..name_end]);
        let name_range = cursor..name_end;
        let value_range = value_start..value_end;

        if head[name_range.clone()] == *b"host" {
            if host_seen {
                return Err(ErrorKind::DuplicateHost);
            }
            host_seen = true;
        } else if head[name_range.clone()] == *b"content-length" {
            let len = types::slice_to_usize(&head[value_range.clone()])
                .ok_or(ErrorKind::InvalidContentLength)?;
            if content_length.is_some() {
                return Err(ErrorKind::InvalidContentLength);
            }
            content_length = Some(len);
        } else if head[name_range.clone()] == *b"transfer-encoding" {
            if head[value_range.clone()].eq_ignore_ascii_case(b"chunked") {
                chunked = true;
            }
        }

        headers.push((name_range, value_range));
        if headers.len() > limits.header_count {
            return Err(ErrorKind::TooManyHeaders);
        }

        cursor = nl + 1;
    }

    if version == Version::Http11 && !host_seen {
        return Err(ErrorKind::MissingHost);
    }
    if content_length.is_some() && chunked {
        return Err(ErrorKind::ConflictingBodyFraming);
    }

    let _ = query_range.clone();
    head.truncate(cursor.max(head.len().min(cursor)));

    Ok(Request {
        head,
        method,
        method_range,
        target,
        path,
        query: query_range,
        version,
        headers,
        content_length,
        chunked,
        body: Vec::new(),
        client_addr: UNSPECIFIED,
        server_addr: UNSPECIFIED,
    })
}

/// Finds the end of the header block (`\r\n\r\n` or bare `\n\n`) within `buf`,
/// returning the offset one past the terminator, i.e. the start of the body.
pub(crate) fn find_head_end(buf: &[u8]) -> Option<usize> {
    for pos in memchr_iter(b'\n', buf) {
        if pos >= 1 && buf[pos - 1] == b'\r' {
            if pos >= 3 && buf[pos - 3] == b'\r' && buf[pos - 2] == b'\n' {
                return Some(pos + 1);
            }
        } else if pos >= 1 && buf[pos - 1] == b'\n' {
            return Some(pos + 1);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(bytes: &[u8]) -> Result<Request, ErrorKind> {
        let end = find_head_end(bytes).expect("head end");
        parse_head(bytes[..end].to_vec(), &ReqLimits::default())
    }

    #[test]
    fn simple_get() {
        let req = parse(b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();
        assert_eq!(req.method(), Method::Get);
        assert_eq!(req.path(), b"/index.html");
        assert_eq!(req.version(), Version::Http11);
        assert_eq!(req.header(b"host"), Some(&b"example.com"[..]));
    }

    #[test]
    fn query_string_split() {
        let req = parse(b"GET /a/b?x=1&y=2 HTTP/1.1\r\nHost: h\r\n\r\n").unwrap();
        assert_eq!(req.path(), b"/a/b");
        assert_eq!(req.query(), Some(&b"x=1&y=2"[..]));
        assert_eq!(req.target(), b"/a/b?x=1&y=2");
    }

    #[test]
    fn missing_host_on_http11_is_error() {
        let err = parse(b"GET / HTTP/1.1\r\n\r\n").unwrap_err();
        assert_eq!(err, ErrorKind::MissingHost);
    }

    #[test]
    fn http10_without_host_is_allowed() {
        let req = parse(b"GET / HTTP/1.0\r\n\r\n").unwrap();
        assert_eq!(req.version(), Version::Http10);
    }

    #[test]
    fn duplicate_host_is_error() {
        let err = parse(b"GET / HTTP/1.1\r\nHost: a\r\nHost: b\r\n\r\n").unwrap_err();
        assert_eq!(err, ErrorKind::DuplicateHost);
    }

    #[test]
    fn content_length_and_chunked_conflict() {
        let err = parse(
            b"POST / HTTP/1.1\r\nHost: h\r\nContent-Length: 3\r\nTransfer-Encoding: chunked\r\n\r\n",
        )
        .unwrap_err();
        assert_eq!(err, ErrorKind::ConflictingBodyFraming);
    }

    #[test]
    fn folded_header_rejected() {
        let err = parse(b"GET / HTTP/1.1\r\nHost: h\r\nX-Foo: a\r\n b\r\n\r\n").unwrap_err();
        assert_eq!(err, ErrorKind::InvalidHeader);
    }

    #[test]
    fn whitespace_inside_header_name_rejected() {
        let err = parse(b"GET / HTTP/1.1\r\nHost: h\r\nX Foo: a\r\n\r\n").unwrap_err();
        assert_eq!(err, ErrorKind::InvalidHeader);
    }

    #[test]
    fn target_without_leading_slash_rejected() {
        let err = parse(b"GET foo HTTP/1.1\r\nHost: h\r\n\r\n").unwrap_err();
        assert_eq!(err, ErrorKind::BadTarget);
    }

    #[test]
    fn header_names_lowercased() {
        let req = parse(b"GET / HTTP/1.1\r\nHOST: h\r\nX-Custom: v\r\n\r\n").unwrap();
        assert_eq!(req.header(b"host"), Some(&b"h"[..]));
        assert_eq!(req.header(b"x-custom"), Some(&b"v"[..]));
    }

    #[test]
    fn head_end_detection() {
        assert_eq!(find_head_end(b"GET / HTTP/1.1\r\n\r\n"), Some(19));
        assert_eq!(find_head_end(b"GET / HTTP/1.1\r\n"), None);
    }
}
