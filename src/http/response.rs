//! HTTP/1.x response builder (spec 4.C).
//!
//! Every response this server sends closes the connection afterward — there
//! is no keep-alive (§9) — so, unlike the builder this module is descended
//! from, there is no `close()`/`keep_alive` toggle: `Connection: close` is
//! always written. `HTTP/0.9` support is dropped outright; this server never
//! negotiates down below `HTTP/1.0`.

use crate::http::types::{StatusCode, Version};
use crate::limits::RespLimits;
use std::borrow::Cow;

pub struct Response {
    buffer: Vec<u8>,
    version: Version,
    posit_length: usize,
    start_body: usize,
    state: ResponseState,
}

#[doc(hidden)]
pub struct Handled(());

#[derive(Debug, Clone, Copy, PartialEq)]
enum ResponseState {
    Clean,
    Headers,
    Complete,
}

impl Response {
    pub(crate) fn new(version: Version, limits: &RespLimits) -> Self {
        Self {
            buffer: Vec::with_capacity(limits.default_capacity),
            version,
            posit_length: 0,
            start_body: 0,
            state: ResponseState::Clean,
        }
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        debug_assert_eq!(self.state, ResponseState::Complete);
        self.buffer
    }
}

impl Response {
    /// Sets the status line. Must be the first method called.
    #[track_caller]
    pub(crate) fn status(&mut self, status: StatusCode) -> &mut Self {
        debug_assert!(
            self.state == ResponseState::Clean,
            "status() must be called first and only once"
        );

        self.buffer.extend_from_slice(self.version.as_bytes());
        self.buffer.push(b' ');

        let mut itoa_buf = itoa::Buffer::new();
        self.buffer
            .extend_from_slice(itoa_buf.format(status.code()).as_bytes());
        self.buffer.push(b' ');
        self.buffer.extend_from_slice(status.reason().as_bytes());
        self.buffer.extend_from_slice(b"\r\n");

        self.state = ResponseState::Headers;
        self
    }

    /// Appends a header. Do not add `content-length` or `connection` —
    /// those are written automatically by [`body`](Self::body)/[`body_with`](Self::body_with).
    #[track_caller]
    pub(crate) fn header(&mut self, name: &str, value: impl AsRef<[u8]>) -> &mut Self {
        debug_assert!(
            self.state == ResponseState::Headers,
            "header() must be called after status() and before any body method"
        );

        self.buffer.extend_from_slice(name.as_bytes());
        self.buffer.extend_from_slice(b": ");
        self.buffer.extend_from_slice(value.as_ref());
        self.buffer.extend_from_slice(b"\r\n");
        self
    }

    /// Writes the body and finalizes the response, filling in `Content-Length`
    /// and `Connection: close`.
    #[track_caller]
    pub(crate) fn body(&mut self, data: impl AsRef<[u8]>) -> Handled {
        debug_assert!(
            self.state == ResponseState::Headers,
            "body() must be called after status() and any headers"
        );

        self.start_body();
        self.buffer.extend_from_slice(data.as_ref());
        self.end_body()
    }

    /// Writes the body via a closure appending straight into the output buffer.
    #[track_caller]
    pub(crate) fn body_with<F: FnOnce(&mut Vec<u8>)>(&mut self, f: F) -> Handled {
        debug_assert!(
            self.state == ResponseState::Headers,
            "body_with() must be called after status() and any headers"
        );

        self.start_body();
        f(&mut self.buffer);
        self.end_body()
    }

    fn start_body(&mut self) {
        self.header("connection", "close");
        self.buffer.extend_from_slice(b"content-length: ");
        self.posit_length = self.buffer.len();
        self.buffer.extend_from_slice(b"0000000000\r\n\r\n");
        self.start_body = self.buffer.len();
    }

    fn end_body(&mut self) -> Handled {
        let body_len = self.buffer.len() - self.start_body;
        let mut itoa_buf = itoa::Buffer::new();
        let formatted = itoa_buf.format(body_len);
        let padded: Cow<str> = if formatted.len() < 10 {
            Cow::Owned(format!("{formatted:0>10}"))
        } else {
            Cow::Borrowed(formatted)
        };

        let target_range = self.posit_length..self.posit_length + padded.len();
        self.buffer[target_range].copy_from_slice(padded.as_bytes());
        self.state = ResponseState::Complete;

        Handled(())
    }
}

/// Shared helpers for building error/status responses from an [`ErrorKind`](crate::errors::ErrorKind),
/// used by the router (4.F) and connection task (4.H) alike.
pub(crate) fn plain_text(
    version: Version,
    limits: &RespLimits,
    status: StatusCode,
    extra_headers: &[(&str, String)],
    body: &str,
) -> Vec<u8> {
    let mut resp = Response::new(version, limits);
    resp.status(status);
    resp.header("server", "webserv/0.1");
    resp.header("content-type", "text/plain; charset=utf-8");
    for (name, value) in extra_headers {
        resp.header(name, value.as_bytes());
    }
    resp.body(body);
    resp.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_str(buf: &[u8]) -> &str {
        std::str::from_utf8(buf).unwrap()
    }

    #[test]
    fn status_line() {
        let mut resp = Response::new(Version::Http11, &RespLimits::default());
        resp.status(StatusCode::Ok);
        assert_eq!(as_str(&resp.buffer), "HTTP/1.1 200 OK\r\n");
    }

    #[test]
    fn full_response_has_close_and_length() {
        let mut resp = Response::new(Version::Http11, &RespLimits::default());
        resp.status(StatusCode::NotFound);
        resp.header("content-type", "text/plain");
        resp.body("missing");

        let out = resp.into_bytes();
        let text = as_str(&out);
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains("connection: close\r\n"));
        assert!(text.contains("content-length: 0000000007\r\n"));
        assert!(text.ends_with("missing"));
    }

    #[test]
    fn body_with_writes_directly() {
        let mut resp = Response::new(Version::Http11, &RespLimits::default());
        resp.status(StatusCode::Ok);
        resp.body_with(|buf| buf.extend_from_slice(b"abc"));

        let out = resp.into_bytes();
        assert!(as_str(&out).ends_with("abc"));
    }

    #[test]
    fn plain_text_helper_sets_content_type() {
        let out = plain_text(
            Version::Http11,
            &RespLimits::default(),
            StatusCode::Forbidden,
            &[],
            "nope",
        );
        let text = as_str(&out);
        assert!(text.contains("content-type: text/plain; charset=utf-8\r\n"));
        assert!(text.ends_with("nope"));
    }

    #[test]
    #[should_panic(expected = "must be called first and only once")]
    fn status_twice_panics() {
        let mut resp = Response::new(Version::Http11, &RespLimits::default());
        resp.status(StatusCode::Ok);
        resp.status(StatusCode::Ok);
    }
}
