//! Server-wide limits and timeouts.
//!
//! Buffers are not pooled across requests — each connection handles exactly
//! one request and its buffers are dropped with it (no keep-alive) — so
//! `ReqLimits`/`RespLimits` describe per-request allocation hints rather
//! than a shared-pool precalculation.

use std::time::Duration;

/// Server-level accept-loop behavior.
#[derive(Debug, Clone)]
pub struct ServerLimits {
    /// Backlog passed to `listen(2)` for each bound socket (default: `128`).
    pub backlog: i32,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            backlog: 128,
            _priv: (),
        }
    }
}

/// Connection-level timeouts.
#[derive(Debug, Clone)]
pub struct ConnLimits {
    /// How long a connection may sit with no bytes read before it is closed
    /// (default: `30 seconds`). Resets on every successful read.
    pub idle_timeout: Duration,

    /// Maximum duration to wait for a response write to complete (default: `30 seconds`).
    pub write_timeout: Duration,

    /// Maximum duration a CGI script may run before it is killed (default: `30 seconds`).
    pub cgi_timeout: Duration,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ConnLimits {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            cgi_timeout: Duration::from_secs(30),
            _priv: (),
        }
    }
}

/// Limits applied while parsing a request's start-line and headers.
///
/// Body size is governed separately, by each location's `client_max_body_size`,
/// since it is a per-vhost/per-location config value rather than a fixed
/// server-wide constant.
#[derive(Debug, Clone)]
pub struct ReqLimits {
    /// Maximum length of the request target, in bytes (default: `8192`).
    pub url_size: usize,
    /// Maximum number of headers per request (default: `100`).
    pub header_count: usize,
    /// Maximum header name length in bytes (default: `256`).
    pub header_name_size: usize,
    /// Maximum header value length in bytes (default: `8192`).
    pub header_value_size: usize,
    /// Maximum size of the request line + header block combined (default: `64 KiB`).
    pub max_head_size: usize,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ReqLimits {
    fn default() -> Self {
        Self {
            url_size: 8 * 1024,
            header_count: 100,
            header_name_size: 256,
            header_value_size: 8 * 1024,
            max_head_size: 64 * 1024,
            _priv: (),
        }
    }
}

/// Response buffer pre-allocation.
#[derive(Debug, Clone)]
pub struct RespLimits {
    /// Initial buffer capacity allocated per response (default: `1024 B`).
    pub default_capacity: usize,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for RespLimits {
    fn default() -> Self {
        Self {
            default_capacity: 1024,
            _priv: (),
        }
    }
}
