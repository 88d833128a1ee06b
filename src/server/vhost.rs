//! Virtual-host selection, mirroring `WebServer::selectServerForRequest`.
//!
//! Pure and idempotent: given the same server set and `Host:` value it
//! always returns the same server.

use crate::config::ServerConfig;

/// Picks the `ServerConfig` to handle a request, given the port the
/// connection was accepted on, the request's `Host:` header (already
/// lowercased is not required — this does it), and the default server for
/// that port (the first one defined).
pub(crate) fn select<'a>(
    servers: &'a [ServerConfig],
    port: u16,
    host_header: Option<&[u8]>,
    default: &'a ServerConfig,
) -> &'a ServerConfig {
    let Some(raw) = host_header else {
        return default;
    };
    let Ok(text) = std::str::from_utf8(raw) else {
        return default;
    };
    let host = strip_port(text.trim()).to_ascii_lowercase();

    servers
        .iter()
        .find(|s| s.listen_addr.port() == port && s.host == host)
        .unwrap_or(default)
}

/// Strips a trailing `:port` from a `Host:` header value, e.g.
/// `example.com:8080` -> `example.com`. Leaves bare hostnames untouched.
fn strip_port(value: &str) -> &str {
    match value.rfind(':') {
        Some(pos) if pos + 1 < value.len() && value[pos + 1..].bytes().all(|b| b.is_ascii_digit()) => {
            &value[..pos]
        }
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    fn server(port: u16, host: &str) -> ServerConfig {
        let mut s = ServerConfig::new(SocketAddr::from(([0, 0, 0, 0], port)));
        s.host = host.to_string();
        s
    }

    #[test]
    fn matches_by_host_and_port() {
        let servers = vec![server(8080, "a"), server(8080, "b")];
        let picked = select(&servers, 8080, Some(b"b:8080"), &servers[0]);
        assert_eq!(picked.host, "b");
    }

    #[test]
    fn falls_back_to_default_on_no_match() {
        let servers = vec![server(8080, "a"), server(8080, "b")];
        let picked = select(&servers, 8080, Some(b"c"), &servers[0]);
        assert_eq!(picked.host, "a");
    }

    #[test]
    fn falls_back_to_default_on_missing_host() {
        let servers = vec![server(8080, "a")];
        let picked = select(&servers, 8080, None, &servers[0]);
        assert_eq!(picked.host, "a");
    }

    #[test]
    fn is_case_insensitive() {
        let servers = vec![server(8080, "example.com")];
        let picked = select(&servers, 8080, Some(b"EXAMPLE.COM"), &servers[0]);
        assert_eq!(picked.host, "example.com");
    }

    #[test]
    fn ignores_servers_on_a_different_port() {
        let servers = vec![server(8080, "a"), server(9090, "a")];
        let picked = select(&servers, 8080, Some(b"a"), &servers[0]);
        assert_eq!(picked.listen_addr.port(), 8080);
    }
}
