//! Listener setup and accept loop, using the socket2 + `TcpListener::from_std`
//! pattern (e.g. `chopin-core`'s `fast_http.rs`) to get `SO_REUSEADDR` and an
//! explicit backlog before handing the socket to tokio, and spawning one
//! tokio task per accepted connection.
//!
//! The single-threaded readiness-polling event loop of the original server
//! is reinterpreted as one tokio task per accepted connection; each task's
//! idle timeout ([`crate::limits::ConnLimits::idle_timeout`]) plays the role
//! of the sweep that evicts stale descriptors every second. One socket is
//! still bound per unique port: servers sharing a port are distinguished
//! purely by the `Host:` selector, never by a separate listening descriptor.

use crate::config::ServerConfig;
use crate::limits::{ConnLimits, ReqLimits, RespLimits, ServerLimits};
use crate::server::connection::{self, ConnContext};
use socket2::{Domain, Protocol, Socket, Type};
use std::collections::BTreeMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Groups servers by listening port (first-defined-per-port stays index 0,
/// the default server per 4.E), binds one socket per group, and spawns an
/// accept loop per socket. Returns once every listener is bound; the accept
/// loops themselves run until the process exits.
pub(crate) async fn bind_and_serve(
    servers: Vec<ServerConfig>,
    server_limits: ServerLimits,
    req_limits: ReqLimits,
    conn_limits: ConnLimits,
    resp_limits: RespLimits,
) -> io::Result<()> {
    let mut by_port: BTreeMap<u16, Vec<ServerConfig>> = BTreeMap::new();
    for server in servers {
        by_port.entry(server.listen_addr.port()).or_default().push(server);
    }

    let mut listeners = Vec::with_capacity(by_port.len());
    for (port, group) in by_port {
        let listener = bind_listener(port, server_limits.backlog)?;
        log::info!("listening on 0.0.0.0:{port} ({} vhost(s))", group.len());
        listeners.push((listener, group));
    }

    let req_limits = Arc::new(req_limits);
    let conn_limits = Arc::new(conn_limits);
    let resp_limits = Arc::new(resp_limits);

    let mut tasks = Vec::with_capacity(listeners.len());
    for (listener, servers) in listeners {
        let ctx = Arc::new(ConnContext {
            servers,
            req_limits: (*req_limits).clone(),
            conn_limits: (*conn_limits).clone(),
            resp_limits: (*resp_limits).clone(),
        });
        tasks.push(tokio::spawn(accept_loop(listener, ctx)));
    }

    for task in tasks {
        let _ = task.await;
    }

    Ok(())
}

/// Binds `0.0.0.0:port` with `SO_REUSEADDR`, the configured backlog, and
/// non-blocking mode, then hands the descriptor to tokio.
fn bind_listener(port: u16, backlog: i32) -> io::Result<TcpListener> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}

async fn accept_loop(listener: TcpListener, ctx: Arc<ConnContext>) {
    loop {
        let (stream, client_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                log::warn!("accept failed: {err}");
                continue;
            }
        };
        let Ok(server_addr) = stream.local_addr() else {
            continue;
        };

        let ctx = ctx.clone();
        tokio::spawn(async move {
            connection::handle(stream, client_addr, server_addr, ctx).await;
        });
    }
}
