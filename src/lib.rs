//! webserv - a configurable HTTP/1.1 origin server
//!
//! Serves static files, handles uploads and deletes, generates directory
//! listings, issues redirects, runs CGI/1.1 scripts, and multiplexes
//! multiple virtual hosts per listening port — all driven by an nginx-style
//! configuration file. Built for educational/small-deployment use where a
//! single process serves every configured vhost.
//!
//! # Quick start
//!
//! ```no_run
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! runtime.block_on(webserv::run("config/default.conf")).unwrap();
//! ```
//!
//! See `main.rs` for the actual CLI entry point (argument parsing, logging
//! init, exit codes).

mod config;
mod errors;
mod http;
mod limits;
mod mime;
mod server;

use limits::{ConnLimits, ReqLimits, RespLimits, ServerLimits};

/// Loads the config file at `config_path` and serves every configured
/// virtual host until the process is killed. Returns `Err` on any fatal
/// startup failure (bad config, bind failure) — those are the only
/// failures that don't get recovered into an HTTP response.
pub async fn run(config_path: &str) -> Result<(), String> {
    let path = std::path::Path::new(config_path);
    let servers = config::parser::load(path).map_err(|err| err.to_string())?;

    server::listener::bind_and_serve(
        servers,
        ServerLimits::default(),
        ReqLimits::default(),
        ConnLimits::default(),
        RespLimits::default(),
    )
    .await
    .map_err(|err| format!("listener setup failed: {err}"))
}
