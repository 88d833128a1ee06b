//! Configuration tree, mirroring the `Config.hpp`/`Config.cpp`
//! `ServerConfig`/`LocationConfig` layout.
//!
//! Loaded once at startup into an immutable `Arc<[ServerConfig]>`; nothing
//! here is mutated after [`parser::load`] returns.

pub(crate) mod parser;

use crate::http::types::Method;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub(crate) struct ServerConfig {
    pub(crate) listen_addr: SocketAddr,
    /// Virtual-host match name (the `host` directive), or the listen IP
    /// string if no `host` directive was given — kept distinct from
    /// `listen_addr` since a port can be shared by several vhosts.
    pub(crate) host: String,
    pub(crate) root: PathBuf,
    pub(crate) index: String,
    pub(crate) error_pages: HashMap<u16, PathBuf>,
    /// 0 means unlimited.
    pub(crate) client_max_body_size: usize,
    pub(crate) autoindex: bool,
    pub(crate) locations: Vec<LocationConfig>,
}

impl ServerConfig {
    pub(crate) fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            host: listen_addr.ip().to_string(),
            root: PathBuf::from("./www"),
            index: "index.html".to_string(),
            error_pages: HashMap::new(),
            client_max_body_size: 1024 * 1024,
            autoindex: false,
            locations: Vec::new(),
        }
    }

    pub(crate) fn root_for<'a>(&'a self, location: Option<&'a LocationConfig>) -> &'a PathBuf {
        location
            .and_then(|loc| loc.root.as_ref())
            .unwrap_or(&self.root)
    }

    pub(crate) fn index_for<'a>(&'a self, location: Option<&'a LocationConfig>) -> &'a str {
        location
            .and_then(|loc| loc.index.as_deref())
            .unwrap_or(self.index.as_str())
    }

    pub(crate) fn autoindex_for(&self, location: Option<&LocationConfig>) -> bool {
        location
            .and_then(|loc| loc.autoindex)
            .unwrap_or(self.autoindex)
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct LocationConfig {
    pub(crate) path: String,
    pub(crate) root: Option<PathBuf>,
    pub(crate) index: Option<String>,
    /// Empty means all of GET/POST/DELETE are allowed.
    pub(crate) allowed_methods: HashSet<Method>,
    pub(crate) autoindex: Option<bool>,
    pub(crate) redirect: Option<Redirect>,
    pub(crate) upload_store: Option<PathBuf>,
    pub(crate) cgi: Option<CgiBinding>,
}

impl LocationConfig {
    pub(crate) fn new(path: String) -> Self {
        Self {
            path,
            ..Default::default()
        }
    }

    pub(crate) fn method_allowed(&self, method: Method) -> bool {
        self.allowed_methods.is_empty() || self.allowed_methods.contains(&method)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Redirect {
    pub(crate) code: u16,
    pub(crate) url: String,
}

#[derive(Debug, Clone)]
pub(crate) struct CgiBinding {
    pub(crate) extension: String,
    pub(crate) interpreter: PathBuf,
}
