//! Request router, mirroring `WebServer::buildHttpResponse`'s dispatch
//! shape: method gate, location match, redirect, then per-method handling.

use crate::config::{LocationConfig, ServerConfig};
use crate::errors::ErrorKind;
use crate::http::request::Request;
use crate::http::response::{self, Response};
use crate::http::types::{Method, StatusCode, Version};
use crate::limits::RespLimits;
use crate::server::{cgi, resolve};
use std::time::Duration;

const ALLOW_ALL: &str = "GET, POST, DELETE";

/// Dispatches a fully parsed request to a response, never failing: every
/// branch that can go wrong produces an error response instead.
pub(crate) async fn route(
    request: &Request,
    server: &ServerConfig,
    resp_limits: &RespLimits,
    cgi_timeout: Duration,
) -> Vec<u8> {
    let version = request.version();
    let method = request.method();

    if !matches!(method, Method::Get | Method::Post | Method::Delete) {
        return error_response(server, resp_limits, version, ErrorKind::MethodNotAllowed(&[ALLOW_ALL]));
    }

    let target = std::str::from_utf8(request.target()).unwrap_or("/");
    let path = std::str::from_utf8(request.path()).unwrap_or("/");
    let location = resolve::find_location(server, path);

    if let Some(loc) = location {
        if !loc.method_allowed(method) {
            let allow = allow_header(loc);
            return error_status_response(server, resp_limits, version, StatusCode::MethodNotAllowed, Some(allow));
        }
        if let Some(redirect) = &loc.redirect {
            return redirect_response(resp_limits, version, redirect.code, &redirect.url);
        }
    }

    let outcome = match method {
        Method::Get => handle_get(request, server, location, target, cgi_timeout).await,
        Method::Post => handle_post(request, server, location, target, cgi_timeout).await,
        Method::Delete => handle_delete(server, location, target),
        _ => unreachable!("method gate already filtered this"),
    };

    match outcome {
        Ok(resp) => resp,
        Err(kind) => error_response(server, resp_limits, version, kind),
    }
    .finish(resp_limits, version)
}

/// Intermediate result so every handler can share one finishing path
/// (`Server:` header, `Content-Length`, `Connection: close`).
enum Outcome {
    Raw { status: StatusCode, content_type: String, extra: Vec<(String, String)>, body: Vec<u8> },
}

impl Outcome {
    fn finish(self, resp_limits: &RespLimits, version: Version) -> Vec<u8> {
        let Outcome::Raw { status, content_type, extra, body } = self;
        let mut resp = Response::new(version, resp_limits);
        resp.status(status);
        resp.header("server", "webserv/0.1");
        resp.header("content-type", content_type);
        for (name, value) in &extra {
            resp.header(name, value.as_bytes());
        }
        resp.body(body);
        resp.into_bytes()
    }
}

fn ok(content_type: &str, body: Vec<u8>) -> Outcome {
    Outcome::Raw {
        status: StatusCode::Ok,
        content_type: content_type.to_string(),
        extra: Vec::new(),
        body,
    }
}

fn allow_header(loc: &LocationConfig) -> String {
    if loc.allowed_methods.is_empty() {
        return ALLOW_ALL.to_string();
    }
    let mut names: Vec<&str> = loc
        .allowed_methods
        .iter()
        .map(|m| m.as_str())
        .collect();
    names.sort_unstable();
    names.join(", ")
}

fn redirect_response(resp_limits: &RespLimits, version: Version, code: u16, url: &str) -> Vec<u8> {
    let status = StatusCode::from_redirect_code(code);
    let status_code = status.code();
    let status_reason = status.reason().to_string();
    let mut resp = Response::new(version, resp_limits);
    resp.status(status);
    resp.header("server", "webserv/0.1");
    resp.header("location", url);
    resp.header("content-type", "text/html");
    let body = format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{status_code} {status_reason}</title></head>\n<body>\n<h1>{status_code} {status_reason}</h1>\n<p>Resource has moved to <a href=\"{url}\">{url}</a>.</p>\n</body>\n</html>\n"
    );
    resp.body(body);
    resp.into_bytes()
}

async fn handle_get(
    request: &Request,
    server: &ServerConfig,
    location: Option<&LocationConfig>,
    target: &str,
    cgi_timeout: Duration,
) -> Result<Outcome, ErrorKind> {
    let path = resolve::resolve_fs_path(server, location, target)?;

    let metadata = tokio::fs::metadata(&path).await;
    if let Ok(meta) = &metadata {
        if meta.is_dir() {
            let index_name = server.index_for(location);
            let index_path = path.join(index_name);
            if let Ok(body) = tokio::fs::read(&index_path).await {
                let mime = crate::mime::for_path(&index_path);
                return Ok(ok(mime, body));
            }

            if !server.autoindex_for(location) {
                return Err(ErrorKind::Forbidden);
            }

            let target_path = target.find('?').map_or(target, |pos| &target[..pos]);
            let url_path = if target_path.is_empty() { "/".to_string() } else { target_path.to_string() };
            let url_path = if url_path.ends_with('/') { url_path } else { format!("{url_path}/") };
            let body = autoindex_page(&path, &url_path).await;
            return Ok(ok("text/html", body.into_bytes()));
        }
    }

    if let Some(loc) = location {
        if let Some(cgi_binding) = &loc.cgi {
            if path.to_string_lossy().ends_with(cgi_binding.extension.as_str()) {
                if tokio::fs::metadata(&path).await.is_err() {
                    return Err(ErrorKind::NotFound);
                }
                return run_cgi(request, server, &path, &cgi_binding.interpreter, cgi_timeout).await;
            }
        }
    }

    let body = tokio::fs::read(&path).await.map_err(|_| ErrorKind::NotFound)?;
    let mime = crate::mime::for_path(&path);
    Ok(ok(mime, body))
}

async fn handle_post(
    request: &Request,
    server: &ServerConfig,
    location: Option<&LocationConfig>,
    target: &str,
    cgi_timeout: Duration,
) -> Result<Outcome, ErrorKind> {
    let path = resolve::resolve_fs_path(server, location, target)?;

    if let Some(loc) = location {
        if let Some(cgi_binding) = &loc.cgi {
            if path.to_string_lossy().ends_with(cgi_binding.extension.as_str()) {
                if tokio::fs::metadata(&path).await.is_err() {
                    return Err(ErrorKind::NotFound);
                }
                return run_cgi(request, server, &path, &cgi_binding.interpreter, cgi_timeout).await;
            }
        }

        if let Some(upload_store) = &loc.upload_store {
            let target_path = target.find('?').map_or(target, |pos| &target[..pos]);
            let loc_path = loc.path.trim_end_matches('/');
            let suffix = if target_path.len() >= loc_path.len() {
                &target_path[loc_path.len()..]
            } else {
                ""
            };
            if suffix.contains("..") {
                return Err(ErrorKind::Forbidden);
            }
            if suffix.is_empty() || suffix == "/" {
                return Err(ErrorKind::BadTarget);
            }
            let filename = suffix.trim_start_matches('/');
            if filename.is_empty() || filename.contains('/') {
                return Err(ErrorKind::BadTarget);
            }

            let mut file_path = upload_store.clone();
            file_path.push(filename);
            tokio::fs::write(&file_path, &request.body).await.map_err(|err| {
                log::error!("upload write failed for {}: {err}", file_path.display());
                ErrorKind::Internal
            })?;

            let body = format!("File uploaded as {filename}\r\n");
            return Ok(Outcome::Raw {
                status: StatusCode::Created,
                content_type: "text/plain".to_string(),
                extra: Vec::new(),
                body: body.into_bytes(),
            });
        }
    }

    let mut body = format!(
        "You sent a POST request to {target}\r\nBody length: {} bytes\r\n",
        request.body.len()
    );
    if !request.body.is_empty() {
        body.push_str("\r\n");
        body.push_str(&String::from_utf8_lossy(&request.body));
        body.push_str("\r\n");
    }
    Ok(ok("text/plain", body.into_bytes()))
}

fn handle_delete(
    server: &ServerConfig,
    location: Option<&LocationConfig>,
    target: &str,
) -> Result<Outcome, ErrorKind> {
    if target.is_empty() || !target.starts_with('/') {
        return Err(ErrorKind::BadTarget);
    }
    if target.contains("..") || target == "/" {
        return Err(ErrorKind::Forbidden);
    }

    let path = resolve::resolve_fs_path(server, location, target)?;

    if std::fs::metadata(&path).is_err() {
        return Err(ErrorKind::NotFound);
    }
    std::fs::remove_file(&path).map_err(|err| {
        log::error!("delete failed for {}: {err}", path.display());
        ErrorKind::Internal
    })?;

    Ok(ok("text/plain", b"File deleted.\r\n".to_vec()))
}

async fn run_cgi(
    request: &Request,
    server: &ServerConfig,
    script_path: &std::path::Path,
    interpreter: &std::path::Path,
    timeout: Duration,
) -> Result<Outcome, ErrorKind> {
    let output = cgi::execute(request, server, script_path, interpreter, timeout)
        .await
        .map_err(|_| ErrorKind::Internal)?;

    let mut has_content_type = false;
    let mut extra = Vec::new();
    for (name, value) in &output.headers {
        if name.eq_ignore_ascii_case("content-type") {
            has_content_type = true;
        }
        extra.push((name.clone(), value.clone()));
    }

    let content_type = if has_content_type {
        extra
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case("content-type"))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| "text/html".to_string())
    } else {
        "text/html".to_string()
    };
    extra.retain(|(n, _)| !n.eq_ignore_ascii_case("content-type"));

    Ok(Outcome::Raw {
        status: output.status,
        content_type,
        extra,
        body: output.body,
    })
}

async fn autoindex_page(dir_path: &std::path::Path, url_path: &str) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n  <meta charset=\"utf-8\">\n");
    out.push_str(&format!("  <title>Index of {url_path}</title>\n</head>\n<body>\n"));
    out.push_str(&format!("  <h1>Index of {url_path}</h1>\n  <ul>\n"));

    match tokio::fs::read_dir(dir_path).await {
        Ok(mut entries) => {
            while let Ok(Some(entry)) = entries.next_entry().await {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if name == "." || name == ".." {
                    continue;
                }
                let mut href = url_path.to_string();
                if !href.ends_with('/') {
                    href.push('/');
                }
                href.push_str(&name);
                out.push_str(&format!("    <li><a href=\"{href}\">{name}</a></li>\n"));
            }
        }
        Err(_) => out.push_str("    <li>Cannot open directory</li>\n"),
    }

    out.push_str("  </ul>\n</body>\n</html>\n");
    out
}

/// Builds an error response: `error_pages[code]` served from disk if
/// defined and traversal-safe, otherwise a plain-text `<code> <reason>` body.
pub(crate) fn error_response(
    server: &ServerConfig,
    resp_limits: &RespLimits,
    version: Version,
    kind: ErrorKind,
) -> Vec<u8> {
    let status = kind.status();
    if status.code() >= 500 {
        log::error!("{} {} for vhost {:?}", status.code(), status.reason(), server.host);
    } else {
        log::debug!("{} {} for vhost {:?}", status.code(), status.reason(), server.host);
    }
    let allow = kind.allow_header();
    error_status_response(server, resp_limits, version, status, allow)
}

fn error_status_response(
    server: &ServerConfig,
    resp_limits: &RespLimits,
    version: Version,
    status: StatusCode,
    allow: Option<String>,
) -> Vec<u8> {
    let extra: Vec<(&str, String)> = allow.map(|allow| vec![("allow", allow)]).unwrap_or_default();

    if let Some(rel) = server.error_pages.get(&status.code()) {
        let rel_str = rel.to_string_lossy();
        if !rel_str.contains("..") {
            let mut full = server.root.clone();
            full.push(rel_str.trim_start_matches('/'));
            if let Ok(body) = std::fs::read(&full) {
                let mut resp = Response::new(version, resp_limits);
                resp.status(status);
                resp.header("server", "webserv/0.1");
                for (name, value) in &extra {
                    resp.header(name, value.as_bytes());
                }
                resp.header("content-type", crate::mime::for_path(&full));
                resp.body(body);
                return resp.into_bytes();
            }
        }
    }

    let body = format!("{} {}", status.code(), status.reason());
    response::plain_text(version, resp_limits, status, &extra, &body)
}
