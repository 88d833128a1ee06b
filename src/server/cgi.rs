//! CGI/1.1 executor, mirroring `WebServer::executeCgi`'s process lifecycle.
//!
//! `WebServer::executeCgi` forks, redirects stdin/stdout through pipes,
//! execs the interpreter and polls the output descriptor with a 30s
//! deadline. Under tokio, `Command::spawn` plus piped stdio is the direct
//! equivalent of the fork/pipe/exec dance, and `kill_on_drop` plays the role
//! of "kill with an unblockable signal and reap" when the
//! [`tokio::time::timeout`] future is dropped: the child is killed and
//! awaited by tokio's runtime, never left a zombie.
//!
//! The router always hands this executor an already-decoded body, so the
//! "maybe still chunked" fallback kept for defensive reasons elsewhere has
//! no counterpart here.

use crate::config::ServerConfig;
use crate::http::request::Request;
use crate::http::types::StatusCode;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub(crate) struct CgiOutput {
    pub(crate) status: StatusCode,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Vec<u8>,
}

/// Runs `interpreter script_path` with the CGI/1.1 environment derived from
/// `request` and `server`, feeding `request`'s body on stdin, and parses the
/// captured stdout into a status/headers/body triple.
pub(crate) async fn execute(
    request: &Request,
    server: &ServerConfig,
    script_path: &Path,
    interpreter: &Path,
    timeout: Duration,
) -> Result<CgiOutput, ()> {
    let script_dir = script_path.parent().unwrap_or_else(|| Path::new("."));
    let script_name = script_path.file_name().ok_or(())?;

    let query = request.query().unwrap_or(b"");
    let body = request.body.clone();

    let mut command = Command::new(interpreter);
    command
        .arg(script_name)
        .current_dir(script_dir)
        .env_clear()
        .env("GATEWAY_INTERFACE", "CGI/1.1")
        .env("SERVER_PROTOCOL", "HTTP/1.1")
        .env("SERVER_SOFTWARE", "webserv/0.1")
        .env("REQUEST_METHOD", request.method_str())
        .env("QUERY_STRING", String::from_utf8_lossy(query).into_owned())
        .env("SCRIPT_FILENAME", script_path.as_os_str())
        .env("SCRIPT_NAME", String::from_utf8_lossy(request.path()).into_owned())
        .env("SERVER_NAME", &server.host)
        .env("SERVER_PORT", server.listen_addr.port().to_string())
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::null())
        .kill_on_drop(true);

    if matches!(request.method(), crate::http::types::Method::Post) {
        command.env("CONTENT_LENGTH", body.len().to_string());
    }

    if let Some(content_type) = request.header(b"content-type") {
        command.env("CONTENT_TYPE", String::from_utf8_lossy(content_type).into_owned());
    }
    if let Some(host) = request.header(b"host") {
        command.env("HTTP_HOST", String::from_utf8_lossy(host).into_owned());
    }

    let mut child = command.spawn().map_err(|err| {
        log::error!("CGI spawn failed for {}: {err}", script_path.display());
    })?;

    let mut stdin = child.stdin.take();
    let write_task = tokio::spawn(async move {
        if let Some(stdin) = stdin.as_mut() {
            let _ = stdin.write_all(&body).await;
        }
        // stdin drops here, closing the write end and signaling EOF to the child.
    });

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(err)) => {
            log::error!("CGI I/O error for {}: {err}", script_path.display());
            return Err(());
        }
        Err(_elapsed) => {
            log::warn!("CGI script {} exceeded its {:?} deadline, killed", script_path.display(), timeout);
            return Err(()); // child already killed by kill_on_drop
        }
    };
    let _ = write_task.await;

    if !output.status.success() {
        log::warn!("CGI script {} exited with {}", script_path.display(), output.status);
        return Err(());
    }

    Ok(parse_output(&output.stdout))
}

fn parse_output(raw: &[u8]) -> CgiOutput {
    let (header_block, body) = match split_headers(raw) {
        Some((h, b)) => (h, b),
        None => {
            return CgiOutput {
                status: StatusCode::Ok,
                headers: Vec::new(),
                body: raw.to_vec(),
            };
        }
    };

    let mut status = StatusCode::Ok;
    let mut headers = Vec::new();

    for line in header_block.split(|&b| b == b'\n') {
        let line = trim_cr(line);
        if line.is_empty() {
            continue;
        }
        let Some(colon) = line.iter().position(|&b| b == b':') else {
            continue;
        };
        let name = String::from_utf8_lossy(&line[..colon]).trim().to_string();
        let mut value_start = colon + 1;
        while value_start < line.len() && (line[value_start] == b' ' || line[value_start] == b'\t') {
            value_start += 1;
        }
        let value = String::from_utf8_lossy(&line[value_start..]).trim().to_string();

        if name.eq_ignore_ascii_case("status") {
            if let Some(parsed) = parse_status_value(&value) {
                status = parsed;
            }
        } else {
            headers.push((name, value));
        }
    }

    CgiOutput {
        status,
        headers,
        body: body.to_vec(),
    }
}

/// Splits `raw` on the first `\r\n\r\n`, falling back to `\n\n`. Returns
/// `None` if neither separator is present.
fn split_headers(raw: &[u8]) -> Option<(&[u8], &[u8])> {
    if let Some(pos) = memchr::memmem::find(raw, b"\r\n\r\n") {
        return Some((&raw[..pos], &raw[pos + 4..]));
    }
    if let Some(pos) = memchr::memmem::find(raw, b"\n\n") {
        return Some((&raw[..pos], &raw[pos + 2..]));
    }
    None
}

fn trim_cr(line: &[u8]) -> &[u8] {
    if line.last() == Some(&b'\r') {
        &line[..line.len() - 1]
    } else {
        line
    }
}

/// Parses a `Status:` value of the form `NNN reason` or just `NNN`.
fn parse_status_value(value: &str) -> Option<StatusCode> {
    let value = value.trim();
    let (code_str, rest) = match value.find(|c: char| c.is_ascii_whitespace()) {
        Some(pos) => (&value[..pos], value[pos..].trim_start()),
        None => (value, ""),
    };
    let code: u16 = code_str.parse().ok()?;
    if !(100..=599).contains(&code) {
        return None;
    }
    let reason = if rest.is_empty() { None } else { Some(rest) };
    Some(StatusCode::from_code(code, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_crlf_crlf() {
        let raw = b"Content-Type: text/plain\r\n\r\nbody";
        let (h, b) = split_headers(raw).unwrap();
        assert_eq!(h, b"Content-Type: text/plain");
        assert_eq!(b, b"body");
    }

    #[test]
    fn splits_on_lf_lf() {
        let raw = b"Content-Type: text/plain\n\nbody";
        let (h, b) = split_headers(raw).unwrap();
        assert_eq!(h, b"Content-Type: text/plain");
        assert_eq!(b, b"body");
    }

    #[test]
    fn no_separator_means_whole_output_is_body() {
        let out = parse_output(b"just some bytes");
        assert_eq!(out.body, b"just some bytes");
        assert_eq!(out.status, StatusCode::Ok);
        assert!(out.headers.is_empty());
    }

    #[test]
    fn status_header_overrides_default() {
        let out = parse_output(b"Status: 404 Not Found\r\nContent-Type: text/html\r\n\r\n<p>no</p>");
        assert_eq!(out.status, StatusCode::NotFound);
        assert_eq!(out.headers, vec![("Content-Type".to_string(), "text/html".to_string())]);
        assert_eq!(out.body, b"<p>no</p>");
    }

    #[test]
    fn status_without_reason_parses() {
        let out = parse_output(b"Status: 201\r\n\r\n");
        assert_eq!(out.status, StatusCode::Created);
    }

    #[test]
    fn unknown_code_with_reason_is_preserved() {
        let out = parse_output(b"Status: 422 Unprocessable Entity\r\nContent-Type: text/plain\r\n\r\nbad\n");
        assert_eq!(out.status.code(), 422);
        assert_eq!(out.status.reason(), "Unprocessable Entity");
    }

    #[test]
    fn unknown_code_without_reason_gets_standard_text() {
        let out = parse_output(b"Status: 409\r\n\r\n");
        assert_eq!(out.status.code(), 409);
        assert_eq!(out.status.reason(), "Conflict");
    }
}
