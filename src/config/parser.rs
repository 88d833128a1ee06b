//! Configuration file loader, following `Config::load`/`parseServerBlock`/
//! `parseLocationBlock` token-by-token.
//!
//! The directive grammar is a simple line-oriented `keyword value...;`
//! format with `{ }` blocks, so this is a hand-rolled recursive-descent
//! line parser rather than a general parser-combinator or serde format —
//! matching the original's `get_line` → `trim` → dispatch-on-keyword
//! structure one directive at a time.

use crate::config::{CgiBinding, LocationConfig, Redirect, ServerConfig};
use crate::http::types::Method;
use std::fmt;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub(crate) enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(String),
    Empty,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "could not open config file {}: {e}", path.display()),
            ConfigError::Parse(msg) => write!(f, "{msg}"),
            ConfigError::Empty => write!(f, "no 'server {{ ... }}' block found in config"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Loads and parses a configuration file into its `server { }` blocks.
pub(crate) fn load(path: &Path) -> Result<Vec<ServerConfig>, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
    let lines: Vec<&str> = text.lines().collect();
    let mut cursor = Cursor { lines: &lines, pos: 0 };

    let mut servers = Vec::new();
    while let Some(line) = cursor.next_significant() {
        if is_server_header(line) {
            servers.push(parse_server_block(&mut cursor)?);
        } else {
            return Err(ConfigError::Parse(format!(
                "unexpected top-level directive: {line}"
            )));
        }
    }

    if servers.is_empty() {
        return Err(ConfigError::Empty);
    }
    Ok(servers)
}

fn is_server_header(line: &str) -> bool {
    let trimmed = line.trim_end();
    trimmed == "server{" || trimmed == "server {" || {
        let mut parts = trimmed.split_whitespace();
        parts.next() == Some("server") && trimmed.ends_with('{')
    }
}

struct Cursor<'a> {
    lines: &'a [&'a str],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Next non-blank, non-comment line, trimmed. `None` at end of input.
    fn next_significant(&mut self) -> Option<&'a str> {
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos].trim();
            self.pos += 1;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            return Some(line);
        }
        None
    }
}

/// Splits a `keyword value... ;` directive into tokens (keyword first),
/// requiring the line to end with a semicolon (attached to the last token
/// or standalone).
fn directive_tokens(line: &str) -> Result<Vec<&str>, ConfigError> {
    let mut toks: Vec<&str> = line.split_whitespace().collect();
    let Some(last) = toks.pop() else {
        return Err(ConfigError::Parse("empty directive".to_string()));
    };

    if last == ";" {
        Ok(toks)
    } else if let Some(stripped) = last.strip_suffix(';') {
        if !stripped.is_empty() {
            toks.push(stripped);
        }
        Ok(toks)
    } else {
        Err(ConfigError::Parse(format!("directive missing ';': {line}")))
    }
}

fn parse_server_block(cursor: &mut Cursor) -> Result<ServerConfig, ConfigError> {
    let mut server = ServerConfig::new(SocketAddr::from(([0, 0, 0, 0], 80)));
    let mut host_explicit = false;
    let mut listen_set = false;

    loop {
        let line = cursor
            .next_significant()
            .ok_or_else(|| ConfigError::Parse("unterminated server block".to_string()))?;

        if line == "}" {
            break;
        }

        if is_location_header(line) {
            server.locations.push(parse_location_block(cursor, line)?);
            continue;
        }

        let tokens = directive_tokens(line)?;
        let (keyword, values) = split_keyword(&tokens, line)?;

        match keyword {
            "listen" => {
                server.listen_addr = parse_listen(values, line)?;
                if !host_explicit {
                    server.host = server.listen_addr.ip().to_string();
                }
                listen_set = true;
            }
            "host" => {
                let value = single_value(values, "host", line)?;
                server.host = value.to_ascii_lowercase();
                host_explicit = true;
            }
            "root" => server.root = PathBuf::from(single_value(values, "root", line)?),
            "index" => server.index = single_value(values, "index", line)?.to_string(),
            "error_page" => {
                let (code, rel) = error_page_args(values, line)?;
                server.error_pages.insert(code, rel);
            }
            "client_max_body_size" => {
                server.client_max_body_size = parse_body_size(values, line)?;
            }
            "autoindex" => server.autoindex = parse_on_off(values, line)?,
            other => return Err(ConfigError::Parse(format!("unknown directive inside server block: {other}"))),
        }
    }

    if !listen_set {
        return Err(ConfigError::Parse("server block has no 'listen' directive".to_string()));
    }
    Ok(server)
}

fn is_location_header(line: &str) -> bool {
    line.starts_with("location") && line.trim_end().ends_with('{')
}

fn parse_location_block(cursor: &mut Cursor, header: &str) -> Result<LocationConfig, ConfigError> {
    let mut header_tokens: Vec<&str> = header.trim_end().trim_end_matches('{').split_whitespace().collect();
    if header_tokens.first() != Some(&"location") {
        return Err(ConfigError::Parse(format!("invalid location header: {header}")));
    }
    header_tokens.remove(0);
    let raw_path = header_tokens
        .into_iter()
        .next()
        .ok_or_else(|| ConfigError::Parse(format!("location directive missing path: {header}")))?;

    let mut path = raw_path.to_string();
    if !path.starts_with('/') {
        path = format!("/{path}");
    }
    if path.len() > 1 && path.ends_with('/') {
        path.pop();
    }

    let mut loc = LocationConfig::new(path);

    loop {
        let line = cursor
            .next_significant()
            .ok_or_else(|| ConfigError::Parse("unterminated location block".to_string()))?;

        if line == "}" {
            break;
        }

        let tokens = directive_tokens(line)?;
        let (keyword, values) = split_keyword(&tokens, line)?;

        match keyword {
            "root" => loc.root = Some(PathBuf::from(single_value(values, "root", line)?)),
            "index" => loc.index = Some(single_value(values, "index", line)?.to_string()),
            "methods" => loc.allowed_methods = parse_methods(values, line)?,
            "autoindex" => loc.autoindex = Some(parse_on_off(values, line)?),
            "redirect" => loc.redirect = Some(parse_redirect(values, line)?),
            "upload_store" => loc.upload_store = Some(PathBuf::from(single_value(values, "upload_store", line)?)),
            "cgi" => loc.cgi = Some(parse_cgi(values, line)?),
            other => {
                return Err(ConfigError::Parse(format!(
                    "unknown directive inside location block: {other}"
                )))
            }
        }
    }

    Ok(loc)
}

fn split_keyword<'a>(tokens: &'a [&'a str], line: &str) -> Result<(&'a str, &'a [&'a str]), ConfigError> {
    if tokens.is_empty() {
        return Err(ConfigError::Parse(format!("empty directive: {line}")));
    }
    Ok((tokens[0], &tokens[1..]))
}

fn single_value<'a>(values: &'a [&'a str], name: &str, line: &str) -> Result<&'a str, ConfigError> {
    if values.len() == 1 {
        Ok(values[0])
    } else {
        Err(ConfigError::Parse(format!("invalid '{name}' directive: {line}")))
    }
}

fn parse_listen(values: &[&str], line: &str) -> Result<SocketAddr, ConfigError> {
    let value = single_value(values, "listen", line)?;
    let (host, port_str) = match value.find(':') {
        Some(pos) => (&value[..pos], &value[pos + 1..]),
        None => ("0.0.0.0", value),
    };
    let port: u16 = port_str
        .parse()
        .ok()
        .filter(|p| *p > 0)
        .ok_or_else(|| ConfigError::Parse(format!("invalid port in listen directive: {line}")))?;
    let ip: IpAddr = host
        .parse()
        .map_err(|_| ConfigError::Parse(format!("invalid bind address in listen directive: {line}")))?;
    Ok(SocketAddr::new(ip, port))
}

fn error_page_args(values: &[&str], line: &str) -> Result<(u16, PathBuf), ConfigError> {
    if values.len() != 2 {
        return Err(ConfigError::Parse(format!("invalid error_page directive: {line}")));
    }
    let code: u16 = values[0]
        .parse()
        .ok()
        .filter(|c| (100..=599).contains(c))
        .ok_or_else(|| ConfigError::Parse(format!("invalid status code in error_page: {line}")))?;
    Ok((code, PathBuf::from(values[1])))
}

fn parse_body_size(values: &[&str], line: &str) -> Result<usize, ConfigError> {
    let value = single_value(values, "client_max_body_size", line)?;
    value
        .parse()
        .map_err(|_| ConfigError::Parse(format!("invalid client_max_body_size value: {line}")))
}

fn parse_on_off(values: &[&str], line: &str) -> Result<bool, ConfigError> {
    match single_value(values, "autoindex", line)? {
        "on" => Ok(true),
        "off" => Ok(false),
        _ => Err(ConfigError::Parse(format!("invalid autoindex value (expected on/off): {line}"))),
    }
}

fn parse_methods(values: &[&str], line: &str) -> Result<std::collections::HashSet<Method>, ConfigError> {
    if values.is_empty() {
        return Err(ConfigError::Parse(format!("methods directive has no methods: {line}")));
    }
    let mut set = std::collections::HashSet::new();
    for token in values {
        let upper = token.to_ascii_uppercase();
        let method = match upper.as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "DELETE" => Method::Delete,
            _ => return Err(ConfigError::Parse(format!("invalid HTTP method in methods directive: {token}"))),
        };
        set.insert(method);
    }
    Ok(set)
}

fn parse_redirect(values: &[&str], line: &str) -> Result<Redirect, ConfigError> {
    match values.len() {
        1 => Ok(Redirect { code: 302, url: values[0].to_string() }),
        2 => {
            let code: u16 = values[0]
                .parse()
                .ok()
                .filter(|c| (300..=399).contains(c))
                .ok_or_else(|| ConfigError::Parse(format!("invalid redirect code (must be 3xx): {line}")))?;
            Ok(Redirect { code, url: values[1].to_string() })
        }
        _ => Err(ConfigError::Parse(format!("invalid redirect directive: {line}"))),
    }
}

fn parse_cgi(values: &[&str], line: &str) -> Result<CgiBinding, ConfigError> {
    if values.len() != 2 {
        return Err(ConfigError::Parse(format!("invalid cgi directive: {line}")));
    }
    let (ext, interpreter) = (values[0], values[1]);
    if ext.is_empty() || interpreter.is_empty() {
        return Err(ConfigError::Parse(format!("cgi directive has empty extension or path: {line}")));
    }
    Ok(CgiBinding {
        extension: ext.to_string(),
        interpreter: PathBuf::from(interpreter),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("webserv_test_{name}_{}.conf", std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn minimal_server_block() {
        let path = write_temp(
            "minimal",
            r#"
            server {
                listen 8080;
                root ./www;
                index index.html;
            }
            "#,
        );
        let servers = load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].listen_addr.port(), 8080);
        assert_eq!(servers[0].root, PathBuf::from("./www"));
        assert_eq!(servers[0].index, "index.html");
    }

    #[test]
    fn host_directive_overrides_vhost_name_independently_of_listen() {
        let path = write_temp(
            "vhost",
            r#"
            server {
                listen 0.0.0.0:8080;
                host example.com;
                root ./www;
            }
            "#,
        );
        let servers = load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(servers[0].listen_addr.ip().to_string(), "0.0.0.0");
        assert_eq!(servers[0].host, "example.com");
    }

    #[test]
    fn location_block_with_cgi_and_methods() {
        let path = write_temp(
            "location",
            r#"
            server {
                listen 8080;
                root ./www;
                location /cgi {
                    methods GET POST;
                    cgi .py /usr/bin/python3;
                }
            }
            "#,
        );
        let servers = load(&path).unwrap();
        fs::remove_file(&path).ok();

        let loc = &servers[0].locations[0];
        assert_eq!(loc.path, "/cgi");
        assert!(loc.method_allowed(Method::Get));
        assert!(loc.method_allowed(Method::Post));
        assert!(!loc.method_allowed(Method::Delete));
        let cgi = loc.cgi.as_ref().unwrap();
        assert_eq!(cgi.extension, ".py");
        assert_eq!(cgi.interpreter, PathBuf::from("/usr/bin/python3"));
    }

    #[test]
    fn redirect_with_explicit_code() {
        let path = write_temp(
            "redirect",
            r#"
            server {
                listen 8080;
                root ./www;
                location /old {
                    redirect 301 /new;
                }
            }
            "#,
        );
        let servers = load(&path).unwrap();
        fs::remove_file(&path).ok();

        let redirect = servers[0].locations[0].redirect.as_ref().unwrap();
        assert_eq!(redirect.code, 301);
        assert_eq!(redirect.url, "/new");
    }

    #[test]
    fn client_max_body_size_zero_is_accepted_as_no_limit() {
        let path = write_temp(
            "zero_body",
            r#"
            server {
                listen 8080;
                root ./www;
                client_max_body_size 0;
            }
            "#,
        );
        let servers = load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(servers[0].client_max_body_size, 0);
    }

    #[test]
    fn missing_semicolon_is_rejected() {
        let path = write_temp(
            "missing_semi",
            r#"
            server {
                listen 8080
                root ./www;
            }
            "#,
        );
        let err = load(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn empty_file_has_no_servers() {
        let path = write_temp("empty", "# just a comment\n");
        let err = load(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(err, ConfigError::Empty));
    }
}
