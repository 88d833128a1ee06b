//! Path & location resolution, generalizing `WebServer::resolvePathForCgi`'s
//! target-to-filesystem-path logic to every request, not just CGI ones.

use crate::config::{LocationConfig, ServerConfig};
use crate::errors::ErrorKind;
use std::path::PathBuf;

/// Longest string-prefix match of `target` against the server's locations.
/// No wildcards, no regex, no path-component awareness — pure byte prefix.
pub(crate) fn find_location<'a>(server: &'a ServerConfig, target: &str) -> Option<&'a LocationConfig> {
    server
        .locations
        .iter()
        .filter(|loc| target.starts_with(loc.path.as_str()))
        .max_by_key(|loc| loc.path.len())
}

/// Resolves `target` (the request path, with or without a trailing query
/// string) to a filesystem path under the server's or location's root.
///
/// A target not starting with `/` is malformed (400); a target containing
/// `..` anywhere is a blocked traversal attempt into a context that reads
/// from disk (403) — per spec §7's split between `BadTarget`'s two status
/// codes, these are distinct [`ErrorKind`] variants rather than one shared
/// error the caller disambiguates.
pub(crate) fn resolve_fs_path(
    server: &ServerConfig,
    location: Option<&LocationConfig>,
    target: &str,
) -> Result<PathBuf, ErrorKind> {
    let path_target = match target.find('?') {
        Some(pos) => &target[..pos],
        None => target,
    };

    if path_target.is_empty() || !path_target.starts_with('/') {
        return Err(ErrorKind::BadTarget);
    }
    if path_target.contains("..") {
        return Err(ErrorKind::Forbidden);
    }

    let root = server.root_for(location);

    let suffix = match location {
        Some(loc) => {
            let loc_path = loc.path.trim_end_matches('/');
            if path_target.len() >= loc_path.len() {
                &path_target[loc_path.len()..]
            } else {
                ""
            }
        }
        None => path_target,
    };
    let suffix = suffix.trim_start_matches('/');

    let mut full = root.clone();
    full.push(suffix);
    Ok(full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    fn server() -> ServerConfig {
        let mut s = ServerConfig::new(SocketAddr::from(([127, 0, 0, 1], 8080)));
        s.root = PathBuf::from("/srv/www");
        s
    }

    #[test]
    fn no_location_joins_root_and_target() {
        let s = server();
        let p = resolve_fs_path(&s, None, "/a/b.html").unwrap();
        assert_eq!(p, PathBuf::from("/srv/www/a/b.html"));
    }

    #[test]
    fn strips_location_prefix() {
        let s = server();
        let loc = LocationConfig::new("/api".to_string());
        let p = resolve_fs_path(&s, Some(&loc), "/api/users").unwrap();
        assert_eq!(p, PathBuf::from("/srv/www/users"));
    }

    #[test]
    fn location_root_override_wins() {
        let s = server();
        let mut loc = LocationConfig::new("/up".to_string());
        loc.root = Some(PathBuf::from("/srv/uploads"));
        let p = resolve_fs_path(&s, Some(&loc), "/up/file.txt").unwrap();
        assert_eq!(p, PathBuf::from("/srv/uploads/file.txt"));
    }

    #[test]
    fn query_string_is_stripped() {
        let s = server();
        let p = resolve_fs_path(&s, None, "/a.html?x=1").unwrap();
        assert_eq!(p, PathBuf::from("/srv/www/a.html"));
    }

    #[test]
    fn dot_dot_rejected() {
        let s = server();
        let err = resolve_fs_path(&s, None, "/../etc/passwd").unwrap_err();
        assert_eq!(err, ErrorKind::Forbidden);
    }

    #[test]
    fn missing_leading_slash_rejected() {
        let s = server();
        let err = resolve_fs_path(&s, None, "relative").unwrap_err();
        assert_eq!(err, ErrorKind::BadTarget);
    }

    #[test]
    fn longest_prefix_location_wins() {
        let mut s = server();
        s.locations.push(LocationConfig::new("/a".to_string()));
        s.locations.push(LocationConfig::new("/a/b".to_string()));
        let found = find_location(&s, "/a/b/c").unwrap();
        assert_eq!(found.path, "/a/b");
    }
}
