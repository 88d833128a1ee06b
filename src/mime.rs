//! MIME-type lookup by file extension, matching `WebServer::getMimeType`'s
//! table, extended with the handful of extra extensions that any real
//! static-file server ends up wanting (images, json, pdf). Kept as a flat
//! match rather than a `mime_guess`-sized crate dependency.

/// Returns the `Content-Type` value for a file path based on its extension,
/// falling back to `application/octet-stream` for anything unrecognized.
pub(crate) fn for_path(path: &std::path::Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "html" | "htm" => "text/html",
        "txt" => "text/plain",
        "css" => "text/css",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "csv" => "text/csv",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn known_extensions() {
        assert_eq!(for_path(Path::new("index.html")), "text/html");
        assert_eq!(for_path(Path::new("style.CSS")), "text/css");
        assert_eq!(for_path(Path::new("script.js")), "application/javascript");
        assert_eq!(for_path(Path::new("photo.JPG")), "image/jpeg");
    }

    #[test]
    fn unknown_extension_is_octet_stream() {
        assert_eq!(for_path(Path::new("data.bin")), "application/octet-stream");
        assert_eq!(for_path(Path::new("noext")), "application/octet-stream");
    }
}
