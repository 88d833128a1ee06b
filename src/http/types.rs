//! Core HTTP protocol types: methods, versions and status codes.

use crate::errors::ErrorKind;

#[rustfmt::skip]
const ASCII_LOWER: [u8; 256] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F,
    0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x1B, 0x1C, 0x1D, 0x1E, 0x1F,
    0x20, 0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27, 0x28, 0x29, 0x2A, 0x2B, 0x2C, 0x2D, 0x2E, 0x2F,
    0x30, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x3B, 0x3C, 0x3D, 0x3E, 0x3F,
    0x40, b'a', b'b', b'c', b'd', b'e', b'f', b'g', b'h', b'i', b'j', b'k', b'l', b'm', b'n', b'o',
    b'p', b'q', b'r', b's', b't', b'u', b'v', b'w', b'x', b'y', b'z', 0x5B, 0x5C, 0x5D, 0x5E, 0x5F,
    0x60, b'a', b'b', b'c', b'd', b'e', b'f', b'g', b'h', b'i', b'j', b'k', b'l', b'm', b'n', b'o',
    b'p', b'q', b'r', b's', b't', b'u', b'v', b'w', b'x', b'y', b'z', 0x7B, 0x7C, 0x7D, 0x7E, 0x7F,
    0x80, 0x81, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89, 0x8A, 0x8B, 0x8C, 0x8D, 0x8E, 0x8F,
    0x90, 0x91, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9A, 0x9B, 0x9C, 0x9D, 0x9E, 0x9F,
    0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8, 0xA9, 0xAA, 0xAB, 0xAC, 0xAD, 0xAE, 0xAF,
    0xB0, 0xB1, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xBB, 0xBC, 0xBD, 0xBE, 0xBF,
    0xC0, 0xC1, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xCB, 0xCC, 0xCD, 0xCE, 0xCF,
    0xD0, 0xD1, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xDB, 0xDC, 0xDD, 0xDE, 0xDF,
    0xE0, 0xE1, 0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9, 0xEA, 0xEB, 0xEC, 0xED, 0xEE, 0xEF,
    0xF0, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8, 0xF9, 0xFA, 0xFB, 0xFC, 0xFD, 0xFE, 0xFF,
];

#[inline(always)]
pub(crate) fn to_lower_case(src: &mut [u8]) {
    for byte in src.iter_mut() {
        *byte = ASCII_LOWER[*byte as usize];
    }
}

#[inline(always)]
pub(crate) fn slice_to_usize(bytes: &[u8]) -> Option<usize> {
    if bytes.is_empty() {
        return None;
    }
    let mut result: usize = 0;
    for &byte in bytes {
        if !byte.is_ascii_digit() {
            return None;
        }
        result = result.checked_mul(10)?.checked_add((byte - b'0') as usize)?;
    }
    Some(result)
}

/// HTTP request method. `Other` covers any token the parser doesn't special-case;
/// the router (4.F) rejects it with 405 regardless of what it was.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
    Head,
    Patch,
    Delete,
    Options,
    Other,
}

impl Method {
    #[inline]
    pub(crate) fn from_bytes(token: &[u8]) -> Self {
        match token {
            b"GET" => Method::Get,
            b"PUT" => Method::Put,
            b"POST" => Method::Post,
            b"HEAD" => Method::Head,
            b"PATCH" => Method::Patch,
            b"DELETE" => Method::Delete,
            b"OPTIONS" => Method::Options,
            _ => Method::Other,
        }
    }

    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Head => "HEAD",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Other => "OTHER",
        }
    }
}

/// HTTP protocol version. HTTP/0.9 is not supported by this server.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Version {
    Http10,
    Http11,
}

impl Version {
    #[inline]
    pub(crate) fn from_bytes(src: &[u8]) -> Result<Self, ErrorKind> {
        match src {
            b"HTTP/1.1" => Ok(Self::Http11),
            b"HTTP/1.0" => Ok(Self::Http10),
            _ => Err(ErrorKind::InvalidVersion),
        }
    }

    pub(crate) fn as_bytes(&self) -> &'static [u8] {
        match self {
            Version::Http11 => b"HTTP/1.1",
            Version::Http10 => b"HTTP/1.0",
        }
    }
}

macro_rules! set_status_codes {
    ($(
        $(#[$docs:meta])+
        $name:ident = ($num:expr, $str:expr);
    )+) => {
        /// HTTP status codes used by this server's responses.
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum StatusCode { $(
            #[doc = concat!(stringify!($num), " ", $str)]
            $(#[$docs])+
            $name,
        )+
            /// Any status outside the fixed set above, carrying the code and
            /// reason phrase verbatim — e.g. from a CGI `Status:` header this
            /// server doesn't otherwise name.
            Other(u16, String),
        }

        impl StatusCode {
            pub(crate) const fn code(&self) -> u16 {
                match self { $( StatusCode::$name => $num, )+ StatusCode::Other(code, _) => *code, }
            }

            pub(crate) fn reason(&self) -> &str {
                match self { $( StatusCode::$name => $str, )+ StatusCode::Other(_, reason) => reason.as_str(), }
            }
        }
    }
}

set_status_codes! {
    /// 200 OK
    Ok = (200, "OK");
    /// 201 Created
    Created = (201, "Created");

    /// 301 Moved Permanently
    MovedPermanently = (301, "Moved Permanently");
    /// 302 Found
    Found = (302, "Found");
    /// 303 See Other
    SeeOther = (303, "See Other");
    /// 307 Temporary Redirect
    TemporaryRedirect = (307, "Temporary Redirect");
    /// 308 Permanent Redirect
    PermanentRedirect = (308, "Permanent Redirect");

    /// 400 Bad Request
    BadRequest = (400, "Bad Request");
    /// 403 Forbidden
    Forbidden = (403, "Forbidden");
    /// 404 Not Found
    NotFound = (404, "Not Found");
    /// 405 Method Not Allowed
    MethodNotAllowed = (405, "Method Not Allowed");
    /// 413 Payload Too Large
    PayloadTooLarge = (413, "Payload Too Large");
    /// 505 HTTP Version Not Supported
    HttpVersionNotSupported = (505, "HTTP Version Not Supported");

    /// 500 Internal Server Error
    InternalServerError = (500, "Internal Server Error");
    /// 503 Service Unavailable
    ServiceUnavailable = (503, "Service Unavailable");
    /// 507 Insufficient Storage
    InsufficientStorage = (507, "Insufficient Storage");
}

impl StatusCode {
    /// Resolves a redirect's configured status code (300-399) back to a [`StatusCode`],
    /// falling back to 302 for anything not in the small set this server emits.
    pub(crate) fn from_redirect_code(code: u16) -> Self {
        match code {
            301 => StatusCode::MovedPermanently,
            303 => StatusCode::SeeOther,
            307 => StatusCode::TemporaryRedirect,
            308 => StatusCode::PermanentRedirect,
            _ => StatusCode::Found,
        }
    }

    /// Maps a numeric code to one of the fixed variants above, if it's one
    /// this server knows how to name.
    fn from_known_code(code: u16) -> Option<Self> {
        Some(match code {
            200 => StatusCode::Ok,
            201 => StatusCode::Created,
            301 => StatusCode::MovedPermanently,
            302 => StatusCode::Found,
            303 => StatusCode::SeeOther,
            307 => StatusCode::TemporaryRedirect,
            308 => StatusCode::PermanentRedirect,
            400 => StatusCode::BadRequest,
            403 => StatusCode::Forbidden,
            404 => StatusCode::NotFound,
            405 => StatusCode::MethodNotAllowed,
            413 => StatusCode::PayloadTooLarge,
            500 => StatusCode::InternalServerError,
            503 => StatusCode::ServiceUnavailable,
            505 => StatusCode::HttpVersionNotSupported,
            507 => StatusCode::InsufficientStorage,
            _ => return None,
        })
    }

    /// Maps a numeric code (e.g. from a CGI `Status:` header) to a
    /// [`StatusCode`], always succeeding: codes outside the fixed set above
    /// become [`StatusCode::Other`], carrying `reason` verbatim when given
    /// (falling back to [`standard_reason`] for a bare numeric status).
    pub(crate) fn from_code(code: u16, reason: Option<&str>) -> Self {
        if let Some(known) = Self::from_known_code(code) {
            return known;
        }
        let reason = match reason {
            Some(r) if !r.is_empty() => r.to_string(),
            _ => standard_reason(code).to_string(),
        };
        StatusCode::Other(code, reason)
    }
}

/// Reason phrase for a code outside this server's fixed set, used when a
/// CGI script sends a bare numeric `Status:` with no text of its own.
fn standard_reason(code: u16) -> &'static str {
    match code {
        100 => "Continue",
        204 => "No Content",
        304 => "Not Modified",
        401 => "Unauthorized",
        406 => "Not Acceptable",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        415 => "Unsupported Media Type",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        504 => "Gateway Timeout",
        _ => "Unknown Status",
    }
}
