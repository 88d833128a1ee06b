//! Error taxonomy for request parsing, routing and CGI, each mapped to the
//! HTTP status it produces. Unlike a transport-level failure (which just
//! drops the connection), every variant here is recovered into a normal
//! response by the caller — see [`ErrorKind::status`].

use crate::http::types::StatusCode;
use std::{error, fmt, io};

#[derive(Debug, PartialEq)]
pub(crate) enum ErrorKind {
    // 4.A request line / header parsing
    InvalidMethod,
    InvalidUrl,
    InvalidVersion,
    InvalidHeader,
    TooManyHeaders,
    MissingHost,
    DuplicateHost,
    InvalidContentLength,
    ConflictingBodyFraming,

    // 4.B chunked body
    InvalidChunk,

    // body limits
    BodyTooLarge,

    // 4.D path resolution
    BadTarget,
    Forbidden,

    // 4.F routing
    MethodNotAllowed(&'static [&'static str]),
    NotFound,

    // 4.G CGI and upload/delete failures
    Internal,

    Io(IoError),
}

impl ErrorKind {
    /// Maps a parse/route failure onto its HTTP status code.
    pub(crate) fn status(&self) -> StatusCode {
        match self {
            ErrorKind::InvalidMethod
            | ErrorKind::InvalidUrl
            | ErrorKind::InvalidVersion
            | ErrorKind::InvalidHeader
            | ErrorKind::TooManyHeaders
            | ErrorKind::MissingHost
            | ErrorKind::DuplicateHost
            | ErrorKind::InvalidContentLength
            | ErrorKind::ConflictingBodyFraming
            | ErrorKind::InvalidChunk
            | ErrorKind::BadTarget => StatusCode::BadRequest,

            ErrorKind::BodyTooLarge => StatusCode::PayloadTooLarge,
            ErrorKind::Forbidden => StatusCode::Forbidden,
            ErrorKind::MethodNotAllowed(_) => StatusCode::MethodNotAllowed,
            ErrorKind::NotFound => StatusCode::NotFound,
            ErrorKind::Internal | ErrorKind::Io(_) => StatusCode::InternalServerError,
        }
    }

    /// Extra response headers a given error always carries (currently only `Allow:`).
    pub(crate) fn allow_header(&self) -> Option<String> {
        match self {
            ErrorKind::MethodNotAllowed(methods) => Some(methods.join(", ")),
            _ => None,
        }
    }
}

impl error::Error for ErrorKind {}
impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl From<io::Error> for ErrorKind {
    fn from(err: io::Error) -> Self {
        ErrorKind::Io(IoError(err))
    }
}

#[derive(Debug)]
pub(crate) struct IoError(pub(crate) io::Error);

impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}
