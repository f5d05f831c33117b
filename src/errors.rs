//! Error types of the request pipeline
//!
//! Parse failures are [`HttpError`]s tagged with an [`ErrorKind`] and end up as
//! `400 Bad Request`. Everything that goes wrong after parsing (I/O, handler
//! panics) is an [`Error`] that maps to `500 Internal Server Error`, except a
//! read timeout, which is answered with `408 Request Timeout`.

use crate::{Response, StatusCode};
use std::{fmt, io, time::Duration};

macro_rules! error_kinds {
    ($(
        $(#[$docs:meta])*
        $name:ident => $reason:literal;
    )+) => {
        /// Category of a request failure.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ErrorKind { $(
            $(#[$docs])*
            $name,
        )+ }

        impl ErrorKind {
            /// Upper snake case name used in error messages, e.g. `INVALID_HEADER`.
            pub const fn as_str(&self) -> &'static str {
                match self { $(
                    Self::$name => $reason,
                )+ }
            }
        }
    };
}

error_kinds! {
    Unknown => "UNKNOWN";
    /// Request is structurally broken: missing or non-numeric `Content-Length`
    /// on `POST`, or a line longer than [`ReqLimits::line_size`](crate::limits::ReqLimits::line_size)
    InvalidRequest => "INVALID_REQUEST";
    /// Request line isn't `METHOD SP PATH SP HTTP/VERSION`
    InvalidMethod => "INVALID_METHOD";
    /// Header line without a `: ` separator, or with an empty key or value
    InvalidHeader => "INVALID_HEADER";
    /// Cookie that is not `key=value`. Never aborts a request
    InvalidCookie => "INVALID_COOKIE";
    /// Stream ended before the request line or the blank line after headers
    UnexpectedEnd => "UNEXPECTED_END";
    MissingBody => "MISSING_BODY";
    /// `Content-Length` above [`ReqLimits::body_size`](crate::limits::ReqLimits::body_size)
    BodyTooLong => "BODY_TOO_LONG";
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parse-level failure with the offending detail.
///
/// Displays as `KIND: detail`:
/// ```
/// use plain_http::{ErrorKind, HttpError};
///
/// let err = HttpError::new(ErrorKind::InvalidHeader, "X-Broken");
/// assert_eq!(err.to_string(), "INVALID_HEADER: X-Broken");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {detail}")]
pub struct HttpError {
    kind: ErrorKind,
    detail: String,
}

impl HttpError {
    pub fn new<D: Into<String>>(kind: ErrorKind, detail: D) -> Self {
        HttpError {
            kind,
            detail: detail.into(),
        }
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[inline]
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

/// Anything that can abort a single exchange.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// The handler panicked or its task was cancelled.
    #[error("handler failed: {0}")]
    Handler(String),
}

impl Error {
    /// Status code the client receives for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Http(_) => StatusCode::BAD_REQUEST,
            Error::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            Error::Io(_) | Error::Handler(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Builds the plaintext error response, `<code> <reason>: <message>`.
    pub fn into_response(self) -> Response {
        Response::error_with(self.status(), self)
    }
}

impl From<ErrorKind> for HttpError {
    fn from(kind: ErrorKind) -> Self {
        HttpError::new(kind, "")
    }
}
