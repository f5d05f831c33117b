//! Core HTTP protocol types: methods, status codes and headers

use crate::errors::{ErrorKind, HttpError};
use std::fmt;

// METHOD

/// HTTP request methods accepted by the parser
///
/// Anything else on the request line is rejected with
/// [`ErrorKind::InvalidMethod`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET method - transfer a current representation of the target resource
    /// [[RFC1945, Section 8.1](https://datatracker.ietf.org/doc/html/rfc1945#section-8.1)]
    Get,
    /// HEAD method - same as GET but the response body is never sent
    /// [[RFC1945, Section 8.2](https://datatracker.ietf.org/doc/html/rfc1945#section-8.2)]
    Head,
    /// POST method - the request carries a `Content-Length` delimited body
    /// [[RFC1945, Section 8.3](https://datatracker.ietf.org/doc/html/rfc1945#section-8.3)]
    Post,
}

impl Method {
    #[inline]
    pub(crate) fn from_field(field: &str) -> Result<Self, HttpError> {
        match field.as_bytes() {
            [b'g' | b'G', b'e' | b'E', b't' | b'T'] => Ok(Method::Get),
            [b'h' | b'H', b'e' | b'E', b'a' | b'A', b'd' | b'D'] => Ok(Method::Head),
            [b'p' | b'P', b'o' | b'O', b's' | b'S', b't' | b'T'] => Ok(Method::Post),
            _ => Err(HttpError::new(ErrorKind::InvalidMethod, field)),
        }
    }

    /// Returns the canonical upper-case name of the method.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// VERSION

// `HTTP/[0-9.]+`, case-insensitive.
#[inline]
pub(crate) fn is_http_version(field: &str) -> bool {
    match field.as_bytes() {
        [b'h' | b'H', b't' | b'T', b't' | b'T', b'p' | b'P', b'/', rest @ ..] => {
            !rest.is_empty() && rest.iter().all(|b| b.is_ascii_digit() || *b == b'.')
        }
        _ => false,
    }
}

// STATUS_CODE

/// HTTP status code of a [`Response`](crate::Response).
///
/// Any `u16` can be used as a status code; the associated constants cover the
/// table the server knows reason phrases for. Codes outside of it are written
/// with an empty reason phrase.
///
/// # Examples
/// ```
/// use plain_http::StatusCode;
///
/// assert_eq!(StatusCode::NOT_FOUND.as_u16(), 404);
/// assert_eq!(StatusCode::NOT_FOUND.reason(), Some("Not Found"));
/// assert_eq!(StatusCode::from(299).reason(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatusCode(u16);

macro_rules! set_status_codes {
    ($(
        $(#[$docs:meta])*
        $name:ident = ($num:expr, $str:expr);
    )+) => {
        impl StatusCode { $(
            #[doc = concat!(stringify!($num), " ", $str)]
            $(#[$docs])*
            pub const $name: StatusCode = StatusCode($num);
        )+

            /// Returns the reason phrase for known codes.
            #[inline]
            pub const fn reason(&self) -> Option<&'static str> {
                match self.0 {
                    $($num => Some($str),)+
                    _ => None,
                }
            }
        }
    }
}

impl StatusCode {
    /// Returns the numeric value of the code.
    #[inline]
    pub const fn as_u16(&self) -> u16 {
        self.0
    }

    /// `true` for codes in `400..=599`.
    #[inline]
    pub const fn is_error(&self) -> bool {
        self.0 >= 400 && self.0 < 600
    }

    // `HTTP/1.0 404 Not Found`, without the line terminator
    #[inline]
    pub(crate) fn status_line(&self) -> String {
        format!("HTTP/1.0 {} {}", self.0, self.reason().unwrap_or(""))
    }

    // `404 Not Found` as used in plaintext bodies of canned responses
    #[inline]
    pub(crate) fn summary(&self) -> String {
        match self.reason() {
            Some(reason) => format!("{} {reason}", self.0),
            None => self.0.to_string(),
        }
    }
}

impl From<u16> for StatusCode {
    #[inline]
    fn from(code: u16) -> Self {
        StatusCode(code)
    }
}

impl From<StatusCode> for u16 {
    #[inline]
    fn from(code: StatusCode) -> Self {
        code.0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

set_status_codes! {
    CONTINUE = (100, "Continue");
    SWITCHING_PROTOCOLS = (101, "Switching Protocols");

    OK = (200, "OK");
    CREATED = (201, "Created");
    ACCEPTED = (202, "Accepted");
    NON_AUTHORITATIVE_INFORMATION = (203, "Non-Authoritative Information");
    NO_CONTENT = (204, "No Content");
    RESET_CONTENT = (205, "Reset Content");
    PARTIAL_CONTENT = (206, "Partial Content");

    MULTIPLE_CHOICES = (300, "Multiple Choices");
    MOVED_PERMANENTLY = (301, "Moved Permanently");
    /// Default code of [`Response::redirect`](crate::Response::redirect)
    FOUND = (302, "Found");
    SEE_OTHER = (303, "See Other");
    NOT_MODIFIED = (304, "Not Modified");
    USE_PROXY = (305, "Use Proxy");
    TEMPORARY_REDIRECT = (307, "Temporary Redirect");

    /// Sent by the server for requests it can't parse
    BAD_REQUEST = (400, "Bad Request");
    UNAUTHORIZED = (401, "Unauthorized");
    PAYMENT_REQUIRED = (402, "Payment Required");
    FORBIDDEN = (403, "Forbidden");
    NOT_FOUND = (404, "Not Found");
    METHOD_NOT_ALLOWED = (405, "Method Not Allowed");
    NOT_ACCEPTABLE = (406, "Not Acceptable");
    PROXY_AUTHENTICATION_REQUIRED = (407, "Proxy Authentication Required");
    /// Sent when [`socket_read_timeout`](crate::limits::ConnLimits::socket_read_timeout) expires
    REQUEST_TIMEOUT = (408, "Request Timeout");
    CONFLICT = (409, "Conflict");
    GONE = (410, "Gone");
    LENGTH_REQUIRED = (411, "Length Required");
    PRECONDITION_FAILED = (412, "Precondition Failed");
    REQUEST_ENTITY_TOO_LARGE = (413, "Request Entity Too Large");
    REQUEST_URI_TOO_LONG = (414, "Request URI Too Long");
    UNSUPPORTED_MEDIA_TYPE = (415, "Unsupported Media Type");
    REQUESTED_RANGE_NOT_SATISFIABLE = (416, "Requested Range Not Satisfiable");
    EXPECTATION_FAILED = (417, "Expectation Failed");
    /// [RFC 2324](https://datatracker.ietf.org/doc/html/rfc2324#section-2.3.2)
    IM_A_TEAPOT = (418, "I'm a teapot");

    /// Sent by the server when a handler panics or I/O fails mid-exchange
    INTERNAL_SERVER_ERROR = (500, "Internal Server Error");
    NOT_IMPLEMENTED = (501, "Not Implemented");
    BAD_GATEWAY = (502, "Bad Gateway");
    SERVICE_UNAVAILABLE = (503, "Service Unavailable");
    GATEWAY_TIMEOUT = (504, "Gateway Timeout");
    HTTP_VERSION_NOT_SUPPORTED = (505, "HTTP Version Not Supported");
}

// HEADER

const OVERRIDE_KEYS: [&str; 6] = [
    "Content-MD5",
    "DNT",
    "ETag",
    "TE",
    "WWW-Authenticate",
    "X-XSS-Protection",
];

/// Returns the canonical spelling of a header name.
///
/// Every `-`-separated word gets an upper-case first letter and a lower-case
/// rest, so the result doesn't depend on the input's casing. A handful of names with irregular casing (`ETag`,
/// `DNT`, `TE`, `WWW-Authenticate`, `Content-MD5`, `X-XSS-Protection`) are
/// always mapped to their fixed spelling.
///
/// # Examples
/// ```
/// use plain_http::normalize_key;
///
/// assert_eq!(normalize_key("content-type"), "Content-Type");
/// assert_eq!(normalize_key("etag"), "ETag");
/// assert_eq!(normalize_key("x-request-id"), "X-Request-Id");
/// ```
pub fn normalize_key(key: &str) -> String {
    let key = key.trim();

    if let Some(fixed) = OVERRIDE_KEYS.iter().find(|k| k.eq_ignore_ascii_case(key)) {
        return (*fixed).to_owned();
    }

    let mut result = String::with_capacity(key.len());
    for (i, word) in key.split('-').enumerate() {
        if i != 0 {
            result.push('-');
        }

        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            result.push_str(&chars.as_str().to_lowercase());
        }
    }

    result
}

/// A single `Key: value` header entry.
///
/// Key and value are trimmed on construction. Comparisons by key go through
/// [`normalize_key`], so `content-length` and `CONTENT-LENGTH` name the same
/// header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Header {
    key: String,
    value: String,
    normalized: String,
}

impl Header {
    /// Creates a header from a key and a value.
    pub fn new<K: AsRef<str>, V: AsRef<str>>(key: K, value: V) -> Self {
        let key = key.as_ref().trim();

        Header {
            normalized: normalize_key(key),
            key: key.to_owned(),
            value: value.as_ref().trim().to_owned(),
        }
    }

    /// The key as it was given (trimmed).
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The canonical form of the key, used on the wire.
    #[inline]
    pub fn normalized_key(&self) -> &str {
        &self.normalized
    }

    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Checks whether the header is named `key`, ignoring case.
    #[inline]
    pub fn is(&self, key: &str) -> bool {
        self.normalized.eq_ignore_ascii_case(&normalize_key(key))
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.normalized, self.value)
    }
}
