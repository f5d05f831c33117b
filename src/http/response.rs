//! HTTP/1.0 response builder and serializer.

use crate::http::{
    cookie::Cookie,
    types::{Header, StatusCode},
};
use std::{
    fmt,
    fs::File,
    io::{self, Read},
    path::Path,
    time::SystemTime,
};
use tokio::io::{AsyncWrite, AsyncWriteExt};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";
const SERVER: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// An HTTP response: status code, ordered headers and an optional body.
///
/// Handlers build one and return it; the server serializes it once, leaving
/// out the body for `HEAD` requests.
///
/// A new response already has three headers:
/// - `Content-Type: text/plain; charset=utf-8`
/// - `Date` with the current time in IMF-fixdate (RFC 1123) form
/// - `Server: plain_http/<version>`
///
/// # Examples
/// ```
/// use plain_http::{Cookie, Response, StatusCode};
///
/// let mut resp = Response::new();
/// resp.set_code(StatusCode::CREATED)
///     .set_header("content-type", "application/json")
///     .add_cookie(&Cookie::session("id", "42"))
///     .set_body(r#"{"ok":true}"#);
///
/// assert_eq!(resp.code(), StatusCode::CREATED);
/// assert_eq!(resp.header("Content-Type"), Some("application/json"));
/// assert_eq!(resp.header("Content-Length"), Some("11"));
/// assert_eq!(resp.header("Set-Cookie"), Some("id=42"));
///
/// let bytes = resp.to_bytes(true);
/// assert!(bytes.starts_with(b"HTTP/1.0 201 Created\r\n"));
/// assert!(bytes.ends_with(b"\r\n\r\n{\"ok\":true}"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    code: StatusCode,
    headers: Vec<Header>,
    body: Option<Vec<u8>>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// Empty `200 OK` response with the default headers.
    pub fn new() -> Self {
        Response {
            code: StatusCode::OK,
            headers: vec![
                Header::new("Content-Type", TEXT_PLAIN),
                Header::new("Date", httpdate::fmt_http_date(SystemTime::now())),
                Header::new("Server", SERVER),
            ],
            body: None,
        }
    }

    /// Response with a code, a content type (plain text when `None`) and a body.
    pub fn simple<C, B>(code: C, content_type: Option<&str>, body: B) -> Self
    where
        C: Into<StatusCode>,
        B: Into<Vec<u8>>,
    {
        let mut resp = Self::new();
        resp.set_code(code)
            .set_header("Content-Type", content_type.unwrap_or(TEXT_PLAIN))
            .set_body(body);
        resp
    }

    /// `200 OK` plain text response.
    pub fn text<B: Into<Vec<u8>>>(body: B) -> Self {
        Self::simple(StatusCode::OK, None, body)
    }

    /// `200 OK` HTML response.
    pub fn html<B: Into<Vec<u8>>>(body: B) -> Self {
        Self::simple(StatusCode::OK, Some(TEXT_HTML), body)
    }

    /// `302 Found` pointing at `location`, without a body.
    pub fn redirect_to(location: &str) -> Self {
        let mut resp = Self::new();
        resp.redirect(location);
        resp
    }

    /// `500 Internal Server Error` with the body `500 Internal Server Error: <err>`.
    pub fn error<E: fmt::Display>(err: E) -> Self {
        Self::error_with(StatusCode::INTERNAL_SERVER_ERROR, err)
    }

    /// Plaintext error response `<code> <reason>: <detail>`.
    ///
    /// ```
    /// use plain_http::{Response, StatusCode};
    ///
    /// let resp = Response::error_with(StatusCode::BAD_REQUEST, "no way");
    /// assert_eq!(resp.body(), Some(&b"400 Bad Request: no way"[..]));
    /// ```
    pub fn error_with<C: Into<StatusCode>, E: fmt::Display>(code: C, detail: E) -> Self {
        let code = code.into();
        Self::simple(code, None, format!("{}: {detail}", code.summary()))
    }

    /// `404 Not Found` with the body `404 Not Found: <path>`.
    pub fn not_found(path: &str) -> Self {
        Self::error_with(StatusCode::NOT_FOUND, path)
    }

    /// Reads a whole file into a `200 OK` response.
    ///
    /// The content type is guessed from the extension. A file that can't be
    /// opened gives [`Response::not_found`]; a failed read (a directory, for
    /// one) gives [`Response::error`].
    pub fn file<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(_) => return Self::not_found(&path.to_string_lossy()),
        };

        let mut body = Vec::new();
        if let Err(err) = file.read_to_end(&mut body) {
            return Self::error(err);
        }

        Self::simple(StatusCode::OK, Some(content_type_for(path)), body)
    }
}

impl Response {
    #[inline]
    pub fn code(&self) -> StatusCode {
        self.code
    }

    pub fn set_code<C: Into<StatusCode>>(&mut self, code: C) -> &mut Self {
        self.code = code.into();
        self
    }

    /// First value of the header named `key` (case-insensitive).
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.iter().find(|h| h.is(key)).map(Header::value)
    }

    /// Every header named `key`, in order.
    pub fn headers(&self, key: &str) -> Vec<&Header> {
        self.headers.iter().filter(|h| h.is(key)).collect()
    }

    #[inline]
    pub fn all_headers(&self) -> &[Header] {
        &self.headers
    }

    /// Replaces the first header with the same name, or appends one.
    pub fn set_header<K: AsRef<str>, V: AsRef<str>>(&mut self, key: K, value: V) -> &mut Self {
        let header = Header::new(key, value);

        match self
            .headers
            .iter_mut()
            .find(|h| h.is(header.normalized_key()))
        {
            Some(slot) => *slot = header,
            None => self.headers.push(header),
        }
        self
    }

    /// Appends a header, keeping existing ones with the same name.
    pub fn add_header<K: AsRef<str>, V: AsRef<str>>(&mut self, key: K, value: V) -> &mut Self {
        self.headers.push(Header::new(key, value));
        self
    }

    /// Removes the first header named `key`.
    pub fn remove_header(&mut self, key: &str) -> &mut Self {
        if let Some(index) = self.headers.iter().position(|h| h.is(key)) {
            self.headers.remove(index);
        }
        self
    }

    /// Removes every header named `key`.
    pub fn remove_headers(&mut self, key: &str) -> &mut Self {
        self.headers.retain(|h| !h.is(key));
        self
    }

    /// Removes all headers, including the default ones.
    pub fn clear_headers(&mut self) -> &mut Self {
        self.headers.clear();
        self
    }

    /// Appends a `Set-Cookie` header.
    pub fn add_cookie(&mut self, cookie: &Cookie) -> &mut Self {
        self.add_header("Set-Cookie", cookie.to_string())
    }

    /// Turns the response into a `302 Found` redirect.
    pub fn redirect(&mut self, location: &str) -> &mut Self {
        self.redirect_with(location, StatusCode::FOUND)
    }

    /// Sets `Location` and the given status code.
    pub fn redirect_with<C: Into<StatusCode>>(&mut self, location: &str, code: C) -> &mut Self {
        self.set_code(code).set_header("Location", location)
    }

    #[inline]
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Replaces the body and sets `Content-Length` to its size.
    pub fn set_body<B: Into<Vec<u8>>>(&mut self, body: B) -> &mut Self {
        let body = body.into();

        self.remove_headers("Content-Length");
        self.headers
            .push(Header::new("Content-Length", body.len().to_string()));
        self.body = Some(body);
        self
    }
}

/// Serialization
impl Response {
    fn head(&self) -> Vec<u8> {
        let mut head = Vec::with_capacity(64 + self.headers.len() * 32);

        head.extend_from_slice(self.code.status_line().as_bytes());
        head.extend_from_slice(b"\r\n");
        for header in &self.headers {
            head.extend_from_slice(header.to_string().as_bytes());
            head.extend_from_slice(b"\r\n");
        }
        head.extend_from_slice(b"\r\n");

        head
    }

    /// Serializes the response. With `include_body == false` the headers,
    /// `Content-Length` included, are kept and only the body is left out.
    pub fn to_bytes(&self, include_body: bool) -> Vec<u8> {
        let mut bytes = self.head();
        if let (true, Some(body)) = (include_body, &self.body) {
            bytes.extend_from_slice(body);
        }
        bytes
    }

    /// Writes the serialized response to `writer` and flushes it.
    pub async fn write_to<W>(&self, writer: &mut W, include_body: bool) -> io::Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        writer.write_all(&self.head()).await?;
        if let (true, Some(body)) = (include_body, &self.body) {
            writer.write_all(body).await?;
        }
        writer.flush().await
    }
}

/// Guesses a `Content-Type` from the file extension.
pub(crate) fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("html" | "htm") => TEXT_HTML,
        Some("txt" | "text") => TEXT_PLAIN,
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("csv") => "text/csv; charset=utf-8",
        Some("md") => "text/markdown; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("gz") => "application/gzip",
        Some("wasm") => "application/wasm",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}
