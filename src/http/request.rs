use crate::{
    errors::{Error, ErrorKind, HttpError},
    http::{
        cookie::Cookie,
        form::Form,
        reader::{self, WireReader},
        types::{self, Header, Method},
    },
    limits::ReqLimits,
};
use memchr::memchr_iter;
use std::net::SocketAddr;
use tokio::io::AsyncBufRead;

/// A parsed HTTP request.
///
/// Built once, either by the server from the wire or through [`Request::new`],
/// and read-only afterwards.
///
/// # Accepted input
///
/// ```text
/// [METHOD] SP+ [PATH] SP+ "HTTP/" [VERSION] EOL
/// ([NAME] ":" SP+ [VALUE] EOL)*
/// EOL
/// [BODY]
/// ```
///
/// - `EOL` is `\r\n`, a bare `\n`, or a `\r` at the very end of the stream.
/// - `[METHOD]` is `GET`, `HEAD` or `POST` in any letter case.
/// - `[VERSION]` is any run of digits and dots; it is checked, not interpreted.
/// - `[PATH]` is kept verbatim, including the query string.
/// - Header names and values are trimmed and must not be empty.
/// - Every `Cookie` header is split on `;` into cookies. Segments that aren't
///   `key=value` are dropped without failing the request.
/// - Only `POST` has a body. It requires a numeric `Content-Length` no larger
///   than [`ReqLimits::body_size`]. If the client closes the connection early,
///   the bytes received so far become the body.
///
/// # Examples
/// ```
/// use plain_http::{Method, Request};
///
/// let request = Request::new(
///     "127.0.0.1:8080".parse().unwrap(),
///     "127.0.0.1:50000".parse().unwrap(),
///     Method::Get,
///     "/search?q=rust+http",
///     vec![("Host".into(), "example.com".into()), ("Cookie".into(), "id=7; bad".into())],
///     None,
/// );
///
/// assert_eq!(request.path(), "/search");
/// assert_eq!(request.query_string(), Some("q=rust+http"));
/// assert_eq!(request.query_form().get("q"), Some("rust http"));
/// assert_eq!(request.url(), "http://example.com/search?q=rust+http");
/// assert_eq!(request.cookie("id"), Some("7"));
/// assert_eq!(request.cookies().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    local_addr: SocketAddr,
    remote_addr: SocketAddr,

    method: Method,
    raw_path: String,

    headers: Vec<Header>,
    cookies: Vec<Cookie>,

    body: Option<Vec<u8>>,
}

impl Request {
    /// Builds a request directly, e.g. to call a handler in tests.
    ///
    /// Cookies are taken from the `Cookie` headers the same way the parser
    /// does it.
    pub fn new<P: Into<String>>(
        local_addr: SocketAddr,
        remote_addr: SocketAddr,
        method: Method,
        raw_path: P,
        headers: Vec<(String, String)>,
        body: Option<Vec<u8>>,
    ) -> Self {
        let headers: Vec<Header> = headers
            .into_iter()
            .map(|(key, value)| Header::new(key, value))
            .collect();

        let mut cookies = Vec::new();
        for header in headers.iter().filter(|h| h.is("Cookie")) {
            parse_cookies(header.value(), &mut cookies);
        }

        Request {
            local_addr,
            remote_addr,
            method,
            raw_path: raw_path.into(),
            headers,
            cookies,
            body,
        }
    }

    /// Reads and validates one request from `reader`.
    pub(crate) async fn read_from<R: AsyncBufRead + Unpin>(
        reader: R,
        local_addr: SocketAddr,
        remote_addr: SocketAddr,
        limits: &ReqLimits,
    ) -> Result<Self, Error> {
        let mut reader = WireReader::new(reader, limits.line_size);

        let line = reader
            .read_line()
            .await?
            .ok_or_else(|| HttpError::new(ErrorKind::UnexpectedEnd, "no request line"))?;
        let (method, raw_path) = parse_request_line(&line)?;

        let mut headers = Vec::new();
        let mut cookies = Vec::new();
        loop {
            let line = reader.read_line().await?.ok_or_else(|| {
                HttpError::new(ErrorKind::UnexpectedEnd, "stream ended inside headers")
            })?;

            if line.is_empty() {
                break;
            }

            let header = parse_header(&line)?;
            if header.is("Cookie") {
                parse_cookies(header.value(), &mut cookies);
            }
            headers.push(header);
        }

        let body = match method {
            Method::Post => {
                let len = content_length(&headers, limits.body_size)?;
                Some(reader.read_exact(len).await?)
            }
            Method::Get | Method::Head => None,
        };

        Ok(Request {
            local_addr,
            remote_addr,
            method,
            raw_path,
            headers,
            cookies,
            body,
        })
    }

    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[inline]
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    #[inline]
    pub fn method(&self) -> Method {
        self.method
    }

    #[inline]
    pub fn is_get(&self) -> bool {
        self.method == Method::Get
    }

    #[inline]
    pub fn is_post(&self) -> bool {
        self.method == Method::Post
    }

    #[inline]
    pub fn is_head(&self) -> bool {
        self.method == Method::Head
    }

    /// Path exactly as sent, query string included.
    #[inline]
    pub fn raw_path(&self) -> &str {
        &self.raw_path
    }

    /// Path up to the first `?`.
    pub fn path(&self) -> &str {
        match self.raw_path.split_once('?') {
            Some((path, _)) => path,
            None => &self.raw_path,
        }
    }

    /// Everything after the first `?`, if there is one.
    pub fn query_string(&self) -> Option<&str> {
        self.raw_path.split_once('?').map(|(_, query)| query)
    }

    /// `http://<host><raw path>`, where the host comes from the `Host` header
    /// or falls back to the local address.
    pub fn url(&self) -> String {
        match self.header("Host") {
            Some(host) => format!("http://{host}{}", self.raw_path),
            None => format!("http://{}{}", self.local_addr, self.raw_path),
        }
    }

    /// Value of the first header named `key` (case-insensitive).
    pub fn header(&self, key: &str) -> Option<&str> {
        let key = types::normalize_key(key);
        self.headers
            .iter()
            .find(|h| h.normalized_key().eq_ignore_ascii_case(&key))
            .map(Header::value)
    }

    /// All headers in arrival order, duplicates included.
    #[inline]
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// Value of the first cookie named `key`.
    pub fn cookie(&self, key: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|c| c.key() == key)
            .and_then(Cookie::value)
    }

    #[inline]
    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// Body bytes; only `POST` requests have one.
    #[inline]
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Body decoded as UTF-8, invalid sequences replaced.
    pub fn body_str(&self) -> Option<String> {
        self.body.as_deref().map(reader::decode)
    }

    /// Form parsed from the query string (empty without one).
    pub fn query_form(&self) -> Form {
        Form::parse(self.query_string().unwrap_or(""))
    }

    /// Form parsed from the body (empty without one).
    pub fn post_form(&self) -> Form {
        Form::parse(self.body_str().as_deref().unwrap_or(""))
    }
}

fn parse_request_line(line: &str) -> Result<(Method, String), HttpError> {
    let invalid = || HttpError::new(ErrorKind::InvalidMethod, line);

    // Leading whitespace makes an empty first field.
    if line.starts_with(|c: char| c.is_ascii_whitespace()) {
        return Err(invalid());
    }

    let mut fields = line.split_ascii_whitespace();
    let (Some(method), Some(path), Some(version), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(invalid());
    };

    let method = Method::from_field(method).map_err(|_| invalid())?;
    if !types::is_http_version(version) {
        return Err(invalid());
    }

    Ok((method, path.to_owned()))
}

// `Name: value`, split at the first `:` that is followed by a space.
fn parse_header(line: &str) -> Result<Header, HttpError> {
    let bytes = line.as_bytes();

    let split = memchr_iter(b':', bytes)
        .find(|&pos| bytes.get(pos + 1) == Some(&b' '))
        .ok_or_else(|| HttpError::new(ErrorKind::InvalidHeader, line))?;

    let header = Header::new(&line[..split], &line[split + 1..]);
    if header.key().is_empty() || header.value().is_empty() {
        return Err(HttpError::new(ErrorKind::InvalidHeader, line));
    }

    Ok(header)
}

fn parse_cookies(value: &str, cookies: &mut Vec<Cookie>) {
    cookies.extend(
        value
            .split(';')
            .filter_map(|segment| Cookie::parse(segment.trim_start()).ok()),
    );
}

fn content_length(headers: &[Header], limit: usize) -> Result<usize, HttpError> {
    let value = headers
        .iter()
        .find(|h| h.is("Content-Length"))
        .map(Header::value)
        .ok_or_else(|| HttpError::new(ErrorKind::InvalidRequest, "POST without Content-Length"))?;

    let len: usize = value.parse().map_err(|_| {
        HttpError::new(
            ErrorKind::InvalidRequest,
            format!("invalid Content-Length: {value}"),
        )
    })?;

    if len > limit {
        return Err(HttpError::new(
            ErrorKind::BodyTooLong,
            format!("{len} bytes, limit is {limit}"),
        ));
    }

    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! parse_request {
        ($input:expr) => {
            parse_request!($input, ReqLimits::default())
        };
        ($input:expr, $limits:expr) => {
            Request::read_from(
                &$input[..],
                "127.0.0.1:8080".parse().unwrap(),
                "10.0.0.1:40000".parse().unwrap(),
                &$limits,
            )
            .await
        };
    }

    fn kind(result: Result<Request, Error>) -> ErrorKind {
        match result {
            Err(Error::Http(err)) => err.kind(),
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn minimal_request() {
        let request = parse_request!(b"GET / HTTP/1.0\r\n\r\n").unwrap();

        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.raw_path(), "/");
        assert_eq!(request.path(), "/");
        assert_eq!(request.query_string(), None);
        assert!(request.headers().is_empty());
        assert!(request.cookies().is_empty());
        assert_eq!(request.body(), None);
        assert_eq!(request.remote_addr().to_string(), "10.0.0.1:40000");
    }

    #[tokio::test]
    async fn request_line() {
        #[rustfmt::skip]
        let valid: [(&[u8], Method, &str); 7] = [
            (b"GET /a?b=c HTTP/1.1\r\n\r\n",      Method::Get,  "/a?b=c"),
            (b"head /x HTTP/1.0\n\n",             Method::Head, "/x"),
            (b"GET / HTTP/1.0\r\n\r",             Method::Get,  "/"),
            (b"GET  /spaces \t HTTP/1.0\r\n\r\n", Method::Get,  "/spaces"),
            (b"GET / HTTP/1.0 \r\n\r\n",          Method::Get,  "/"),
            (b"Post / http/1.0\r\nContent-Length: 0\r\n\r\n", Method::Post, "/"),
            (b"GET /a\xc2\xa0b HTTP/1.0\r\n\r\n",    Method::Get,  "/a\u{a0}b"),
        ];

        for (input, method, path) in valid {
            let request = parse_request!(input).unwrap();
            assert_eq!(request.method(), method);
            assert_eq!(request.raw_path(), path);
        }

        #[rustfmt::skip]
        let invalid: [&[u8]; 8] = [
            b"GET /\r\n\r\n",
            b"GET / HTTP/1.0 extra\r\n\r\n",
            b" GET / HTTP/1.0\r\n\r\n",
            b"PUT / HTTP/1.0\r\n\r\n",
            b"GET / FTP/1.0\r\n\r\n",
            b"GET / HTTP/\r\n\r\n",
            b"GET / HTTP/1.x\r\n\r\n",
            b"\r\n\r\n",
        ];

        for input in invalid {
            assert_eq!(kind(parse_request!(input)), ErrorKind::InvalidMethod, "{input:?}");
        }
    }

    #[tokio::test]
    async fn unexpected_end() {
        #[rustfmt::skip]
        let cases: [&[u8]; 4] = [
            b"",
            b"GET / HTTP/1.0\r\n",
            b"GET / HTTP/1.0\r",
            b"GET / HTTP/1.0\r\nHost: a\r\n",
        ];

        for input in cases {
            assert_eq!(kind(parse_request!(input)), ErrorKind::UnexpectedEnd);
        }
    }

    #[tokio::test]
    async fn headers() {
        let request = parse_request!(
            b"GET / HTTP/1.0\r\n\
              host:   example.com  \r\n\
              X-Multi: 1\r\n\
              x-multi: 2\r\n\
              Time: 12:30: now\r\n\
              \r\n"
        )
        .unwrap();

        let pairs: Vec<_> = request.headers().iter().map(|h| (h.key(), h.value())).collect();
        assert_eq!(
            pairs,
            [
                ("host", "example.com"),
                ("X-Multi", "1"),
                ("x-multi", "2"),
                ("Time", "12:30: now"),
            ]
        );

        assert_eq!(request.header("HOST"), Some("example.com"));
        assert_eq!(request.header("x-multi"), Some("1"));
        assert_eq!(request.header("missing"), None);
        assert_eq!(request.url(), "http://example.com/");
    }

    #[tokio::test]
    async fn invalid_headers() {
        #[rustfmt::skip]
        let cases: [&[u8]; 5] = [
            b"GET / HTTP/1.0\r\nNoSeparator\r\n\r\n",
            b"GET / HTTP/1.0\r\nNoSpace:value\r\n\r\n",
            b"GET / HTTP/1.0\r\n: value\r\n\r\n",
            b"GET / HTTP/1.0\r\nEmpty: \r\n\r\n",
            b"GET / HTTP/1.0\r\nEmpty:    \r\n\r\n",
        ];

        for input in cases {
            assert_eq!(kind(parse_request!(input)), ErrorKind::InvalidHeader, "{input:?}");
        }
    }

    #[tokio::test]
    async fn cookies() {
        let request = parse_request!(
            b"GET / HTTP/1.0\r\nCookie: a=1; ===bad; b=2\r\ncookie: c=x%20y;d\r\n\r\n"
        )
        .unwrap();

        let cookies: Vec<_> = request
            .cookies()
            .iter()
            .map(|c| (c.key(), c.value()))
            .collect();
        assert_eq!(
            cookies,
            [("a", Some("1")), ("b", Some("2")), ("c", Some("x y"))]
        );
        assert_eq!(request.cookie("b"), Some("2"));
        assert_eq!(request.cookie("d"), None);
    }

    #[tokio::test]
    async fn post_body() {
        let request =
            parse_request!(b"POST /post HTTP/1.0\r\nContent-Length: 5\r\n\r\nhello").unwrap();
        assert_eq!(request.body(), Some(&b"hello"[..]));
        assert_eq!(request.body_str().as_deref(), Some("hello"));

        // Extra bytes after the declared length are not part of the body
        let request =
            parse_request!(b"POST / HTTP/1.0\r\nContent-Length: 2\r\n\r\nhello").unwrap();
        assert_eq!(request.body(), Some(&b"he"[..]));

        // Short bodies are accepted as they are
        let request =
            parse_request!(b"POST / HTTP/1.0\r\nContent-Length: 10\r\n\r\nabc").unwrap();
        assert_eq!(request.body(), Some(&b"abc"[..]));

        let request = parse_request!(
            b"POST / HTTP/1.0\r\nContent-Length: 16\r\n\r\nname=a+b&x=%21&y"
        )
        .unwrap();
        let form = request.post_form();
        assert_eq!(form.get("name"), Some("a b"));
        assert_eq!(form.get("x"), Some("!"));
        assert!(form.contains("y"));
    }

    #[tokio::test]
    async fn post_errors() {
        #[rustfmt::skip]
        let cases: [(&[u8], ErrorKind); 4] = [
            (b"POST / HTTP/1.0\r\n\r\nbody",                          ErrorKind::InvalidRequest),
            (b"POST / HTTP/1.0\r\nContent-Length: abc\r\n\r\n",       ErrorKind::InvalidRequest),
            (b"POST / HTTP/1.0\r\nContent-Length: -1\r\n\r\n",        ErrorKind::InvalidRequest),
            (b"POST / HTTP/1.0\r\nContent-Length: 999999999\r\n\r\n", ErrorKind::BodyTooLong),
        ];

        for (input, expected) in cases {
            assert_eq!(kind(parse_request!(input)), expected);
        }

        let limits = ReqLimits {
            body_size: 4,
            ..ReqLimits::default()
        };
        let result = parse_request!(b"POST / HTTP/1.0\r\nContent-Length: 5\r\n\r\nhello", limits);
        assert_eq!(kind(result), ErrorKind::BodyTooLong);
    }

    #[tokio::test]
    async fn get_ignores_body() {
        let request =
            parse_request!(b"GET / HTTP/1.0\r\nContent-Length: 5\r\n\r\nhello").unwrap();
        assert_eq!(request.body(), None);
        assert_eq!(request.post_form(), Form::default());
    }

    #[tokio::test]
    async fn url_falls_back_to_local_addr() {
        let request = parse_request!(b"GET /x?y HTTP/1.0\r\n\r\n").unwrap();
        assert_eq!(request.url(), "http://127.0.0.1:8080/x?y");
        assert_eq!(request.query_string(), Some("y"));
        assert_eq!(request.path(), "/x");
    }

    #[tokio::test]
    async fn line_too_long() {
        let limits = ReqLimits {
            line_size: 16,
            ..ReqLimits::default()
        };
        let result = parse_request!(b"GET /a/very/long/path HTTP/1.0\r\n\r\n", limits);
        assert_eq!(kind(result), ErrorKind::InvalidRequest);
    }
}
