use crate::errors::{Error, ErrorKind, HttpError};
use memchr::memchr2;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

const INITIAL_BODY_CAPACITY: usize = 64 * 1024;

/// Line and byte-count reader over a buffered byte stream.
///
/// Lines end with `\n`, `\r\n`, or a `\r` directly followed by end of stream.
/// A `\r` followed by anything else is kept as line content.
pub(crate) struct WireReader<R> {
    inner: R,
    line_limit: usize,
}

impl<R: AsyncBufRead + Unpin> WireReader<R> {
    #[inline]
    pub(crate) fn new(inner: R, line_limit: usize) -> Self {
        Self { inner, line_limit }
    }

    /// Reads one line without its terminator.
    ///
    /// `Ok(None)` means the stream ended before a single byte was read.
    /// Invalid UTF-8 is replaced with `U+FFFD`.
    pub(crate) async fn read_line(&mut self) -> Result<Option<String>, Error> {
        let mut line = Vec::new();
        let mut seen_bytes = false;

        loop {
            let buf = self.inner.fill_buf().await?;
            if buf.is_empty() {
                if !seen_bytes {
                    return Ok(None);
                }
                break;
            }
            seen_bytes = true;

            let Some(pos) = memchr2(b'\n', b'\r', buf) else {
                let len = buf.len();
                line.extend_from_slice(buf);
                self.inner.consume(len);
                self.check_len(&line)?;
                continue;
            };

            let is_cr = buf[pos] == b'\r';
            line.extend_from_slice(&buf[..pos]);
            self.inner.consume(pos + 1);
            self.check_len(&line)?;

            if !is_cr {
                break;
            }

            // One byte of lookahead after a solitary `\r`.
            let next = self.inner.fill_buf().await?.first().copied();
            match next {
                None => break,
                Some(b'\n') => {
                    self.inner.consume(1);
                    break;
                }
                Some(_) => line.push(b'\r'),
            }
        }

        self.check_len(&line)?;
        Ok(Some(decode(&line)))
    }

    /// Reads up to `len` bytes, stopping early only at end of stream.
    ///
    /// The buffer grows with the data that actually arrives; `len` only
    /// bounds it.
    pub(crate) async fn read_exact(&mut self, len: usize) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::with_capacity(len.min(INITIAL_BODY_CAPACITY));
        (&mut self.inner)
            .take(len as u64)
            .read_to_end(&mut bytes)
            .await?;

        Ok(bytes)
    }

    #[inline]
    fn check_len(&self, line: &[u8]) -> Result<(), HttpError> {
        if line.len() > self.line_limit {
            return Err(HttpError::new(
                ErrorKind::InvalidRequest,
                format!("line longer than {} bytes", self.line_limit),
            ));
        }

        Ok(())
    }
}

#[inline]
pub(crate) fn decode(bytes: &[u8]) -> String {
    match simdutf8::basic::from_utf8(bytes) {
        Ok(text) => text.to_owned(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn lines(input: &[u8]) -> Vec<String> {
        let mut reader = WireReader::new(input, 1024);
        let mut lines = Vec::new();

        while let Some(line) = reader.read_line().await.unwrap() {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn line_terminators() {
        #[rustfmt::skip]
        let cases: [(&[u8], &[&str]); 10] = [
            (b"GET / HTTP/1.0\r\n\r\n", &["GET / HTTP/1.0", ""]),
            (b"a\nb\n",                 &["a", "b"]),
            (b"a\r\nb",                 &["a", "b"]),
            (b"a\r",                    &["a"]),
            (b"a\rb\r\n",               &["a\rb"]),
            (b"a\r\rb\n",               &["a\r\rb"]),
            (b"\r\n",                   &[""]),
            (b"\n\n",                   &["", ""]),
            (b"",                       &[]),
            (b"no terminator",          &["no terminator"]),
        ];

        for (input, expected) in cases {
            assert_eq!(lines(input).await, expected, "{:?}", String::from_utf8_lossy(input));
        }
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        assert_eq!(lines(b"caf\xe9\n").await, ["caf\u{FFFD}"]);
    }

    #[tokio::test]
    async fn line_limit() {
        let mut reader = WireReader::new(&b"0123456789\n"[..], 4);
        let err = reader.read_line().await.unwrap_err();

        match err {
            Error::Http(err) => assert_eq!(err.kind(), ErrorKind::InvalidRequest),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn exact_bytes() {
        let mut reader = WireReader::new(&b"line\nhello world"[..], 1024);

        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("line"));
        assert_eq!(reader.read_exact(5).await.unwrap(), b"hello");
        // Short read at end of stream
        assert_eq!(reader.read_exact(100).await.unwrap(), b" world");
        assert_eq!(reader.read_exact(3).await.unwrap(), b"");
    }

    #[tokio::test]
    async fn declared_length_does_not_preallocate() {
        let mut reader = WireReader::new(&b"tiny"[..], 1024);

        let bytes = reader.read_exact(16 * 1024 * 1024).await.unwrap();
        assert_eq!(bytes, b"tiny");
        assert!(bytes.capacity() <= INITIAL_BODY_CAPACITY, "{}", bytes.capacity());
    }

    #[tokio::test]
    async fn lines_split_across_reads() {
        let input = tokio::io::BufReader::with_capacity(2, &b"abc\r\ndef\r"[..]);
        let mut reader = WireReader::new(input, 1024);

        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("abc"));
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("def"));
        assert_eq!(reader.read_line().await.unwrap(), None);
    }
}
