use crate::{
    errors::{ErrorKind, HttpError},
    http::form::decode_component,
};
use std::{
    fmt,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// An HTTP cookie: key, value and an optional expiry.
///
/// Cookies parsed from a request never carry an expiry. Cookies built for a
/// response serialize through [`Display`](fmt::Display) into the value of a
/// `Set-Cookie` header.
///
/// # Examples
/// ```
/// use plain_http::Cookie;
/// use std::time::UNIX_EPOCH;
///
/// let cookie = Cookie::parse("session=abc%20123").unwrap();
/// assert_eq!(cookie.key(), "session");
/// assert_eq!(cookie.value(), Some("abc 123"));
///
/// let gone = Cookie::expiring("session", "", None);
/// assert_eq!(gone.expires(), Some(UNIX_EPOCH));
/// assert_eq!(gone.to_string(), "session=; Expires=Thu%2C%2001%20Jan%201970%2000%3A00%3A00%20GMT");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cookie {
    key: String,
    value: Option<String>,
    expires: Option<SystemTime>,
}

impl Cookie {
    /// Parses one `key=value` segment of a `Cookie` header.
    ///
    /// Both sides are trimmed and URL-decoded. Fails with
    /// [`ErrorKind::InvalidCookie`] when there is no `=` or the key is empty.
    pub fn parse(raw: &str) -> Result<Self, HttpError> {
        let (key, value) = raw
            .split_once('=')
            .ok_or_else(|| HttpError::new(ErrorKind::InvalidCookie, raw))?;

        let key = decode_component(key.trim());
        if key.is_empty() {
            return Err(HttpError::new(ErrorKind::InvalidCookie, raw));
        }

        Ok(Cookie {
            key,
            value: Some(decode_component(value.trim())),
            expires: None,
        })
    }

    /// Cookie that lives until the client session ends.
    pub fn session<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        Cookie {
            key: key.into(),
            value: Some(value.into()),
            expires: None,
        }
    }

    /// Cookie with a fixed expiry; `None` means the Unix epoch, which makes
    /// the client delete the cookie.
    ///
    /// The expiry is clamped to what a `Set-Cookie` date can express: times
    /// before the epoch become the epoch, times past the end of year 9999
    /// become `Fri, 31 Dec 9999 23:59:59 GMT`.
    pub fn expiring<K: Into<String>, V: Into<String>>(
        key: K,
        value: V,
        expires: Option<SystemTime>,
    ) -> Self {
        Cookie {
            key: key.into(),
            value: Some(value.into()),
            expires: Some(clamp_expiry(expires.unwrap_or(UNIX_EPOCH))),
        }
    }

    /// Cookie expiring `after` from now (local clock). Lifetimes reaching past
    /// year 9999 saturate to its last second.
    pub fn expires_after<K: Into<String>, V: Into<String>>(
        key: K,
        value: V,
        after: Duration,
    ) -> Self {
        let at = SystemTime::now()
            .checked_add(after)
            .unwrap_or_else(latest_expiry);
        Self::expiring(key, value, Some(at))
    }

    /// Key-only cookie, serialized as the bare key.
    pub fn without_value<K: Into<String>>(key: K) -> Self {
        Cookie {
            key: key.into(),
            value: None,
            expires: None,
        }
    }

    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    #[inline]
    pub fn expires(&self) -> Option<SystemTime> {
        self.expires
    }
}

// 9999-12-31T23:59:59Z, the last instant an HTTP date can hold.
const LATEST_EXPIRY_SECS: u64 = 253_402_300_799;

fn latest_expiry() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(LATEST_EXPIRY_SECS)
}

fn clamp_expiry(at: SystemTime) -> SystemTime {
    at.clamp(UNIX_EPOCH, latest_expiry())
}

// Line breaks and `;` would split the header, everything else is escaped.
fn encode(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| match c {
            '\n' | '\r' | ';' => ' ',
            c => c,
        })
        .collect();

    urlencoding::encode(&cleaned).into_owned()
}

/// `key=value[; Expires=date]`, every part URL-encoded.
impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(&self.key))?;
        if let Some(value) = &self.value {
            write!(f, "={}", encode(value))?;
        }
        if let Some(expires) = self.expires {
            write!(f, "; Expires={}", encode(&httpdate::fmt_http_date(expires)))?;
        }
        Ok(())
    }
}
