//! URL-encoded form data (`application/x-www-form-urlencoded` and query strings).

use memchr::memchr;
use std::{collections::HashMap, fmt};

/// Ordered list of decoded `key=value` pairs.
///
/// Pairs are separated by `&`; empty segments are skipped. Keys and values are
/// URL-decoded with `+` read as a space. A segment without `=` yields a pair
/// with no value.
///
/// # Examples
/// ```
/// use plain_http::Form;
///
/// let form = Form::parse("name=John+Doe&tag=a&tag=b&debug&&email=user%40example.com");
///
/// assert_eq!(form.get("name"), Some("John Doe"));
/// assert_eq!(form.get("tag"), Some("a"));
/// assert_eq!(form.get_all("tag"), vec![Some("a"), Some("b")]);
/// assert_eq!(form.get("debug"), None);
/// assert!(form.contains("debug"));
/// assert_eq!(form.get("email"), Some("user@example.com"));
/// assert_eq!(form.len(), 5);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    pairs: Vec<Pair>,
}

/// A single form entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pair {
    key: String,
    value: Option<String>,
}

impl Pair {
    pub fn new<K: Into<String>, V: Into<String>>(key: K, value: Option<V>) -> Self {
        Pair {
            key: key.into(),
            value: value.map(Into::into),
        }
    }

    fn parse(raw: &str) -> Self {
        match memchr(b'=', raw.as_bytes()) {
            Some(index) => Pair {
                key: decode_component(&raw[..index]),
                value: Some(decode_component(&raw[index + 1..])),
            },
            None => Pair {
                key: decode_component(raw),
                value: None,
            },
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
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&urlencoding::encode(&self.key))?;
        if let Some(value) = &self.value {
            write!(f, "={}", urlencoding::encode(value))?;
        }
        Ok(())
    }
}

impl Form {
    /// Parses a raw, URL-encoded form. A leading `?` is ignored.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.strip_prefix('?').unwrap_or(raw);
        let bytes = raw.as_bytes();

        let mut pairs = Vec::new();
        let mut start = 0;
        while start < bytes.len() {
            let end = memchr(b'&', &bytes[start..])
                .map(|pos| start + pos)
                .unwrap_or(bytes.len());

            if end > start {
                pairs.push(Pair::parse(&raw[start..end]));
            }
            start = end + 1;
        }

        Form { pairs }
    }

    /// First value for `key`.
    ///
    /// `None` both when the key is absent and when its first occurrence has no
    /// value; use [`Form::contains`] to tell the two apart.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|pair| pair.key == key)
            .and_then(Pair::value)
    }

    /// All values for `key`, in order.
    pub fn get_all(&self, key: &str) -> Vec<Option<&str>> {
        self.pairs
            .iter()
            .filter(|pair| pair.key == key)
            .map(Pair::value)
            .collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|pair| pair.key == key)
    }

    /// Map of keys to their first value.
    pub fn to_map(&self) -> HashMap<&str, Option<&str>> {
        let mut map = HashMap::with_capacity(self.pairs.len());
        for pair in &self.pairs {
            map.entry(pair.key()).or_insert_with(|| pair.value());
        }
        map
    }

    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Pair> {
        self.pairs.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl FromIterator<Pair> for Form {
    fn from_iter<I: IntoIterator<Item = Pair>>(iter: I) -> Self {
        Form {
            pairs: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Form {
    type Item = &'a Pair;
    type IntoIter = std::slice::Iter<'a, Pair>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.iter()
    }
}

impl IntoIterator for Form {
    type Item = Pair;
    type IntoIter = std::vec::IntoIter<Pair>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.into_iter()
    }
}

/// URL-encodes the pairs back into `k=v&k2` form.
impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pair) in self.pairs.iter().enumerate() {
            if i != 0 {
                f.write_str("&")?;
            }
            write!(f, "{pair}")?;
        }
        Ok(())
    }
}

/// URL-decodes a key or value, reading `+` as a space.
///
/// Malformed escapes are kept verbatim; bytes that don't form UTF-8 after
/// decoding are replaced with `U+FFFD`.
pub(crate) fn decode_component(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned()
}
