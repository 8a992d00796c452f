//! Query string extraction.
//!
//! [`Values`] is the decoded `key -> [value, ..]` view of a URL-encoded
//! string, shared by the query extractor and the form body extractor.

use crate::descriptor::{StructDescriptor, TagKind};
use crate::error::Failure;

/// Decoded URL-encoded pairs, in their original order.
///
/// # Example
///
/// ```rust
/// use chirp::Values;
///
/// let values = Values::parse("tag=a&tag=b&q=hello+world");
///
/// assert_eq!(values.first("tag"), Some("a"));
/// assert_eq!(values.get_all("tag").collect::<Vec<_>>(), vec!["a", "b"]);
/// assert_eq!(values.first("q"), Some("hello world"));
/// assert_eq!(values.first("missing"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Values {
    pairs: Vec<(String, String)>,
}

impl Values {
    /// Parses a URL-encoded string (`a=1&b=2`).
    #[must_use]
    pub fn parse(input: &str) -> Self {
        Self::parse_bytes(input.as_bytes())
    }

    /// Parses URL-encoded bytes, such as a form body.
    ///
    /// Parsing never fails: invalid percent-encodings and non-UTF-8 bytes
    /// are decoded lossily.
    #[must_use]
    pub fn parse_bytes(input: &[u8]) -> Self {
        // String pairs are always deserializable from lossy form decoding.
        let pairs = serde_urlencoded::from_bytes(input).unwrap_or_default();
        Self { pairs }
    }

    /// Returns the first value for `key`.
    #[must_use]
    pub fn first(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns all values for `key`, in order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if no pairs were parsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub(crate) fn push(&mut self, key: String, value: String) {
        self.pairs.push((key, value));
    }
}

/// Populates every query-tagged field from `query`.
///
/// Untagged fields are never touched; a missing key decodes as the empty
/// token and leaves the field unchanged.
pub(crate) fn extract_query<T>(
    descriptor: &StructDescriptor<T>,
    query: Option<&str>,
    dst: &mut T,
) -> Result<(), Failure> {
    let values = Values::parse(query.unwrap_or_default());
    extract_values(descriptor, TagKind::Query, &values, dst)
}

/// Decodes the first value of each resolved key into its field.
pub(crate) fn extract_values<T>(
    descriptor: &StructDescriptor<T>,
    kind: TagKind,
    values: &Values,
    dst: &mut T,
) -> Result<(), Failure> {
    for (key, field) in descriptor.resolved(kind) {
        let token = values.first(key).unwrap_or_default();
        tracing::trace!(kind = %kind, key, field = field.meta().name(), "decoding field");
        field
            .decode(dst, token)
            .map_err(|e| Failure::field(*field.meta(), token, e.into_cause()))?;
    }
    Ok(())
}
