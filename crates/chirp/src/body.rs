//! Request body stream.
//!
//! [`Body`] owns the body of a request, either as bytes already in memory or
//! as a blocking reader. Reading consumes the body, so the underlying stream
//! is released exactly once whichever way the read ends.

use bytes::Bytes;
use std::fmt;
use std::io::{self, Read};

/// Default maximum body size accepted by the decoder (1 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Error raised while reading a request body.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    /// The underlying stream failed.
    #[error("failed to read request body: {0}")]
    Read(#[from] io::Error),

    /// The body exceeded the configured limit.
    #[error("request body exceeds {limit} bytes")]
    TooLarge {
        /// Configured limit in bytes.
        limit: usize,
    },
}

enum Inner {
    Empty,
    Full(Bytes),
    Reader(Box<dyn Read + Send>),
}

/// Body of an inbound request.
///
/// # Example
///
/// ```rust
/// use chirp::Body;
///
/// let body = Body::from_reader(&b"name=John"[..]);
/// let bytes = body.read_to_bytes(1024).unwrap();
/// assert_eq!(&bytes[..], b"name=John");
/// ```
pub struct Body {
    inner: Inner,
}

impl Body {
    /// Creates an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self { inner: Inner::Empty }
    }

    /// Wraps a blocking reader.
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self {
            inner: Inner::Reader(Box::new(reader)),
        }
    }

    /// Returns true if the body is known to hold no bytes.
    ///
    /// Reader-backed bodies are never known to be empty before reading.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.inner {
            Inner::Empty => true,
            Inner::Full(bytes) => bytes.is_empty(),
            Inner::Reader(_) => false,
        }
    }

    /// Takes the body out, leaving an empty body behind.
    #[must_use]
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Reads the whole body, consuming it.
    ///
    /// The reader is dropped before this returns, on success and on every
    /// error path.
    pub fn read_to_bytes(self, limit: usize) -> Result<Bytes, BodyError> {
        let bytes = match self.inner {
            Inner::Empty => Bytes::new(),
            Inner::Full(bytes) => bytes,
            Inner::Reader(reader) => {
                let mut buf = Vec::new();
                let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
                reader.take(cap).read_to_end(&mut buf)?;
                Bytes::from(buf)
            }
        };
        if bytes.len() > limit {
            return Err(BodyError::TooLarge { limit });
        }
        Ok(bytes)
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Empty => f.write_str("Body::Empty"),
            Inner::Full(bytes) => f.debug_tuple("Body::Full").field(&bytes.len()).finish(),
            Inner::Reader(_) => f.write_str("Body::Reader"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self {
            inner: Inner::Full(bytes),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Bytes::from(bytes).into()
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Bytes::from(text).into()
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Bytes::from_static(text.as_bytes()).into()
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Bytes::from_static(bytes).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Reader that counts how often it is dropped.
    struct Tracked {
        data: io::Cursor<Vec<u8>>,
        fail: bool,
        drops: Arc<AtomicUsize>,
    }

    impl Read for Tracked {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
            }
            self.data.read(buf)
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn tracked(data: &[u8], fail: bool) -> (Body, Arc<AtomicUsize>) {
        let drops = Arc::new(AtomicUsize::new(0));
        let body = Body::from_reader(Tracked {
            data: io::Cursor::new(data.to_vec()),
            fail,
            drops: Arc::clone(&drops),
        });
        (body, drops)
    }

    #[test]
    fn test_read_full_body() {
        let body = Body::from("hello");
        assert!(!body.is_empty());
        assert_eq!(&body.read_to_bytes(16).unwrap()[..], b"hello");
    }

    #[test]
    fn test_reader_closed_after_success() {
        let (body, drops) = tracked(b"payload", false);

        let bytes = body.read_to_bytes(64).unwrap();

        assert_eq!(&bytes[..], b"payload");
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reader_closed_after_read_error() {
        let (body, drops) = tracked(b"payload", true);

        let err = body.read_to_bytes(64).unwrap_err();

        assert!(matches!(err, BodyError::Read(_)));
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_limit_exceeded() {
        let (body, drops) = tracked(&[b'a'; 32], false);

        let err = body.read_to_bytes(8).unwrap_err();

        assert!(matches!(err, BodyError::TooLarge { limit: 8 }));
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_limit_applies_to_in_memory_bodies() {
        let err = Body::from(vec![0u8; 10]).read_to_bytes(4).unwrap_err();
        assert_eq!(err.to_string(), "request body exceeds 4 bytes");
    }

    #[test]
    fn test_take_leaves_empty() {
        let mut body = Body::from("x");
        let taken = body.take();

        assert!(body.is_empty());
        assert!(!taken.is_empty());
    }

    #[test]
    fn test_empty_body() {
        let body = Body::default();
        assert!(body.is_empty());
        assert!(body.read_to_bytes(0).unwrap().is_empty());
    }
}
