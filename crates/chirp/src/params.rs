//! Path parameter lookup.
//!
//! URL pattern matching belongs to the routing layer; the decoder only needs
//! to ask for a parameter by name. [`PathParams`] is that capability and
//! [`Params`] is a small ready-made implementation for routers that hand out
//! `(name, value)` pairs.

use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// Maximum number of parameters stored inline (stack allocated).
const INLINE_PARAMS: usize = 4;

/// Lookup of matched path parameters by name.
///
/// Implemented for [`Params`], string maps and references to any
/// implementor, so most routers can be plugged in without glue.
pub trait PathParams {
    /// Returns the raw value of the named parameter.
    fn lookup(&self, key: &str) -> Option<&str>;
}

impl<P: PathParams + ?Sized> PathParams for &P {
    fn lookup(&self, key: &str) -> Option<&str> {
        (**self).lookup(key)
    }
}

impl<S: BuildHasher> PathParams for HashMap<String, String, S> {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

impl PathParams for BTreeMap<String, String> {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

/// Extracted path parameters from a route match.
///
/// Uses small-vector optimization to avoid heap allocation for common
/// cases with few parameters. Parameters are stored as (name, value) pairs;
/// the first pair with a given name wins.
///
/// # Example
///
/// ```rust
/// use chirp::{Params, PathParams};
///
/// let mut params = Params::new();
/// params.push("userId", "123");
/// params.push("action", "view");
///
/// assert_eq!(params.lookup("userId"), Some("123"));
/// assert_eq!(params.get("action"), Some("view"));
/// assert_eq!(params.get("unknown"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl Params {
    /// Creates a new empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter to the set.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the value for a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns an iterator over the parameters.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl PathParams for Params {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.get(key)
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            inner: iter
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }
}
