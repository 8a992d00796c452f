//! Scalar decoding.
//!
//! [`Scalar`] is the self-parse capability of leaf field types. Primitive
//! numbers, booleans, characters, strings and network addresses implement it
//! out of the box; domain types opt in directly or through
//! [`impl_scalar_from_str!`](crate::impl_scalar_from_str).

use crate::error::BoxError;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Error produced when a token cannot be converted to a scalar.
#[derive(Debug, thiserror::Error)]
#[error("{cause}")]
pub struct ScalarError {
    cause: BoxError,
}

impl ScalarError {
    /// Wraps an underlying conversion error.
    pub fn new(cause: impl Into<BoxError>) -> Self {
        Self {
            cause: cause.into(),
        }
    }

    /// Returns the underlying conversion error.
    #[must_use]
    pub fn into_cause(self) -> BoxError {
        self.cause
    }
}

/// A leaf value that can construct itself from a text token.
///
/// # Example
///
/// ```rust
/// use chirp::{Scalar, ScalarError};
///
/// #[derive(Debug, PartialEq)]
/// struct Percent(u8);
///
/// impl Scalar for Percent {
///     fn parse_token(token: &str) -> Result<Self, ScalarError> {
///         let digits = token.strip_suffix('%').unwrap_or(token);
///         let value: u8 = digits.parse().map_err(ScalarError::new)?;
///         if value > 100 {
///             return Err(ScalarError::new("percentage above 100"));
///         }
///         Ok(Percent(value))
///     }
/// }
///
/// assert_eq!(Percent::parse_token("42%").unwrap(), Percent(42));
/// assert!(Percent::parse_token("420").is_err());
/// ```
pub trait Scalar: Sized {
    /// Parses a non-empty token.
    fn parse_token(token: &str) -> Result<Self, ScalarError>;
}

/// Decodes `token` into `slot` in place.
///
/// An empty token leaves `slot` unchanged. On failure `slot` is also left
/// unchanged.
///
/// ```rust
/// let mut limit = 10u32;
/// chirp::decode_token("", &mut limit).unwrap();
/// assert_eq!(limit, 10);
///
/// chirp::decode_token("25", &mut limit).unwrap();
/// assert_eq!(limit, 25);
///
/// assert!(chirp::decode_token("lots", &mut limit).is_err());
/// assert_eq!(limit, 25);
/// ```
pub fn decode_token<S: Scalar>(token: &str, slot: &mut S) -> Result<(), ScalarError> {
    if token.is_empty() {
        return Ok(());
    }
    *slot = S::parse_token(token)?;
    Ok(())
}

/// Implements [`Scalar`] for types whose [`FromStr`](std::str::FromStr)
/// error is a standard error.
///
/// ```rust
/// use std::str::FromStr;
///
/// #[derive(Debug, PartialEq)]
/// struct Sku(String);
///
/// impl FromStr for Sku {
///     type Err = std::io::Error;
///
///     fn from_str(s: &str) -> Result<Self, Self::Err> {
///         Ok(Sku(s.to_uppercase()))
///     }
/// }
///
/// chirp::impl_scalar_from_str!(Sku);
///
/// assert_eq!(<Sku as chirp::Scalar>::parse_token("ab-1").unwrap(), Sku("AB-1".into()));
/// ```
#[macro_export]
macro_rules! impl_scalar_from_str {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::Scalar for $ty {
                fn parse_token(token: &str) -> ::std::result::Result<Self, $crate::ScalarError> {
                    <$ty as ::std::str::FromStr>::from_str(token).map_err($crate::ScalarError::new)
                }
            }
        )*
    };
}

impl_scalar_from_str!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char, String,
    IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr,
);

#[cfg(feature = "uuid")]
impl_scalar_from_str!(uuid::Uuid);

/// Accepts the usual spellings of true and false.
#[derive(Debug, thiserror::Error)]
#[error("invalid boolean: {0:?}")]
struct InvalidBool(String);

impl Scalar for bool {
    fn parse_token(token: &str) -> Result<Self, ScalarError> {
        match token {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
            _ => Err(ScalarError::new(InvalidBool(token.to_owned()))),
        }
    }
}

/// A present token always yields `Some`.
impl<S: Scalar> Scalar for Option<S> {
    fn parse_token(token: &str) -> Result<Self, ScalarError> {
        S::parse_token(token).map(Some)
    }
}
