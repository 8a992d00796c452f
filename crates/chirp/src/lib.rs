//! # Chirp
//!
//! Declarative decoding of HTTP requests into typed structs.
//!
//! A destination struct declares, per field, which request channel feeds it:
//!
//! | Attribute | Source | Untagged fields |
//! |-----------|--------|-----------------|
//! | `#[chirp(path = "..")]` | Router path parameters | ignored |
//! | `#[chirp(query = "..")]` | URL query string | ignored |
//! | `#[chirp(body = "..")]` | Form or JSON body | matched by field name |
//!
//! A [`Decoder`] runs the query, body and path stages in that order and stops
//! at the first failure. Fields without a value in the request keep whatever
//! they held before the call.
//!
//! ## Example
//!
//! ```rust
//! use chirp::{Body, Decode, Decoder, Params};
//!
//! #[derive(Debug, Default, Decode)]
//! struct Rename {
//!     #[chirp(path = "id")]
//!     id: u64,
//!     #[chirp(body = "name")]
//!     name: String,
//!     #[chirp(query = "part")]
//!     part: String,
//!     #[chirp(body = "priority")]
//!     priority: u8,
//!     #[chirp(body = "-")]
//!     internal: String,
//!     // Body-only, matched by field name.
//!     hero: String,
//! }
//!
//! let mut request = http::Request::builder()
//!     .method("PUT")
//!     .uri("/user/42/name?part=last")
//!     .header("content-type", "application/json")
//!     .body(Body::from(r#"{"name":"John","priority":5,"hero":"Joker","internal":"x"}"#))
//!     .unwrap();
//! let params: Params = [("id", "42")].into_iter().collect();
//!
//! let mut rename = Rename::default();
//! chirp::parse(&mut request, &params, &mut rename).unwrap();
//!
//! assert_eq!(rename.id, 42);
//! assert_eq!(rename.name, "John");
//! assert_eq!(rename.part, "last");
//! assert_eq!(rename.priority, 5);
//! assert_eq!(rename.hero, "Joker");
//! assert_eq!(rename.internal, "");
//! ```
//!
//! ## Error Handling
//!
//! Every failure is a [`ParseError`] naming the channel, the field label and
//! the offending text:
//!
//! ```rust
//! use chirp::{Body, Decode, Params};
//!
//! #[derive(Default, Decode)]
//! struct Lookup {
//!     #[chirp(path = "id")]
//!     id: u64,
//! }
//!
//! let mut request = http::Request::builder().body(Body::empty()).unwrap();
//! let params: Params = [("id", "seven")].into_iter().collect();
//!
//! let err = chirp::parse(&mut request, &params, &mut Lookup::default()).unwrap_err();
//! assert!(err.to_string().starts_with("path[id](seven): "));
//! assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
//! ```

#![doc(html_root_url = "https://docs.rs/chirp/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

extern crate self as chirp;

mod body;
mod config;
mod descriptor;
mod error;
mod form;
mod json;
mod middleware;
mod params;
mod path;
mod pipeline;
mod query;
mod resolve;
mod scalar;

pub use body::{Body, BodyError, DEFAULT_MAX_BODY_SIZE};
pub use config::{ConfigError, DecodeConfig, DecodeConfigBuilder};
pub use descriptor::{
    Decode, DecodeFn, DescriptorError, FieldDescriptor, FieldMeta, MergeFn, StructDescriptor,
    StructDescriptorBuilder, TagKind,
};
pub use error::{BoxError, Channel, ParseError, ParseErrorKind, WHOLE_BODY_TAG};
pub use json::merge_value;
pub use middleware::{request_from_extensions, DecodeLayer, Decoded, ErrorHook, Flow};
pub use params::{PathParams, Params};
pub use pipeline::{parse, Decoder};
pub use query::Values;
pub use resolve::{field_key, normalize_tag, SKIP_MARKER, TAG_SEPARATOR};
pub use scalar::{decode_token, Scalar, ScalarError};

/// Derives [`Decode`] for a struct with named fields.
///
/// See the [crate documentation](crate) for the attribute syntax.
pub use chirp_macros::Decode;

#[doc(hidden)]
pub mod __private {
    pub use serde_json::Value;
    pub use std::sync::OnceLock;
}
