//! Procedural macros for Chirp.
//!
//! This crate provides `#[derive(Decode)]`, which describes a struct's fields
//! and their channel tags to the decoding engine in the `chirp` crate. Use it
//! through the `chirp` re-export rather than depending on this crate
//! directly.
//!
//! # Example
//!
//! ```rust,ignore
//! use chirp::Decode;
//!
//! #[derive(Default, Decode)]
//! struct UpdateUser {
//!     #[chirp(path = "id")]
//!     id: Uuid,
//!     #[chirp(query = "notify")]
//!     notify: bool,
//!     #[chirp(body = "name")]
//!     name: String,
//! }
//! ```
//!
//! # Macro Expansion
//!
//! The derive:
//!
//! 1. Rejects enums, unions, tuple structs and generic structs
//! 2. Reads the `path`, `query` and `body` tags of every named field
//! 3. Generates a `chirp::Decode` impl whose descriptor is built once and
//!    cached, along with any error building it

mod derive;
mod parse;

use proc_macro::TokenStream;

/// Derives `chirp::Decode` for a struct with named fields.
///
/// # Attributes
///
/// Each field accepts one `#[chirp(..)]` attribute with any of:
///
/// - `path = "key"`: decode from the router parameter `key`
/// - `query = "key"`: decode from the first query value for `key`
/// - `body = "key"`: decode from the form value or JSON member `key`;
///   `body = "-"` excludes the field from the body
///
/// Text after a `,` in a tag is ignored. Fields without a `body` tag are
/// matched against the body by their own name.
///
/// Path, query and form values require the field type to implement
/// `chirp::Scalar`; JSON members require `serde::Deserialize`.
///
/// # Generated Code
///
/// The macro generates approximately:
///
/// ```rust,ignore
/// impl chirp::Decode for UpdateUser {
///     fn try_descriptor() -> Result<&'static chirp::StructDescriptor<Self>, chirp::DescriptorError> {
///         static DESCRIPTOR: OnceLock<Result<chirp::StructDescriptor<UpdateUser>, chirp::DescriptorError>> =
///             OnceLock::new();
///         DESCRIPTOR
///             .get_or_init(|| {
///                 chirp::StructDescriptor::<UpdateUser>::builder("UpdateUser")
///                     .field(
///                         chirp::FieldDescriptor::<UpdateUser>::new(
///                             chirp::FieldMeta::new("id").with_tag(chirp::TagKind::Path, "id"),
///                         )
///                         .with_decode(|dst, token| chirp::decode_token(token, &mut dst.id))
///                         .with_merge(|dst, value| chirp::merge_value(value, &mut dst.id)),
///                     )
///                     // ...
///                     .build()
///             })
///             .as_ref()
///             .map_err(Clone::clone)
///     }
/// }
/// ```
#[proc_macro_derive(Decode, attributes(chirp))]
pub fn derive_decode(input: TokenStream) -> TokenStream {
    derive::expand_derive(input.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
