//! The decode pipeline.
//!
//! A [`Decoder`] runs three stages against one destination value, always in
//! the order query, body, path. The first failing stage stops the pipeline
//! and its error is returned tagged with the stage's channel; later stages
//! never run.

use crate::body::Body;
use crate::config::DecodeConfig;
use crate::descriptor::{Decode, DescriptorError, StructDescriptor};
use crate::error::{Channel, Failure, ParseError};
use crate::form::extract_form;
use crate::json::extract_structured;
use crate::params::PathParams;
use crate::path::extract_path;
use crate::query::extract_query;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Request};
use mime::Mime;
use std::fmt;

/// Decodes requests into values of `T`.
///
/// Construction fetches the type's cached descriptor, so an invalid
/// descriptor fails here, once, rather than per request. Use
/// [`Decoder::try_new`] to receive that failure as a [`DescriptorError`].
///
/// # Example
///
/// ```rust
/// use chirp::{Body, Decode, Decoder, Params};
///
/// #[derive(Debug, Default, Decode)]
/// struct Rename {
///     #[chirp(path = "id")]
///     id: u64,
///     #[chirp(body = "name")]
///     name: String,
///     #[chirp(query = "dry_run")]
///     dry_run: bool,
/// }
///
/// let mut request = http::Request::builder()
///     .method("PUT")
///     .uri("/users/7/name?dry_run=true")
///     .header("content-type", "application/json")
///     .body(Body::from(r#"{"name":"John"}"#))
///     .unwrap();
/// let params: Params = [("id", "7")].into_iter().collect();
///
/// let mut rename = Rename::default();
/// Decoder::<Rename>::new().decode(&mut request, &params, &mut rename).unwrap();
///
/// assert_eq!(rename.id, 7);
/// assert_eq!(rename.name, "John");
/// assert!(rename.dry_run);
/// ```
pub struct Decoder<T: 'static> {
    descriptor: &'static StructDescriptor<T>,
    config: DecodeConfig,
}

impl<T: Decode> Decoder<T> {
    /// Creates a decoder with the default configuration.
    ///
    /// # Panics
    ///
    /// Panics if the descriptor of `T` is invalid.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DecodeConfig::default())
    }

    /// Creates a decoder with the given configuration.
    ///
    /// # Panics
    ///
    /// Panics if the descriptor of `T` is invalid.
    #[must_use]
    pub fn with_config(config: DecodeConfig) -> Self {
        Self::from_descriptor(T::descriptor(), config)
    }

    /// Creates a decoder with the default configuration, surfacing an
    /// invalid descriptor as an error.
    pub fn try_new() -> Result<Self, DescriptorError> {
        Self::try_with_config(DecodeConfig::default())
    }

    /// Creates a decoder with the given configuration, surfacing an invalid
    /// descriptor as an error.
    pub fn try_with_config(config: DecodeConfig) -> Result<Self, DescriptorError> {
        Ok(Self::from_descriptor(T::try_descriptor()?, config))
    }
}

impl<T: Decode> Default for Decoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Decoder<T> {
    /// Creates a decoder over an explicitly built descriptor.
    #[must_use]
    pub fn from_descriptor(descriptor: &'static StructDescriptor<T>, config: DecodeConfig) -> Self {
        Self { descriptor, config }
    }

    /// Returns the descriptor driving this decoder.
    #[must_use]
    pub fn descriptor(&self) -> &'static StructDescriptor<T> {
        self.descriptor
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// Decodes `request` into `dst`.
    ///
    /// The body is taken out of the request by the body stage and released
    /// before the path stage runs. On failure `dst` keeps whatever earlier
    /// fields and stages already wrote.
    pub fn decode(
        &self,
        request: &mut Request<Body>,
        params: &dyn PathParams,
        dst: &mut T,
    ) -> Result<(), ParseError> {
        let type_name = self.descriptor.type_name();

        tracing::debug!(target: "chirp::decode", type_name, stage = "query", "decoding");
        extract_query(self.descriptor, request.uri().query(), dst)
            .map_err(|f| ParseError::new(Channel::Query, f))?;

        tracing::debug!(target: "chirp::decode", type_name, stage = "body", "decoding");
        let content_type = content_type(request.headers());
        let body = request.body_mut().take();
        self.decode_body(content_type.as_ref(), body, dst)
            .map_err(|f| ParseError::new(Channel::Body, f))?;

        tracing::debug!(target: "chirp::decode", type_name, stage = "path", "decoding");
        extract_path(self.descriptor, params, dst)
            .map_err(|f| ParseError::new(Channel::Path, f))?;

        Ok(())
    }

    fn decode_body(&self, content_type: Option<&Mime>, body: Body, dst: &mut T) -> Result<(), Failure> {
        let bytes = body
            .read_to_bytes(self.config.max_body_bytes)
            .map_err(Failure::read)?;

        match content_type {
            Some(kind) if self.config.is_form(kind) => extract_form(self.descriptor, kind, bytes, dst),
            _ => extract_structured(self.descriptor, &bytes, dst),
        }
    }
}

impl<T: 'static> Clone for Decoder<T> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor,
            config: self.config.clone(),
        }
    }
}

impl<T: 'static> fmt::Debug for Decoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("type_name", &self.descriptor.type_name())
            .field("config", &self.config)
            .finish()
    }
}

/// Parses the `Content-Type` header; missing or malformed values select the
/// structured body path.
fn content_type(headers: &HeaderMap) -> Option<Mime> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

/// Decodes `request` into `dst` with the default configuration.
///
/// ```rust
/// use chirp::{Body, Decode, Params};
///
/// #[derive(Default, Decode)]
/// struct Page {
///     #[chirp(query = "page")]
///     page: u32,
/// }
///
/// let mut request = http::Request::builder()
///     .uri("/items?page=3")
///     .body(Body::empty())
///     .unwrap();
///
/// let mut page = Page::default();
/// chirp::parse(&mut request, &Params::new(), &mut page).unwrap();
/// assert_eq!(page.page, 3);
/// ```
pub fn parse<T: Decode>(
    request: &mut Request<Body>,
    params: &dyn PathParams,
    dst: &mut T,
) -> Result<(), ParseError> {
    Decoder::<T>::new().decode(request, params, dst)
}
