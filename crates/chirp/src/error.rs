//! Decode error types.
//!
//! A [`ParseError`] describes the first failure of a decode call: which
//! channel it came from, which field (if any) was being populated, the raw
//! text that could not be converted and the underlying cause.

use crate::descriptor::{FieldMeta, TagKind};
use crate::resolve;
use http::StatusCode;
use std::fmt;

/// Boxed error used as the cause of a decode failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Tag reported for failures that are not tied to a single field.
pub const WHOLE_BODY_TAG: &str = "*";

/// Request channel a value was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// URL path parameters (e.g., `/users/{id}`)
    Path,
    /// Query string parameters
    Query,
    /// Request body (form or structured)
    Body,
}

impl Channel {
    /// Returns the tag namespace used to resolve labels for this channel.
    ///
    /// The body channel shares its namespace between form and structured
    /// decoding.
    #[must_use]
    pub const fn tag_kind(self) -> TagKind {
        match self {
            Self::Path => TagKind::Path,
            Self::Query => TagKind::Query,
            Self::Body => TagKind::Body,
        }
    }

    /// Returns the channel name as used in error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Body => "body",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a [`ParseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A single field's token failed scalar conversion.
    FieldConversion,
    /// The body as a whole could not be deserialized.
    StructuralDecode,
    /// The body stream could not be read.
    BodyRead,
}

/// Error returned by a decode call.
///
/// The label reported by [`ParseError::tag`] is recomputed from the stored
/// field metadata on every call using the same key rule the resolver uses,
/// so it always matches the key the field was looked up by.
///
/// # Example
///
/// ```rust
/// use chirp::{Channel, Decode, Decoder, Params, Body};
///
/// #[derive(Debug, Default, Decode)]
/// struct Page {
///     #[chirp(query = "limit")]
///     limit: u32,
/// }
///
/// let mut request = http::Request::builder()
///     .uri("/items?limit=lots")
///     .body(Body::empty())
///     .unwrap();
///
/// let mut page = Page::default();
/// let err = Decoder::<Page>::new()
///     .decode(&mut request, &Params::new(), &mut page)
///     .unwrap_err();
///
/// assert_eq!(err.channel(), Channel::Query);
/// assert_eq!(err.tag(), "limit");
/// assert_eq!(err.source_text(), "lots");
/// ```
#[derive(Debug)]
pub struct ParseError {
    channel: Channel,
    kind: ParseErrorKind,
    field: Option<FieldMeta>,
    source_text: String,
    cause: BoxError,
}

impl ParseError {
    /// Decorates a stage failure with the channel it originated from.
    pub(crate) fn new(channel: Channel, failure: Failure) -> Self {
        Self {
            channel,
            kind: failure.kind,
            field: failure.field,
            source_text: failure.source_text,
            cause: failure.cause,
        }
    }

    /// Returns the channel (path, query or body) that failed.
    #[must_use]
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Returns the error category.
    #[must_use]
    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    /// Returns the metadata of the field being decoded, if the failure was
    /// tied to a single field.
    #[must_use]
    pub fn field(&self) -> Option<&FieldMeta> {
        self.field.as_ref()
    }

    /// Returns the label of the failing field.
    ///
    /// This is the channel tag of the field, its declared name when the
    /// field has no tag for the channel, or `"*"` for whole-body failures.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match &self.field {
            None => WHOLE_BODY_TAG,
            Some(meta) => resolve::field_key(meta, self.channel.tag_kind()).0,
        }
    }

    /// Returns the raw text that could not be decoded.
    ///
    /// For field failures this is the token; for structured body failures it
    /// is the whole body interpreted as UTF-8.
    #[must_use]
    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    /// Returns the underlying cause.
    #[must_use]
    pub fn cause(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.cause
    }

    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            ParseErrorKind::FieldConversion | ParseErrorKind::StructuralDecode => {
                StatusCode::BAD_REQUEST
            }
            ParseErrorKind::BodyRead => match self.cause.downcast_ref::<crate::BodyError>() {
                Some(crate::BodyError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
                _ => StatusCode::BAD_REQUEST,
            },
        }
    }

    /// Returns the error code suitable for error envelopes.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self.kind {
            ParseErrorKind::FieldConversion => "INVALID_PARAMETER",
            ParseErrorKind::StructuralDecode => "DESERIALIZATION_FAILED",
            ParseErrorKind::BodyRead => "BODY_READ_FAILED",
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]({}): {}",
            self.channel,
            self.tag(),
            self.source_text,
            self.cause
        )
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.cause)
    }
}

/// Failure produced by a single stage, before the pipeline attaches the
/// channel.
#[derive(Debug)]
pub(crate) struct Failure {
    kind: ParseErrorKind,
    field: Option<FieldMeta>,
    source_text: String,
    cause: BoxError,
}

impl Failure {
    pub(crate) fn field(field: FieldMeta, token: &str, cause: BoxError) -> Self {
        Self {
            kind: ParseErrorKind::FieldConversion,
            field: Some(field),
            source_text: token.to_owned(),
            cause,
        }
    }

    pub(crate) fn structure(source_text: String, cause: impl Into<BoxError>) -> Self {
        Self {
            kind: ParseErrorKind::StructuralDecode,
            field: None,
            source_text,
            cause: cause.into(),
        }
    }

    pub(crate) fn read(cause: crate::BodyError) -> Self {
        Self {
            kind: ParseErrorKind::BodyRead,
            field: None,
            source_text: String::new(),
            cause: Box::new(cause),
        }
    }
}
