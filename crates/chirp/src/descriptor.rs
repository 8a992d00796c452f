//! Per-type field descriptors.
//!
//! A [`StructDescriptor`] lists a destination type's fields in declaration
//! order together with their channel tags and decode capabilities. It is
//! built once per type (normally by `#[derive(Decode)]`) and resolved
//! eagerly for every tag kind, so decoding never re-inspects the type.

use crate::resolve::{self, Resolved, SKIP_MARKER};
use crate::scalar::ScalarError;
use std::fmt;

/// Tag namespace a field key is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    /// `#[chirp(path = "..")]`
    Path,
    /// `#[chirp(query = "..")]`
    Query,
    /// `#[chirp(body = "..")]`, shared by form and structured bodies
    Body,
}

impl TagKind {
    /// All tag kinds, in pipeline order of first use.
    pub const ALL: [Self; 3] = [Self::Query, Self::Body, Self::Path];

    /// Returns the attribute key naming this tag kind.
    #[must_use]
    pub const fn attr_name(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Body => "body",
        }
    }

    /// Whether an untagged field is addressed by its declared name.
    ///
    /// Only body decoding falls back to field names; path and query decoding
    /// ignore untagged fields.
    #[must_use]
    pub const fn uses_field_name_on_empty(self) -> bool {
        matches!(self, Self::Body)
    }

    const fn index(self) -> usize {
        match self {
            Self::Path => 0,
            Self::Query => 1,
            Self::Body => 2,
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attr_name())
    }
}

/// Declared name and raw channel tags of one field.
///
/// Tags are stored verbatim; trimming and modifier truncation happen in the
/// resolver so that every consumer derives keys the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMeta {
    name: &'static str,
    tags: [Option<&'static str>; 3],
}

impl FieldMeta {
    /// Creates metadata for a field with no tags.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            tags: [None; 3],
        }
    }

    /// Sets the raw tag for one tag kind.
    #[must_use]
    pub fn with_tag(mut self, kind: TagKind, tag: &'static str) -> Self {
        self.tags[kind.index()] = Some(tag);
        self
    }

    /// Returns the declared field name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the raw tag for a tag kind, if one was declared.
    #[must_use]
    pub fn tag(&self, kind: TagKind) -> Option<&'static str> {
        self.tags[kind.index()]
    }
}

/// Decodes one text token directly into a field of `T`.
pub type DecodeFn<T> = fn(&mut T, &str) -> Result<(), ScalarError>;

/// Deserializes one structured-body member directly into a field of `T`.
pub type MergeFn<T> = fn(&mut T, &serde_json::Value) -> Result<(), serde_json::Error>;

/// One field of a destination type.
pub struct FieldDescriptor<T> {
    meta: FieldMeta,
    decode: Option<DecodeFn<T>>,
    merge: Option<MergeFn<T>>,
}

impl<T> FieldDescriptor<T> {
    /// Creates a descriptor without decode capabilities.
    ///
    /// Such a field may only be bound to the body channel with the skip
    /// marker `-`.
    #[must_use]
    pub fn new(meta: FieldMeta) -> Self {
        Self {
            meta,
            decode: None,
            merge: None,
        }
    }

    /// Sets the token decoder used by the path, query and form extractors.
    #[must_use]
    pub fn with_decode(mut self, decode: DecodeFn<T>) -> Self {
        self.decode = Some(decode);
        self
    }

    /// Sets the member deserializer used by the structured body extractor.
    #[must_use]
    pub fn with_merge(mut self, merge: MergeFn<T>) -> Self {
        self.merge = Some(merge);
        self
    }

    /// Returns the field metadata.
    #[must_use]
    pub fn meta(&self) -> &FieldMeta {
        &self.meta
    }

    pub(crate) fn decode(&self, dst: &mut T, token: &str) -> Result<(), ScalarError> {
        match self.decode {
            Some(decode) => decode(dst, token),
            None => Ok(()),
        }
    }

    pub(crate) fn merge(
        &self,
        dst: &mut T,
        value: &serde_json::Value,
    ) -> Result<(), serde_json::Error> {
        match self.merge {
            Some(merge) => merge(dst, value),
            None => Ok(()),
        }
    }
}

impl<T> Clone for FieldDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            meta: self.meta,
            decode: self.decode,
            merge: self.merge,
        }
    }
}

impl<T> fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("meta", &self.meta)
            .field("decode", &self.decode.is_some())
            .field("merge", &self.merge.is_some())
            .finish()
    }
}

/// Error detected while building a [`StructDescriptor`].
///
/// These are programmer errors: they surface once, when the descriptor for
/// a type is first built, never per request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    /// A field was registered with an empty name.
    #[error("{type_name}: field name must not be empty")]
    EmptyFieldName {
        /// Destination type name.
        type_name: &'static str,
    },

    /// Two fields share a declared name.
    #[error("{type_name}: duplicate field `{field}`")]
    DuplicateField {
        /// Destination type name.
        type_name: &'static str,
        /// The repeated field name.
        field: &'static str,
    },

    /// A field resolves for a channel but cannot be decoded from it.
    #[error("{type_name}: field `{field}` is bound to the {kind} tag but has no {capability} capability")]
    MissingCapability {
        /// Destination type name.
        type_name: &'static str,
        /// The field lacking the capability.
        field: &'static str,
        /// Tag kind the field resolved for.
        kind: TagKind,
        /// Either `"decode"` or `"merge"`.
        capability: &'static str,
    },
}

/// Ordered field list of a destination type, resolved for every tag kind.
pub struct StructDescriptor<T> {
    type_name: &'static str,
    fields: Vec<FieldDescriptor<T>>,
    resolved: [Vec<Resolved>; 3],
}

impl<T> StructDescriptor<T> {
    /// Starts building a descriptor for the named type.
    #[must_use]
    pub fn builder(type_name: &'static str) -> StructDescriptorBuilder<T> {
        StructDescriptorBuilder {
            type_name,
            fields: Vec::new(),
        }
    }

    /// Returns the destination type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor<T>] {
        &self.fields
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the type has no named fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the `(key, field)` pairs eligible for a tag kind, in
    /// declaration order.
    pub fn resolved(&self, kind: TagKind) -> impl Iterator<Item = (&'static str, &FieldDescriptor<T>)> {
        self.resolved[kind.index()]
            .iter()
            .map(|entry| (entry.key, &self.fields[entry.index]))
    }
}

impl<T> fmt::Debug for StructDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructDescriptor")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .field("resolved", &self.resolved)
            .finish()
    }
}

/// Builder for [`StructDescriptor`].
///
/// # Example
///
/// ```rust
/// use chirp::{decode_token, merge_value, FieldDescriptor, FieldMeta, StructDescriptor, TagKind};
///
/// #[derive(Default)]
/// struct Page {
///     limit: u32,
/// }
///
/// let descriptor = StructDescriptor::<Page>::builder("Page")
///     .field(
///         FieldDescriptor::<Page>::new(FieldMeta::new("limit").with_tag(TagKind::Query, "limit"))
///             .with_decode(|dst, token| decode_token(token, &mut dst.limit))
///             .with_merge(|dst, value| merge_value(value, &mut dst.limit)),
///     )
///     .build()
///     .unwrap();
///
/// let keys: Vec<_> = descriptor.resolved(TagKind::Query).map(|(key, _)| key).collect();
/// assert_eq!(keys, vec!["limit"]);
/// ```
pub struct StructDescriptorBuilder<T> {
    type_name: &'static str,
    fields: Vec<FieldDescriptor<T>>,
}

impl<T> StructDescriptorBuilder<T> {
    /// Appends a field; declaration order is preserved.
    #[must_use]
    pub fn field(mut self, field: FieldDescriptor<T>) -> Self {
        self.fields.push(field);
        self
    }

    /// Validates the fields and resolves keys for every tag kind.
    pub fn build(self) -> Result<StructDescriptor<T>, DescriptorError> {
        let type_name = self.type_name;

        for (index, field) in self.fields.iter().enumerate() {
            let name = field.meta.name();
            if name.is_empty() {
                return Err(DescriptorError::EmptyFieldName { type_name });
            }
            if self.fields[..index].iter().any(|f| f.meta.name() == name) {
                return Err(DescriptorError::DuplicateField {
                    type_name,
                    field: name,
                });
            }
        }

        let resolved = [TagKind::Path, TagKind::Query, TagKind::Body]
            .map(|kind| resolve::resolve(&self.fields, kind, kind.uses_field_name_on_empty()));

        for kind in TagKind::ALL {
            for entry in &resolved[kind.index()] {
                let field = &self.fields[entry.index];
                if kind == TagKind::Body && entry.key == SKIP_MARKER {
                    continue;
                }
                let missing = if field.decode.is_none() {
                    Some("decode")
                } else if kind == TagKind::Body && field.merge.is_none() {
                    Some("merge")
                } else {
                    None
                };
                if let Some(capability) = missing {
                    return Err(DescriptorError::MissingCapability {
                        type_name,
                        field: field.meta.name(),
                        kind,
                        capability,
                    });
                }
            }
        }

        Ok(StructDescriptor {
            type_name,
            fields: self.fields,
            resolved,
        })
    }
}

/// Types that can be populated by a [`Decoder`](crate::Decoder).
///
/// Implement this with `#[derive(Decode)]`; the derive builds the descriptor
/// on first use and caches the outcome, success or error, for the life of
/// the process.
///
/// ```rust
/// use chirp::{Decode, TagKind};
///
/// #[derive(Default, Decode)]
/// struct Search {
///     #[chirp(query = "q")]
///     term: String,
///     #[chirp(path = "id")]
///     id: u64,
/// }
///
/// let descriptor = Search::descriptor();
/// assert_eq!(descriptor.len(), 2);
/// assert_eq!(descriptor.resolved(TagKind::Path).count(), 1);
/// ```
pub trait Decode: Sized + 'static {
    /// Returns the cached descriptor, or the error that prevented building it.
    fn try_descriptor() -> Result<&'static StructDescriptor<Self>, DescriptorError>;

    /// Returns the cached descriptor for this type.
    ///
    /// # Panics
    ///
    /// Panics if the descriptor is invalid.
    fn descriptor() -> &'static StructDescriptor<Self> {
        Self::try_descriptor().unwrap_or_else(|err| panic!("invalid descriptor: {err}"))
    }
}
