//! Field key resolution.
//!
//! Both the extractors and [`ParseError::tag`](crate::ParseError::tag) derive
//! keys through [`field_key`], so a reported label always equals the key the
//! field was looked up by.

use crate::descriptor::{FieldDescriptor, FieldMeta, TagKind};

/// Separator introducing tag modifiers (`"name,omitempty"`).
pub const TAG_SEPARATOR: char = ',';

/// Body tag value that excludes a field from body decoding.
pub const SKIP_MARKER: &str = "-";

/// A field selected for one tag kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Resolved {
    pub(crate) key: &'static str,
    pub(crate) index: usize,
}

/// Strips modifiers and surrounding whitespace from a raw tag.
///
/// Modifiers after the first [`TAG_SEPARATOR`] are discarded without being
/// interpreted.
///
/// ```rust
/// assert_eq!(chirp::normalize_tag(" name ,omitempty"), "name");
/// assert_eq!(chirp::normalize_tag(""), "");
/// ```
#[must_use]
pub fn normalize_tag(raw: &str) -> &str {
    raw.split(TAG_SEPARATOR).next().unwrap_or_default().trim()
}

/// Returns the key for a field and whether it came from an explicit tag.
///
/// Without a non-empty tag the declared field name is returned with
/// `false`; callers decide whether that fallback is eligible.
#[must_use]
pub fn field_key(meta: &FieldMeta, kind: TagKind) -> (&'static str, bool) {
    match meta.tag(kind).map(normalize_tag) {
        Some(tag) if !tag.is_empty() => (tag, true),
        _ => (meta.name(), false),
    }
}

/// Selects the fields eligible for `kind`, in declaration order.
pub(crate) fn resolve<T>(
    fields: &[FieldDescriptor<T>],
    kind: TagKind,
    use_field_name_on_empty: bool,
) -> Vec<Resolved> {
    fields
        .iter()
        .enumerate()
        .filter_map(|(index, field)| {
            let (key, explicit) = field_key(field.meta(), kind);
            (explicit || use_field_name_on_empty).then_some(Resolved { key, index })
        })
        .collect()
}
