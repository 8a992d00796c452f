//! Structured (JSON) body extraction.
//!
//! The body is handed to `serde_json` in one call. Members are then applied
//! to the fields whose body key matches, so values decoded by earlier stages
//! survive unless the body names them.

use crate::descriptor::{StructDescriptor, TagKind};
use crate::error::Failure;
use crate::resolve::SKIP_MARKER;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Deserializes one structured-body member into `slot`.
///
/// `slot` is only overwritten when deserialization succeeds.
pub fn merge_value<V: DeserializeOwned>(value: &Value, slot: &mut V) -> Result<(), serde_json::Error> {
    *slot = V::deserialize(value)?;
    Ok(())
}

/// Applies a JSON object body to the destination.
///
/// A zero-length body or a `null` document leaves the destination untouched.
/// A member matches its key exactly or, failing that, ignoring ASCII case.
/// Members without a matching field are ignored. Any failure is reported
/// against the whole body.
pub(crate) fn extract_structured<T>(
    descriptor: &StructDescriptor<T>,
    body: &[u8],
    dst: &mut T,
) -> Result<(), Failure> {
    if body.is_empty() {
        return Ok(());
    }
    let whole_body = || String::from_utf8_lossy(body).into_owned();

    let document: Option<Map<String, Value>> =
        serde_json::from_slice(body).map_err(|e| Failure::structure(whole_body(), e))?;
    let Some(object) = document else {
        return Ok(());
    };

    for (key, field) in descriptor.resolved(TagKind::Body) {
        if key == SKIP_MARKER {
            continue;
        }
        if let Some(value) = member(&object, key) {
            tracing::trace!(kind = %TagKind::Body, key, field = field.meta().name(), "merging member");
            field
                .merge(dst, value)
                .map_err(|e| Failure::structure(whole_body(), e))?;
        }
    }
    Ok(())
}

/// Looks up `key`, preferring an exact match over a case-insensitive one.
fn member<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).or_else(|| {
        object
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value)
    })
}
