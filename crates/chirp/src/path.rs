//! Path parameter extraction.

use crate::descriptor::{StructDescriptor, TagKind};
use crate::error::Failure;
use crate::params::PathParams;

/// Populates every path-tagged field from the router's parameters.
///
/// Untagged fields are never touched; a parameter the router did not match
/// decodes as the empty token and leaves the field unchanged.
pub(crate) fn extract_path<T>(
    descriptor: &StructDescriptor<T>,
    params: &dyn PathParams,
    dst: &mut T,
) -> Result<(), Failure> {
    for (key, field) in descriptor.resolved(TagKind::Path) {
        let token = params.lookup(key).unwrap_or_default();
        tracing::trace!(kind = %TagKind::Path, key, field = field.meta().name(), "decoding field");
        field
            .decode(dst, token)
            .map_err(|e| Failure::field(*field.meta(), token, e.into_cause()))?;
    }
    Ok(())
}

#[cfg(all(test, feature = "uuid"))]
mod tests {
    use super::*;
    use crate::{decode_token, merge_value, Channel, FieldDescriptor, FieldMeta, ParseError, Params};
    use uuid::Uuid;

    #[derive(Debug, Default)]
    struct PostPath {
        user_id: u64,
        post_id: Uuid,
        slug: String,
    }

    fn descriptor() -> StructDescriptor<PostPath> {
        StructDescriptor::builder("PostPath")
            .field(
                FieldDescriptor::<PostPath>::new(
                    FieldMeta::new("user_id").with_tag(TagKind::Path, "userId"),
                )
                .with_decode(|dst, token| decode_token(token, &mut dst.user_id))
                .with_merge(|dst, value| merge_value(value, &mut dst.user_id)),
            )
            .field(
                FieldDescriptor::<PostPath>::new(
                    FieldMeta::new("post_id").with_tag(TagKind::Path, "id"),
                )
                .with_decode(|dst, token| decode_token(token, &mut dst.post_id))
                .with_merge(|dst, value| merge_value(value, &mut dst.post_id)),
            )
            .field(
                FieldDescriptor::<PostPath>::new(FieldMeta::new("slug"))
                    .with_decode(|dst, token| decode_token(token, &mut dst.slug))
                    .with_merge(|dst, value| merge_value(value, &mut dst.slug)),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_path_params_decoded() {
        let params: Params = [
            ("userId", "42"),
            ("id", "6b245e15-5c88-438b-a170-d8f97460083a"),
            ("slug", "ignored"),
        ]
        .into_iter()
        .collect();
        let mut path = PostPath::default();

        extract_path(&descriptor(), &params, &mut path).unwrap();

        assert_eq!(path.user_id, 42);
        assert_eq!(
            path.post_id,
            Uuid::parse_str("6b245e15-5c88-438b-a170-d8f97460083a").unwrap()
        );
        assert_eq!(path.slug, "");
    }

    #[test]
    fn test_missing_param_keeps_value() {
        let mut path = PostPath {
            user_id: 9,
            ..PostPath::default()
        };

        extract_path(&descriptor(), &Params::new(), &mut path).unwrap();

        assert_eq!(path.user_id, 9);
        assert!(path.post_id.is_nil());
    }

    #[test]
    fn test_malformed_identifier() {
        let params: Params = [("userId", "1"), ("id", "bad-uuid")].into_iter().collect();
        let mut path = PostPath::default();

        let failure = extract_path(&descriptor(), &params, &mut path).unwrap_err();
        let err = ParseError::new(Channel::Path, failure);

        assert_eq!(err.channel(), Channel::Path);
        assert_eq!(err.tag(), "id");
        assert_eq!(err.source_text(), "bad-uuid");
        assert!(err.cause().downcast_ref::<uuid::Error>().is_some());
        // Fields decoded before the failure keep their values.
        assert_eq!(path.user_id, 1);
    }
}
