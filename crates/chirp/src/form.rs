//! Form body extraction.
//!
//! Form bodies are decoded field by field: every field is addressed by its
//! body tag or, when untagged, by its declared name. A body tag of `-`
//! excludes the field.

use crate::descriptor::{StructDescriptor, TagKind};
use crate::error::Failure;
use crate::query::Values;
use crate::resolve::SKIP_MARKER;
use bytes::Bytes;
use mime::Mime;
use std::convert::Infallible;

/// Populates body-addressable fields from a form body.
///
/// `multipart/form-data` bodies contribute their text parts; file parts are
/// ignored. Any other form kind is parsed as URL-encoded pairs.
pub(crate) fn extract_form<T>(
    descriptor: &StructDescriptor<T>,
    content_type: &Mime,
    body: Bytes,
    dst: &mut T,
) -> Result<(), Failure> {
    let values = if content_type.essence_str() == mime::MULTIPART_FORM_DATA.essence_str() {
        parse_multipart(content_type, body)?
    } else {
        Values::parse_bytes(&body)
    };

    for (key, field) in descriptor.resolved(TagKind::Body) {
        if key == SKIP_MARKER {
            continue;
        }
        let token = values.first(key).unwrap_or_default();
        tracing::trace!(kind = %TagKind::Body, key, field = field.meta().name(), "decoding form field");
        field
            .decode(dst, token)
            .map_err(|e| Failure::field(*field.meta(), token, e.into_cause()))?;
    }
    Ok(())
}

/// Collects the named text parts of a multipart body.
fn parse_multipart(content_type: &Mime, body: Bytes) -> Result<Values, Failure> {
    let whole_body = |body: &Bytes| String::from_utf8_lossy(body).into_owned();

    let boundary = multer::parse_boundary(content_type.as_ref())
        .map_err(|e| Failure::structure(whole_body(&body), e))?;
    let source = whole_body(&body);
    let stream = futures_util::stream::once(async move { Ok::<_, Infallible>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    futures_executor::block_on(async move {
        let mut values = Values::default();
        while let Some(part) = multipart
            .next_field()
            .await
            .map_err(|e| Failure::structure(source.clone(), e))?
        {
            let Some(name) = part.name().map(str::to_owned) else {
                continue;
            };
            if part.file_name().is_some() {
                continue;
            }
            let text = part
                .text()
                .await
                .map_err(|e| Failure::structure(source.clone(), e))?;
            values.push(name, text);
        }
        Ok::<_, Failure>(values)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode_token, merge_value, Channel, FieldDescriptor, FieldMeta, ParseError};

    #[derive(Debug, Default)]
    struct Signup {
        name: String,
        priority: u8,
        null: String,
        hero: String,
    }

    fn descriptor() -> StructDescriptor<Signup> {
        StructDescriptor::builder("Signup")
            .field(
                FieldDescriptor::<Signup>::new(
                    FieldMeta::new("name").with_tag(TagKind::Body, "name"),
                )
                .with_decode(|dst, token| decode_token(token, &mut dst.name))
                .with_merge(|dst, value| merge_value(value, &mut dst.name)),
            )
            .field(
                FieldDescriptor::<Signup>::new(
                    FieldMeta::new("priority").with_tag(TagKind::Body, "priority"),
                )
                .with_decode(|dst, token| decode_token(token, &mut dst.priority))
                .with_merge(|dst, value| merge_value(value, &mut dst.priority)),
            )
            .field(FieldDescriptor::<Signup>::new(
                FieldMeta::new("null").with_tag(TagKind::Body, "-"),
            ))
            .field(
                FieldDescriptor::<Signup>::new(FieldMeta::new("Hero"))
                    .with_decode(|dst, token| decode_token(token, &mut dst.hero))
                    .with_merge(|dst, value| merge_value(value, &mut dst.hero)),
            )
            .build()
            .unwrap()
    }

    fn urlencoded() -> Mime {
        mime::APPLICATION_WWW_FORM_URLENCODED
    }

    #[test]
    fn test_urlencoded_form() {
        let mut signup = Signup::default();
        let body = Bytes::from_static(b"name=John&priority=5&Hero=Joker&null=x&-=y");

        extract_form(&descriptor(), &urlencoded(), body, &mut signup).unwrap();

        assert_eq!(signup.name, "John");
        assert_eq!(signup.priority, 5);
        assert_eq!(signup.hero, "Joker");
        assert_eq!(signup.null, "");
    }

    #[test]
    fn test_missing_form_values_keep_fields() {
        let mut signup = Signup {
            priority: 2,
            ..Signup::default()
        };

        extract_form(&descriptor(), &urlencoded(), Bytes::new(), &mut signup).unwrap();

        assert_eq!(signup.priority, 2);
    }

    #[test]
    fn test_non_utf8_form_body_is_lossy() {
        let mut signup = Signup::default();
        let body = Bytes::from_static(b"name=J%FFohn&priority=4&\xfe=x");

        extract_form(&descriptor(), &urlencoded(), body, &mut signup).unwrap();

        assert_eq!(signup.name, "J\u{fffd}ohn");
        assert_eq!(signup.priority, 4);
    }

    #[test]
    fn test_invalid_form_value() {
        let mut signup = Signup::default();
        let body = Bytes::from_static(b"name=John&priority=urgent");

        let failure = extract_form(&descriptor(), &urlencoded(), body, &mut signup).unwrap_err();
        let err = ParseError::new(Channel::Body, failure);

        assert_eq!(err.tag(), "priority");
        assert_eq!(err.source_text(), "urgent");
        assert_eq!(signup.name, "John");
    }

    #[test]
    fn test_untagged_field_label_is_field_name() {
        #[derive(Default)]
        struct Counter {
            count: u32,
        }
        let descriptor = StructDescriptor::builder("Counter")
            .field(
                FieldDescriptor::<Counter>::new(FieldMeta::new("Count"))
                    .with_decode(|dst, token| decode_token(token, &mut dst.count))
                    .with_merge(|dst, value| merge_value(value, &mut dst.count)),
            )
            .build()
            .unwrap();
        let mut counter = Counter::default();

        let failure = extract_form(
            &descriptor,
            &urlencoded(),
            Bytes::from_static(b"Count=many"),
            &mut counter,
        )
        .unwrap_err();
        let err = ParseError::new(Channel::Body, failure);

        assert_eq!(err.tag(), "Count");
        assert_eq!(counter.count, 0);
    }

    #[test]
    fn test_multipart_form() {
        let body = concat!(
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"name\"\r\n",
            "\r\n",
            "John\r\n",
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"priority\"\r\n",
            "\r\n",
            "7\r\n",
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"Hero\"; filename=\"hero.txt\"\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "file contents\r\n",
            "--XBOUNDARY--\r\n",
        );
        let content_type: Mime = "multipart/form-data; boundary=XBOUNDARY".parse().unwrap();
        let mut signup = Signup::default();

        extract_form(&descriptor(), &content_type, Bytes::from_static(body.as_bytes()), &mut signup)
            .unwrap();

        assert_eq!(signup.name, "John");
        assert_eq!(signup.priority, 7);
        assert_eq!(signup.hero, "");
    }

    #[test]
    fn test_multipart_without_boundary() {
        let content_type: Mime = "multipart/form-data".parse().unwrap();
        let mut signup = Signup::default();

        let failure =
            extract_form(&descriptor(), &content_type, Bytes::from_static(b"x"), &mut signup)
                .unwrap_err();
        let err = ParseError::new(Channel::Body, failure);

        assert_eq!(err.tag(), "*");
        assert_eq!(err.source_text(), "x");
    }
}
