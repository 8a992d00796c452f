//! `#[derive(Decode)]` expansion.

use proc_macro2::TokenStream;
use quote::quote;
use syn::DeriveInput;

use crate::parse::{DecodeField, DecodeStruct};

/// Expands `#[derive(Decode)]`.
///
/// The generated impl builds the descriptor on first use and keeps the
/// outcome in a per-type `OnceLock`.
pub fn expand_derive(input: TokenStream) -> syn::Result<TokenStream> {
    let input: DeriveInput = syn::parse2(input)?;
    let parsed = DecodeStruct::parse(input)?;

    let ident = &parsed.ident;
    let type_name = ident.to_string();
    let fields = parsed.fields.iter().map(|field| field_descriptor(ident, field));

    Ok(quote! {
        #[automatically_derived]
        impl ::chirp::Decode for #ident {
            fn try_descriptor() -> ::core::result::Result<
                &'static ::chirp::StructDescriptor<Self>,
                ::chirp::DescriptorError,
            > {
                static DESCRIPTOR: ::chirp::__private::OnceLock<
                    ::core::result::Result<::chirp::StructDescriptor<#ident>, ::chirp::DescriptorError>,
                > = ::chirp::__private::OnceLock::new();

                DESCRIPTOR
                    .get_or_init(|| {
                        ::chirp::StructDescriptor::<#ident>::builder(#type_name)
                            #(.field(#fields))*
                            .build()
                    })
                    .as_ref()
                    .map_err(::core::clone::Clone::clone)
            }
        }
    })
}

/// Generates the `FieldDescriptor` expression for one field.
fn field_descriptor(owner: &syn::Ident, field: &DecodeField) -> TokenStream {
    let member = &field.ident;
    let name = &field.name;

    let tags = [
        (quote!(Path), &field.attrs.path),
        (quote!(Query), &field.attrs.query),
        (quote!(Body), &field.attrs.body),
    ]
    .into_iter()
    .filter_map(|(kind, tag)| {
        tag.as_ref()
            .map(|tag| quote!(.with_tag(::chirp::TagKind::#kind, #tag)))
    });

    let decode = field.attrs.needs_decode().then(|| {
        quote! {
            .with_decode(|dst, token| ::chirp::decode_token(token, &mut dst.#member))
        }
    });
    let merge = field.attrs.needs_merge().then(|| {
        quote! {
            .with_merge(|dst, value| ::chirp::merge_value(value, &mut dst.#member))
        }
    });

    quote! {
        ::chirp::FieldDescriptor::<#owner>::new(::chirp::FieldMeta::new(#name) #(#tags)*)
            #decode
            #merge
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(input: TokenStream) -> String {
        expand_derive(input)
            .unwrap_or_else(|e| panic!("expansion failed: {e}"))
            .to_string()
    }

    #[test]
    fn test_expand_tagged_struct() {
        let output = expand(quote! {
            struct Data {
                #[chirp(path = "id")]
                id: Uuid,
                #[chirp(query = "part")]
                part: String,
            }
        });

        assert!(output.contains("impl :: chirp :: Decode for Data"));
        assert!(output.contains("fn try_descriptor"));
        assert!(output.contains("OnceLock"));
        assert!(output.contains(":: chirp :: DescriptorError"));
        assert!(!output.contains("panic"));
        assert!(output.contains("TagKind :: Path , \"id\""));
        assert!(output.contains("TagKind :: Query , \"part\""));
        assert!(output.contains("dst . id"));
        assert!(output.contains("dst . part"));
    }

    #[test]
    fn test_skipped_field_has_no_capabilities() {
        let output = expand(quote! {
            struct Data {
                #[chirp(body = "-")]
                null: NotDecodable,
            }
        });

        assert!(!output.contains("with_decode"));
        assert!(!output.contains("with_merge"));
        assert!(output.contains("TagKind :: Body , \"-\""));
    }

    #[test]
    fn test_untagged_field_is_body_addressable() {
        let output = expand(quote! {
            struct Data {
                hero: String,
            }
        });

        assert!(output.contains("FieldMeta :: new (\"hero\")"));
        assert!(output.contains("with_decode"));
        assert!(output.contains("with_merge"));
    }

    #[test]
    fn test_expand_unit_struct() {
        let output = expand(quote! { struct Empty; });

        assert!(output.contains("builder (\"Empty\")"));
        assert!(!output.contains("FieldDescriptor"));
    }

    #[test]
    fn test_expand_rejects_enum() {
        let result = expand_derive(quote! {
            enum Data { A }
        });

        assert!(result.is_err());
    }

    #[test]
    fn test_expand_rejects_unknown_tag() {
        let result = expand_derive(quote! {
            struct Data {
                #[chirp(cookie = "session")]
                session: String,
            }
        });

        let err = result.unwrap_err();
        assert!(err.to_string().contains("unknown attribute"));
    }
}
