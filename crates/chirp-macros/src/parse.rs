//! Parsing for `#[derive(Decode)]` input.
//!
//! This module turns a `DeriveInput` into the field list the expansion
//! needs, rejecting inputs a descriptor cannot be built for.

use syn::{
    ext::IdentExt, punctuated::Punctuated, spanned::Spanned, Attribute, Data, DeriveInput, Expr,
    ExprLit, Fields, Ident, Lit, LitStr, Meta, Token,
};

/// Attribute namespace on fields.
const ATTR: &str = "chirp";

/// Separator introducing tag modifiers.
const TAG_SEPARATOR: char = ',';

/// Body tag excluding a field from body decoding.
const SKIP_MARKER: &str = "-";

/// Channel tags declared on one field.
#[derive(Debug, Default)]
pub struct FieldAttrs {
    /// `path = ".."`
    pub path: Option<LitStr>,
    /// `query = ".."`
    pub query: Option<LitStr>,
    /// `body = ".."`
    pub body: Option<LitStr>,
}

impl FieldAttrs {
    /// Collects the `#[chirp(..)]` attributes of a field.
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();

        for attr in attrs.iter().filter(|a| a.path().is_ident(ATTR)) {
            let metas = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
            for meta in metas {
                let Meta::NameValue(nv) = meta else {
                    return Err(syn::Error::new(meta.span(), "expected name = \"value\""));
                };
                let ident = nv
                    .path
                    .get_ident()
                    .ok_or_else(|| syn::Error::new(nv.path.span(), "expected identifier"))?
                    .to_string();
                let value = match &nv.value {
                    Expr::Lit(ExprLit {
                        lit: Lit::Str(s), ..
                    }) => s.clone(),
                    _ => {
                        return Err(syn::Error::new(
                            nv.value.span(),
                            "expected string literal",
                        ))
                    }
                };

                let slot = match ident.as_str() {
                    "path" => &mut parsed.path,
                    "query" => &mut parsed.query,
                    "body" => &mut parsed.body,
                    _ => {
                        return Err(syn::Error::new(
                            nv.path.span(),
                            format!("unknown attribute: {ident}"),
                        ))
                    }
                };
                if slot.is_some() {
                    return Err(syn::Error::new(
                        nv.path.span(),
                        format!("duplicate `{ident}` tag"),
                    ));
                }
                *slot = Some(value);
            }
        }

        Ok(parsed)
    }

    /// Whether the field is excluded from body decoding.
    pub fn skips_body(&self) -> bool {
        self.body
            .as_ref()
            .is_some_and(|tag| normalize(&tag.value()) == SKIP_MARKER)
    }

    /// Whether any channel decodes this field from a text token.
    pub fn needs_decode(&self) -> bool {
        let tagged = |tag: &Option<LitStr>| {
            tag.as_ref()
                .is_some_and(|lit| !normalize(&lit.value()).is_empty())
        };
        tagged(&self.path) || tagged(&self.query) || !self.skips_body()
    }

    /// Whether the structured body deserializes into this field.
    pub fn needs_merge(&self) -> bool {
        !self.skips_body()
    }
}

/// Strips modifiers and whitespace from a tag.
fn normalize(tag: &str) -> &str {
    tag.split(TAG_SEPARATOR).next().unwrap_or_default().trim()
}

/// One named field of the destination struct.
#[derive(Debug)]
pub struct DecodeField {
    /// Field identifier as written.
    pub ident: Ident,
    /// Declared name used for body matching and labels.
    pub name: String,
    /// Channel tags.
    pub attrs: FieldAttrs,
}

/// Parsed destination struct.
#[derive(Debug)]
pub struct DecodeStruct {
    /// The struct name.
    pub ident: Ident,
    /// Named fields in declaration order.
    pub fields: Vec<DecodeField>,
}

impl DecodeStruct {
    /// Parses a derive input, accepting only non-generic structs with named
    /// fields (or no fields).
    pub fn parse(input: DeriveInput) -> syn::Result<Self> {
        if !input.generics.params.is_empty() {
            return Err(syn::Error::new(
                input.generics.span(),
                "Decode cannot be derived for generic structs",
            ));
        }

        let data = match input.data {
            Data::Struct(data) => data,
            Data::Enum(e) => {
                return Err(syn::Error::new(
                    e.enum_token.span,
                    "Decode can only be derived for structs",
                ))
            }
            Data::Union(u) => {
                return Err(syn::Error::new(
                    u.union_token.span,
                    "Decode can only be derived for structs",
                ))
            }
        };

        let fields = match data.fields {
            Fields::Named(named) => named
                .named
                .into_iter()
                .map(|field| {
                    let attrs = FieldAttrs::from_attrs(&field.attrs)?;
                    let ident = field
                        .ident
                        .ok_or_else(|| syn::Error::new(field.ty.span(), "expected named field"))?;
                    Ok(DecodeField {
                        name: ident.unraw().to_string(),
                        ident,
                        attrs,
                    })
                })
                .collect::<syn::Result<Vec<_>>>()?,
            Fields::Unit => Vec::new(),
            Fields::Unnamed(unnamed) => {
                return Err(syn::Error::new(
                    unnamed.span(),
                    "Decode requires named fields",
                ))
            }
        };

        Ok(Self {
            ident: input.ident,
            fields,
        })
    }
}
