//! Procedural macros for the docmodel project.
//!
//! Provides `#[derive(FieldShape)]`, which lists a struct's stored field names and generates a
//! typed `Field` constant for each of them.

#[allow(unused_extern_crates)]
extern crate self as docmodel_macros;

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::{format_ident, quote};
use syn::{
    Attribute, Data, DeriveInput, Fields, LitStr, Token, ext::IdentExt, meta::ParseNestedMeta, parse_macro_input,
    spanned::Spanned,
};

/// Derives `docmodel::field::FieldShape` for a struct with named fields.
///
/// For every serialized field an associated constant is generated, named after the Rust field in
/// upper snake case and keyed by the field's stored name. `#[serde(rename = "...")]`,
/// `#[serde(rename_all = "...")]` and `#[serde(skip)]` are honored.
///
/// ```ignore
/// #[derive(Serialize, Deserialize, FieldShape)]
/// pub struct User {
///     pub name: String,
///     #[serde(rename = "lastSeen")]
///     pub last_seen: Option<DateTime<Utc>>,
/// }
///
/// // User::NAME: Field<User, String>
/// // User::LAST_SEEN: Field<User, Option<DateTime<Utc>>>, stored as "lastSeen"
/// ```
#[proc_macro_derive(FieldShape, attributes(serde))]
pub fn derive_field_shape(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "FieldShape can only be derived for structs with named fields",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "FieldShape can only be derived for structs with named fields",
        ));
    };

    let container = SerdeAttrs::parse(&input.attrs)?;

    let mut names = Vec::new();
    let mut consts = Vec::new();

    for field in &fields.named {
        let attrs = SerdeAttrs::parse(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        if attrs.flatten {
            return Err(syn::Error::new_spanned(
                field,
                "FieldShape does not support #[serde(flatten)]",
            ));
        }

        let Some(ident) = &field.ident else { continue };
        let rust_name = ident.unraw().to_string();
        let stored = match (&attrs.rename, &container.rename_all) {
            (Some(rename), _) => rename.clone(),
            (None, Some(rule)) => rule.apply(&rust_name),
            (None, None) => rust_name.clone(),
        };

        let const_ident = format_ident!("{}", rust_name.to_uppercase(), span = ident.span());
        let ty = &field.ty;
        let doc = format!(" Typed key for the stored field `{stored}`.");

        consts.push(quote! {
            #[doc = #doc]
            pub const #const_ident: ::docmodel::field::Field<Self, #ty> = ::docmodel::field::Field::new(#stored);
        });
        names.push(stored);
    }

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    // Generic shapes only implement the supertraits for some parameters, so bound on Self.
    let mut shape_generics = input.generics.clone();
    shape_generics.make_where_clause().predicates.push(syn::parse_quote! {
        #ident #ty_generics: ::docmodel::__private::serde::Serialize
            + ::docmodel::__private::serde::de::DeserializeOwned
            + ::core::marker::Send
            + ::core::marker::Sync
            + 'static
    });
    let shape_where = &shape_generics.where_clause;

    Ok(quote! {
        impl #impl_generics ::docmodel::field::FieldShape for #ident #ty_generics #shape_where {
            fn field_names() -> &'static [&'static str] {
                &[#(#names),*]
            }
        }

        #[allow(dead_code)]
        impl #impl_generics #ident #ty_generics #where_clause {
            #(#consts)*
        }
    })
}

#[derive(Default)]
struct SerdeAttrs {
    rename: Option<String>,
    rename_all: Option<RenameRule>,
    skip: bool,
    flatten: bool,
}

impl SerdeAttrs {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = SerdeAttrs::default();

        for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    if let Some(name) = serialized_name(&meta)? {
                        parsed.rename = Some(name);
                    }
                } else if meta.path.is_ident("rename_all") {
                    if let Some(rule) = serialized_name(&meta)? {
                        parsed.rename_all = Some(RenameRule::from_str(&rule, meta.path.span())?);
                    }
                } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                    parsed.skip = true;
                } else if meta.path.is_ident("flatten") {
                    parsed.flatten = true;
                } else {
                    skip_meta(&meta)?;
                }

                Ok(())
            })?;
        }

        Ok(parsed)
    }
}

/// Reads `name = "..."` or the `serialize` half of `name(serialize = "...", ...)`.
fn serialized_name(meta: &ParseNestedMeta) -> syn::Result<Option<String>> {
    if meta.input.peek(Token![=]) {
        return Ok(Some(meta.value()?.parse::<LitStr>()?.value()));
    }

    let mut name = None;
    meta.parse_nested_meta(|inner| {
        if inner.path.is_ident("serialize") {
            name = Some(inner.value()?.parse::<LitStr>()?.value());
        } else {
            skip_meta(&inner)?;
        }
        Ok(())
    })?;

    Ok(name)
}

fn skip_meta(meta: &ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<syn::Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| skip_meta(&inner))?;
    }

    Ok(())
}

#[derive(Clone, Copy)]
enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn from_str(rule: &str, span: Span) -> syn::Result<Self> {
        Ok(match rule {
            "lowercase" => RenameRule::Lower,
            "UPPERCASE" => RenameRule::Upper,
            "PascalCase" => RenameRule::Pascal,
            "camelCase" => RenameRule::Camel,
            "snake_case" => RenameRule::Snake,
            "SCREAMING_SNAKE_CASE" => RenameRule::ScreamingSnake,
            "kebab-case" => RenameRule::Kebab,
            "SCREAMING-KEBAB-CASE" => RenameRule::ScreamingKebab,
            other => return Err(syn::Error::new(span, format!("unknown rename rule `{other}`"))),
        })
    }

    /// Renames a snake_case field the way serde does.
    fn apply(self, field: &str) -> String {
        match self {
            RenameRule::Lower | RenameRule::Snake => field.to_string(),
            RenameRule::Upper | RenameRule::ScreamingSnake => field.to_ascii_uppercase(),
            RenameRule::Kebab => field.replace('_', "-"),
            RenameRule::ScreamingKebab => field.replace('_', "-").to_ascii_uppercase(),
            RenameRule::Pascal | RenameRule::Camel => {
                let mut out = String::with_capacity(field.len());
                let mut capitalize = matches!(self, RenameRule::Pascal);
                for c in field.chars() {
                    if c == '_' {
                        capitalize = true;
                    } else if capitalize {
                        out.push(c.to_ascii_uppercase());
                        capitalize = false;
                    } else {
                        out.push(c);
                    }
                }
                out
            }
        }
    }
}
