//! Derive macros for kumiki
//!
//! * `#[derive(Component)]` describes a record to the injector: field descriptors,
//!   zero construction and interface casts.
//! * `#[derive(DeepClone)]` implements the structural deep copy of a struct or enum.

extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote, ToTokens};
use syn::parse::ParseStream;
use syn::punctuated::Punctuated;
use syn::{
    parenthesized, parse_macro_input, parse_quote, Attribute, Data, DeriveInput, Fields, Ident,
    Index, LitStr, Meta, Token, Type, Visibility,
};

/// `#[derive(Component)]`: generates the `Reflect` and `Record` impls of a record.
///
/// The record must also implement `Default` (zero value) and `DeepClone`.
///
/// Attributes:
/// * `#[component(implements(dyn Trait, ...))]` on the struct declares the interfaces
///   the record can be injected as.
/// * `#[inject]`, `#[inject("name")]` or `#[inject(name = "name")]` on a field marks it
///   for injection. Names are string literals, raw strings included. The field type must be `Option<Arc<T>>` or `Option<Interface<dyn Trait>>`.
///
/// Example:
/// ```ignore
/// #[derive(Default, DeepClone, Component)]
/// #[component(implements(dyn Repository))]
/// pub struct SqlRepository {
///     #[inject("pool")]
///     pub pool: Option<Arc<Pool>>,
/// }
/// ```
#[proc_macro_derive(Component, attributes(component, inject))]
pub fn derive_component(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_component(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_component(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "generic components are not supported",
        ));
    }
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(input, "Only structs are supported"));
    };

    let interfaces = component_interfaces(&input.attrs)?;

    let mut fields = Vec::new();
    for (idx, field) in data.fields.iter().enumerate() {
        let (label, access, embedded) = match &field.ident {
            Some(ident) => (ident.to_string(), ident.to_token_stream(), false),
            None => {
                let index = Index::from(idx);
                (idx.to_string(), index.to_token_stream(), true)
            }
        };

        let marker = field
            .attrs
            .iter()
            .find(|a| a.path().is_ident("inject"))
            .map(marker_tokens);

        fields.push(match marker {
            None => quote! {
                ::kumiki::Field::plain(#label, #embedded)
            },
            Some(marker) => {
                let settable = !matches!(field.vis, Visibility::Inherited);
                quote! {
                    ::kumiki::Field::injected(#label, #embedded, #marker, #settable, &mut self.#access)
                }
            }
        });
    }

    let casts = interfaces.iter().map(|iface| {
        quote! {
            ::kumiki::Cast::new::<#name, #iface>(
                |this: ::std::sync::Arc<#name>| -> ::std::sync::Arc<#iface> { this }
            )
        }
    });

    Ok(quote! {
        impl ::kumiki::Reflect for #name {
            fn type_info() -> ::kumiki::TypeInfo {
                fn interfaces() -> ::std::vec::Vec<::kumiki::Cast> {
                    ::std::vec![#(#casts),*]
                }
                ::kumiki::TypeInfo::record::<#name>(interfaces)
            }
        }

        impl ::kumiki::Record for #name {
            fn describe(&self) -> ::kumiki::TypeInfo {
                <Self as ::kumiki::Reflect>::type_info()
            }

            fn fields(&mut self) -> ::std::vec::Vec<::kumiki::Field<'_>> {
                ::std::vec![#(#fields),*]
            }

            fn into_shared(self: ::std::boxed::Box<Self>) -> ::kumiki::SharedAny {
                let shared: ::std::sync::Arc<Self> = ::std::sync::Arc::from(self);
                shared
            }
        }
    })
}

/// Parse `#[component(implements(dyn A, dyn B))]`
fn component_interfaces(attrs: &[Attribute]) -> syn::Result<Vec<Type>> {
    let mut interfaces = Vec::new();
    for attr in attrs.iter().filter(|a| a.path().is_ident("component")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("implements") {
                let content;
                parenthesized!(content in meta.input);
                let types = Punctuated::<Type, Token![,]>::parse_terminated(&content)?;
                interfaces.extend(types);
                Ok(())
            } else {
                Err(meta.error("unsupported component attribute, expected `implements(...)`"))
            }
        })?;
    }
    Ok(interfaces)
}

/// Decode the arguments of an `#[inject]` attribute into a provider name (empty if unnamed)
fn marker_name(attr: &Attribute) -> syn::Result<String> {
    match &attr.meta {
        Meta::Path(_) => Ok(String::new()),
        Meta::List(_) => attr.parse_args_with(|input: ParseStream| {
            if input.peek(LitStr) {
                return Ok(input.parse::<LitStr>()?.value());
            }
            let key: Ident = input.parse()?;
            if key != "name" {
                return Err(syn::Error::new(
                    key.span(),
                    format!("unknown marker key `{}`, expected `name`", key),
                ));
            }
            input.parse::<Token![=]>()?;
            Ok(input.parse::<LitStr>()?.value())
        }),
        Meta::NameValue(nv) => {
            syn::parse2::<LitStr>(nv.value.to_token_stream()).map(|lit| lit.value())
        }
    }
}

/// `RawMarker` expression for a field attribute.
///
/// Undecodable arguments are not a compile error: they are reported when the field is resolved.
fn marker_tokens(attr: &Attribute) -> TokenStream2 {
    match marker_name(attr) {
        Ok(name) => quote!(::kumiki::marker::RawMarker::Name(#name)),
        Err(err) => {
            let tokens = match &attr.meta {
                Meta::Path(_) => String::new(),
                Meta::List(list) => list.tokens.to_string(),
                Meta::NameValue(nv) => nv.value.to_token_stream().to_string(),
            };
            let reason = err.to_string();
            quote!(::kumiki::marker::RawMarker::Rejected { tokens: #tokens, reason: #reason })
        }
    }
}

/// `#[derive(DeepClone)]`: copies every field (or variant payload) with `DeepClone`.
///
/// Type parameters get a `DeepClone` bound.
#[proc_macro_derive(DeepClone)]
pub fn derive_deep_clone(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_deep_clone(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_deep_clone(mut input: DeriveInput) -> syn::Result<TokenStream2> {
    for param in input.generics.type_params_mut() {
        param.bounds.push(parse_quote!(::kumiki::DeepClone));
    }
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Struct(data) => {
            let copy = copy_fields(&data.fields, |idx, ident| match ident {
                Some(ident) => quote!(&self.#ident),
                None => {
                    let index = Index::from(idx);
                    quote!(&self.#index)
                }
            });
            quote!(Self #copy)
        }
        Data::Enum(data) if data.variants.is_empty() => quote!(match *self {}),
        Data::Enum(data) => {
            let arms = data.variants.iter().map(|variant| {
                let vname = &variant.ident;
                let bindings = bindings(&variant.fields);
                let pattern = match &variant.fields {
                    Fields::Named(_) => quote!({ #(#bindings),* }),
                    Fields::Unnamed(_) => quote!(( #(#bindings),* )),
                    Fields::Unit => quote!(),
                };
                let copy = copy_fields(&variant.fields, |idx, _| {
                    let binding = &bindings[idx];
                    quote!(#binding)
                });
                quote!(Self::#vname #pattern => Self::#vname #copy)
            });
            quote! {
                match self {
                    #(#arms,)*
                }
            }
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                &input,
                "DeepClone cannot be derived for unions",
            ))
        }
    };

    Ok(quote! {
        impl #impl_generics ::kumiki::DeepClone for #name #ty_generics #where_clause {
            fn deep_clone(&self) -> Self {
                #body
            }
        }
    })
}

/// Pattern bindings of a variant: field names, or `f0`, `f1`, ... for positional fields
fn bindings(fields: &Fields) -> Vec<syn::Ident> {
    fields
        .iter()
        .enumerate()
        .map(|(idx, field)| match &field.ident {
            Some(ident) => ident.clone(),
            None => format_ident!("f{}", idx),
        })
        .collect()
}

/// Constructor arguments copying each field from the expression built by `source`
fn copy_fields(
    fields: &Fields,
    source: impl Fn(usize, Option<&syn::Ident>) -> TokenStream2,
) -> TokenStream2 {
    let copies = fields.iter().enumerate().map(|(idx, field)| {
        let value = source(idx, field.ident.as_ref());
        let copy = quote!(::kumiki::DeepClone::deep_clone(#value));
        match &field.ident {
            Some(ident) => quote!(#ident: #copy),
            None => copy,
        }
    });
    match fields {
        Fields::Named(_) => quote!({ #(#copies),* }),
        Fields::Unnamed(_) => quote!(( #(#copies),* )),
        Fields::Unit => quote!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_of(attr: Attribute) -> syn::Result<String> {
        marker_name(&attr)
    }

    #[test]
    fn marker_names_are_decoded_as_literals() {
        assert_eq!(name_of(parse_quote!(#[inject])).unwrap(), "");
        assert_eq!(name_of(parse_quote!(#[inject("db")])).unwrap(), "db");
        assert_eq!(name_of(parse_quote!(#[inject(name = "db")])).unwrap(), "db");
        assert_eq!(name_of(parse_quote!(#[inject = "db"])).unwrap(), "db");
        assert_eq!(name_of(parse_quote!(#[inject(r"db")])).unwrap(), "db");
        assert_eq!(name_of(parse_quote!(#[inject(r#"say "hi""#)])).unwrap(), "say \"hi\"");
        assert_eq!(name_of(parse_quote!(#[inject("tab\tname")])).unwrap(), "tab\tname");
    }

    #[test]
    fn malformed_markers_are_rejected() {
        let err = name_of(parse_quote!(#[inject(label = "db")])).unwrap_err();
        assert_eq!(err.to_string(), "unknown marker key `label`, expected `name`");
        assert!(name_of(parse_quote!(#[inject(name "db")])).is_err());
        assert!(name_of(parse_quote!(#[inject(name = db)])).is_err());
        assert!(name_of(parse_quote!(#[inject("db", extra)])).is_err());
    }

    #[test]
    fn rejected_markers_keep_their_tokens() {
        let tokens = marker_tokens(&parse_quote!(#[inject(label = "db")])).to_string();
        assert!(tokens.contains("Rejected"), "{}", tokens);
        assert!(tokens.contains("unknown marker key"), "{}", tokens);

        let tokens = marker_tokens(&parse_quote!(#[inject("db")])).to_string();
        assert!(tokens.contains("Name"), "{}", tokens);
    }
}
