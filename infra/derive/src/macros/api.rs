use fxhash::FxHashSet;
use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::Parser;
use syn::{Attribute, ItemFn, ItemStruct, Lit, LitStr, Meta};

/// Expands the `#[api_model]` attribute macro.
///
/// Automatically adds common derives (`Serialize`, `Deserialize`, `ToSchema`) and
/// configures Serde for camelCase and strict field checking.
pub fn expand_api_model(args: TokenStream, input: ItemStruct) -> TokenStream {
    let (rename_all, deny_unknown) = match parse_args(args) {
        Ok(parsed) => parsed,
        Err(err) => return err,
    };

    let derives = derived_trait_names(&input.attrs);
    let (existing_rename, existing_deny) = serde_policy(&input.attrs);

    let mut tokens = Vec::new();
    if !derives.contains("Debug") {
        tokens.push(quote! { Debug });
    }
    if !derives.contains("Serialize") {
        tokens.push(quote! { ::serde::Serialize });
    }
    if !derives.contains("Deserialize") {
        tokens.push(quote! { ::serde::Deserialize });
    }
    let derive_attr = if tokens.is_empty() { quote! {} } else { quote! { #[derive(#(#tokens),*)] } };

    let schema_attr = if derives.contains("ToSchema") {
        quote! {}
    } else {
        quote! { #[cfg_attr(feature = "server", derive(::utoipa::ToSchema))] }
    };

    let rename_attr = if existing_rename {
        quote! {}
    } else {
        let value =
            rename_all.unwrap_or_else(|| LitStr::new("camelCase", proc_macro2::Span::call_site()));
        quote! { #[serde(rename_all = #value)] }
    };

    let deny_attr = if existing_deny || !deny_unknown.unwrap_or(true) {
        quote! {}
    } else {
        quote! { #[serde(deny_unknown_fields)] }
    };

    quote! {
        #derive_attr
        #schema_attr
        #rename_attr
        #deny_attr
        #input
    }
}

/// Expands the `#[api_handler]` attribute macro.
///
/// Integrates with `utoipa::path` for `OpenAPI` documentation while maintaining
/// clean handler signatures.
pub fn expand_api_handler(args: TokenStream, input: ItemFn) -> TokenStream {
    let body = &input.block;
    let sig = &input.sig;
    let vis = &input.vis;
    let attrs = &input.attrs;

    quote! {
        #(#attrs)*
        #[allow(clippy::unused_async)]
        #[cfg_attr(feature = "server", ::utoipa::path(#args))]
        #vis #sig {
            #body
        }
    }
}

type ApiModelArgs = (Option<LitStr>, Option<bool>);

fn parse_args(args: TokenStream) -> Result<ApiModelArgs, TokenStream> {
    let parser = syn::punctuated::Punctuated::<Meta, syn::Token![,]>::parse_terminated;
    let metas = parser.parse2(args).map_err(|err| err.to_compile_error())?;

    let mut rename_all = None;
    let mut deny_unknown_fields = None;

    for meta in metas {
        let name_value = match meta {
            Meta::NameValue(name_value) => name_value,
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "Expected name-value arguments like `rename_all = \"...\"`",
                )
                .to_compile_error());
            },
        };

        if name_value.path.is_ident("rename_all") {
            match literal(&name_value) {
                Some(Lit::Str(lit)) => rename_all = Some(lit.clone()),
                _ => {
                    return Err(syn::Error::new_spanned(
                        &name_value.value,
                        "rename_all must be a string literal",
                    )
                    .to_compile_error());
                },
            }
        } else if name_value.path.is_ident("deny_unknown_fields") {
            match literal(&name_value) {
                Some(Lit::Bool(lit)) => deny_unknown_fields = Some(lit.value),
                _ => {
                    return Err(syn::Error::new_spanned(
                        &name_value.value,
                        "deny_unknown_fields must be a boolean literal",
                    )
                    .to_compile_error());
                },
            }
        } else {
            return Err(syn::Error::new_spanned(
                name_value.path,
                "Unsupported argument; expected rename_all or deny_unknown_fields",
            )
            .to_compile_error());
        }
    }

    Ok((rename_all, deny_unknown_fields))
}

fn literal(name_value: &syn::MetaNameValue) -> Option<&Lit> {
    match &name_value.value {
        syn::Expr::Lit(expr_lit) => Some(&expr_lit.lit),
        _ => None,
    }
}

/// Returns which serde policies are already present (`rename_all`, `deny_unknown_fields`).
fn serde_policy(attrs: &[Attribute]) -> (bool, bool) {
    let mut rename_all = false;
    let mut deny_unknown_fields = false;

    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                rename_all = true;
                let _ = meta.value().and_then(|v| v.parse::<LitStr>());
            } else if meta.path.is_ident("deny_unknown_fields") {
                deny_unknown_fields = true;
            }
            Ok(())
        });
    }

    (rename_all, deny_unknown_fields)
}

fn derived_trait_names(attrs: &[Attribute]) -> FxHashSet<String> {
    let mut traits = FxHashSet::default();

    for attr in attrs {
        if !attr.path().is_ident("derive") {
            continue;
        }
        let _ = attr.parse_nested_meta(|meta| {
            if let Some(ident) = meta.path.segments.last().map(|seg| seg.ident.to_string()) {
                traits.insert(ident);
            }
            Ok(())
        });
    }

    traits
}
