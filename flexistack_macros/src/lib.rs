//! Capability tag attributes.
//!
//! The attributes carry no code generation: discovery reads them straight out
//! of the source file. Their job at compile time is validation, so a typo in
//! a tag fails the build of the tagged crate instead of silently dropping the
//! capability from discovery.

use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, Expr, Item, Lit, Token};

/// Tags a type as a command action.
///
/// `#[flexi_action(None, "description")]` registers a positional subcommand;
/// `#[flexi_action("store_true", "description")]` registers a top-level flag.
/// Named form: `#[flexi_action(as_optional = "store_true", description = "...")]`.
#[proc_macro_attribute]
pub fn flexi_action(attr: TokenStream, item: TokenStream) -> TokenStream {
    validate(attr, item, Tag::Action)
}

/// Tags a type as a versioned plugin:
/// `#[flexi_plugin("name", "0.1", "description")]` or the equivalent
/// `name = ... , version = ... , description = ...` form.
#[proc_macro_attribute]
pub fn flexi_plugin(attr: TokenStream, item: TokenStream) -> TokenStream {
    validate(attr, item, Tag::Plugin)
}

/// Tags a type as middleware: `#[flexi_middleware("description")]`.
#[proc_macro_attribute]
pub fn flexi_middleware(attr: TokenStream, item: TokenStream) -> TokenStream {
    validate(attr, item, Tag::Middleware)
}

/// Map form of the capability tags:
/// `#[flexi(kind = "action", description = "...")]`.
#[proc_macro_attribute]
pub fn flexi(attr: TokenStream, item: TokenStream) -> TokenStream {
    validate(attr, item, Tag::Map)
}

#[derive(Clone, Copy)]
enum Tag {
    Action,
    Plugin,
    Middleware,
    Map,
}

impl Tag {
    fn positional_arity(self) -> usize {
        match self {
            Tag::Action => 2,
            Tag::Plugin => 3,
            Tag::Middleware => 1,
            Tag::Map => 0,
        }
    }

    fn known_keys(self) -> &'static [&'static str] {
        match self {
            Tag::Action => &["as_optional", "description"],
            Tag::Plugin => &["name", "version", "description"],
            Tag::Middleware => &["description"],
            Tag::Map => &["kind", "as_optional", "description", "name", "version"],
        }
    }
}

fn validate(attr: TokenStream, item: TokenStream, tag: Tag) -> TokenStream {
    let item = parse_macro_input!(item as Item);
    let args = parse_macro_input!(attr with Punctuated::<Expr, Token![,]>::parse_terminated);

    if let Err(message) = check(&args, tag) {
        let error = syn::Error::new_spanned(&args, message).to_compile_error();
        return quote! { #error #item }.into();
    }
    quote! { #item }.into()
}

fn check(args: &Punctuated<Expr, Token![,]>, tag: Tag) -> Result<(), String> {
    let mut positional = 0usize;
    let mut named = Vec::new();
    for arg in args {
        match arg {
            Expr::Assign(assign) => {
                let Expr::Path(key) = &*assign.left else {
                    return Err("tag field names must be plain identifiers".to_string());
                };
                let Some(ident) = key.path.get_ident() else {
                    return Err("tag field names must be plain identifiers".to_string());
                };
                let ident = ident.to_string();
                if !tag.known_keys().contains(&ident.as_str()) {
                    return Err(format!("unknown tag field `{ident}`"));
                }
                literal_or_none(&assign.right)?;
                named.push(ident);
            }
            other => {
                literal_or_none(other)?;
                positional += 1;
            }
        }
    }
    if positional > 0 && !named.is_empty() {
        return Err("mix of positional and named tag fields".to_string());
    }
    if positional > 0 && positional != tag.positional_arity() {
        return Err(format!(
            "expected {} positional tag fields, found {positional}",
            tag.positional_arity()
        ));
    }
    if positional == 0 {
        let required: &[&str] = match tag {
            Tag::Action | Tag::Middleware => &["description"],
            Tag::Plugin => &["name", "version", "description"],
            Tag::Map => &["kind", "description"],
        };
        for key in required {
            if !named.iter().any(|n| n == key) {
                return Err(format!("missing tag field `{key}`"));
            }
        }
    } else if matches!(tag, Tag::Map) {
        return Err("the flexi tag takes named fields only".to_string());
    }
    Ok(())
}

fn literal_or_none(expr: &Expr) -> Result<(), String> {
    match expr {
        Expr::Lit(lit) if matches!(lit.lit, Lit::Str(_)) => Ok(()),
        Expr::Path(path) if path.path.is_ident("None") => Ok(()),
        _ => Err("tag fields must be string literals or None".to_string()),
    }
}
