//! Static inspection of candidate source files.
//!
//! Parses a file into a syntax tree (no statement is ever executed) and
//! extracts capability tags and flag declarations from compile-time literals
//! only. Anything that is not a literal is rejected and the class is skipped
//! softly; only I/O and syntax failures surface as errors.

use std::fs;
use std::path::Path;
use syn::punctuated::Punctuated;
use syn::{Attribute, Block, Expr, Item, ItemImpl, ItemStruct, Lit, Meta, Stmt, Token, Type};

use crate::descriptor::{ActionTag, CapabilityTag, Descriptor, MiddlewareTag, PluginTag};
use crate::error::{FlexiError, FlexiResult};
use crate::grammar::{ArgMode, ArgSpec};

/// Method name recognized as the "declare extra flags" hook.
const ARGUMENTS_METHOD: &str = "set_optional_arguments";

/// Inspect a source file and return the descriptors of every tagged type.
pub fn inspect_file(path: &Path) -> FlexiResult<Vec<Descriptor>> {
    let source = fs::read_to_string(path)?;
    inspect(&source, path)
}

/// Inspect in-memory source. Mostly useful for tests.
pub fn inspect_source(source: &str) -> FlexiResult<Vec<Descriptor>> {
    inspect(source, Path::new("<memory>"))
}

fn inspect(source: &str, origin: &Path) -> FlexiResult<Vec<Descriptor>> {
    let file = syn::parse_file(source).map_err(|e| FlexiError::Inspection {
        path: origin.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut structs: Vec<&ItemStruct> = Vec::new();
    let mut impls: Vec<&ItemImpl> = Vec::new();
    collect_items(&file.items, &mut structs, &mut impls);

    let mut descriptors = Vec::new();
    for item in structs {
        let Some(tag) = capability_tag(&item.attrs) else {
            continue;
        };
        let type_name = item.ident.to_string();
        let mut declares_arguments = false;
        let mut arguments = Vec::new();
        for imp in impls.iter().filter(|i| impl_targets(i, &type_name)) {
            for impl_item in &imp.items {
                if let syn::ImplItem::Fn(method) = impl_item {
                    if method.sig.ident == ARGUMENTS_METHOD {
                        declares_arguments = true;
                        arguments.extend(extract_arguments(&method.block));
                    }
                }
            }
        }
        descriptors.push(Descriptor {
            type_name,
            tag,
            declares_arguments,
            arguments,
        });
    }
    Ok(descriptors)
}

fn collect_items<'a>(
    items: &'a [Item],
    structs: &mut Vec<&'a ItemStruct>,
    impls: &mut Vec<&'a ItemImpl>,
) {
    for item in items {
        match item {
            Item::Struct(s) => structs.push(s),
            Item::Impl(i) => impls.push(i),
            Item::Mod(m) => {
                if let Some((_, nested)) = &m.content {
                    collect_items(nested, structs, impls);
                }
            }
            _ => {}
        }
    }
}

fn impl_targets(imp: &ItemImpl, type_name: &str) -> bool {
    if let Type::Path(type_path) = &*imp.self_ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == type_name;
        }
    }
    false
}

/// One metadata field of a tag attribute: positional or named, with `None`
/// admitted as an explicit null.
enum TagField {
    Positional(Option<String>),
    Named(String, Option<String>),
}

/// Recognize a capability tag among a type's attributes.
///
/// Two forms are accepted: dedicated attributes carrying the fields
/// positionally or named (`#[flexi_action(None, "desc")]`), and the map form
/// `#[flexi(kind = "action", description = "desc")]`. Malformed or
/// non-literal metadata rejects the tag (soft skip).
fn capability_tag(attrs: &[Attribute]) -> Option<CapabilityTag> {
    for attr in attrs {
        let Some(ident) = attr.path().get_ident() else {
            continue;
        };
        let ident = ident.to_string();
        let recognized = matches!(
            ident.as_str(),
            "flexi_action" | "flexi_plugin" | "flexi_middleware" | "flexi"
        );
        if !recognized {
            continue;
        }
        let Meta::List(_) = &attr.meta else {
            return None;
        };
        let fields = parse_tag_fields(attr)?;
        return match ident.as_str() {
            "flexi_action" => action_tag(&fields),
            "flexi_plugin" => plugin_tag(&fields),
            "flexi_middleware" => middleware_tag(&fields),
            "flexi" => map_tag(&fields),
            _ => None,
        };
    }
    None
}

fn parse_tag_fields(attr: &Attribute) -> Option<Vec<TagField>> {
    let exprs = attr
        .parse_args_with(Punctuated::<Expr, Token![,]>::parse_terminated)
        .ok()?;
    let mut fields = Vec::new();
    for expr in exprs {
        match expr {
            Expr::Assign(assign) => {
                let Expr::Path(key) = *assign.left else {
                    return None;
                };
                let key = key.path.get_ident()?.to_string();
                fields.push(TagField::Named(key, literal_or_none(&assign.right)?));
            }
            other => fields.push(TagField::Positional(literal_or_none(&other)?)),
        }
    }
    Some(fields)
}

/// Literal string → `Some(Some(value))`, the path `None` → `Some(None)`,
/// anything else (an expression the inspector will not evaluate) → `None`.
fn literal_or_none(expr: &Expr) -> Option<Option<String>> {
    match expr {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Str(s) => Some(Some(s.value())),
            _ => None,
        },
        Expr::Path(path) if path.path.is_ident("None") => Some(None),
        _ => None,
    }
}

fn named<'a>(fields: &'a [TagField], key: &str) -> Option<&'a Option<String>> {
    fields.iter().find_map(|f| match f {
        TagField::Named(k, v) if k == key => Some(v),
        _ => None,
    })
}

fn positional(fields: &[TagField]) -> Option<Vec<&Option<String>>> {
    let mut out = Vec::new();
    for field in fields {
        match field {
            TagField::Positional(v) => out.push(v),
            TagField::Named(..) => return None,
        }
    }
    Some(out)
}

fn action_tag(fields: &[TagField]) -> Option<CapabilityTag> {
    let (as_optional, description) = if let Some(pos) = positional(fields) {
        if pos.len() != 2 {
            return None;
        }
        (pos[0].clone(), pos[1].clone()?)
    } else {
        let as_optional = named(fields, "as_optional").cloned().unwrap_or(None);
        (as_optional, named(fields, "description")?.clone()?)
    };
    Some(CapabilityTag::Action(ActionTag {
        as_optional,
        description,
    }))
}

fn plugin_tag(fields: &[TagField]) -> Option<CapabilityTag> {
    let (name, version, description) = if let Some(pos) = positional(fields) {
        if pos.len() != 3 {
            return None;
        }
        (pos[0].clone()?, pos[1].clone()?, pos[2].clone()?)
    } else {
        (
            named(fields, "name")?.clone()?,
            named(fields, "version")?.clone()?,
            named(fields, "description")?.clone()?,
        )
    };
    Some(CapabilityTag::Plugin(PluginTag {
        name,
        version,
        description,
    }))
}

fn middleware_tag(fields: &[TagField]) -> Option<CapabilityTag> {
    let description = if let Some(pos) = positional(fields) {
        if pos.len() != 1 {
            return None;
        }
        pos[0].clone()?
    } else {
        named(fields, "description")?.clone()?
    };
    Some(CapabilityTag::Middleware(MiddlewareTag { description }))
}

/// The map form carries the capability kind as a `kind` field and the
/// remaining fields under the same names as the dedicated attributes.
fn map_tag(fields: &[TagField]) -> Option<CapabilityTag> {
    match named(fields, "kind")?.as_deref()? {
        "action" => Some(CapabilityTag::Action(ActionTag {
            as_optional: named(fields, "as_optional").cloned().unwrap_or(None),
            description: named(fields, "description")?.clone()?,
        })),
        "plugin" => plugin_tag(fields),
        "middleware" => middleware_tag(fields),
        _ => None,
    }
}

/// Statically extract flag registrations from the body of the
/// `set_optional_arguments` method. Statements that are not a literal-only
/// `parser.add_argument(&[...])` chain are skipped.
fn extract_arguments(block: &Block) -> Vec<ArgSpec> {
    let mut specs = Vec::new();
    for stmt in &block.stmts {
        let expr = match stmt {
            Stmt::Expr(expr, _) => expr,
            _ => continue,
        };
        if let Some(spec) = argument_from_chain(expr) {
            specs.push(spec);
        }
    }
    specs
}

fn argument_from_chain(expr: &Expr) -> Option<ArgSpec> {
    // Unroll the method-call chain down to its receiver.
    let mut calls = Vec::new();
    let mut current = expr;
    while let Expr::MethodCall(call) = current {
        calls.push(call);
        current = &call.receiver;
    }
    // The base receiver must be a plain path (the parser parameter).
    if !matches!(current, Expr::Path(_)) {
        return None;
    }
    let base = calls.pop()?;
    if base.method != "add_argument" {
        return None;
    }
    let flags = flag_literals(base.args.first()?)?;
    let mut spec = ArgSpec::new(flags);

    for call in calls.into_iter().rev() {
        match call.method.to_string().as_str() {
            "action" => {
                let mode = string_literal(call.args.first()?)?;
                spec.mode = ArgMode::parse(&mode)?;
            }
            "help" => {
                spec.help = Some(string_literal(call.args.first()?)?);
            }
            "nargs" => {
                spec.nargs = Some(int_literal(call.args.first()?)?);
            }
            "value_type" => {
                spec.value_type(&string_literal(call.args.first()?)?);
            }
            // An unrecognized call makes the chain non-declarative.
            _ => return None,
        }
    }
    Some(spec)
}

fn flag_literals(expr: &Expr) -> Option<Vec<String>> {
    let array = match expr {
        Expr::Reference(reference) => match &*reference.expr {
            Expr::Array(array) => array,
            _ => return None,
        },
        Expr::Array(array) => array,
        _ => return None,
    };
    let mut flags = Vec::new();
    for element in &array.elems {
        flags.push(string_literal(element)?);
    }
    if flags.is_empty() {
        return None;
    }
    Some(flags)
}

fn string_literal(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Str(s) => Some(s.value()),
            _ => None,
        },
        _ => None,
    }
}

fn int_literal(expr: &Expr) -> Option<usize> {
    match expr {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Int(i) => i.base10_parse().ok(),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::CapabilityKind;
    use crate::grammar::ValueType;

    #[test]
    fn action_tag_positional_form() {
        let source = r#"
            #[flexi_action("store_true", "Display the application version")]
            pub struct VersionAction;
        "#;
        let descriptors = inspect_source(source).unwrap();
        assert_eq!(descriptors.len(), 1);
        let CapabilityTag::Action(tag) = &descriptors[0].tag else {
            panic!("expected action tag");
        };
        assert_eq!(tag.as_optional.as_deref(), Some("store_true"));
        assert_eq!(tag.description, "Display the application version");
        assert!(!descriptors[0].declares_arguments);
    }

    #[test]
    fn action_tag_null_as_optional() {
        let source = r#"
            #[flexi_action(None, "Shuffle a given string")]
            pub struct ShuffleAction;
        "#;
        let descriptors = inspect_source(source).unwrap();
        let CapabilityTag::Action(tag) = &descriptors[0].tag else {
            panic!("expected action tag");
        };
        assert_eq!(tag.as_optional, None);
    }

    #[test]
    fn plugin_tag_named_form() {
        let source = r#"
            #[flexi_plugin(name = "dummy-generator", version = "0.2", description = "Dummy data")]
            pub struct DummyGenerator;
        "#;
        let descriptors = inspect_source(source).unwrap();
        let CapabilityTag::Plugin(tag) = &descriptors[0].tag else {
            panic!("expected plugin tag");
        };
        assert_eq!(tag.name, "dummy-generator");
        assert_eq!(tag.version, "0.2");
    }

    #[test]
    fn map_form_is_equivalent() {
        let source = r#"
            #[flexi(kind = "middleware", description = "Terminal output")]
            pub struct Terminal;
        "#;
        let descriptors = inspect_source(source).unwrap();
        assert_eq!(descriptors[0].tag.kind(), CapabilityKind::Middleware);
        assert_eq!(descriptors[0].tag.description(), "Terminal output");
    }

    #[test]
    fn non_literal_metadata_rejects_the_class() {
        let source = r#"
            #[flexi_plugin(NAME, "0.1", "not a literal name")]
            pub struct Bad;
        "#;
        assert!(inspect_source(source).unwrap().is_empty());
    }

    #[test]
    fn untagged_types_are_ignored() {
        let source = "pub struct Plain { pub field: u32 }";
        assert!(inspect_source(source).unwrap().is_empty());
    }

    #[test]
    fn extracts_declared_flags() {
        let source = r#"
            #[flexi_action(None, "Generate a random string")]
            pub struct RandomString;

            impl flexistack::FlexiAction for RandomString {
                fn set_optional_arguments(&self, parser: &mut ArgBuilder) {
                    parser
                        .add_argument(&["-l", "--length"])
                        .action("store")
                        .help("Requested string length")
                        .nargs(1)
                        .value_type("int");
                }

                fn init(&mut self, ctx: &RunContext<'_>) -> bool {
                    true
                }

                fn run(&mut self, ctx: &RunContext<'_>) -> bool {
                    true
                }
            }
        "#;
        let descriptors = inspect_source(source).unwrap();
        assert!(descriptors[0].declares_arguments);
        let args = &descriptors[0].arguments;
        assert_eq!(args.len(), 1);
        assert_eq!(args[0].flags, vec!["-l".to_string(), "--length".to_string()]);
        assert_eq!(args[0].mode, ArgMode::Store);
        assert_eq!(args[0].help.as_deref(), Some("Requested string length"));
        assert_eq!(args[0].nargs, Some(1));
        assert_eq!(args[0].value_type, Some(ValueType::Int));
    }

    #[test]
    fn non_literal_flag_arguments_are_skipped() {
        let source = r#"
            #[flexi_action(None, "Example")]
            pub struct Example;

            impl Example {
                fn set_optional_arguments(&self, parser: &mut ArgBuilder) {
                    parser.add_argument(&["-d", "--data"]).help(dynamic_help());
                    parser.add_argument(&["-k", "--keep"]).action("store_true");
                }
            }
        "#;
        let descriptors = inspect_source(source).unwrap();
        // The method exists, so the leaf still qualifies for registration.
        assert!(descriptors[0].declares_arguments);
        let args = &descriptors[0].arguments;
        assert_eq!(args.len(), 1);
        assert_eq!(args[0].dest(), "keep");
    }

    #[test]
    fn syntax_errors_surface() {
        assert!(inspect_source("struct {{{{").is_err());
    }
}
