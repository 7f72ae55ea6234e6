//! Grammar engine wrapper.
//!
//! Discovery builds a lightweight parser tree ([`ParserNode`]) while walking
//! the action directories; the tree is converted to a `clap` command at parse
//! time and the matches are flattened into the flat key/value shape the
//! dispatcher consumes (`action`, `<level>_action`, plus one entry per flag
//! along the selected path). The framework never depends on `clap` internals
//! beyond this module.

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::collections::BTreeMap;

use crate::error::{FlexiError, FlexiResult};

/// Semantic action mode of a flag, mirroring the classic argparse modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgMode {
    Store,
    StoreTrue,
    StoreFalse,
    Append,
}

impl ArgMode {
    /// Parse a store-mode spelling. Unknown spellings yield `None`.
    pub fn parse(mode: &str) -> Option<Self> {
        match mode {
            "store" => Some(ArgMode::Store),
            "store_true" => Some(ArgMode::StoreTrue),
            "store_false" => Some(ArgMode::StoreFalse),
            "append" => Some(ArgMode::Append),
            _ => None,
        }
    }

    pub fn is_flag(&self) -> bool {
        matches!(self, ArgMode::StoreTrue | ArgMode::StoreFalse)
    }
}

/// Declared value type of a flag. Values stay strings in the flat parse
/// result, but `Int`/`Float` declarations are validated at parse time, so a
/// non-numeric value fails the parse instead of reaching the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Str,
    Int,
    Float,
}

impl ValueType {
    pub fn parse(ty: &str) -> Option<Self> {
        match ty {
            "str" => Some(ValueType::Str),
            "int" => Some(ValueType::Int),
            "float" => Some(ValueType::Float),
            _ => None,
        }
    }
}

/// A single flag registration: spellings, store mode and presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSpec {
    pub flags: Vec<String>,
    pub mode: ArgMode,
    pub help: Option<String>,
    pub nargs: Option<usize>,
    pub value_type: Option<ValueType>,
}

impl ArgSpec {
    pub fn new<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ArgSpec {
            flags: flags.into_iter().map(Into::into).collect(),
            mode: ArgMode::Store,
            help: None,
            nargs: None,
            value_type: None,
        }
    }

    /// Set the store mode from its spelling; unknown spellings are ignored.
    pub fn action(&mut self, mode: &str) -> &mut Self {
        if let Some(mode) = ArgMode::parse(mode) {
            self.mode = mode;
        }
        self
    }

    pub fn help(&mut self, text: &str) -> &mut Self {
        self.help = Some(text.to_string());
        self
    }

    pub fn nargs(&mut self, n: usize) -> &mut Self {
        self.nargs = Some(n);
        self
    }

    pub fn value_type(&mut self, ty: &str) -> &mut Self {
        self.value_type = ValueType::parse(ty);
        self
    }

    /// Destination key in the flat parse result: the long spelling without
    /// its dashes, falling back to the first spelling. Hyphens are kept so
    /// optional-action destinations match their registry keys.
    pub fn dest(&self) -> String {
        self.flags
            .iter()
            .find_map(|f| f.strip_prefix("--"))
            .or_else(|| self.flags.first().map(|f| f.trim_start_matches('-')))
            .unwrap_or_default()
            .to_string()
    }
}

/// Runtime receiver for `set_optional_arguments`.
///
/// The framework itself registers flags from statically extracted specs and
/// never invokes the method, but discovered action types still compile and
/// can be driven manually (e.g. in tests).
#[derive(Debug, Default)]
pub struct ArgBuilder {
    args: Vec<ArgSpec>,
}

impl ArgBuilder {
    pub fn new() -> Self {
        ArgBuilder::default()
    }

    pub fn add_argument(&mut self, flags: &[&str]) -> &mut ArgSpec {
        let idx = self.args.len();
        self.args.push(ArgSpec::new(flags.iter().copied()));
        &mut self.args[idx]
    }

    pub fn args(&self) -> &[ArgSpec] {
        &self.args
    }
}

/// One node of the parser tree: either the root parser, a grouping
/// subcommand (carries a `dest` for its nested subparsers) or a leaf command.
#[derive(Debug, Clone)]
pub struct ParserNode {
    name: String,
    help: String,
    dest: Option<String>,
    args: Vec<ArgSpec>,
    children: Vec<ParserNode>,
}

impl ParserNode {
    pub(crate) fn new(name: &str, help: &str) -> Self {
        ParserNode {
            name: name.to_string(),
            help: help.to_string(),
            dest: None,
            args: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn dest(&self) -> Option<&str> {
        self.dest.as_deref()
    }

    pub fn args(&self) -> &[ArgSpec] {
        &self.args
    }

    pub fn children(&self) -> &[ParserNode] {
        &self.children
    }

    pub fn find(&self, name: &str) -> Option<&ParserNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Register a flag on this parser node.
    pub fn add_argument(&mut self, spec: ArgSpec) {
        self.args.push(spec);
    }

    /// Add a subcommand parser under this node and return it.
    pub fn add_parser(&mut self, name: &str, help: &str) -> &mut ParserNode {
        let idx = self.children.len();
        self.children.push(ParserNode::new(name, help));
        &mut self.children[idx]
    }

    /// Declare that this node owns a nested subparser collection scoped
    /// under `dest` in the flat parse result.
    pub fn add_subparsers(&mut self, dest: &str) {
        self.dest = Some(dest.to_string());
    }
}

/// A single value in the flat parse result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    /// store_true / store_false flags.
    Flag(bool),
    /// store flags: `None` when the flag was not given.
    Single(Option<String>),
    /// append or multi-value flags.
    Many(Vec<String>),
    /// Subcommand selection for a subparser dest: `None` when that level
    /// chose no child.
    Choice(Option<String>),
}

/// Flat key/value view of one parsed invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    values: BTreeMap<String, ArgValue>,
}

impl ParsedArgs {
    pub fn new() -> Self {
        ParsedArgs::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ArgValue) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Subcommand selection under `key`. Outer `None` means the key is
    /// absent entirely (that level is a leaf); `Some(None)` means the level
    /// exists but chose no child.
    pub fn choice(&self, key: &str) -> Option<Option<&str>> {
        match self.values.get(key) {
            Some(ArgValue::Choice(v)) => Some(v.as_deref()),
            _ => None,
        }
    }

    /// Value of a `store` flag, when present.
    pub fn value(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(ArgValue::Single(v)) => v.as_deref(),
            _ => None,
        }
    }

    /// True when `key` is a flag that was set.
    pub fn is_set(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(ArgValue::Flag(true)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ArgValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Thin wrapper over the external argument grammar engine.
pub struct GrammarEngine {
    root: ParserNode,
}

impl GrammarEngine {
    pub fn new(prog: &str) -> Self {
        GrammarEngine {
            root: ParserNode::new(prog, ""),
        }
    }

    pub fn root(&self) -> &ParserNode {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut ParserNode {
        &mut self.root
    }

    /// Parse known arguments: unknown flags and stray subcommand tokens are
    /// peeled off into the leftover list instead of failing the parse.
    /// Structural errors (bad values, missing flag arguments) fail with
    /// [`FlexiError::InvalidArguments`].
    pub fn parse_known<I, S>(&self, argv: I) -> FlexiResult<(ParsedArgs, Vec<String>)>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tokens: Vec<String> = argv.into_iter().map(Into::into).collect();
        let mut leftovers = Vec::new();
        let command = to_clap(&self.root).no_binary_name(true);

        // Bounded retry: each pass removes at most one offending token.
        for _ in 0..=tokens.len() {
            match command.clone().try_get_matches_from(&tokens) {
                Ok(matches) => {
                    let mut parsed = ParsedArgs::new();
                    flatten(&self.root, &matches, &mut parsed);
                    return Ok((parsed, leftovers));
                }
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::UnknownArgument | ErrorKind::InvalidSubcommand
                    ) =>
                {
                    let Some(bad) = offending_token(&err) else {
                        return Err(FlexiError::InvalidArguments(err.to_string()));
                    };
                    let Some(pos) = tokens
                        .iter()
                        .position(|t| *t == bad || t.starts_with(&format!("{bad}=")))
                    else {
                        return Err(FlexiError::InvalidArguments(err.to_string()));
                    };
                    leftovers.push(tokens.remove(pos));
                }
                Err(err) => return Err(FlexiError::InvalidArguments(err.to_string())),
            }
        }
        Err(FlexiError::InvalidArguments(
            "could not recover from parse errors".to_string(),
        ))
    }
}

fn offending_token(err: &clap::Error) -> Option<String> {
    for kind in [ContextKind::InvalidArg, ContextKind::InvalidSubcommand] {
        if let Some(ContextValue::String(s)) = err.get(kind) {
            return Some(s.clone());
        }
    }
    None
}

fn to_clap(node: &ParserNode) -> Command {
    let mut command = Command::new(node.name.to_string());
    if !node.help.is_empty() {
        command = command.about(node.help.to_string());
    }
    for spec in &node.args {
        command = command.arg(to_clap_arg(spec));
    }
    for child in &node.children {
        command = command.subcommand(to_clap(child));
    }
    command
}

fn to_clap_arg(spec: &ArgSpec) -> Arg {
    let mut arg = Arg::new(spec.dest());
    for flag in &spec.flags {
        if let Some(long) = flag.strip_prefix("--") {
            arg = arg.long(long.to_string());
        } else if let Some(short) = flag.strip_prefix('-') {
            if let Some(c) = short.chars().next() {
                arg = arg.short(c);
            }
        }
    }
    arg = match spec.mode {
        ArgMode::Store => arg.action(ArgAction::Set),
        ArgMode::StoreTrue => arg.action(ArgAction::SetTrue),
        ArgMode::StoreFalse => arg.action(ArgAction::SetFalse),
        ArgMode::Append => arg.action(ArgAction::Append),
    };
    if let Some(help) = &spec.help {
        arg = arg.help(help.to_string());
    }
    if let Some(n) = spec.nargs {
        arg = arg.num_args(n);
    }
    match spec.value_type {
        Some(ValueType::Int) => arg = arg.value_parser(parse_int_value),
        Some(ValueType::Float) => arg = arg.value_parser(parse_float_value),
        Some(ValueType::Str) | None => {}
    }
    arg
}

fn parse_int_value(raw: &str) -> Result<String, String> {
    raw.parse::<i64>()
        .map(|_| raw.to_string())
        .map_err(|_| format!("'{raw}' is not an integer"))
}

fn parse_float_value(raw: &str) -> Result<String, String> {
    raw.parse::<f64>()
        .map(|_| raw.to_string())
        .map_err(|_| format!("'{raw}' is not a number"))
}

fn flatten(node: &ParserNode, matches: &ArgMatches, out: &mut ParsedArgs) {
    for spec in &node.args {
        let dest = spec.dest();
        let many = spec.mode == ArgMode::Append || spec.nargs.map_or(false, |n| n > 1);
        let value = if spec.mode.is_flag() {
            ArgValue::Flag(matches.get_flag(&dest))
        } else if many {
            ArgValue::Many(
                matches
                    .get_many::<String>(&dest)
                    .map(|v| v.cloned().collect())
                    .unwrap_or_default(),
            )
        } else {
            ArgValue::Single(matches.get_one::<String>(&dest).cloned())
        };
        out.insert(dest, value);
    }

    let selected = matches.subcommand();
    if let Some(dest) = &node.dest {
        out.insert(
            dest.clone(),
            ArgValue::Choice(selected.map(|(name, _)| name.to_string())),
        );
    }
    if let Some((name, sub_matches)) = selected {
        if let Some(child) = node.find(name) {
            flatten(child, sub_matches, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(flags: &[&str], mode: &str, help: &str) -> ArgSpec {
        let mut s = ArgSpec::new(flags.iter().copied());
        s.action(mode).help(help);
        s
    }

    fn two_level_engine() -> GrammarEngine {
        let mut engine = GrammarEngine::new("app");
        let root = engine.root_mut();
        root.add_subparsers("action");
        root.add_argument(spec(&["-v", "--version"], "store_true", "Get version"));
        let generate = root.add_parser("generate", "Generate things");
        generate.add_subparsers("generate_action");
        let leaf = generate.add_parser("random-string", "Generate a random string");
        leaf.add_argument(spec(&["-l", "--length"], "store", "Requested length"));
        engine
    }

    #[test]
    fn flatten_full_path() {
        let engine = two_level_engine();
        let (parsed, rest) = engine
            .parse_known(["generate", "random-string", "--length", "8"])
            .unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed.choice("action"), Some(Some("generate")));
        assert_eq!(parsed.choice("generate_action"), Some(Some("random-string")));
        assert_eq!(parsed.value("length"), Some("8"));
        // The leaf declares no nested subparsers, so its key must be absent.
        assert_eq!(parsed.choice("random-string_action"), None);
    }

    #[test]
    fn flatten_incomplete_level() {
        let engine = two_level_engine();
        let (parsed, _) = engine.parse_known(["generate"]).unwrap();
        assert_eq!(parsed.choice("action"), Some(Some("generate")));
        assert_eq!(parsed.choice("generate_action"), Some(None));
    }

    #[test]
    fn flatten_no_selection() {
        let engine = two_level_engine();
        let (parsed, _) = engine.parse_known(["-v"]).unwrap();
        assert_eq!(parsed.choice("action"), Some(None));
        assert!(parsed.is_set("version"));
    }

    #[test]
    fn unknown_tokens_become_leftovers() {
        let engine = two_level_engine();
        let (parsed, rest) = engine.parse_known(["-v", "--bogus"]).unwrap();
        assert!(parsed.is_set("version"));
        assert_eq!(rest, vec!["--bogus".to_string()]);
    }

    #[test]
    fn int_typed_flags_validate_at_parse_time() {
        let mut engine = GrammarEngine::new("app");
        let mut length = ArgSpec::new(["-l", "--length"]);
        length.action("store").value_type("int");
        engine.root_mut().add_argument(length);

        let (parsed, _) = engine.parse_known(["--length", "8"]).unwrap();
        assert_eq!(parsed.value("length"), Some("8"));

        assert!(matches!(
            engine.parse_known(["--length", "abc"]),
            Err(FlexiError::InvalidArguments(_))
        ));
    }

    #[test]
    fn dest_prefers_long_flag() {
        let spec = ArgSpec::new(["-l", "--length"]);
        assert_eq!(spec.dest(), "length");
        let spec = ArgSpec::new(["-v"]);
        assert_eq!(spec.dest(), "v");
    }

    #[test]
    fn arg_builder_collects_chained_declarations() {
        let mut builder = ArgBuilder::new();
        builder
            .add_argument(&["-l", "--length"])
            .action("store")
            .help("Requested length");
        assert_eq!(builder.args().len(), 1);
        assert_eq!(builder.args()[0].mode, ArgMode::Store);
    }
}
