//! The stack facade: registries, grammar and parse state under one roof.

use std::env;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::discovery::{DiscoveryEvent, DiscoveryOptions, DiscoveryWalker};
use crate::error::FlexiResult;
use crate::grammar::{GrammarEngine, ParsedArgs};
use crate::helper;
use crate::loader::{FlexiPlugin, Loader};
use crate::registry::{ActionRegistry, MiddlewareSet, PluginRegistry};

/// Execution context handed to every materialized action and plugin.
pub struct RunContext<'a> {
    pub stack: &'a Flexistack,
    pub project_dir: &'a Path,
    /// Full flat parse result. Present on the positional dispatch path only.
    pub pargs: Option<&'a ParsedArgs>,
}

impl<'a> RunContext<'a> {
    /// Resolve a virtual path: `::` prefixes are current-directory relative,
    /// `:` prefixes are project relative, anything else is normalized as-is.
    pub fn get_filepath(&self, path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("::") {
            let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            helper::resolve_path(&cwd.join(rest))
        } else if let Some(rest) = path.strip_prefix(':') {
            helper::resolve_path(&self.project_dir.join(rest))
        } else {
            helper::resolve_path(Path::new(path))
        }
    }
}

/// Top-level framework object.
///
/// Owns the three registries, the grammar tree and the loader; discovery
/// fills them, `parse_arguments` produces the flat invocation map, `run`
/// dispatches it.
pub struct Flexistack {
    id: Uuid,
    project_dir: Option<PathBuf>,
    pub(crate) actions: ActionRegistry,
    pub(crate) plugins: PluginRegistry,
    pub(crate) middleware: MiddlewareSet,
    pub(crate) loader: Box<dyn Loader>,
    pub(crate) grammar: GrammarEngine,
    pub(crate) parsed: Option<ParsedArgs>,
    options: DiscoveryOptions,
    trace: Option<Box<dyn FnMut(&DiscoveryEvent) + Send>>,
}

impl Flexistack {
    pub fn new(project_dir: Option<PathBuf>, loader: impl Loader + 'static) -> Self {
        let mut grammar = GrammarEngine::new("flexistack");
        grammar.root_mut().add_subparsers("action");
        Flexistack {
            id: Uuid::new_v4(),
            project_dir,
            actions: ActionRegistry::new(),
            plugins: PluginRegistry::new(),
            middleware: MiddlewareSet::new(),
            loader: Box::new(loader),
            grammar,
            parsed: None,
            options: DiscoveryOptions::default(),
            trace: None,
        }
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub fn project_dir(&self) -> &Path {
        self.project_dir.as_deref().unwrap_or(Path::new("."))
    }

    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn middleware(&self) -> &MiddlewareSet {
        &self.middleware
    }

    pub fn grammar(&self) -> &GrammarEngine {
        &self.grammar
    }

    pub fn parsed(&self) -> Option<&ParsedArgs> {
        self.parsed.as_ref()
    }

    /// Materialize every capability at discovery time instead of lazily.
    pub fn eager_loading(&mut self, eager: bool) -> &mut Self {
        self.options.eager = eager;
        self
    }

    /// Install a discovery trace sink.
    pub fn trace(&mut self, sink: impl FnMut(&DiscoveryEvent) + Send + 'static) -> &mut Self {
        self.trace = Some(Box::new(sink));
        self
    }

    fn walker(&mut self) -> DiscoveryWalker<'_> {
        DiscoveryWalker {
            actions: &mut self.actions,
            plugins: &mut self.plugins,
            middleware: &mut self.middleware,
            grammar_root: self.grammar.root_mut(),
            loader: self.loader.as_ref(),
            options: &self.options,
            trace: self.trace.as_mut().map(|t| {
                let sink: &mut dyn FnMut(&DiscoveryEvent) = t.as_mut();
                sink
            }),
        }
    }

    /// Combined load: middleware first, then plugins, then action trees.
    pub fn load(
        &mut self,
        middleware_dirs: &[PathBuf],
        actions_dirs: &[PathBuf],
        plugins_dirs: &[PathBuf],
    ) -> FlexiResult<()> {
        for dir in middleware_dirs {
            self.load_middleware(dir)?;
        }
        for dir in plugins_dirs {
            self.load_plugins(dir)?;
        }
        for dir in actions_dirs {
            self.load_actions(dir)?;
        }
        Ok(())
    }

    pub fn load_plugins(&mut self, dir: &Path) -> FlexiResult<()> {
        self.walker().load_plugins(dir)
    }

    pub fn load_middleware(&mut self, dir: &Path) -> FlexiResult<()> {
        self.walker().load_middleware(dir)
    }

    pub fn load_actions(&mut self, dir: &Path) -> FlexiResult<()> {
        self.walker().load_actions(dir)
    }

    /// Parse an argument vector (no program name) against the discovered
    /// grammar. The flat result is stored for `run` and also returned with
    /// the leftover tokens.
    pub fn parse_arguments<I, S>(&mut self, argv: I) -> FlexiResult<(ParsedArgs, Vec<String>)>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (parsed, leftovers) = self.grammar.parse_known(argv)?;
        self.parsed = Some(parsed.clone());
        Ok((parsed, leftovers))
    }

    /// Parse the process argument vector.
    pub fn parse_env(&mut self) -> FlexiResult<(ParsedArgs, Vec<String>)> {
        self.parse_arguments(env::args().skip(1))
    }

    /// Resolve a virtual path against the stack's project directory.
    pub fn get_filepath(&self, path: &str) -> PathBuf {
        let ctx = RunContext {
            stack: self,
            project_dir: self.project_dir(),
            pargs: None,
        };
        ctx.get_filepath(path)
    }

    /// Materialize a plugin instance, resolving the latest version when none
    /// is given, and run its `init` hook.
    pub fn plugin_instance(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> FlexiResult<Box<dyn FlexiPlugin>> {
        let pack = self.plugins.get(name)?;
        let mut instance = match version {
            Some(version) => pack.instance(version, self.loader.as_ref())?,
            None => pack.latest_instance(self.loader.as_ref())?,
        };
        let ctx = RunContext {
            stack: self,
            project_dir: self.project_dir(),
            pargs: None,
        };
        instance.init(&ctx);
        Ok(instance)
    }
}
