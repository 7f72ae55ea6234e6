//! FlexiStack: a pluggable command-line application framework.
//!
//! Applications point the stack at directories of action, plugin and
//! middleware source files. Discovery statically inspects every candidate
//! file for capability tags, mirrors the directory tree into a hierarchical
//! command grammar and fills the versioned plugin registry; parsing turns an
//! argument vector into a flat invocation map; dispatch resolves that map to
//! exactly one action and drives its two-phase `init`/`run` contract.
//!
//! ```no_run
//! use flexistack::{Flexistack, StaticLoader};
//! use std::path::{Path, PathBuf};
//!
//! # #[derive(Default)]
//! # struct VersionAction;
//! # impl flexistack::FlexiAction for VersionAction {
//! #     fn init(&mut self, _ctx: &flexistack::RunContext<'_>) -> bool { true }
//! #     fn run(&mut self, _ctx: &flexistack::RunContext<'_>) -> bool { true }
//! # }
//! let loader = StaticLoader::new().action::<VersionAction>("VersionAction");
//! let mut stack = Flexistack::new(None, loader);
//! stack.load(
//!     &[PathBuf::from("core")],
//!     &[PathBuf::from("actions")],
//!     &[PathBuf::from("plugins")],
//! )?;
//! stack.parse_env()?;
//! let ok = stack.run(Path::new("."));
//! std::process::exit(if ok { 0 } else { 1 });
//! # Ok::<(), flexistack::FlexiError>(())
//! ```

pub mod descriptor;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod grammar;
pub mod helper;
pub mod inspector;
pub mod loader;
pub mod registry;
pub mod stack;

pub use descriptor::{
    ActionTag, CapabilityKind, CapabilityTag, Descriptor, MiddlewareTag, PluginTag,
};
pub use discovery::{DiscoveryEvent, DiscoveryOptions, DiscoveryWalker, MANIFEST_FILES};
pub use dispatch::MAX_COMMAND_DEPTH;
pub use error::{FlexiError, FlexiResult};
pub use grammar::{ArgBuilder, ArgMode, ArgSpec, ArgValue, GrammarEngine, ParsedArgs, ParserNode};
pub use loader::{FlexiAction, FlexiMiddleware, FlexiPlugin, Loader, StaticLoader};
pub use registry::{
    ActionEntry, ActionRegistry, MiddlewareEntry, MiddlewareSet, ModuleReference, PluginPack,
    PluginRegistry, VersionKey,
};
pub use stack::{Flexistack, RunContext};
