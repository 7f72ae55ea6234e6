//! Capability traits and materialization.
//!
//! Inspection only reads source files; turning a discovered type into a live
//! object goes through a [`Loader`]. The stock implementation is
//! [`StaticLoader`]: a compile-time factory registry keyed by type name, so
//! the set of loadable types is fixed at build time while the set of
//! *discovered* types still comes from the scanned directories.

use std::any::Any;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{FlexiError, FlexiResult};
use crate::grammar::ArgBuilder;
use crate::stack::RunContext;

/// A dispatchable command handler.
///
/// `init` validates and prepares; `run` executes. Dispatch calls them in
/// order and stops (reporting failure) when either returns `false`.
pub trait FlexiAction: Any {
    /// Declare extra flags for this action's command node. The default
    /// declares nothing.
    fn set_optional_arguments(&self, _parser: &mut ArgBuilder) {}

    fn init(&mut self, ctx: &RunContext<'_>) -> bool;

    fn run(&mut self, ctx: &RunContext<'_>) -> bool;
}

/// A named, versioned service.
pub trait FlexiPlugin: Any {
    /// Called once when an instance is handed out.
    fn init(&mut self, _ctx: &RunContext<'_>) {}

    /// Downcast support for consumers that know the concrete service type.
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// An ambient service instantiated eagerly at discovery time.
pub trait FlexiMiddleware: Any {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub type ActionFactory = Arc<dyn Fn() -> Box<dyn FlexiAction> + Send + Sync>;
pub type PluginFactory = Arc<dyn Fn() -> Box<dyn FlexiPlugin> + Send + Sync>;
pub type MiddlewareFactory = Arc<dyn Fn() -> Box<dyn FlexiMiddleware> + Send + Sync>;

/// Materializes discovered types into live capability objects.
///
/// `path` is the source file the type was discovered in and `type_name` the
/// tagged type's name; a loader may use either to locate the factory.
pub trait Loader: Send + Sync {
    fn load_action(&self, path: &Path, type_name: &str) -> FlexiResult<Box<dyn FlexiAction>>;

    fn load_plugin(&self, path: &Path, type_name: &str) -> FlexiResult<Box<dyn FlexiPlugin>>;

    fn load_middleware(
        &self,
        path: &Path,
        type_name: &str,
    ) -> FlexiResult<Box<dyn FlexiMiddleware>>;
}

enum Factory {
    Action(ActionFactory),
    Plugin(PluginFactory),
    Middleware(MiddlewareFactory),
}

/// Factory registry keyed by type name.
///
/// Every type a scanned directory may declare must be registered here under
/// the exact name it carries in the source file. Missing registrations only
/// fail when the capability is materialized, not at discovery.
#[derive(Default)]
pub struct StaticLoader {
    factories: HashMap<String, Factory>,
}

impl StaticLoader {
    pub fn new() -> Self {
        StaticLoader::default()
    }

    /// Register an action type under its source-level name.
    pub fn action<A>(mut self, type_name: &str) -> Self
    where
        A: FlexiAction + Default + 'static,
    {
        self.factories.insert(
            type_name.to_string(),
            Factory::Action(Arc::new(|| Box::<A>::default() as Box<dyn FlexiAction>)),
        );
        self
    }

    /// Register a plugin type under its source-level name.
    pub fn plugin<P>(mut self, type_name: &str) -> Self
    where
        P: FlexiPlugin + Default + 'static,
    {
        self.factories.insert(
            type_name.to_string(),
            Factory::Plugin(Arc::new(|| Box::<P>::default() as Box<dyn FlexiPlugin>)),
        );
        self
    }

    /// Register a middleware type under its source-level name.
    pub fn middleware<M>(mut self, type_name: &str) -> Self
    where
        M: FlexiMiddleware + Default + 'static,
    {
        self.factories.insert(
            type_name.to_string(),
            Factory::Middleware(Arc::new(|| Box::<M>::default() as Box<dyn FlexiMiddleware>)),
        );
        self
    }

    fn lookup(&self, path: &Path, type_name: &str) -> FlexiResult<&Factory> {
        self.factories
            .get(type_name)
            .ok_or_else(|| FlexiError::LoadFailed {
                type_name: type_name.to_string(),
                path: path.to_path_buf(),
            })
    }
}

impl Loader for StaticLoader {
    fn load_action(&self, path: &Path, type_name: &str) -> FlexiResult<Box<dyn FlexiAction>> {
        match self.lookup(path, type_name)? {
            Factory::Action(f) => Ok(f()),
            _ => Err(FlexiError::KindMismatch {
                name: type_name.to_string(),
                expected: "an action",
            }),
        }
    }

    fn load_plugin(&self, path: &Path, type_name: &str) -> FlexiResult<Box<dyn FlexiPlugin>> {
        match self.lookup(path, type_name)? {
            Factory::Plugin(f) => Ok(f()),
            _ => Err(FlexiError::KindMismatch {
                name: type_name.to_string(),
                expected: "a plugin",
            }),
        }
    }

    fn load_middleware(
        &self,
        path: &Path,
        type_name: &str,
    ) -> FlexiResult<Box<dyn FlexiMiddleware>> {
        match self.lookup(path, type_name)? {
            Factory::Middleware(f) => Ok(f()),
            _ => Err(FlexiError::KindMismatch {
                name: type_name.to_string(),
                expected: "a middleware",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct NoopAction;

    impl FlexiAction for NoopAction {
        fn init(&mut self, _ctx: &RunContext<'_>) -> bool {
            true
        }

        fn run(&mut self, _ctx: &RunContext<'_>) -> bool {
            true
        }
    }

    #[derive(Default)]
    struct NoopPlugin;

    impl FlexiPlugin for NoopPlugin {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn materializes_registered_action() {
        let loader = StaticLoader::new().action::<NoopAction>("NoopAction");
        assert!(loader
            .load_action(Path::new("noop.rs"), "NoopAction")
            .is_ok());
    }

    #[test]
    fn unknown_type_is_a_load_failure() {
        let loader = StaticLoader::new();
        let err = loader
            .load_action(Path::new("missing.rs"), "Missing")
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, FlexiError::LoadFailed { .. }));
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let loader = StaticLoader::new().plugin::<NoopPlugin>("NoopPlugin");
        let err = loader
            .load_action(Path::new("noop.rs"), "NoopPlugin")
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, FlexiError::KindMismatch { .. }));
    }
}
