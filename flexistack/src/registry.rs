//! Capability registries.
//!
//! Discovery fills these with [`ModuleReference`]s (where a capability lives
//! and which type implements it); materialization happens later through the
//! stack's [`Loader`]. Plugins are grouped into versioned packs, actions are
//! keyed by their slash-joined command path, middleware by lowercased type
//! name.

use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::descriptor::CapabilityKind;
use crate::error::{FlexiError, FlexiResult};
use crate::loader::{FlexiAction, FlexiMiddleware, FlexiPlugin, Loader};

/// Where a discovered capability lives and which type implements it.
///
/// Materialization is lazy; the first successful instantiation pins a
/// synthetic load id that identifies the reference for the rest of the
/// stack's lifetime.
#[derive(Debug, Clone)]
pub struct ModuleReference {
    path: PathBuf,
    name: String,
    description: String,
    target: String,
    kind: CapabilityKind,
    load_id: OnceCell<Uuid>,
}

impl ModuleReference {
    pub fn new(
        path: impl Into<PathBuf>,
        name: impl Into<String>,
        description: impl Into<String>,
        target: impl Into<String>,
        kind: CapabilityKind,
    ) -> Self {
        ModuleReference {
            path: path.into(),
            name: name.into(),
            description: description.into(),
            target: target.into(),
            kind,
            load_id: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Name of the tagged type inside the source file.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn kind(&self) -> CapabilityKind {
        self.kind
    }

    /// Set once the reference has been materialized at least once.
    pub fn load_id(&self) -> Option<&Uuid> {
        self.load_id.get()
    }

    fn mark_loaded(&self) {
        self.load_id.get_or_init(Uuid::new_v4);
    }

    pub fn instantiate_action(&self, loader: &dyn Loader) -> FlexiResult<Box<dyn FlexiAction>> {
        let instance = loader.load_action(&self.path, &self.target)?;
        self.mark_loaded();
        Ok(instance)
    }

    pub fn instantiate_plugin(&self, loader: &dyn Loader) -> FlexiResult<Box<dyn FlexiPlugin>> {
        let instance = loader.load_plugin(&self.path, &self.target)?;
        self.mark_loaded();
        Ok(instance)
    }

    pub fn instantiate_middleware(
        &self,
        loader: &dyn Loader,
    ) -> FlexiResult<Box<dyn FlexiMiddleware>> {
        let instance = loader.load_middleware(&self.path, &self.target)?;
        self.mark_loaded();
        Ok(instance)
    }
}

/// Plugin version identifier: dot-separated non-negative integers, ordered
/// numerically component by component (`0.10` sorts above `0.9`).
#[derive(Debug, Clone)]
pub struct VersionKey {
    raw: String,
    parts: Vec<u64>,
}

impl VersionKey {
    pub fn parse(raw: &str) -> FlexiResult<Self> {
        if raw.is_empty() {
            return Err(FlexiError::InvalidVersion(raw.to_string()));
        }
        let parts = raw
            .split('.')
            .map(|p| p.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| FlexiError::InvalidVersion(raw.to_string()))?;
        Ok(VersionKey {
            raw: raw.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for VersionKey {
    fn eq(&self, other: &Self) -> bool {
        self.parts == other.parts
    }
}

impl Eq for VersionKey {}

impl PartialOrd for VersionKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.parts.cmp(&other.parts)
    }
}

/// All discovered versions of one named plugin.
#[derive(Debug, Clone, Default)]
pub struct PluginPack {
    versions: BTreeMap<VersionKey, ModuleReference>,
}

impl PluginPack {
    /// Register a version. Re-registering an existing version replaces the
    /// previous reference (last discovery wins).
    pub fn add(&mut self, version: VersionKey, reference: ModuleReference) {
        self.versions.insert(version, reference);
    }

    /// Known version strings, newest first.
    pub fn versions(&self) -> Vec<&str> {
        self.versions.keys().rev().map(VersionKey::as_str).collect()
    }

    /// Description of the newest version.
    pub fn description(&self) -> &str {
        self.versions
            .values()
            .next_back()
            .map(ModuleReference::description)
            .unwrap_or_default()
    }

    pub fn latest(&self) -> Option<&ModuleReference> {
        self.versions.values().next_back()
    }

    pub fn get(&self, version: &str) -> FlexiResult<&ModuleReference> {
        let key = VersionKey::parse(version)?;
        self.versions
            .get(&key)
            .ok_or_else(|| FlexiError::VersionNotFound(version.to_string()))
    }

    /// Materialize the newest version.
    pub fn latest_instance(&self, loader: &dyn Loader) -> FlexiResult<Box<dyn FlexiPlugin>> {
        let reference = self
            .latest()
            .ok_or_else(|| FlexiError::VersionNotFound("latest".to_string()))?;
        reference.instantiate_plugin(loader)
    }

    /// Materialize a specific version.
    pub fn instance(&self, version: &str, loader: &dyn Loader) -> FlexiResult<Box<dyn FlexiPlugin>> {
        self.get(version)?.instantiate_plugin(loader)
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// Versioned plugin packs keyed by plugin name.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    packs: BTreeMap<String, PluginPack>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        PluginRegistry::default()
    }

    pub fn add(
        &mut self,
        name: &str,
        version: &str,
        reference: ModuleReference,
    ) -> FlexiResult<()> {
        let key = VersionKey::parse(version)?;
        self.packs
            .entry(name.to_string())
            .or_default()
            .add(key, reference);
        Ok(())
    }

    pub fn get(&self, name: &str) -> FlexiResult<&PluginPack> {
        self.packs
            .get(name)
            .ok_or_else(|| FlexiError::PluginNotFound(name.to_string()))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.packs.contains_key(name)
    }

    /// True when every named plugin has at least one discovered version.
    pub fn exists_all<'n>(&self, names: impl IntoIterator<Item = &'n str>) -> bool {
        names.into_iter().all(|name| self.exists(name))
    }

    /// One line per plugin: name and latest description.
    pub fn info(&self) -> Vec<(&str, &str)> {
        self.packs
            .iter()
            .map(|(name, pack)| (name.as_str(), pack.description()))
            .collect()
    }

    /// One line per plugin: name and known versions, newest first.
    pub fn details(&self) -> Vec<(&str, Vec<&str>)> {
        self.packs
            .iter()
            .map(|(name, pack)| (name.as_str(), pack.versions()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PluginPack)> {
        self.packs.iter()
    }

    pub fn len(&self) -> usize {
        self.packs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }
}

/// A registered action: its module reference plus the optional-flag store
/// mode when the action registers as a top-level flag instead of a
/// positional command.
#[derive(Debug, Clone)]
pub struct ActionEntry {
    pub reference: ModuleReference,
    pub as_optional: Option<String>,
}

/// Actions keyed by their slash-joined command path (`generate/random-string`)
/// or, for optional actions, by the bare flag name (`version`).
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    entries: BTreeMap<String, ActionEntry>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        ActionRegistry::default()
    }

    /// Register an action path. The first registration wins; returns `false`
    /// when the path was already taken.
    pub fn register(&mut self, path: &str, entry: ActionEntry) -> bool {
        if self.entries.contains_key(path) {
            return false;
        }
        self.entries.insert(path.to_string(), entry);
        true
    }

    pub fn get(&self, path: &str) -> Option<&ActionEntry> {
        self.entries.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ActionEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A middleware instance together with where it came from.
pub struct MiddlewareEntry {
    pub reference: ModuleReference,
    pub instance: Box<dyn FlexiMiddleware>,
}

/// Eagerly instantiated middleware keyed by lowercased type name.
#[derive(Default)]
pub struct MiddlewareSet {
    entries: BTreeMap<String, MiddlewareEntry>,
}

impl MiddlewareSet {
    pub fn new() -> Self {
        MiddlewareSet::default()
    }

    /// Register an instance. Re-registering a type name replaces the previous
    /// instance (last discovery wins).
    pub fn insert(&mut self, entry: MiddlewareEntry) {
        self.entries
            .insert(entry.reference.target().to_lowercase(), entry);
    }

    pub fn get(&self, type_name: &str) -> Option<&dyn FlexiMiddleware> {
        self.entries
            .get(&type_name.to_lowercase())
            .map(|e| e.instance.as_ref())
    }

    pub fn get_entry(&self, type_name: &str) -> Option<&MiddlewareEntry> {
        self.entries.get(&type_name.to_lowercase())
    }

    /// Typed access for consumers that know the concrete middleware type.
    pub fn get_as<T: 'static>(&self, type_name: &str) -> Option<&T> {
        self.get(type_name)?.as_any().downcast_ref::<T>()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MiddlewareEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for MiddlewareSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(name: &str, description: &str) -> ModuleReference {
        ModuleReference::new(
            format!("{name}.rs"),
            name,
            description,
            "Target",
            CapabilityKind::Plugin,
        )
    }

    #[test]
    fn versions_order_numerically() {
        let a = VersionKey::parse("0.9").unwrap();
        let b = VersionKey::parse("0.10").unwrap();
        assert!(b > a);
    }

    #[test]
    fn invalid_versions_are_rejected() {
        assert!(matches!(
            VersionKey::parse("1.0-beta"),
            Err(FlexiError::InvalidVersion(_))
        ));
        assert!(matches!(
            VersionKey::parse(""),
            Err(FlexiError::InvalidVersion(_))
        ));
    }

    #[test]
    fn pack_reports_newest_first() {
        let mut pack = PluginPack::default();
        pack.add(VersionKey::parse("0.1").unwrap(), reference("p", "old"));
        pack.add(VersionKey::parse("0.2").unwrap(), reference("p", "new"));
        assert_eq!(pack.versions(), vec!["0.2", "0.1"]);
        assert_eq!(pack.description(), "new");
        assert_eq!(pack.latest().unwrap().description(), "new");
    }

    #[test]
    fn missing_version_is_an_error() {
        let mut pack = PluginPack::default();
        pack.add(VersionKey::parse("0.1").unwrap(), reference("p", "d"));
        assert!(matches!(
            pack.get("0.3"),
            Err(FlexiError::VersionNotFound(_))
        ));
    }

    #[test]
    fn action_paths_keep_first_registration() {
        let mut registry = ActionRegistry::new();
        let first = ActionEntry {
            reference: reference("a", "first"),
            as_optional: None,
        };
        let second = ActionEntry {
            reference: reference("a", "second"),
            as_optional: None,
        };
        assert!(registry.register("generate/random-string", first));
        assert!(!registry.register("generate/random-string", second));
        assert_eq!(
            registry
                .get("generate/random-string")
                .unwrap()
                .reference
                .description(),
            "first"
        );
    }

    #[test]
    fn load_id_is_pinned_after_first_materialization() {
        use crate::loader::StaticLoader;
        use std::any::Any;

        #[derive(Default)]
        struct Target;

        impl FlexiPlugin for Target {
            fn as_any(&self) -> &dyn Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }

        let loader = StaticLoader::new().plugin::<Target>("Target");
        let reference = reference("p", "d");
        assert!(reference.load_id().is_none());
        reference.instantiate_plugin(&loader).unwrap();
        let id = *reference.load_id().unwrap();
        reference.instantiate_plugin(&loader).unwrap();
        assert_eq!(*reference.load_id().unwrap(), id);
    }
}
