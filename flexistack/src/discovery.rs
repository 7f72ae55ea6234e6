//! Directory discovery.
//!
//! Plugins and middleware are harvested recursively with a lenient walk:
//! files that fail inspection or materialization are skipped and reported to
//! the trace sink. Action trees are strict: any bad file or manifest aborts
//! the whole root directory, so a broken command tree never half-registers.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::descriptor::{CapabilityTag, Descriptor};
use crate::error::{FlexiError, FlexiResult};
use crate::grammar::{ArgSpec, ParserNode};
use crate::inspector;
use crate::loader::Loader;
use crate::registry::{
    ActionEntry, ActionRegistry, MiddlewareEntry, MiddlewareSet, ModuleReference, PluginRegistry,
};

/// Manifest file names that make a subdirectory visible as a command group,
/// in lookup order. The last two spellings are kept for older trees.
pub const MANIFEST_FILES: &[&str] = &[".flexistack", ".flexiarg", ".autoloader"];

/// Tuning knobs for a discovery pass.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    /// Materialize every capability at discovery time instead of on first
    /// use, so factory gaps surface immediately.
    pub eager: bool,
}

/// Trace records emitted while walking. Purely informational.
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    PluginRegistered {
        name: String,
        version: String,
        path: PathBuf,
    },
    MiddlewareRegistered {
        type_name: String,
        path: PathBuf,
    },
    ActionRegistered {
        command: String,
        path: PathBuf,
    },
    /// A file or directory was passed over during a lenient walk.
    Skipped {
        path: PathBuf,
        reason: String,
    },
    /// An action path was already taken; the first registration stands.
    DuplicateAction {
        command: String,
        path: PathBuf,
    },
}

/// Group manifest: a JSON document sitting next to the group's action files.
/// Both fields are required; a manifest missing either fails the whole
/// action root.
#[derive(Debug, Clone, Deserialize)]
struct GroupManifest {
    #[serde(rename = "z-index")]
    z_index: i64,
    description: String,
}

/// One discovery pass over a directory tree, borrowing the stack's
/// registries and grammar for its duration.
pub struct DiscoveryWalker<'a> {
    pub actions: &'a mut ActionRegistry,
    pub plugins: &'a mut PluginRegistry,
    pub middleware: &'a mut MiddlewareSet,
    pub grammar_root: &'a mut ParserNode,
    pub loader: &'a dyn Loader,
    pub options: &'a DiscoveryOptions,
    pub trace: Option<&'a mut dyn FnMut(&DiscoveryEvent)>,
}

impl<'a> DiscoveryWalker<'a> {
    fn emit(&mut self, event: DiscoveryEvent) {
        if let Some(sink) = self.trace.as_mut() {
            sink(&event);
        }
    }

    fn skip(&mut self, path: &Path, reason: impl Into<String>) {
        self.emit(DiscoveryEvent::Skipped {
            path: path.to_path_buf(),
            reason: reason.into(),
        });
    }

    /// Recursively harvest plugin declarations. Missing directories are fine.
    pub fn load_plugins(&mut self, dir: &Path) -> FlexiResult<()> {
        if !dir.is_dir() {
            return Ok(());
        }
        for entry in WalkDir::new(dir).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(dir).to_path_buf();
                    self.skip(&path, err.to_string());
                    continue;
                }
            };
            let path = entry.path();
            if !is_candidate(path) {
                continue;
            }
            let descriptors = match inspector::inspect_file(path) {
                Ok(descriptors) => descriptors,
                Err(err) => {
                    self.skip(path, err.to_string());
                    continue;
                }
            };
            for descriptor in descriptors {
                let CapabilityTag::Plugin(tag) = &descriptor.tag else {
                    continue;
                };
                let reference = ModuleReference::new(
                    path,
                    &tag.name,
                    &tag.description,
                    &descriptor.type_name,
                    descriptor.tag.kind(),
                );
                if self.options.eager {
                    if let Err(err) = reference.instantiate_plugin(self.loader) {
                        self.skip(path, err.to_string());
                        continue;
                    }
                }
                match self.plugins.add(&tag.name, &tag.version, reference) {
                    Ok(()) => self.emit(DiscoveryEvent::PluginRegistered {
                        name: tag.name.clone(),
                        version: tag.version.clone(),
                        path: path.to_path_buf(),
                    }),
                    Err(err) => self.skip(path, err.to_string()),
                }
            }
        }
        Ok(())
    }

    /// Recursively harvest middleware declarations. Middleware is always
    /// instantiated on the spot.
    pub fn load_middleware(&mut self, dir: &Path) -> FlexiResult<()> {
        if !dir.is_dir() {
            return Ok(());
        }
        for entry in WalkDir::new(dir).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(dir).to_path_buf();
                    self.skip(&path, err.to_string());
                    continue;
                }
            };
            let path = entry.path();
            if !is_candidate(path) {
                continue;
            }
            let descriptors = match inspector::inspect_file(path) {
                Ok(descriptors) => descriptors,
                Err(err) => {
                    self.skip(path, err.to_string());
                    continue;
                }
            };
            for descriptor in descriptors {
                let CapabilityTag::Middleware(tag) = &descriptor.tag else {
                    continue;
                };
                let reference = ModuleReference::new(
                    path,
                    &descriptor.type_name,
                    &tag.description,
                    &descriptor.type_name,
                    descriptor.tag.kind(),
                );
                match reference.instantiate_middleware(self.loader) {
                    Ok(instance) => {
                        self.emit(DiscoveryEvent::MiddlewareRegistered {
                            type_name: descriptor.type_name.clone(),
                            path: path.to_path_buf(),
                        });
                        self.middleware.insert(MiddlewareEntry {
                            reference,
                            instance,
                        });
                    }
                    Err(err) => self.skip(path, err.to_string()),
                }
            }
        }
        Ok(())
    }

    /// Build the command tree from an action root directory. Strict: the
    /// first bad file or manifest fails the whole root.
    pub fn load_actions(&mut self, dir: &Path) -> FlexiResult<()> {
        if !dir.is_dir() {
            return Ok(());
        }
        let mut root = std::mem::replace(self.grammar_root, ParserNode::new("", ""));
        let result = self.walk_actions(dir, &mut root, "");
        *self.grammar_root = root;
        result.map_err(|err| match err {
            err @ FlexiError::ActionDiscovery { .. } => err,
            other => FlexiError::ActionDiscovery {
                dir: dir.to_path_buf(),
                reason: other.to_string(),
            },
        })
    }

    fn walk_actions(&mut self, dir: &Path, node: &mut ParserNode, prefix: &str) -> FlexiResult<()> {
        let mut files = Vec::new();
        let mut dirs = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                dirs.push(path);
            } else if is_candidate(&path) {
                files.push(path);
            }
        }
        files.sort();

        // Leaf commands register before any subgroup at the same level.
        for path in files {
            for descriptor in inspector::inspect_file(&path)? {
                self.register_action(&path, &descriptor, node, prefix);
            }
        }

        // Only manifested subdirectories are visible, ordered by z-index.
        let mut groups = Vec::new();
        for path in dirs {
            match read_manifest(&path)? {
                Some(manifest) => groups.push((path, manifest)),
                None => self.skip(&path, "no group manifest".to_string()),
            }
        }
        groups.sort_by(|a, b| {
            a.1.z_index
                .cmp(&b.1.z_index)
                .then_with(|| a.0.cmp(&b.0))
        });

        for (path, manifest) in groups {
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            let child = node.add_parser(&name, &manifest.description);
            child.add_subparsers(&format!("{name}_action"));
            let child_prefix = format!("{prefix}{name}/");
            self.walk_actions(&path, child, &child_prefix)?;
        }
        Ok(())
    }

    fn register_action(
        &mut self,
        path: &Path,
        descriptor: &Descriptor,
        node: &mut ParserNode,
        prefix: &str,
    ) {
        let CapabilityTag::Action(tag) = &descriptor.tag else {
            return;
        };
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            return;
        };
        // Optional actions live on the current parser level and register
        // under their bare name; positional leaves register under the full
        // slash-joined path and must declare the arguments hook.
        let command = if tag.as_optional.is_some() {
            stem.to_string()
        } else {
            format!("{prefix}{stem}")
        };
        if tag.as_optional.is_none() && !descriptor.declares_arguments {
            self.skip(path, "leaf declares no arguments hook".to_string());
            return;
        }
        let reference = ModuleReference::new(
            path,
            stem,
            &tag.description,
            &descriptor.type_name,
            descriptor.tag.kind(),
        );
        if self.options.eager {
            if let Err(err) = reference.instantiate_action(self.loader) {
                self.skip(path, err.to_string());
                return;
            }
        }
        let entry = ActionEntry {
            reference,
            as_optional: tag.as_optional.clone(),
        };
        if let Some(mode) = &tag.as_optional {
            // Optional action: a flag on the current parser level instead of
            // a positional subcommand.
            if !self.actions.register(&command, entry) {
                self.emit(DiscoveryEvent::DuplicateAction {
                    command,
                    path: path.to_path_buf(),
                });
                return;
            }
            let short = match stem.chars().next() {
                Some(c) => format!("-{c}"),
                None => return,
            };
            let long = format!("--{stem}");
            let mut spec = ArgSpec::new([short.as_str(), long.as_str()]);
            spec.action(mode).help(&tag.description);
            node.add_argument(spec);
        } else {
            if !self.actions.register(&command, entry) {
                self.emit(DiscoveryEvent::DuplicateAction {
                    command,
                    path: path.to_path_buf(),
                });
                return;
            }
            let child = node.add_parser(stem, &tag.description);
            for spec in &descriptor.arguments {
                child.add_argument(spec.clone());
            }
        }
        let registered = if tag.as_optional.is_some() {
            stem.to_string()
        } else {
            format!("{prefix}{stem}")
        };
        self.emit(DiscoveryEvent::ActionRegistered {
            command: registered,
            path: path.to_path_buf(),
        });
    }
}

/// Candidate action/plugin/middleware source file: a `.rs` file that is not
/// a module index.
fn is_candidate(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    if path.extension().and_then(|e| e.to_str()) != Some("rs") {
        return false;
    }
    !matches!(
        path.file_name().and_then(|n| n.to_str()),
        Some("mod.rs") | Some("lib.rs")
    )
}

fn read_manifest(dir: &Path) -> FlexiResult<Option<GroupManifest>> {
    for name in MANIFEST_FILES {
        let candidate = dir.join(name);
        if candidate.is_file() {
            let raw = fs::read_to_string(&candidate)?;
            let manifest = serde_json::from_str(&raw)?;
            return Ok(Some(manifest));
        }
    }
    Ok(None)
}
