//! Capability descriptors extracted by static inspection.
//!
//! The three capability kinds are modeled as a closed sum type with per-kind
//! required fields, validated when the tag is parsed out of the source file.

use crate::grammar::ArgSpec;

/// The kind of a discovered capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityKind {
    Action,
    Plugin,
    Middleware,
}

impl CapabilityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityKind::Action => "action",
            CapabilityKind::Plugin => "plugin",
            CapabilityKind::Middleware => "middleware",
        }
    }
}

/// Metadata carried by an `action` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionTag {
    /// When set, the action registers as a top-level optional flag with this
    /// store mode (e.g. `"store_true"`) instead of a positional subcommand.
    pub as_optional: Option<String>,
    pub description: String,
}

/// Metadata carried by a `plugin` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginTag {
    pub name: String,
    pub version: String,
    pub description: String,
}

/// Metadata carried by a `middleware` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiddlewareTag {
    pub description: String,
}

/// A recognized capability tag with its declared metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityTag {
    Action(ActionTag),
    Plugin(PluginTag),
    Middleware(MiddlewareTag),
}

impl CapabilityTag {
    pub fn kind(&self) -> CapabilityKind {
        match self {
            CapabilityTag::Action(_) => CapabilityKind::Action,
            CapabilityTag::Plugin(_) => CapabilityKind::Plugin,
            CapabilityTag::Middleware(_) => CapabilityKind::Middleware,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            CapabilityTag::Action(t) => &t.description,
            CapabilityTag::Plugin(t) => &t.description,
            CapabilityTag::Middleware(t) => &t.description,
        }
    }
}

/// Everything the inspector learned about one tagged type without executing
/// a single statement of the file that declares it.
#[derive(Debug, Clone)]
pub struct Descriptor {
    /// Name of the tagged type inside the file.
    pub type_name: String,
    pub tag: CapabilityTag,
    /// Whether the type declares a `set_optional_arguments` method at all.
    /// Positional leaf registration requires the method even when no flag
    /// could be statically extracted from it.
    pub declares_arguments: bool,
    /// Flag registrations statically extracted from `set_optional_arguments`.
    pub arguments: Vec<ArgSpec>,
}
