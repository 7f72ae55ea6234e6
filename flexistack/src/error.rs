//! Error types for the FlexiStack framework.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used across the framework.
pub type FlexiResult<T> = Result<T, FlexiError>;

/// Comprehensive error type for discovery, resolution and dispatch.
///
/// Plugin discovery never surfaces these (it skips bad files and reports them
/// to the trace sink); action discovery and dispatch do.
#[derive(Error, Debug)]
pub enum FlexiError {
    /// Action tree loading is all-or-nothing per root directory.
    #[error("action discovery failed in {dir}: {reason}")]
    ActionDiscovery { dir: PathBuf, reason: String },

    #[error("action not found: {0}")]
    ActionNotFound(String),

    #[error("plugin not found: {0}")]
    PluginNotFound(String),

    #[error("plugin version not found: {0}")]
    VersionNotFound(String),

    /// Version strings must be dot-separated non-negative integers.
    #[error("invalid version string: {0}")]
    InvalidVersion(String),

    /// Deferred materialization failure: no factory was registered for the
    /// target type. Discovery itself already succeeded when this shows up.
    #[error("no factory registered for type '{type_name}' (declared in {path})")]
    LoadFailed { type_name: String, path: PathBuf },

    /// A capability resolved to a factory of the wrong kind.
    #[error("capability '{name}' is not registered as {expected}")]
    KindMismatch { name: String, expected: &'static str },

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("incomplete command, use -h <--help> for more information")]
    IncompleteCommand,

    #[error("command depth cannot be achieved (inf. loop breaker)")]
    CommandDepthExceeded,

    /// A candidate source file could not be read or parsed.
    #[error("failed to inspect {path}: {reason}")]
    Inspection { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}
