//! Invocation resolution.
//!
//! Consumes the flat parse result and the action registry to execute exactly
//! one action. Positional selections descend level by level along the
//! `action` / `<level>_action` keys; with no positional selection the
//! flag-style fields are scanned for a set optional action.

use colored::Colorize;
use std::path::Path;

use crate::error::{FlexiError, FlexiResult};
use crate::grammar::{ArgValue, ParsedArgs};
use crate::registry::ActionEntry;
use crate::stack::{Flexistack, RunContext};

/// Upper bound on subcommand nesting. A parse map that descends further is
/// structurally broken.
pub const MAX_COMMAND_DEPTH: usize = 5;

impl Flexistack {
    /// Dispatch the stored parse result. Every failure is reported to stderr
    /// and collapsed into `false`.
    pub fn run(&self, project_dir: &Path) -> bool {
        match self.parsed() {
            Some(pargs) => self.run_with(pargs, project_dir),
            None => {
                report(&FlexiError::InvalidArguments(
                    "no parsed arguments, call parse_arguments first".to_string(),
                ));
                false
            }
        }
    }

    /// Dispatch an explicit parse result. Failures are reported and
    /// collapsed into `false`.
    pub fn run_with(&self, pargs: &ParsedArgs, project_dir: &Path) -> bool {
        match self.try_run(pargs, project_dir) {
            Ok(outcome) => outcome,
            Err(err) => {
                report(&err);
                false
            }
        }
    }

    /// Dispatch an explicit parse result, surfacing errors to the caller.
    pub fn try_run(&self, pargs: &ParsedArgs, project_dir: &Path) -> FlexiResult<bool> {
        match pargs.choice("action") {
            Some(Some(first)) => self.run_positional(first, pargs, project_dir),
            _ => self.run_optional(pargs, project_dir),
        }
    }

    /// No positional subcommand: the first set flag that names a registered
    /// optional action wins. No match means nothing to do.
    fn run_optional(&self, pargs: &ParsedArgs, project_dir: &Path) -> FlexiResult<bool> {
        for (key, value) in pargs.iter() {
            if !matches!(value, ArgValue::Flag(true)) {
                continue;
            }
            let Some(entry) = self.actions.get(key) else {
                continue;
            };
            if entry.as_optional.is_none() {
                continue;
            }
            return self.execute(entry, None, project_dir);
        }
        Ok(false)
    }

    /// Positional descent along the `<level>_action` keys with the
    /// accumulated slash path.
    fn run_positional(
        &self,
        first: &str,
        pargs: &ParsedArgs,
        project_dir: &Path,
    ) -> FlexiResult<bool> {
        let mut level = first.to_string();
        let mut prefix = String::new();
        for _ in 0..MAX_COMMAND_DEPTH {
            match pargs.choice(&format!("{level}_action")) {
                Some(None) => return Err(FlexiError::IncompleteCommand),
                Some(Some(next)) => {
                    if prefix.is_empty() {
                        prefix = level;
                    } else {
                        prefix = format!("{prefix}/{level}");
                    }
                    level = next.to_string();
                }
                None => {
                    let path = if prefix.is_empty() {
                        level
                    } else {
                        format!("{prefix}/{level}")
                    };
                    let entry = self
                        .actions
                        .get(&path)
                        .ok_or(FlexiError::ActionNotFound(path))?;
                    return self.execute(entry, Some(pargs), project_dir);
                }
            }
        }
        Err(FlexiError::CommandDepthExceeded)
    }

    /// Two-phase run contract: `init`, and only on success `run`.
    fn execute(
        &self,
        entry: &ActionEntry,
        pargs: Option<&ParsedArgs>,
        project_dir: &Path,
    ) -> FlexiResult<bool> {
        let mut action = entry.reference.instantiate_action(self.loader.as_ref())?;
        let ctx = RunContext {
            stack: self,
            project_dir,
            pargs,
        };
        if !action.init(&ctx) {
            return Ok(false);
        }
        Ok(action.run(&ctx))
    }
}

fn report(err: &FlexiError) {
    eprintln!("{} {}", "Error:".red().bold(), err);
}
