//! Showcase application for the FlexiStack framework.
//!
//! The capability sources live outside `src/` in the directories the stack
//! scans at runtime (`actions/`, `plugins/`, `core/`); they are compiled into
//! this binary through path includes so the static loader can hand out
//! instances for what discovery finds.

use colored::Colorize;
use flexistack::{FlexiResult, Flexistack, StaticLoader};
use std::path::PathBuf;

mod generator;

#[path = "../actions/version.rs"]
mod version_action;
#[path = "../actions/shuffle.rs"]
mod shuffle_action;
#[path = "../actions/generate/random-string.rs"]
mod random_string_action;
#[path = "../actions/generate/random-number.rs"]
mod random_number_action;
#[path = "../plugins/dummy-generator/v0.1/dummy_generator.rs"]
mod dummy_generator_v01;
#[path = "../plugins/dummy-generator/v0.2/dummy_generator.rs"]
mod dummy_generator_v02;
#[path = "../core/terminal.rs"]
mod terminal;

use dummy_generator_v01::DummyGeneratorV1;
use dummy_generator_v02::DummyGeneratorV2;
use random_number_action::RandomNumberAction;
use random_string_action::RandomStringAction;
use shuffle_action::ShuffleAction;
use terminal::Terminal;
use version_action::VersionAction;

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn run() -> FlexiResult<bool> {
    let loader = StaticLoader::new()
        .action::<VersionAction>("VersionAction")
        .action::<ShuffleAction>("ShuffleAction")
        .action::<RandomStringAction>("RandomStringAction")
        .action::<RandomNumberAction>("RandomNumberAction")
        .plugin::<DummyGeneratorV1>("DummyGeneratorV1")
        .plugin::<DummyGeneratorV2>("DummyGeneratorV2")
        .middleware::<Terminal>("Terminal");

    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let mut stack = Flexistack::new(Some(root.clone()), loader);
    stack.load(
        &[root.join("core")],
        &[root.join("actions")],
        &[root.join("plugins")],
    )?;
    stack.parse_env()?;
    Ok(stack.run(&root))
}
