//! Discovery behavior over real fixture trees.

use flexistack::{
    ArgBuilder, DiscoveryEvent, FlexiAction, FlexiError, Flexistack, RunContext, StaticLoader,
};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Probe;

impl FlexiAction for Probe {
    fn set_optional_arguments(&self, _parser: &mut ArgBuilder) {}

    fn init(&mut self, _ctx: &RunContext<'_>) -> bool {
        true
    }

    fn run(&mut self, _ctx: &RunContext<'_>) -> bool {
        true
    }
}

fn loader() -> StaticLoader {
    StaticLoader::new()
        .action::<Probe>("VersionProbe")
        .action::<Probe>("StringProbe")
        .action::<Probe>("FirstProbe")
        .action::<Probe>("SecondProbe")
}

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

const VERSION_LEAF: &str = r#"
#[flexi_action("store_true", "Display the version")]
pub struct VersionProbe;
"#;

const STRING_LEAF: &str = r#"
#[flexi_action(None, "Generate a random string")]
pub struct StringProbe;

impl StringProbe {
    fn set_optional_arguments(&self, parser: &mut ArgBuilder) {
        parser.add_argument(&["-l", "--length"]).action("store").help("Length");
    }
}
"#;

#[test]
fn manifestless_subdirectory_is_invisible() {
    let dir = tempfile::tempdir().unwrap();
    let hidden = dir.path().join("hidden");
    fs::create_dir(&hidden).unwrap();
    write(&hidden, "random-string.rs", STRING_LEAF);

    let mut stack = Flexistack::new(None, loader());
    stack.load_actions(dir.path()).unwrap();

    assert!(stack.actions().is_empty());
    assert!(stack.grammar().root().find("hidden").is_none());
}

#[test]
fn manifested_groups_nest_and_register_path_qualified() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "version.rs", VERSION_LEAF);
    let generate = dir.path().join("generate");
    fs::create_dir(&generate).unwrap();
    write(
        &generate,
        ".flexistack",
        r#"{"z-index": 1, "description": "Generate things"}"#,
    );
    write(&generate, "random-string.rs", STRING_LEAF);

    let mut stack = Flexistack::new(None, loader());
    stack.load_actions(dir.path()).unwrap();

    assert!(stack.actions().get("version").is_some());
    assert!(stack.actions().get("generate/random-string").is_some());
    // The leaf registers under its path, never under the bare name.
    assert!(stack.actions().get("random-string").is_none());

    let group = stack.grammar().root().find("generate").unwrap();
    assert_eq!(group.dest(), Some("generate_action"));
    let leaf = group.find("random-string").unwrap();
    assert_eq!(leaf.args().len(), 1);
    assert_eq!(leaf.args()[0].dest(), "length");
}

#[test]
fn groups_order_by_z_index() {
    let dir = tempfile::tempdir().unwrap();
    for (name, z) in [("zebra", 1), ("alpha", 2)] {
        let group = dir.path().join(name);
        fs::create_dir(&group).unwrap();
        write(
            &group,
            ".flexistack",
            &format!(r#"{{"z-index": {z}, "description": "{name}"}}"#),
        );
    }

    let mut stack = Flexistack::new(None, loader());
    stack.load_actions(dir.path()).unwrap();

    let names: Vec<&str> = stack
        .grammar()
        .root()
        .children()
        .iter()
        .map(|c| c.name())
        .collect();
    assert_eq!(names, vec!["zebra", "alpha"]);
}

#[test]
fn legacy_manifest_names_are_honored() {
    let dir = tempfile::tempdir().unwrap();
    let group = dir.path().join("legacy");
    fs::create_dir(&group).unwrap();
    write(
        &group,
        ".flexiarg",
        r#"{"z-index": 0, "description": "Legacy group"}"#,
    );
    write(&group, "random-string.rs", STRING_LEAF);

    let mut stack = Flexistack::new(None, loader());
    stack.load_actions(dir.path()).unwrap();
    assert!(stack.actions().get("legacy/random-string").is_some());
}

#[test]
fn first_action_registration_wins_across_roots() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    write(
        first.path(),
        "task.rs",
        r#"
#[flexi_action(None, "First task")]
pub struct FirstProbe;

impl FirstProbe {
    fn set_optional_arguments(&self, _parser: &mut ArgBuilder) {}
}
"#,
    );
    write(
        second.path(),
        "task.rs",
        r#"
#[flexi_action(None, "Second task")]
pub struct SecondProbe;

impl SecondProbe {
    fn set_optional_arguments(&self, _parser: &mut ArgBuilder) {}
}
"#,
    );

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let mut stack = Flexistack::new(None, loader());
    stack.trace(move |event| {
        if let DiscoveryEvent::DuplicateAction { command, .. } = event {
            sink.lock().unwrap().push(command.clone());
        }
    });
    stack.load_actions(first.path()).unwrap();
    stack.load_actions(second.path()).unwrap();

    let entry = stack.actions().get("task").unwrap();
    assert_eq!(entry.reference.target(), "FirstProbe");
    assert_eq!(events.lock().unwrap().as_slice(), ["task".to_string()]);
}

#[test]
fn broken_manifest_fails_the_whole_root() {
    let dir = tempfile::tempdir().unwrap();
    let group = dir.path().join("broken");
    fs::create_dir(&group).unwrap();
    write(&group, ".flexistack", "{not json");

    let mut stack = Flexistack::new(None, loader());
    let err = stack.load_actions(dir.path()).unwrap_err();
    assert!(matches!(err, FlexiError::ActionDiscovery { .. }));
}

#[test]
fn manifest_missing_required_keys_fails_the_whole_root() {
    let dir = tempfile::tempdir().unwrap();
    let group = dir.path().join("bare");
    fs::create_dir(&group).unwrap();
    write(&group, ".flexistack", "{}");
    write(&group, "random-string.rs", STRING_LEAF);

    let mut stack = Flexistack::new(None, loader());
    let err = stack.load_actions(dir.path()).unwrap_err();
    assert!(matches!(err, FlexiError::ActionDiscovery { .. }));
    assert!(stack.actions().is_empty());
}

#[test]
fn syntax_error_in_action_file_fails_the_whole_root() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "bad.rs", "pub struct {{{{");

    let mut stack = Flexistack::new(None, loader());
    let err = stack.load_actions(dir.path()).unwrap_err();
    assert!(matches!(err, FlexiError::ActionDiscovery { .. }));
}

#[test]
fn leaf_without_arguments_hook_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "bare.rs",
        r#"
#[flexi_action(None, "No hook declared")]
pub struct StringProbe;
"#,
    );

    let mut stack = Flexistack::new(None, loader());
    stack.load_actions(dir.path()).unwrap();
    assert!(stack.actions().is_empty());
}
