use flexistack::{ArgBuilder, FlexiAction, RunContext};
use flexistack_macros::flexi_action;

use crate::generator::as_generator;
use crate::terminal::Terminal;

#[flexi_action(None, "Generate a random string via the dummy-generator plugin")]
pub struct RandomStringAction {
    length: usize,
}

impl Default for RandomStringAction {
    fn default() -> Self {
        RandomStringAction { length: 16 }
    }
}

impl FlexiAction for RandomStringAction {
    fn set_optional_arguments(&self, parser: &mut ArgBuilder) {
        parser
            .add_argument(&["-l", "--length"])
            .action("store")
            .help("Length of the generated string")
            .nargs(1)
            .value_type("int");
    }

    fn init(&mut self, ctx: &RunContext<'_>) -> bool {
        let Some(pargs) = ctx.pargs else {
            return false;
        };
        match pargs.value("length") {
            None => true,
            Some(raw) => match raw.parse() {
                Ok(length) => {
                    self.length = length;
                    true
                }
                Err(_) => {
                    if let Some(terminal) = ctx.stack.middleware().get_as::<Terminal>("terminal") {
                        terminal.error(&format!("invalid length: {raw}"));
                    }
                    false
                }
            },
        }
    }

    fn run(&mut self, ctx: &RunContext<'_>) -> bool {
        // Pin version 0.1 deliberately so both plugin versions stay exercised.
        let plugin = match ctx.stack.plugin_instance("dummy-generator", Some("0.1")) {
            Ok(plugin) => plugin,
            Err(err) => {
                if let Some(terminal) = ctx.stack.middleware().get_as::<Terminal>("terminal") {
                    terminal.error(&err.to_string());
                }
                return false;
            }
        };
        let Some(generator) = as_generator(plugin.as_ref()) else {
            return false;
        };
        let payload = generator.generate(self.length);
        match ctx.stack.middleware().get_as::<Terminal>("terminal") {
            Some(terminal) => terminal.success(&payload),
            None => println!("{payload}"),
        }
        true
    }
}
