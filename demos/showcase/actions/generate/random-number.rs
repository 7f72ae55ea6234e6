use flexistack::{ArgBuilder, FlexiAction, RunContext};
use flexistack_macros::flexi_action;

use crate::generator::as_generator;
use crate::terminal::Terminal;

#[flexi_action(None, "Generate a random number via the dummy-generator plugin")]
pub struct RandomNumberAction {
    digits: usize,
}

impl Default for RandomNumberAction {
    fn default() -> Self {
        RandomNumberAction { digits: 6 }
    }
}

impl FlexiAction for RandomNumberAction {
    fn set_optional_arguments(&self, parser: &mut ArgBuilder) {
        parser
            .add_argument(&["-d", "--digits"])
            .action("store")
            .help("Number of digits to generate")
            .nargs(1)
            .value_type("int");
    }

    fn init(&mut self, ctx: &RunContext<'_>) -> bool {
        let Some(pargs) = ctx.pargs else {
            return false;
        };
        match pargs.value("digits") {
            None => true,
            Some(raw) => match raw.parse() {
                Ok(digits) => {
                    self.digits = digits;
                    true
                }
                Err(_) => {
                    if let Some(terminal) = ctx.stack.middleware().get_as::<Terminal>("terminal") {
                        terminal.error(&format!("invalid digit count: {raw}"));
                    }
                    false
                }
            },
        }
    }

    fn run(&mut self, ctx: &RunContext<'_>) -> bool {
        // No version given: the registry resolves the latest one.
        let plugin = match ctx.stack.plugin_instance("dummy-generator", None) {
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
        let payload = generator.generate(self.digits);
        match ctx.stack.middleware().get_as::<Terminal>("terminal") {
            Some(terminal) => terminal.success(&payload),
            None => println!("{payload}"),
        }
        true
    }
}
