use flexistack::{ArgBuilder, FlexiAction, RunContext};
use flexistack_macros::flexi_action;
use rand::seq::SliceRandom;

use crate::terminal::Terminal;

#[flexi_action(None, "Shuffle the characters of a given string")]
#[derive(Default)]
pub struct ShuffleAction {
    data: String,
}

impl FlexiAction for ShuffleAction {
    fn set_optional_arguments(&self, parser: &mut ArgBuilder) {
        parser
            .add_argument(&["-d", "--data"])
            .action("store")
            .help("String to shuffle");
    }

    fn init(&mut self, ctx: &RunContext<'_>) -> bool {
        let Some(pargs) = ctx.pargs else {
            return false;
        };
        match pargs.value("data") {
            Some(data) if !data.is_empty() => {
                self.data = data.to_string();
                true
            }
            _ => {
                if let Some(terminal) = ctx.stack.middleware().get_as::<Terminal>("terminal") {
                    terminal.error("shuffle requires -d/--data");
                }
                false
            }
        }
    }

    fn run(&mut self, ctx: &RunContext<'_>) -> bool {
        let mut chars: Vec<char> = self.data.chars().collect();
        chars.shuffle(&mut rand::thread_rng());
        let shuffled: String = chars.into_iter().collect();
        match ctx.stack.middleware().get_as::<Terminal>("terminal") {
            Some(terminal) => terminal.print(&shuffled),
            None => println!("{shuffled}"),
        }
        true
    }
}
