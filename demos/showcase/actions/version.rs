use flexistack::{FlexiAction, RunContext};
use flexistack_macros::flexi_action;

use crate::terminal::Terminal;

#[flexi_action("store_true", "Display the application version")]
#[derive(Default)]
pub struct VersionAction;

impl FlexiAction for VersionAction {
    fn init(&mut self, _ctx: &RunContext<'_>) -> bool {
        true
    }

    fn run(&mut self, ctx: &RunContext<'_>) -> bool {
        let line = format!("showcase {}", env!("CARGO_PKG_VERSION"));
        match ctx.stack.middleware().get_as::<Terminal>("terminal") {
            Some(terminal) => terminal.print(&line),
            None => println!("{line}"),
        }
        true
    }
}
