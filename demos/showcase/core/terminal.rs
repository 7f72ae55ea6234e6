//! Console middleware: serialized, colored terminal output.

use colored::Colorize;
use flexistack::FlexiMiddleware;
use flexistack_macros::flexi_middleware;
use std::any::Any;
use std::sync::Mutex;

#[flexi_middleware("Serialized colored console output")]
#[derive(Default)]
pub struct Terminal {
    lock: Mutex<()>,
}

impl Terminal {
    pub fn print(&self, line: &str) {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        println!("{line}");
    }

    pub fn success(&self, line: &str) {
        self.print(&format!("{}", line.green()));
    }

    pub fn error(&self, line: &str) {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        eprintln!("{}", line.red());
    }
}

impl FlexiMiddleware for Terminal {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
