use flexistack::FlexiPlugin;
use flexistack_macros::flexi_plugin;
use rand::Rng;
use std::any::Any;

use crate::generator::Generator;

/// Successor of the 0.1 generator: digit payloads without a leading zero.
#[flexi_plugin("dummy-generator", "0.2", "Dummy data generator (numeric)")]
#[derive(Default)]
pub struct DummyGeneratorV2;

impl Generator for DummyGeneratorV2 {
    fn generate(&self, length: usize) -> String {
        if length == 0 {
            return String::new();
        }
        let mut rng = rand::thread_rng();
        let mut out = String::with_capacity(length);
        out.push(char::from(b'1' + rng.gen_range(0..9)));
        for _ in 1..length {
            out.push(char::from(b'0' + rng.gen_range(0..10)));
        }
        out
    }
}

impl FlexiPlugin for DummyGeneratorV2 {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
