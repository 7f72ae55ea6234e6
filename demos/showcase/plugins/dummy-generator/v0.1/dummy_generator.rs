use flexistack::FlexiPlugin;
use flexistack_macros::flexi_plugin;
use std::any::Any;

use crate::generator::Generator;

/// First cut of the generator: alphanumeric payloads only.
#[flexi_plugin("dummy-generator", "0.1", "Dummy data generator (alphanumeric)")]
#[derive(Default)]
pub struct DummyGeneratorV1;

impl Generator for DummyGeneratorV1 {
    fn generate(&self, length: usize) -> String {
        flexistack::helper::generate_random_string(length)
    }
}

impl FlexiPlugin for DummyGeneratorV1 {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
