//! Shared seam between the generate actions and the dummy-generator plugin
//! versions.

use flexistack::FlexiPlugin;

use crate::dummy_generator_v01::DummyGeneratorV1;
use crate::dummy_generator_v02::DummyGeneratorV2;

/// Produces dummy payloads of a requested size.
pub trait Generator {
    fn generate(&self, length: usize) -> String;
}

/// View a materialized plugin as a [`Generator`], whichever version it is.
pub fn as_generator(plugin: &dyn FlexiPlugin) -> Option<&dyn Generator> {
    let any = plugin.as_any();
    if let Some(g) = any.downcast_ref::<DummyGeneratorV1>() {
        return Some(g);
    }
    if let Some(g) = any.downcast_ref::<DummyGeneratorV2>() {
        return Some(g);
    }
    None
}
