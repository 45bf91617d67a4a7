//! Module for the configuration options of the `pmc` tool.
//!
//! Options can be read from configuration files or environment variables
//! (prefixed with `PMC`) and are partly overridden by command line flags.

use pmc_model::builder::BuilderOptions;

use serde::Deserialize;

/// Type representing configuration options for `pmc`
///
/// This type implements `serde::Deserialize` to easily parse the
/// configuration out of structured configuration.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct PMCConfig {
    /// Options for building explicit models
    explicit: Option<BuilderOptions>,
}

impl PMCConfig {
    /// Get the builder options, falling back to the defaults if none were
    /// configured
    pub fn builder_options(&self) -> BuilderOptions {
        self.explicit.clone().unwrap_or_default()
    }

    /// Override the tolerance for the probability mass of a choice
    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.explicit.get_or_insert_with(Default::default).tolerance = tolerance;
    }

    /// Accept models without any state
    pub fn set_allow_empty(&mut self) {
        self.explicit.get_or_insert_with(Default::default).allow_empty = true;
    }

    /// Repair deadlock states with self loops
    pub fn set_fix_deadlocks(&mut self) {
        self.explicit.get_or_insert_with(Default::default).fix_deadlocks = true;
    }
}
