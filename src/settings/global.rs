//! Process-wide default configuration.
//!
//! Set it once at startup. Reloaders built without an explicit configuration
//! read it exactly once, at construction; later changes only affect reloaders
//! built afterwards. Tests should prefer `Reloader::with_configuration` over
//! touching this cell.

use super::Configuration;
use arc_swap::ArcSwap;
use std::sync::{Arc, LazyLock};

static GLOBAL_CONFIGURATION: LazyLock<ArcSwap<Configuration>> =
    LazyLock::new(|| ArcSwap::from_pointee(Configuration::new()));

/// Get the current process-wide configuration.
pub fn get_global_configuration() -> Arc<Configuration> {
    GLOBAL_CONFIGURATION.load_full()
}

/// Replace the process-wide configuration.
pub fn set_global_configuration(configuration: Configuration) {
    tracing::debug!(
        tag = configuration.cloned_resource_tag_name(),
        "global configuration replaced"
    );
    GLOBAL_CONFIGURATION.store(Arc::new(configuration));
}

/// Restore the process-wide configuration to its defaults.
pub fn reset_global_configuration() {
    GLOBAL_CONFIGURATION.store(Arc::new(Configuration::new()));
}
