//! Atomically swappable holder for the active configuration.

use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tracing::{debug, info};

use super::{ConfigError, Configuration};

/// The single source of truth for the active policy.
///
/// Readers take a cheap `Arc` snapshot and never block each other or the
/// writer. A reload builds the whole new [`Configuration`] first and then
/// publishes it with one pointer swap, so a reader sees either the previous
/// snapshot or the next one.
#[derive(Debug)]
pub struct ConfigStore {
    current: ArcSwapOption<Configuration>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    /// Creates an empty store. `get` returns `None` until the first `set`.
    pub fn new() -> Self {
        ConfigStore {
            current: ArcSwapOption::empty(),
        }
    }

    /// Publishes a new configuration, replacing the previous one wholesale.
    pub fn set(&self, config: Configuration) {
        self.current.store(Some(Arc::new(config)));
    }

    /// Returns the active configuration, if one was ever set.
    pub fn get(&self) -> Option<Arc<Configuration>> {
        self.current.load_full()
    }

    /// Loads `path`, validates it and publishes it.
    ///
    /// On any error the previously published configuration stays in place.
    pub fn reload(&self, path: &Path) -> Result<(), ConfigError> {
        let config = Configuration::load(path)?;
        let changed = self
            .get()
            .map(|prev| {
                prev.pattern().as_str() != config.pattern().as_str()
                    || prev.error_message() != config.error_message()
                    || prev.scopes() != config.scopes()
            })
            .unwrap_or(true);

        if changed {
            info!(
                path = %path.display(),
                pattern = %config.pattern(),
                orgs = config.scopes().orgs.len(),
                repos = config.scopes().repos.len(),
                "Loaded configuration"
            );
        } else {
            debug!(path = %path.display(), "Configuration unchanged");
        }

        self.set(config);
        Ok(())
    }
}
