use super::Driver;
use crate::core::{ConfigError, ConfigResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

static GLOBAL: LazyLock<DriverRegistry> = LazyLock::new(DriverRegistry::new);

/// Name to driver lookup table.
///
/// Most programs register their drivers once at startup in
/// [`DriverRegistry::global`]; tests usually build a private registry.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: RwLock<HashMap<String, Arc<dyn Driver>>>,
}

impl DriverRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry
    pub fn global() -> &'static DriverRegistry {
        &GLOBAL
    }

    /// Register `driver` under `name`.
    ///
    /// Registering an empty name or a name that is already taken is a
    /// [`ConfigError::Fatal`] programming error.
    pub fn register(&self, name: impl Into<String>, driver: Arc<dyn Driver>) -> ConfigResult<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(ConfigError::fatal("driver name must not be empty"));
        }
        let mut drivers = self.drivers.write();
        if drivers.contains_key(&name) {
            return Err(ConfigError::fatal(format!(
                "driver '{name}' is already registered"
            )));
        }
        tracing::debug!(driver = %name, "registered configuration driver");
        drivers.insert(name, driver);
        Ok(())
    }

    /// Driver registered under `name`
    pub fn driver_for(&self, name: &str) -> ConfigResult<Arc<dyn Driver>> {
        self.drivers
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::driver_not_found(name))
    }

    /// Registered names in sorted order
    pub fn drivers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.drivers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether a driver is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.drivers.read().contains_key(name)
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.drivers())
            .finish()
    }
}
