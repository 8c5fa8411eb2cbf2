//! Backend factory and registration system.

use crate::{Backend, Config, Result, RgmuxError};
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

/// Factory function type for creating backends.
pub type BackendFactory = fn(Config) -> Result<Box<dyn Backend>>;

static BACKEND_REGISTRY: OnceLock<RwLock<HashMap<String, BackendFactory>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<String, BackendFactory>> {
    BACKEND_REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

fn poisoned() -> RgmuxError {
    RgmuxError::Other(anyhow::anyhow!("backend registry lock poisoned"))
}

/// Registers a backend factory function under `backend_type`.
///
/// Backend modules call this from their `register()` functions. Registering
/// the same name twice replaces the earlier factory.
///
/// # Example
///
/// ```no_run
/// use rgmux::factory::register_backend;
/// use rgmux::{Backend, Config, Result};
///
/// fn my_backend_factory(config: Config) -> Result<Box<dyn Backend>> {
///     // Create and return backend instance
///     # unimplemented!()
/// }
///
/// pub fn register() {
///     register_backend("mybackend", my_backend_factory);
/// }
/// ```
pub fn register_backend(backend_type: &str, factory: BackendFactory) {
    // A poisoned lock still holds a usable map.
    let mut reg = registry().write().unwrap_or_else(|e| e.into_inner());
    reg.insert(backend_type.to_string(), factory);
}

/// Returns the names of all registered backends, sorted.
pub fn registered_backends() -> Result<Vec<String>> {
    let reg = registry().read().map_err(|_| poisoned())?;
    let mut names: Vec<String> = reg.keys().cloned().collect();
    names.sort();
    Ok(names)
}

/// Creates a new backend from configuration.
///
/// The factory is looked up by `config.backend`. Unknown names produce an
/// error hinting at the missing feature flag.
///
/// # Example
///
/// ```no_run
/// use rgmux::{Config, BackendType, factory};
///
/// fn main() -> rgmux::Result<()> {
///     rgmux::init();
///     let config = Config::new(BackendType::Mock);
///     let backend = factory::new_backend(config)?;
///     assert_eq!(backend.name(), "mock");
///     Ok(())
/// }
/// ```
pub fn new_backend(config: Config) -> Result<Box<dyn Backend>> {
    let backend_name = config.backend.to_string();

    let factory = {
        let reg = registry().read().map_err(|_| poisoned())?;
        *reg.get(&backend_name).ok_or_else(|| {
            RgmuxError::Other(anyhow::anyhow!(
                "unknown backend: {} (did you enable the '{}' feature flag?)",
                backend_name,
                feature_for(&backend_name)
            ))
        })?
    };

    factory(config)
}

fn feature_for(backend_name: &str) -> &str {
    match backend_name {
        "azurerm" => "azure",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BackendType;

    fn failing_factory(_cfg: Config) -> Result<Box<dyn Backend>> {
        Err(RgmuxError::Other(anyhow::anyhow!("failing factory")))
    }

    #[test]
    fn test_backend_registration() {
        register_backend("test-backend", failing_factory);

        let names = registered_backends().unwrap();
        assert!(names.contains(&"test-backend".to_string()));
    }

    #[test]
    #[cfg(not(feature = "azure"))]
    fn test_unknown_backend_error() {
        let config = Config::new(BackendType::AzureResourceManager);
        let result = new_backend(config);

        assert!(result.is_err());
        if let Err(e) = result {
            let err_msg = e.to_string();
            assert!(err_msg.contains("unknown backend: azurerm"));
            assert!(err_msg.contains("'azure' feature flag"));
        }
    }

    #[test]
    #[cfg(feature = "mock")]
    fn test_new_mock_backend() {
        crate::init();
        let backend = new_backend(Config::new(BackendType::Mock)).unwrap();
        assert_eq!(backend.name(), "mock");
    }

    #[test]
    #[cfg(feature = "azure")]
    fn test_azure_alias_resolves_to_single_registration() {
        crate::init();

        let backend_type: BackendType = "azure".parse().unwrap();
        let backend = new_backend(Config::new(backend_type).with_subscription_id("s")).unwrap();
        assert_eq!(backend.name(), "azurerm");

        let names = registered_backends().unwrap();
        assert!(names.contains(&"azurerm".to_string()));
        assert!(!names.contains(&"azure".to_string()));
    }
}
