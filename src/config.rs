//! Configuration types for backend initialization.

use crate::{Result, RgmuxError};
use std::collections::HashMap;
use std::time::Duration;

/// Default Azure Resource Manager endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

/// Environment variable holding the subscription id.
pub const ENV_SUBSCRIPTION_ID: &str = "AZURE_SUBSCRIPTION_ID";
/// Environment variable holding the tenant id.
pub const ENV_TENANT_ID: &str = "AZURE_TENANT_ID";
/// Environment variable overriding the management endpoint.
pub const ENV_ENDPOINT: &str = "AZURE_RESOURCE_MANAGER_ENDPOINT";

/// Backend type identifier.
///
/// Each variant corresponds to a specific backend implementation.
/// Backends must be enabled via Cargo feature flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendType {
    /// In-memory backend for tests and dry runs
    Mock,
    /// Azure Resource Manager REST backend
    AzureResourceManager,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mock => write!(f, "mock"),
            Self::AzureResourceManager => write!(f, "azurerm"),
        }
    }
}

impl std::str::FromStr for BackendType {
    type Err = RgmuxError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mock" => Ok(Self::Mock),
            "azurerm" | "azure" => Ok(Self::AzureResourceManager),
            other => Err(RgmuxError::NotSupported(format!("unknown backend type '{}'", other))),
        }
    }
}

/// Configuration for creating a backend.
///
/// ```
/// use rgmux::{Config, BackendType};
///
/// let config = Config::new(BackendType::AzureResourceManager)
///     .with_subscription_id("00000000-0000-0000-0000-000000000000")
///     .with_tenant_id("11111111-1111-1111-1111-111111111111")
///     .with_max_pages(50);
/// assert_eq!(config.max_pages, Some(50));
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend type
    pub backend: BackendType,

    /// Subscription the resource groups live in
    pub subscription_id: Option<String>,

    /// Tenant the credentials belong to
    pub tenant_id: Option<String>,

    /// Management endpoint (default: [`DEFAULT_ENDPOINT`])
    pub endpoint: String,

    /// Upper bound on pages per listing. `None` follows continuation links
    /// until the provider stops returning them.
    pub max_pages: Option<usize>,

    /// Delay between long-running operation polls when the provider sends no
    /// `Retry-After` header (default: 5 seconds)
    pub poll_interval: Duration,

    /// Maximum number of polls for one long-running operation (default: 120)
    pub max_polls: usize,

    /// Backend-specific options
    pub options: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendType::Mock,
            subscription_id: None,
            tenant_id: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_pages: None,
            poll_interval: Duration::from_secs(5),
            max_polls: 120,
            options: HashMap::new(),
        }
    }
}

impl Config {
    /// Creates a new configuration for the specified backend.
    ///
    /// ```
    /// use rgmux::{Config, BackendType};
    ///
    /// let config = Config::new(BackendType::Mock);
    /// assert_eq!(config.backend, BackendType::Mock);
    /// ```
    pub fn new(backend: BackendType) -> Self {
        Self {
            backend,
            ..Default::default()
        }
    }

    /// Builds a configuration from the process environment.
    ///
    /// The Azure backend needs `AZURE_SUBSCRIPTION_ID` and `AZURE_TENANT_ID`;
    /// every missing variable is reported in one
    /// [`RgmuxError::MissingEnvironment`]. The mock backend takes whatever is
    /// present.
    pub fn from_env(backend: BackendType) -> Result<Self> {
        Self::from_lookup(backend, |key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an injectable variable lookup.
    pub fn from_lookup<F>(backend: BackendType, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let subscription_id = get(ENV_SUBSCRIPTION_ID);
        let tenant_id = get(ENV_TENANT_ID);

        if backend == BackendType::AzureResourceManager {
            let missing: Vec<String> = [
                (ENV_SUBSCRIPTION_ID, subscription_id.is_none()),
                (ENV_TENANT_ID, tenant_id.is_none()),
            ]
            .iter()
            .filter(|(_, absent)| *absent)
            .map(|(name, _)| name.to_string())
            .collect();

            if !missing.is_empty() {
                return Err(RgmuxError::MissingEnvironment(missing));
            }
        }

        let mut config = Self::new(backend);
        config.subscription_id = subscription_id;
        config.tenant_id = tenant_id;
        if let Some(endpoint) = get(ENV_ENDPOINT) {
            config.endpoint = endpoint;
        }
        Ok(config)
    }

    /// Sets the subscription id.
    pub fn with_subscription_id(mut self, id: impl Into<String>) -> Self {
        self.subscription_id = Some(id.into());
        self
    }

    /// Sets the tenant id.
    pub fn with_tenant_id(mut self, id: impl Into<String>) -> Self {
        self.tenant_id = Some(id.into());
        self
    }

    /// Overrides the management endpoint (sovereign clouds, test servers).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Caps the number of pages a single listing may fetch.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Sets the fallback delay between long-running operation polls.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the maximum number of polls for one long-running operation.
    pub fn with_max_polls(mut self, max_polls: usize) -> Self {
        self.max_polls = max_polls;
        self
    }

    /// Adds a backend-specific option.
    ///
    /// **Mock:**
    /// - `page_size`: items per listing page (default 100)
    ///
    /// **Azure Resource Manager:**
    /// - `groups_api_version`: api-version for group calls (default "2021-04-01")
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Gets a backend-specific option value.
    pub fn get_option(&self, key: &str) -> Option<&String> {
        self.options.get(key)
    }
}
