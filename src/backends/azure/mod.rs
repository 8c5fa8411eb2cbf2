//! Azure Resource Manager backend.
//!
//! This backend talks to the Azure Resource Manager REST API over `reqwest`,
//! with bearer tokens from the official Azure identity crate.
//!
//! # Authentication
//!
//! The backend uses DefaultAzureCredential, which tries multiple authentication methods:
//! - Environment variables (AZURE_TENANT_ID, AZURE_CLIENT_ID, AZURE_CLIENT_SECRET)
//! - Managed Identity (when running in Azure)
//! - Azure CLI credentials
//!
//! # Configuration
//!
//! - `subscription_id`: required (config or `AZURE_SUBSCRIPTION_ID`)
//! - `endpoint`: management endpoint, default `https://management.azure.com`
//! - option `groups_api_version`: api-version for group calls
//!
//! # Example
//!
//! ```
//! use rgmux::{Config, BackendType};
//!
//! let config = Config::new(BackendType::AzureResourceManager)
//!     .with_subscription_id("00000000-0000-0000-0000-000000000000")
//!     .with_option("groups_api_version", "2021-04-01");
//! ```

mod backend;
mod poller;
mod session;
mod wire;

pub use backend::AzureBackend;
pub use session::AzureSession;

use crate::factory;

/// Registers the Azure Resource Manager backend with the factory.
///
/// The `azure` spelling is accepted by [`BackendType`](crate::BackendType)'s
/// `FromStr` and resolves to the same registration.
pub fn register() {
    factory::register_backend("azurerm", |config| Ok(Box::new(AzureBackend::new(config))));
}
