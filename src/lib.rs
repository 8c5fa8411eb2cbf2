//! rgmux - resource-group management over pluggable cloud backends.
//!
//! rgmux creates, tags, lists, exports and deletes resource groups and the
//! generic resources inside them. Every provider sits behind the same
//! [`Backend`] trait, so code written against the mock backend runs
//! unchanged against Azure Resource Manager.
//!
//! # Features
//!
//! - **Complete listings**: continuation links are followed until the
//!   provider stops returning them ([`paging`])
//! - **Safe exports**: a template export never overwrites an existing file
//!   ([`export`])
//! - **Async/Await**: Built on tokio for non-blocking I/O
//! - **Error Context**: Rich error types with full context and chaining
//! - **Feature Flags**: Optional backend compilation to minimize dependencies
//!
//! # Quick Start
//!
//! ```no_run
//! use rgmux::{factory, sample, Config, BackendType, Backend};
//!
//! #[tokio::main]
//! async fn main() -> rgmux::Result<()> {
//!     rgmux::init();
//!
//!     let config = Config::from_env(BackendType::AzureResourceManager)?;
//!     let tenant = config.tenant_id.clone().unwrap_or_default();
//!
//!     let mut backend = factory::new_backend(config)?;
//!     backend.init().await?;
//!     let session = backend.authenticate().await?;
//!
//!     let plan = sample::SamplePlan::new(tenant);
//!     let report = sample::run(&mut *backend, &*session, &plan, |_| async { Ok(()) }).await?;
//!     println!("{}", rgmux::report::format_groups(&report.groups));
//!
//!     Ok(())
//! }
//! ```
//!
//! # Supported Backends
//!
//! | Backend | Feature Flag | Notes |
//! |---------|-------------|-------|
//! | Mock | `mock` (default) | In-memory, paging and error injection |
//! | Azure Resource Manager | `azure` | REST + `azure_identity` |
//!
//! Use `full` to enable all backends:
//!
//! ```toml
//! [dependencies]
//! rgmux = { version = "0.1", features = ["full"] }
//! ```

pub mod backend;
pub mod session;
pub mod item;
pub mod error;
pub mod config;
pub mod factory;
pub mod validation;
pub mod paging;
pub mod export;
pub mod report;
pub mod sample;
pub mod backends;

pub use backend::Backend;
pub use session::Session;
pub use item::{Item, ItemType, ResourceSpec, Tags};
pub use error::{ErrorKind, Result, RgmuxError};
pub use config::{BackendType, Config};
pub use paging::{Lister, Page};
pub use export::{export_once, ExportSnapshot};

use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes the rgmux library.
///
/// Registers all compiled backends with the factory. Call it before
/// [`factory::new_backend`]; repeated calls do nothing.
pub fn init() {
    INIT.call_once(backends::register_all);
}
