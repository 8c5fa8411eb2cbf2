//! Backend trait definition for resource-management integrations.
//!
//! This module defines the core [`Backend`] trait that all providers must
//! satisfy. Required methods are single remote calls; the provided methods
//! build whole listings and exports on top of them.

use crate::export::{export_once, template_file_name, ExportSnapshot};
use crate::paging::{Lister, Page};
use crate::{Item, ResourceSpec, Result, Session, Tags};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Backend represents a resource-management API.
///
/// All implementations must be `Send + Sync` to support concurrent access
/// across async tasks.
///
/// # Implementations
///
/// - **SDK-based**: Azure Resource Manager (REST + `azure_identity`)
/// - **Testing**: Mock backend with paging and error injection
///
/// # Example
///
/// ```
/// use rgmux::{Backend, Config, BackendType, Tags};
///
/// #[tokio::main]
/// async fn main() -> rgmux::Result<()> {
///     rgmux::init();
///     let mut backend = rgmux::factory::new_backend(Config::new(BackendType::Mock))?;
///
///     backend.init().await?;
///     let session = backend.authenticate().await?;
///
///     backend.create_or_update_group("rg", "westus", &Tags::new(), &*session).await?;
///     let groups = backend.list_groups(&*session).await?;
///
///     assert_eq!(groups.len(), 1);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait Backend: Send + Sync {
    // ========================================================================
    // Metadata
    // ========================================================================

    /// Returns the backend name (e.g., "mock", "azurerm").
    fn name(&self) -> &str;

    /// Pager used by [`list_groups`](Backend::list_groups) and
    /// [`list_resources`](Backend::list_resources). Uncapped by default.
    fn lister(&self) -> Lister {
        Lister::new()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Initializes the backend.
    ///
    /// Validates configuration and sets up HTTP clients and credentials.
    async fn init(&mut self) -> Result<()>;

    /// Closes the backend and releases resources.
    async fn close(&mut self) -> Result<()>;

    // ========================================================================
    // Authentication
    // ========================================================================

    /// Checks if the backend has what it needs to authenticate.
    async fn is_authenticated(&self) -> bool;

    /// Acquires credentials and returns a session.
    ///
    /// # Errors
    ///
    /// - [`RgmuxError::NotAuthenticated`](crate::RgmuxError::NotAuthenticated):
    ///   `init()` has not been called
    /// - [`RgmuxError::Remote`](crate::RgmuxError::Remote): the credential
    ///   source rejected the request
    async fn authenticate(&mut self) -> Result<Arc<dyn Session>>;

    // ========================================================================
    // Resource groups
    // ========================================================================

    /// Creates a resource group, or replaces its location and tags if it
    /// already exists. Returns the group as the provider reports it.
    ///
    /// # Errors
    ///
    /// - [`RgmuxError::InvalidName`](crate::RgmuxError::InvalidName):
    ///   `name` is not a valid group name
    async fn create_or_update_group(
        &mut self,
        name: &str,
        location: &str,
        tags: &Tags,
        session: &dyn Session,
    ) -> Result<Item>;

    /// Fetches one page of resource groups in the subscription.
    ///
    /// `next_link` is `None` for the first page, then the previous page's
    /// continuation link.
    async fn list_groups_page(
        &self,
        next_link: Option<String>,
        session: &dyn Session,
    ) -> Result<Page<Item>>;

    /// Deletes a resource group and everything in it. Waits for the provider
    /// to finish.
    ///
    /// # Errors
    ///
    /// - [`RgmuxError::NotFound`](crate::RgmuxError::NotFound): no such group
    async fn delete_group(&mut self, name: &str, session: &dyn Session) -> Result<()>;

    /// Exports the template of a resource group covering all its resources.
    async fn export_template(&self, group: &str, session: &dyn Session)
        -> Result<ExportSnapshot>;

    // ========================================================================
    // Resources
    // ========================================================================

    /// Creates a resource in `group`, or replaces it if it exists.
    ///
    /// # Errors
    ///
    /// - [`RgmuxError::NotFound`](crate::RgmuxError::NotFound): `group` does
    ///   not exist
    async fn create_or_update_resource(
        &mut self,
        group: &str,
        resource: &ResourceSpec,
        session: &dyn Session,
    ) -> Result<Item>;

    /// Fetches one page of resources in `group`.
    async fn list_resources_page(
        &self,
        group: &str,
        next_link: Option<String>,
        session: &dyn Session,
    ) -> Result<Page<Item>>;

    /// Deletes a resource.
    ///
    /// # Errors
    ///
    /// - [`RgmuxError::NotFound`](crate::RgmuxError::NotFound): no such resource
    async fn delete_resource(
        &mut self,
        group: &str,
        resource: &ResourceSpec,
        session: &dyn Session,
    ) -> Result<()>;

    // ========================================================================
    // Provided
    // ========================================================================

    /// Lists every resource group, following continuation links.
    ///
    /// # Errors
    ///
    /// [`RgmuxError::PageFetch`](crate::RgmuxError::PageFetch) naming the page
    /// that failed. No partial listing is returned.
    async fn list_groups(&self, session: &dyn Session) -> Result<Vec<Item>> {
        self.lister()
            .list_all(|next| self.list_groups_page(next, session))
            .await
    }

    /// Lists every resource in `group`, following continuation links.
    async fn list_resources(&self, group: &str, session: &dyn Session) -> Result<Vec<Item>> {
        self.lister()
            .list_all(|next| self.list_resources_page(group, next, session))
            .await
    }

    /// Exports the template of `group` to `<dir>/<group>-template.json`.
    ///
    /// # Errors
    ///
    /// [`RgmuxError::AlreadyExists`](crate::RgmuxError::AlreadyExists) if the
    /// file is already there; no export is requested in that case.
    async fn export_template_to(
        &self,
        group: &str,
        dir: &Path,
        session: &dyn Session,
    ) -> Result<PathBuf> {
        let path = dir.join(template_file_name(group));
        export_once(|| self.export_template(group, session), path).await
    }
}
