//! Mock backend for testing.
//!
//! This backend keeps groups and resources in memory, pages its listings
//! like a real provider, and can inject errors to simulate failures.

use crate::export::ExportSnapshot;
use crate::paging::{Lister, Page};
use crate::session::is_expired;
use crate::validation::{validate_group_name, validate_resource_name};
use crate::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Items per page when not configured.
const DEFAULT_PAGE_SIZE: usize = 100;

const GROUPS_LINK: &str = "mock://groups";

/// Mock backend for testing.
///
/// Listings are returned in name order, `page_size` items per page, with
/// continuation links of the form `mock://groups?skip=<n>`.
///
/// # Example
///
/// ```
/// use rgmux::backends::mock::MockBackend;
/// use rgmux::{Backend, RgmuxError, Tags};
///
/// #[tokio::main]
/// async fn main() -> rgmux::Result<()> {
///     let mut backend = MockBackend::new().with_page_size(1);
///     backend.init().await?;
///     backend.set_group("rg-a", "westus").await;
///     backend.set_group("rg-b", "eastus").await;
///
///     // Fail the second page of every listing
///     backend.list_error = Some((2, RgmuxError::Remote("throttled".to_string())));
///
///     let session = backend.authenticate().await?;
///     let result = backend.list_groups(&*session).await;
///     assert!(matches!(result, Err(RgmuxError::PageFetch { page: 2, .. })));
///
///     Ok(())
/// }
/// ```
pub struct MockBackend {
    subscription_id: String,
    groups: Arc<RwLock<BTreeMap<String, MockGroup>>>,
    page_size: usize,
    lister: Lister,
    session_ttl: Option<Duration>,
    page_requests: Arc<AtomicUsize>,

    /// Error to return from `authenticate()`
    pub auth_error: Option<RgmuxError>,
    /// Error to return when fetching the given 1-based page of any listing
    pub list_error: Option<(usize, RgmuxError)>,
    /// Error to return from `create_or_update_group()` and `create_or_update_resource()`
    pub create_error: Option<RgmuxError>,
    /// Error to return from `delete_group()` and `delete_resource()`
    pub delete_error: Option<RgmuxError>,
    /// Error to return from `export_template()`
    pub export_error: Option<RgmuxError>,
}

struct MockGroup {
    item: Item,
    resources: BTreeMap<String, (Item, ResourceSpec)>,
}

impl MockBackend {
    /// Creates a new mock backend with empty storage and a random
    /// subscription id.
    pub fn new() -> Self {
        Self {
            subscription_id: uuid::Uuid::new_v4().to_string(),
            groups: Arc::new(RwLock::new(BTreeMap::new())),
            page_size: DEFAULT_PAGE_SIZE,
            lister: Lister::new(),
            session_ttl: None,
            page_requests: Arc::new(AtomicUsize::new(0)),
            auth_error: None,
            list_error: None,
            create_error: None,
            delete_error: None,
            export_error: None,
        }
    }

    /// Creates a mock backend from configuration.
    ///
    /// Honors `subscription_id`, `max_pages` and the `page_size` option.
    pub fn from_config(config: Config) -> Result<Self> {
        let mut backend = Self::new();

        if let Some(id) = config.subscription_id {
            backend.subscription_id = id;
        }
        if let Some(size) = config.options.get("page_size") {
            let size = size.parse::<usize>().ok().filter(|n| *n > 0).ok_or_else(|| {
                RgmuxError::NotSupported(format!("page_size must be a positive integer, got '{}'", size))
            })?;
            backend = backend.with_page_size(size);
        }
        backend.lister = Lister::new().with_limit(config.max_pages);

        Ok(backend)
    }

    /// Sets the number of items per listing page (minimum 1).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Caps listings at `limit` pages.
    pub fn with_max_pages(mut self, limit: usize) -> Self {
        self.lister = Lister::new().max_pages(limit);
        self
    }

    /// Makes sessions expire `ttl` after authentication.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = Some(ttl);
        self
    }

    /// Subscription id used in item identifiers.
    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// Number of page fetches served so far.
    pub fn page_requests(&self) -> usize {
        self.page_requests.load(Ordering::SeqCst)
    }

    /// Pre-populates the backend with an untagged group.
    pub async fn set_group(&self, name: impl Into<String>, location: impl Into<String>) {
        let name = name.into();
        let item = Item::new_group(self.group_id(&name), name.clone(), location);
        let mut groups = self.groups.write().await;
        groups.insert(
            name,
            MockGroup {
                item,
                resources: BTreeMap::new(),
            },
        );
    }

    /// Returns whether a group exists.
    pub async fn has_group(&self, name: &str) -> bool {
        self.groups.read().await.contains_key(name)
    }

    /// Returns whether a resource exists in a group.
    pub async fn has_resource(&self, group: &str, name: &str) -> bool {
        self.groups
            .read()
            .await
            .get(group)
            .map(|g| g.resources.contains_key(name))
            .unwrap_or(false)
    }

    fn group_id(&self, name: &str) -> String {
        format!("/subscriptions/{}/resourceGroups/{}", self.subscription_id, name)
    }

    fn resource_id(&self, group: &str, resource: &ResourceSpec) -> String {
        format!(
            "/subscriptions/{}/{}",
            self.subscription_id,
            resource.path_in(group)
        )
    }

    fn injected(err: &Option<RgmuxError>) -> Result<()> {
        match err {
            Some(err) => Err(RgmuxError::Remote(err.to_string())),
            None => Ok(()),
        }
    }

    /// Slices `items` into the page addressed by `next_link`.
    fn page_of(&self, base: &str, items: Vec<Item>, next_link: Option<String>) -> Result<Page<Item>> {
        self.page_requests.fetch_add(1, Ordering::SeqCst);

        let skip = match next_link {
            None => 0,
            Some(link) => parse_skip(base, &link)?,
        };

        if let Some((page, err)) = &self.list_error {
            if skip / self.page_size + 1 == *page {
                return Err(RgmuxError::Remote(err.to_string()));
            }
        }

        let end = (skip + self.page_size).min(items.len());
        let page_items = items.get(skip..end).map(<[Item]>::to_vec).unwrap_or_default();

        if end < items.len() {
            Ok(Page::with_next(page_items, format!("{}?skip={}", base, end)))
        } else {
            Ok(Page::last(page_items))
        }
    }
}

fn parse_skip(base: &str, link: &str) -> Result<usize> {
    link.strip_prefix(base)
        .and_then(|rest| rest.strip_prefix("?skip="))
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| RgmuxError::Remote(format!("malformed continuation link '{}'", link)))
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Mock session, optionally expiring.
pub struct MockSession {
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl MockSession {
    fn new(ttl: Option<Duration>) -> Self {
        Self {
            token: "mock-session-token".to_string(),
            expires_at: ttl
                .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
                .map(|ttl| Utc::now() + ttl),
        }
    }
}

#[async_trait]
impl Session for MockSession {
    fn token(&self) -> &str {
        &self.token
    }

    async fn is_valid(&self) -> bool {
        !is_expired(self.expires_at, chrono::Duration::zero())
    }

    fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn lister(&self) -> Lister {
        self.lister
    }

    async fn init(&mut self) -> Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }

    async fn is_authenticated(&self) -> bool {
        self.auth_error.is_none()
    }

    async fn authenticate(&mut self) -> Result<Arc<dyn Session>> {
        Self::injected(&self.auth_error)?;
        Ok(Arc::new(MockSession::new(self.session_ttl)))
    }

    async fn create_or_update_group(
        &mut self,
        name: &str,
        location: &str,
        tags: &Tags,
        _session: &dyn Session,
    ) -> Result<Item> {
        validate_group_name(name)?;
        Self::injected(&self.create_error)?;

        let item = Item::new_group(self.group_id(name), name, location).with_tags(tags.clone());

        let mut groups = self.groups.write().await;
        match groups.get_mut(name) {
            Some(group) => group.item = item.clone(),
            None => {
                groups.insert(
                    name.to_string(),
                    MockGroup {
                        item: item.clone(),
                        resources: BTreeMap::new(),
                    },
                );
            }
        }
        Ok(item)
    }

    async fn list_groups_page(
        &self,
        next_link: Option<String>,
        _session: &dyn Session,
    ) -> Result<Page<Item>> {
        let items: Vec<Item> = {
            let groups = self.groups.read().await;
            groups.values().map(|g| g.item.clone()).collect()
        };
        self.page_of(GROUPS_LINK, items, next_link)
    }

    async fn delete_group(&mut self, name: &str, _session: &dyn Session) -> Result<()> {
        validate_group_name(name)?;
        Self::injected(&self.delete_error)?;

        let mut groups = self.groups.write().await;
        groups
            .remove(name)
            .ok_or_else(|| RgmuxError::NotFound(name.to_string()))?;
        Ok(())
    }

    async fn export_template(
        &self,
        group: &str,
        _session: &dyn Session,
    ) -> Result<ExportSnapshot> {
        validate_group_name(group)?;
        Self::injected(&self.export_error)?;

        let groups = self.groups.read().await;
        let entry = groups
            .get(group)
            .ok_or_else(|| RgmuxError::NotFound(group.to_string()))?;

        let resources: Vec<serde_json::Value> = entry
            .resources
            .values()
            .map(|(_, spec)| {
                serde_json::json!({
                    "type": spec.full_type(),
                    "name": spec.name,
                    "apiVersion": spec.api_version,
                    "location": spec.location,
                    "tags": spec.tags,
                    "properties": spec.properties,
                })
            })
            .collect();

        Ok(ExportSnapshot::new(serde_json::json!({
            "template": {
                "$schema": "https://schema.management.azure.com/schemas/2015-01-01/deploymentTemplate.json#",
                "contentVersion": "1.0.0.0",
                "parameters": {},
                "variables": {},
                "resources": resources,
            }
        })))
    }

    async fn create_or_update_resource(
        &mut self,
        group: &str,
        resource: &ResourceSpec,
        _session: &dyn Session,
    ) -> Result<Item> {
        validate_group_name(group)?;
        validate_resource_name(&resource.name)?;
        Self::injected(&self.create_error)?;

        let item = Item::new_resource(
            self.resource_id(group, resource),
            resource.name.clone(),
            resource.full_type(),
            resource.location.clone(),
        )
        .with_tags(resource.tags.clone());

        let mut groups = self.groups.write().await;
        let entry = groups
            .get_mut(group)
            .ok_or_else(|| RgmuxError::NotFound(group.to_string()))?;
        entry
            .resources
            .insert(resource.name.clone(), (item.clone(), resource.clone()));
        Ok(item)
    }

    async fn list_resources_page(
        &self,
        group: &str,
        next_link: Option<String>,
        _session: &dyn Session,
    ) -> Result<Page<Item>> {
        validate_group_name(group)?;

        let items: Vec<Item> = {
            let groups = self.groups.read().await;
            let entry = groups
                .get(group)
                .ok_or_else(|| RgmuxError::NotFound(group.to_string()))?;
            entry.resources.values().map(|(item, _)| item.clone()).collect()
        };
        let base = format!("mock://resourceGroups/{}/resources", group);
        self.page_of(&base, items, next_link)
    }

    async fn delete_resource(
        &mut self,
        group: &str,
        resource: &ResourceSpec,
        _session: &dyn Session,
    ) -> Result<()> {
        validate_group_name(group)?;
        validate_resource_name(&resource.name)?;
        Self::injected(&self.delete_error)?;

        let mut groups = self.groups.write().await;
        groups
            .get_mut(group)
            .and_then(|g| g.resources.remove(&resource.name))
            .ok_or_else(|| RgmuxError::NotFound(format!("{}/{}", group, resource.name)))?;
        Ok(())
    }
}

/// Registers the mock backend with the factory.
pub fn register() {
    crate::factory::register_backend("mock", |config| {
        Ok(Box::new(MockBackend::from_config(config)?))
    });
}
