//! Data structures for resource groups and resources.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag map attached to groups and resources.
///
/// A `BTreeMap` keeps keys sorted, so display and serialization order is
/// stable across runs.
pub type Tags = BTreeMap<String, String>;

/// A resource group or resource returned by a provider listing.
///
/// `id` is the provider's full identifier and is never empty once returned
/// by a provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    /// Provider identifier (e.g. `/subscriptions/<sub>/resourceGroups/<name>`)
    pub id: String,

    /// Display name
    pub name: String,

    /// Item type
    #[serde(rename = "kind")]
    pub item_type: ItemType,

    /// Region the item lives in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Provider type string (e.g. `Microsoft.KeyVault/vaults`)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    /// Tags, sorted by key
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: Tags,

    /// Provider status (e.g. `Succeeded`, `Deleting`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

impl Item {
    /// Creates a resource group item.
    ///
    /// # Example
    ///
    /// ```
    /// use rgmux::Item;
    ///
    /// let group = Item::new_group("/subscriptions/s/resourceGroups/rg", "rg", "westus");
    /// assert_eq!(group.name, "rg");
    /// assert_eq!(group.location.as_deref(), Some("westus"));
    /// ```
    pub fn new_group(
        id: impl Into<String>,
        name: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            item_type: ItemType::ResourceGroup,
            location: Some(location.into()),
            resource_type: Some("Microsoft.Resources/resourceGroups".to_string()),
            tags: Tags::new(),
            provisioning_state: Some("Succeeded".to_string()),
        }
    }

    /// Creates a resource item.
    pub fn new_resource(
        id: impl Into<String>,
        name: impl Into<String>,
        resource_type: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            item_type: ItemType::Resource,
            location: Some(location.into()),
            resource_type: Some(resource_type.into()),
            tags: Tags::new(),
            provisioning_state: None,
        }
    }

    /// Returns the item with `tags` replacing its current tags.
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }
}

/// Kind of managed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ItemType {
    /// A resource group
    ResourceGroup,
    /// A resource inside a group
    Resource,
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ResourceGroup => write!(f, "ResourceGroup"),
            Self::Resource => write!(f, "Resource"),
        }
    }
}

/// Definition of a generic resource to create, tag, and delete.
///
/// A resource is addressed by provider namespace, type and name inside a
/// group, and is written with its own api-version.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSpec {
    /// Provider namespace (e.g. `Microsoft.KeyVault`)
    pub namespace: String,
    /// Resource type within the namespace (e.g. `vaults`)
    pub resource_type: String,
    /// Resource name
    pub name: String,
    /// api-version used for PUT/DELETE on this resource
    pub api_version: String,
    /// Region
    pub location: String,
    /// Provider-specific `properties` body
    pub properties: serde_json::Value,
    /// Tags to apply
    pub tags: Tags,
}

impl ResourceSpec {
    /// Builds a key vault definition for `tenant_id`.
    ///
    /// ```
    /// use rgmux::ResourceSpec;
    ///
    /// let vault = ResourceSpec::key_vault("azureSampleVault", "westus", "tenant");
    /// assert_eq!(vault.full_type(), "Microsoft.KeyVault/vaults");
    /// assert_eq!(vault.properties["sku"]["name"], "standard");
    /// ```
    pub fn key_vault(
        name: impl Into<String>,
        location: impl Into<String>,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self {
            namespace: "Microsoft.KeyVault".to_string(),
            resource_type: "vaults".to_string(),
            name: name.into(),
            api_version: "2015-06-01".to_string(),
            location: location.into(),
            properties: serde_json::json!({
                "sku": {
                    "family": "A",
                    "name": "standard"
                },
                "tenantId": tenant_id.into(),
                "accessPolicies": [],
                "enabledForDeployment": true
            }),
            tags: Tags::new(),
        }
    }

    /// Returns `<namespace>/<type>`.
    pub fn full_type(&self) -> String {
        format!("{}/{}", self.namespace, self.resource_type)
    }

    /// Returns the path of this resource below the subscription.
    ///
    /// ```
    /// use rgmux::ResourceSpec;
    ///
    /// let vault = ResourceSpec::key_vault("kv", "westus", "t");
    /// assert_eq!(
    ///     vault.path_in("rg"),
    ///     "resourceGroups/rg/providers/Microsoft.KeyVault/vaults/kv"
    /// );
    /// ```
    pub fn path_in(&self, group: &str) -> String {
        format!(
            "resourceGroups/{}/providers/{}/{}/{}",
            group, self.namespace, self.resource_type, self.name
        )
    }

    /// Request body for a create-or-update call.
    pub fn body(&self) -> serde_json::Value {
        serde_json::json!({
            "location": self.location,
            "properties": self.properties,
            "tags": self.tags,
        })
    }
}
