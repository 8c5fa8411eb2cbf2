//! Resource Manager JSON shapes.

use crate::{Item, ItemType, Tags};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(super) struct GroupWire {
    id: String,
    name: String,
    #[serde(rename = "type")]
    resource_type: Option<String>,
    location: Option<String>,
    #[serde(default)]
    tags: Option<Tags>,
    properties: Option<GroupProperties>,
}

#[derive(Debug, Deserialize)]
struct GroupProperties {
    #[serde(rename = "provisioningState")]
    provisioning_state: Option<String>,
}

impl From<GroupWire> for Item {
    fn from(g: GroupWire) -> Self {
        Item {
            id: g.id,
            name: g.name,
            item_type: ItemType::ResourceGroup,
            location: g.location,
            resource_type: g.resource_type,
            tags: g.tags.unwrap_or_default(),
            provisioning_state: g.properties.and_then(|p| p.provisioning_state),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ResourceWire {
    id: String,
    name: String,
    #[serde(rename = "type")]
    resource_type: Option<String>,
    location: Option<String>,
    #[serde(default)]
    tags: Option<Tags>,
    #[serde(rename = "provisioningState")]
    provisioning_state: Option<String>,
    properties: Option<serde_json::Value>,
}

impl From<ResourceWire> for Item {
    fn from(r: ResourceWire) -> Self {
        // Listings carry the state at the top level, single GETs inside properties.
        let provisioning_state = r.provisioning_state.or_else(|| {
            r.properties
                .as_ref()
                .and_then(|p| p.get("provisioningState"))
                .and_then(|s| s.as_str())
                .map(str::to_string)
        });

        Item {
            id: r.id,
            name: r.name,
            item_type: ItemType::Resource,
            location: r.location,
            resource_type: r.resource_type,
            tags: r.tags.unwrap_or_default(),
            provisioning_state,
        }
    }
}
