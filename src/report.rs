//! Plain-text rendering of listings.

use crate::{Item, Tags};
use std::fmt::Write;

fn tag_block(tags: &Tags, indent: &str) -> String {
    let mut out = String::from("\n");
    if tags.is_empty() {
        let _ = writeln!(out, "{}No tags yet", indent);
    }
    for (key, value) in tags {
        let _ = writeln!(out, "{}{} = {}", indent, key, value);
    }
    out
}

/// Renders the resource groups of a subscription.
///
/// ```
/// use rgmux::{report, Item};
///
/// let text = report::format_groups(&[Item::new_group("/g/rg", "rg", "westus")]);
/// assert!(text.starts_with("Resource groups in subscription\nResource group 'rg'\n"));
/// assert!(text.contains("\t\tNo tags yet\n"));
/// ```
pub fn format_groups(groups: &[Item]) -> String {
    if groups.is_empty() {
        return "There aren't any resource groups\n".to_string();
    }

    let mut out = String::from("Resource groups in subscription\n");
    for group in groups {
        let _ = writeln!(out, "Resource group '{}'", group.name);
        let _ = writeln!(out, "\tID: {}", group.id);
        let _ = writeln!(out, "\tLocation: {}", group.location.as_deref().unwrap_or(""));
        let _ = writeln!(
            out,
            "\tProvisioning state: {}",
            group.provisioning_state.as_deref().unwrap_or("")
        );
        let _ = writeln!(out, "\tTags: {}", tag_block(&group.tags, "\t\t"));
    }
    out
}

/// Renders the resources inside `group`.
pub fn format_resources(group: &str, resources: &[Item]) -> String {
    if resources.is_empty() {
        return format!("There aren't any resources inside '{}' resource group\n", group);
    }

    let mut out = format!("Resources in '{}' resource group\n", group);
    for resource in resources {
        let _ = writeln!(out, "\tResource '{}'", resource.name);
        let _ = writeln!(out, "\t\tID: {}", resource.id);
        let _ = writeln!(out, "\t\tLocation: {}", resource.location.as_deref().unwrap_or(""));
        let _ = writeln!(out, "\t\tType: {}", resource.resource_type.as_deref().unwrap_or(""));
        let _ = writeln!(out, "\t\tTags: {}", tag_block(&resource.tags, "\t\t\t"));
    }
    out
}
