//! End-to-end walkthrough of group and resource management.
//!
//! [`run`] creates a resource group, tags it, lists the subscription's
//! groups, puts a generic resource into the group, tags it, lists the
//! group's resources, exports the group template, waits for confirmation,
//! then deletes the resource and the group.

use crate::export::template_file_name;
use crate::{Backend, Item, ResourceSpec, Result, Session, Tags};
use std::future::Future;
use std::path::PathBuf;
use tracing::{info, warn};

/// Default resource group name.
pub const DEFAULT_GROUP: &str = "azure-sample-group";

/// Default region.
pub const DEFAULT_LOCATION: &str = "westus";

/// Default key vault name.
pub const DEFAULT_VAULT: &str = "rustrocksonazure";

/// What [`run`] does when a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnFailure {
    /// Leave whatever was created in place.
    #[default]
    Leave,
    /// Try to delete the group before returning the error.
    DeleteGroup,
}

/// Parameters of one sample run.
#[derive(Debug, Clone)]
pub struct SamplePlan {
    /// Resource group to create
    pub group: String,

    /// Region for the group and the resource
    pub location: String,

    /// Tags applied to both the group and the resource
    pub tags: Tags,

    /// Resource created inside the group
    pub resource: ResourceSpec,

    /// Directory receiving `<group>-template.json`
    pub output_dir: PathBuf,

    /// Compensating action on failure
    pub on_failure: OnFailure,
}

impl SamplePlan {
    /// Creates the default plan: a key vault owned by `tenant_id` in
    /// `azure-sample-group`, exported to the current directory.
    pub fn new(tenant_id: impl Into<String>) -> Self {
        let mut tags = Tags::new();
        tags.insert("who rocks".to_string(), "rust".to_string());
        tags.insert("where".to_string(), "on azure".to_string());

        Self {
            group: DEFAULT_GROUP.to_string(),
            location: DEFAULT_LOCATION.to_string(),
            tags,
            resource: ResourceSpec::key_vault(DEFAULT_VAULT, DEFAULT_LOCATION, tenant_id),
            output_dir: PathBuf::from("."),
            on_failure: OnFailure::Leave,
        }
    }

    /// Sets the group name.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Sets the region of the group and the resource.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self.resource.location = self.location.clone();
        self
    }

    /// Replaces the tags.
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    /// Sets the export directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Sets the failure behavior.
    pub fn with_on_failure(mut self, on_failure: OnFailure) -> Self {
        self.on_failure = on_failure;
        self
    }

    /// Path the template export is written to.
    pub fn template_path(&self) -> PathBuf {
        self.output_dir.join(template_file_name(&self.group))
    }
}

/// What a successful run observed.
#[derive(Debug, Clone)]
pub struct SampleReport {
    /// Every group in the subscription after tagging
    pub groups: Vec<Item>,

    /// Every resource in the sample group after tagging
    pub resources: Vec<Item>,

    /// Where the template was saved
    pub template_path: PathBuf,
}

/// Runs the walkthrough.
///
/// `confirm` receives what the run has observed so far and is awaited after
/// the export, before anything is deleted. On failure the error of the
/// failing step is returned; with [`OnFailure::DeleteGroup`] the group delete
/// is attempted first and its own failure is only logged.
pub async fn run<F, Fut>(
    backend: &mut dyn Backend,
    session: &dyn Session,
    plan: &SamplePlan,
    confirm: F,
) -> Result<SampleReport>
where
    F: FnOnce(SampleReport) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    match steps(backend, session, plan, confirm).await {
        Ok(report) => Ok(report),
        Err(err) => {
            if plan.on_failure == OnFailure::DeleteGroup {
                warn!(group = %plan.group, error = %err, "sample failed, deleting resource group");
                if let Err(cleanup) = backend.delete_group(&plan.group, session).await {
                    warn!(group = %plan.group, error = %cleanup, "cleanup failed");
                }
            }
            Err(err)
        }
    }
}

async fn steps<F, Fut>(
    backend: &mut dyn Backend,
    session: &dyn Session,
    plan: &SamplePlan,
    confirm: F,
) -> Result<SampleReport>
where
    F: FnOnce(SampleReport) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let group = plan.group.as_str();

    info!(group, location = %plan.location, "creating resource group");
    backend
        .create_or_update_group(group, &plan.location, &Tags::new(), session)
        .await?;

    info!(group, "updating resource group");
    backend
        .create_or_update_group(group, &plan.location, &plan.tags, session)
        .await?;

    info!("listing resource groups");
    let groups = backend.list_groups(session).await?;

    let mut resource = plan.resource.clone();
    resource.tags = Tags::new();
    info!(group, resource = %resource.name, kind = %resource.full_type(), "creating resource");
    backend
        .create_or_update_resource(group, &resource, session)
        .await?;

    resource.tags = plan.tags.clone();
    info!(group, resource = %resource.name, "updating resource");
    backend
        .create_or_update_resource(group, &resource, session)
        .await?;

    info!(group, "listing resources");
    let resources = backend.list_resources(group, session).await?;

    info!(group, "exporting resource group template");
    let template_path = backend
        .export_template_to(group, &plan.output_dir, session)
        .await?;

    let report = SampleReport {
        groups,
        resources,
        template_path,
    };
    confirm(report.clone()).await?;

    info!(group, resource = %resource.name, "deleting resource");
    backend.delete_resource(group, &resource, session).await?;

    info!(group, "deleting resource group");
    backend.delete_group(group, session).await?;

    Ok(report)
}
