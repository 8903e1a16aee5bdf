//! Administrative operations on zones, instance groups and instances.
//!
//! Unlike the [`crate::monitor`], nothing here keeps state between calls.
use std::collections::HashMap;

use futures::TryStreamExt;

use crate::compute::{
    ComputeAdmin, Error, GroupLister, InstanceDetail, Result, group_members, project_zones,
    zone_groups,
};
use crate::resource::{GroupRef, InstanceRef, Zone};

/// Compute Engine operations scoped to one project.
#[derive(Debug, Clone)]
pub struct Toolbox<C> {
    compute: C,
    project: String,
}

impl<C> Toolbox<C>
where
    C: ComputeAdmin + GroupLister,
{
    pub fn new(compute: C, project: impl Into<String>) -> Self {
        Self {
            compute,
            project: project.into(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub async fn zones(&self) -> Result<Vec<Zone>> {
        project_zones(&self.compute, &self.project).try_collect().await
    }

    /// Returns the instance groups of `zone`, keyed by group name.
    pub async fn groups_of_zone(&self, zone: &str) -> Result<HashMap<String, GroupRef>> {
        zone_groups(&self.compute, &self.project, zone)
            .map_ok(|group| (group.name().to_owned(), group))
            .try_collect()
            .await
    }

    /// Returns the instance groups of every zone, keyed by group name.
    ///
    /// Groups sharing a name in different zones collapse into the one listed last.
    pub async fn all_groups(&self) -> Result<HashMap<String, GroupRef>> {
        let mut groups = HashMap::new();
        for zone in self.zones().await? {
            groups.extend(self.groups_of_zone(zone.name()).await?);
        }
        Ok(groups)
    }

    /// Looks up a group by name across all zones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no zone has a group called `name`.
    pub async fn find_group(&self, name: &str) -> Result<GroupRef> {
        self.all_groups()
            .await?
            .remove(name)
            .ok_or_else(|| Error::NotFound {
                resource: format!("instance group `{name}`"),
            })
    }

    pub async fn group_size(&self, group: &GroupRef) -> Result<u32> {
        self.compute.group_size(group).await
    }

    pub async fn members(&self, group: &GroupRef) -> Result<Vec<InstanceRef>> {
        group_members(&self.compute, group).try_collect().await
    }

    /// Adds one instance to `group`. Returns the requested size.
    pub async fn grow_group(&self, group: &GroupRef) -> Result<u32> {
        let size = self.group_size(group).await? + 1;
        self.compute.resize_group(group, size).await?;
        log::info!("Resized group {} to {}", group, size);
        Ok(size)
    }

    /// Removes the oldest member of `group`, by creation time.
    ///
    /// Returns the removed instance, or `None` if the group has no members.
    pub async fn shrink_group(&self, group: &GroupRef) -> Result<Option<InstanceRef>> {
        let mut oldest: Option<(InstanceRef, InstanceDetail)> = None;
        for member in self.members(group).await? {
            let detail = self.compute.instance_detail(&member).await?;
            if oldest
                .as_ref()
                .is_none_or(|(_, current)| detail.created_at < current.created_at)
            {
                oldest = Some((member, detail));
            }
        }

        let Some((instance, _)) = oldest else {
            log::warn!("Group {} has no members to remove", group);
            return Ok(None);
        };
        self.compute.remove_group_instance(group, &instance).await?;
        log::info!("Removed {} from group {}", instance, group);
        Ok(Some(instance))
    }

    pub async fn instance_detail(&self, instance: &InstanceRef) -> Result<InstanceDetail> {
        self.compute.instance_detail(instance).await
    }

    pub async fn start_instance(&self, instance: &InstanceRef) -> Result<()> {
        self.compute.start_instance(instance).await
    }

    pub async fn stop_instance(&self, instance: &InstanceRef) -> Result<()> {
        self.compute.stop_instance(instance).await
    }

    /// Creates instance `name` in `zone` from the instance template `template`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resource`] if `name` is not a valid instance name, without
    /// calling the API.
    pub async fn create_instance(
        &self,
        zone: &str,
        name: &str,
        template: &str,
    ) -> Result<InstanceRef> {
        let instance = InstanceRef::try_new(&self.project, zone, name)?;
        self.compute
            .create_instance_from_template(&instance, template)
            .await?;
        log::info!("Created {} from template `{}`", instance, template);
        Ok(instance)
    }
}
