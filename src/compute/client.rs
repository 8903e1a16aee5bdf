use std::sync::Arc;

use futures::Stream;

use crate::resource::{GroupRef, InstanceRef, Zone};

use super::pager::{Page, paginate};
use super::{InstanceDetail, Result};

/// Read-only listing of instance groups and their members.
///
/// This is the only part of the compute API the environment monitor needs.
pub trait GroupLister: Send + Sync {
    /// Lists one page of the instance groups in `zone`.
    fn list_groups(
        &self,
        project: &str,
        zone: &str,
        page_token: Option<String>,
    ) -> impl Future<Output = Result<Page<GroupRef>>> + Send;

    /// Lists one page of the instances that are members of `group`.
    fn list_group_instances(
        &self,
        group: &GroupRef,
        page_token: Option<String>,
    ) -> impl Future<Output = Result<Page<InstanceRef>>> + Send;
}

/// Operations that inspect or change individual compute resources.
pub trait ComputeAdmin: Send + Sync {
    fn list_zones(
        &self,
        project: &str,
        page_token: Option<String>,
    ) -> impl Future<Output = Result<Page<Zone>>> + Send;

    /// Returns the current number of instances in `group`.
    fn group_size(&self, group: &GroupRef) -> impl Future<Output = Result<u32>> + Send;

    fn instance_detail(
        &self,
        instance: &InstanceRef,
    ) -> impl Future<Output = Result<InstanceDetail>> + Send;

    /// Sets the target size of the managed instance group.
    fn resize_group(&self, group: &GroupRef, size: u32)
    -> impl Future<Output = Result<()>> + Send;

    /// Deletes `instance` from the managed instance group, shrinking its target size.
    fn remove_group_instance(
        &self,
        group: &GroupRef,
        instance: &InstanceRef,
    ) -> impl Future<Output = Result<()>> + Send;

    fn start_instance(&self, instance: &InstanceRef) -> impl Future<Output = Result<()>> + Send;

    fn stop_instance(&self, instance: &InstanceRef) -> impl Future<Output = Result<()>> + Send;

    /// Creates `instance` from an instance template. `template` is either a bare
    /// template name in the instance's project or a template resource URL.
    fn create_instance_from_template(
        &self,
        instance: &InstanceRef,
        template: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

impl<T: GroupLister> GroupLister for Arc<T> {
    fn list_groups(
        &self,
        project: &str,
        zone: &str,
        page_token: Option<String>,
    ) -> impl Future<Output = Result<Page<GroupRef>>> + Send {
        (**self).list_groups(project, zone, page_token)
    }

    fn list_group_instances(
        &self,
        group: &GroupRef,
        page_token: Option<String>,
    ) -> impl Future<Output = Result<Page<InstanceRef>>> + Send {
        (**self).list_group_instances(group, page_token)
    }
}

impl<T: ComputeAdmin> ComputeAdmin for Arc<T> {
    fn list_zones(
        &self,
        project: &str,
        page_token: Option<String>,
    ) -> impl Future<Output = Result<Page<Zone>>> + Send {
        (**self).list_zones(project, page_token)
    }

    fn group_size(&self, group: &GroupRef) -> impl Future<Output = Result<u32>> + Send {
        (**self).group_size(group)
    }

    fn instance_detail(
        &self,
        instance: &InstanceRef,
    ) -> impl Future<Output = Result<InstanceDetail>> + Send {
        (**self).instance_detail(instance)
    }

    fn resize_group(&self, group: &GroupRef, size: u32)
    -> impl Future<Output = Result<()>> + Send {
        (**self).resize_group(group, size)
    }

    fn remove_group_instance(
        &self,
        group: &GroupRef,
        instance: &InstanceRef,
    ) -> impl Future<Output = Result<()>> + Send {
        (**self).remove_group_instance(group, instance)
    }

    fn start_instance(&self, instance: &InstanceRef) -> impl Future<Output = Result<()>> + Send {
        (**self).start_instance(instance)
    }

    fn stop_instance(&self, instance: &InstanceRef) -> impl Future<Output = Result<()>> + Send {
        (**self).stop_instance(instance)
    }

    fn create_instance_from_template(
        &self,
        instance: &InstanceRef,
        template: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        (**self).create_instance_from_template(instance, template)
    }
}

/// Streams every instance group in `zone`.
pub fn zone_groups<'a, L: GroupLister>(
    lister: &'a L,
    project: &'a str,
    zone: &'a str,
) -> impl Stream<Item = Result<GroupRef>> + Send + 'a {
    paginate(move |token| lister.list_groups(project, zone, token))
}

/// Streams every member of `group`.
pub fn group_members<'a, L: GroupLister>(
    lister: &'a L,
    group: &'a GroupRef,
) -> impl Stream<Item = Result<InstanceRef>> + Send + 'a {
    paginate(move |token| lister.list_group_instances(group, token))
}

/// Streams every zone of `project`.
pub fn project_zones<'a, A: ComputeAdmin>(
    admin: &'a A,
    project: &'a str,
) -> impl Stream<Item = Result<Zone>> + Send + 'a {
    paginate(move |token| admin.list_zones(project, token))
}
