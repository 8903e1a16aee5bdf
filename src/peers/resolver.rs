use std::pin::pin;

use futures::TryStreamExt;

use crate::compute::{self, GroupLister, group_members, zone_groups};
use crate::error::ResultOkLogExt;
use crate::resource::{GroupRef, InstanceRef};

/// Returns the first instance group in `instance`'s zone that lists it as a member.
///
/// Groups are searched in listing order and member listings stop at the first
/// match.
pub async fn find_group<L: GroupLister>(
    lister: &L,
    instance: &InstanceRef,
) -> compute::Result<Option<GroupRef>> {
    let groups: Vec<GroupRef> = zone_groups(lister, instance.project(), instance.zone())
        .try_collect()
        .await?;

    for group in &groups {
        let mut members = pin!(group_members(lister, group));
        while let Some(member) = members.try_next().await? {
            if &member == instance {
                log::debug!("Instance {} is a member of group {}", instance, group);
                return Ok(Some(group.clone()));
            }
        }
    }
    Ok(None)
}

/// Like [`find_group`], but a failed listing is logged and treated as no group.
pub async fn resolve_group<L: GroupLister>(lister: &L, instance: &InstanceRef) -> Option<GroupRef> {
    find_group(lister, instance)
        .await
        .ok_warn(&format!("Failed to resolve the instance group of {instance}"))
        .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{Failure, FakeCompute, members};

    const ZONE: &str = "us-east1-b";

    fn compute() -> FakeCompute {
        FakeCompute::new()
            .with_group(
                GroupRef::new("p1", ZONE, "db"),
                members("p1", ZONE, &["db-1", "db-2", "db-3"]),
            )
            .with_group(
                GroupRef::new("p1", "us-east1-c", "web"),
                members("p1", "us-east1-c", &["vm-1"]),
            )
            .with_group(
                GroupRef::new("p1", ZONE, "web"),
                members("p1", ZONE, &["web-1", "web-2", "vm-1"]),
            )
    }

    #[tokio::test]
    async fn test_find_group_across_pages() {
        let compute = compute();
        let own = InstanceRef::new("p1", ZONE, "vm-1");

        let group = find_group(&compute, &own).await.unwrap();
        assert_eq!(group, Some(GroupRef::new("p1", ZONE, "web")));
    }

    #[tokio::test]
    async fn test_find_group_none() {
        let compute = compute();
        let own = InstanceRef::new("p1", ZONE, "vm-9");

        assert_eq!(find_group(&compute, &own).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_group_compares_whole_reference() {
        let compute = compute();
        let own = InstanceRef::new("p2", ZONE, "vm-1");

        assert_eq!(find_group(&compute, &own).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_resolve_group_failure_is_none() {
        let compute = compute();
        compute.fail_member_listing(Failure::Error);
        let own = InstanceRef::new("p1", ZONE, "vm-1");

        assert!(find_group(&compute, &own).await.is_err());
        assert_eq!(resolve_group(&compute, &own).await, None);
    }
}
