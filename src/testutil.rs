//! In-memory implementations of the capability traits for unit tests.
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::DateTime;

use crate::compute::{self, ComputeAdmin, GroupLister, InstanceDetail, Page};
use crate::environment::{self, EnvironmentProbe};
use crate::metadata::{self, FetchError};
use crate::resource::{GroupRef, InstanceRef, Zone};

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Lines(Vec<String>),
    Unreachable,
    Status(u16),
    Malformed,
    TimedOut,
}

impl Reply {
    pub(crate) fn lines(lines: &[&str]) -> Self {
        Self::Lines(lines.iter().map(|line| line.to_string()).collect())
    }

    fn to_result(&self, path: &str) -> metadata::Result<Vec<String>> {
        match self {
            Self::Lines(lines) => Ok(lines.clone()),
            Self::Unreachable => Err(FetchError::Unreachable {
                path: path.to_owned(),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                )),
            }),
            Self::Status(code) => Err(FetchError::Status {
                path: path.to_owned(),
                code: *code,
            }),
            Self::Malformed => Err(FetchError::Malformed {
                path: path.to_owned(),
                reason: "garbage".to_owned(),
            }),
            Self::TimedOut => Err(FetchError::Request {
                path: path.to_owned(),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "operation timed out",
                )),
            }),
        }
    }
}

#[derive(Debug)]
pub(crate) struct FakeProbe {
    project: String,
    hostname: String,
    replies: HashMap<String, Reply>,
    fallback: Reply,
    requests: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl FakeProbe {
    /// A VM whose metadata server answers name, zone and IP; every other path is a 404.
    pub(crate) fn in_cloud(project: &str, zone_path: &str, name: &str, private_ip: &str) -> Self {
        Self {
            project: project.to_owned(),
            hostname: name.to_owned(),
            replies: HashMap::from([
                ("instance/name".to_owned(), Reply::lines(&[name])),
                ("instance/zone".to_owned(), Reply::lines(&[zone_path])),
                (
                    "instance/network-interfaces/0/ip".to_owned(),
                    Reply::lines(&[private_ip]),
                ),
            ]),
            fallback: Reply::Status(404),
            requests: Mutex::default(),
            calls: AtomicUsize::new(0),
        }
    }

    /// A machine without a metadata server.
    pub(crate) fn local(project: &str, hostname: &str) -> Self {
        Self {
            project: project.to_owned(),
            hostname: hostname.to_owned(),
            replies: HashMap::new(),
            fallback: Reply::Unreachable,
            requests: Mutex::default(),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with(mut self, path: &str, reply: Reply) -> Self {
        self.replies.insert(path.to_owned(), reply);
        self
    }

    pub(crate) fn with_hostname(mut self, hostname: &str) -> Self {
        self.hostname = hostname.to_owned();
        self
    }

    pub(crate) fn metadata_requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of calls to any probe method.
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EnvironmentProbe for FakeProbe {
    async fn default_project_id(&self) -> environment::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.project.clone())
    }

    async fn fetch_metadata(&self, path: &str) -> metadata::Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(path.to_owned());
        self.replies
            .get(path)
            .unwrap_or(&self.fallback)
            .to_result(path)
    }

    async fn local_hostname(&self) -> environment::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.hostname.clone())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Failure {
    #[default]
    None,
    Error,
    Panic,
}

/// Compute API holding groups, members and instance details in memory.
///
/// Listings are served two items per page so callers always exercise pagination.
#[derive(Debug, Default)]
pub(crate) struct FakeCompute {
    groups: Mutex<Vec<(GroupRef, Vec<InstanceRef>)>>,
    zones: Vec<Zone>,
    details: HashMap<InstanceRef, InstanceDetail>,
    actions: Mutex<Vec<String>>,
    member_failure: Mutex<Failure>,
    member_listings: AtomicUsize,
}

const PAGE_SIZE: usize = 2;

fn page<T: Clone>(items: &[T], token: Option<String>) -> Page<T> {
    let start = token.map_or(0, |token| token.parse::<usize>().unwrap());
    let end = (start + PAGE_SIZE).min(items.len());
    let next = (end < items.len()).then(|| end.to_string());
    Page::new(items[start..end].to_vec(), next)
}

pub(crate) fn members(project: &str, zone: &str, names: &[&str]) -> Vec<InstanceRef> {
    names
        .iter()
        .map(|name| InstanceRef::new(project, zone, *name))
        .collect()
}

pub(crate) fn detail(id: u64, created_at: &str) -> InstanceDetail {
    InstanceDetail {
        id,
        private_ip: Some(format!("10.0.0.{id}")),
        public_ip: None,
        created_at: DateTime::parse_from_rfc3339(created_at).unwrap(),
        status: "RUNNING".to_owned(),
    }
}

impl FakeCompute {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_group(self, group: GroupRef, members: Vec<InstanceRef>) -> Self {
        self.groups.lock().unwrap().push((group, members));
        self
    }

    pub(crate) fn with_zone(mut self, zone: Zone) -> Self {
        self.zones.push(zone);
        self
    }

    pub(crate) fn with_detail(mut self, instance: InstanceRef, detail: InstanceDetail) -> Self {
        self.details.insert(instance, detail);
        self
    }

    pub(crate) fn set_members(&self, group: &GroupRef, members: Vec<InstanceRef>) {
        let mut groups = self.groups.lock().unwrap();
        match groups.iter_mut().find(|(g, _)| g == group) {
            Some((_, current)) => *current = members,
            None => groups.push((group.clone(), members)),
        }
    }

    pub(crate) fn members_of(&self, group: &GroupRef) -> Vec<InstanceRef> {
        self.groups
            .lock()
            .unwrap()
            .iter()
            .find(|(g, _)| g == group)
            .map(|(_, members)| members.clone())
            .unwrap_or_default()
    }

    /// Makes every following member listing fail in the given way.
    pub(crate) fn fail_member_listing(&self, failure: Failure) {
        *self.member_failure.lock().unwrap() = failure;
    }

    /// Number of member pages served so far.
    pub(crate) fn member_listings(&self) -> usize {
        self.member_listings.load(Ordering::SeqCst)
    }

    pub(crate) fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }

    fn record(&self, action: String) {
        self.actions.lock().unwrap().push(action);
    }
}

impl GroupLister for FakeCompute {
    async fn list_groups(
        &self,
        project: &str,
        zone: &str,
        page_token: Option<String>,
    ) -> compute::Result<Page<GroupRef>> {
        let groups: Vec<GroupRef> = self
            .groups
            .lock()
            .unwrap()
            .iter()
            .map(|(group, _)| group.clone())
            .filter(|group| group.project() == project && group.zone() == zone)
            .collect();
        Ok(page(&groups, page_token))
    }

    async fn list_group_instances(
        &self,
        group: &GroupRef,
        page_token: Option<String>,
    ) -> compute::Result<Page<InstanceRef>> {
        let failure = *self.member_failure.lock().unwrap();
        match failure {
            Failure::None => {}
            Failure::Error => {
                return Err(compute::Error::Status {
                    url: group.to_string(),
                    code: 503,
                    body: "backend unavailable".to_owned(),
                });
            }
            Failure::Panic => panic!("member listing of {group} panicked"),
        }

        self.member_listings.fetch_add(1, Ordering::SeqCst);
        let groups = self.groups.lock().unwrap();
        match groups.iter().find(|(g, _)| g == group) {
            Some((_, members)) => Ok(page(members, page_token)),
            None => Err(compute::Error::NotFound {
                resource: group.to_string(),
            }),
        }
    }
}

impl ComputeAdmin for FakeCompute {
    async fn list_zones(
        &self,
        _project: &str,
        page_token: Option<String>,
    ) -> compute::Result<Page<Zone>> {
        Ok(page(&self.zones, page_token))
    }

    async fn group_size(&self, group: &GroupRef) -> compute::Result<u32> {
        Ok(self.members_of(group).len() as u32)
    }

    async fn instance_detail(&self, instance: &InstanceRef) -> compute::Result<InstanceDetail> {
        self.details
            .get(instance)
            .cloned()
            .ok_or_else(|| compute::Error::NotFound {
                resource: instance.to_string(),
            })
    }

    async fn resize_group(&self, group: &GroupRef, size: u32) -> compute::Result<()> {
        self.record(format!("resize {} {}", group.name(), size));
        Ok(())
    }

    async fn remove_group_instance(
        &self,
        group: &GroupRef,
        instance: &InstanceRef,
    ) -> compute::Result<()> {
        self.record(format!("remove {} {}", group.name(), instance.name()));
        let mut members = self.members_of(group);
        members.retain(|member| member != instance);
        self.set_members(group, members);
        Ok(())
    }

    async fn start_instance(&self, instance: &InstanceRef) -> compute::Result<()> {
        self.record(format!("start {}", instance.name()));
        Ok(())
    }

    async fn stop_instance(&self, instance: &InstanceRef) -> compute::Result<()> {
        self.record(format!("stop {}", instance.name()));
        Ok(())
    }

    async fn create_instance_from_template(
        &self,
        instance: &InstanceRef,
        template: &str,
    ) -> compute::Result<()> {
        self.record(format!("create {} from {}", instance.name(), template));
        Ok(())
    }
}
