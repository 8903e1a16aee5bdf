//! The environment monitor: detects where this process runs once, then keeps
//! track of the instance group it belongs to.
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{OnceCell, watch};
use tokio::time::{Instant, MissedTickBehavior};

use crate::compute::GroupLister;
use crate::environment::{self, EnvironmentProbe, Identity, detect_identity};
use crate::error::{ResultOkLogExt, panic_message};
use crate::peers::{
    self, Listener, ListenerRegistry, PeerSet, PeerTracker, SubscriptionId, resolve_group,
};
use crate::resource::GroupRef;

/// Outcome of [`EnvironmentMonitor::start_auto_refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStatus {
    /// The background refresh task was spawned.
    Started,
    /// A refresh task is already running for this monitor.
    AlreadyActive,
    /// Not running on Compute Engine, so there is nothing to refresh.
    NotInCloud,
    /// Running on Compute Engine, but not as a member of any instance group.
    NotInGroup,
    /// The requested period is zero.
    InvalidPeriod,
}

#[derive(Debug)]
struct Detected {
    identity: Identity,
    group: Option<GroupRef>,
}

/// Detects the identity of this process and tracks its instance group peers.
///
/// Construct one per process and share it through an [`Arc`].
#[derive(Debug)]
pub struct EnvironmentMonitor<P, L> {
    probe: P,
    lister: L,
    detected: OnceCell<Detected>,
    tracker: PeerTracker,
    listeners: ListenerRegistry,
    refreshing: AtomicBool,
}

impl<P, L> EnvironmentMonitor<P, L>
where
    P: EnvironmentProbe,
    L: GroupLister,
{
    pub fn new(probe: P, lister: L) -> Self {
        Self {
            probe,
            lister,
            detected: OnceCell::new(),
            tracker: PeerTracker::default(),
            listeners: ListenerRegistry::default(),
            refreshing: AtomicBool::new(false),
        }
    }

    /// Returns this process' identity, detecting it on the first call.
    ///
    /// Only the first successful call does any work; concurrent first callers
    /// share that run. On Compute Engine the instance group is resolved and the
    /// peer set populated before the identity is returned.
    ///
    /// # Errors
    ///
    /// Returns the detection error if the metadata server answered with an
    /// error or the local host name could not be read. The monitor stays
    /// undetected and a later call tries again.
    pub async fn detect(&self) -> environment::Result<&Identity> {
        let detected = self
            .detected
            .get_or_try_init(|| self.run_detection())
            .await?;
        Ok(&detected.identity)
    }

    async fn run_detection(&self) -> environment::Result<Detected> {
        let identity = detect_identity(&self.probe).await?;
        let own = identity.instance_ref();

        if !identity.in_cloud() {
            log::info!(
                "Not running on Compute Engine, local host is `{}`",
                identity.instance_name()
            );
            self.tracker.replace(vec![own].into());
            return Ok(Detected {
                identity,
                group: None,
            });
        }

        log::info!("Running on Compute Engine as {}", own);
        let group = resolve_group(&self.lister, &own).await;
        match &group {
            Some(group) => log::info!("Member of instance group {}", group),
            None => log::info!("Not a member of any instance group"),
        }

        let refreshed = self
            .tracker
            .refresh(&self.lister, group.as_ref(), Some(&own))
            .await;
        if refreshed.ok_log().is_none() {
            self.tracker.replace(vec![own].into());
        }

        Ok(Detected { identity, group })
    }

    pub fn is_detected(&self) -> bool {
        self.detected.initialized()
    }

    /// The detected identity, or `None` before detection completed.
    pub fn identity(&self) -> Option<&Identity> {
        self.detected.get().map(|detected| &detected.identity)
    }

    /// The instance group this VM belongs to, if detected and any.
    pub fn group(&self) -> Option<&GroupRef> {
        self.detected.get().and_then(|detected| detected.group.as_ref())
    }

    /// Number of peers including this instance. Never 0.
    pub fn peer_count(&self) -> usize {
        self.tracker.peer_count()
    }

    pub fn peers(&self) -> Option<PeerSet> {
        self.tracker.peers()
    }

    pub fn watch_peers(&self) -> watch::Receiver<Option<PeerSet>> {
        self.tracker.watch()
    }

    /// Re-lists the group members once, without notifying listeners.
    pub async fn refresh(&self) -> peers::Result<()> {
        let (group, own) = match self.detected.get() {
            Some(detected) => (
                detected.group.as_ref(),
                Some(detected.identity.instance_ref()),
            ),
            None => (None, None),
        };
        self.tracker.refresh(&self.lister, group, own.as_ref()).await
    }

    /// One refresh cycle: refreshes the peers and notifies the listeners if the
    /// peer count changed. Returns the new count.
    pub(crate) async fn tick(&self) -> peers::Result<usize> {
        let before = self.peer_count();
        self.refresh().await?;
        let after = self.peer_count();

        if before != after {
            log::info!("Peer count changed from {} to {}", before, after);
            let delivered = self.listeners.notify(after);
            log::debug!(
                "Notified {}/{} listeners",
                delivered,
                self.listeners.len()
            );
        }
        Ok(after)
    }

    /// Registers `listener` for peer count changes.
    ///
    /// If there currently is more than one peer, `listener` is called once right
    /// away with the current count.
    ///
    /// The immediate call happens before `listener` is registered, so counts
    /// fanned out by a concurrent refresh always arrive after it.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        let id = SubscriptionId::new();

        let count = self.peer_count();
        if count > 1 {
            ListenerRegistry::deliver(id, &listener, count).ok_log();
        }
        self.listeners.insert_with_id(id, listener);
        id
    }

    /// Removes a subscription. Returns whether `id` was subscribed.
    pub fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        self.listeners.remove(id)
    }
}

impl<P, L> EnvironmentMonitor<P, L>
where
    P: EnvironmentProbe + 'static,
    L: GroupLister + 'static,
{
    /// Spawns a task refreshing the peers every `period`, starting one `period`
    /// from now.
    ///
    /// Detects the identity first if that has not happened yet. Nothing is
    /// spawned off-cloud, when not in a group, for a zero `period`, or when a
    /// refresh task is already running; the returned status says why.
    ///
    /// # Errors
    ///
    /// Returns the detection error if detection has to run and fails.
    pub async fn start_auto_refresh(
        self: &Arc<Self>,
        period: Duration,
    ) -> environment::Result<RefreshStatus> {
        if !self.is_detected() {
            log::warn!("Auto refresh requested before detection, detecting now");
        }
        let identity = self.detect().await?;

        if !identity.in_cloud() {
            log::warn!("Not starting auto refresh: not running on Compute Engine");
            return Ok(RefreshStatus::NotInCloud);
        }
        if self.group().is_none() {
            log::warn!("Not starting auto refresh: not a member of any instance group");
            return Ok(RefreshStatus::NotInGroup);
        }
        if period.is_zero() {
            log::warn!("Not starting auto refresh: period must not be zero");
            return Ok(RefreshStatus::InvalidPeriod);
        }
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::warn!("Not starting auto refresh: already active");
            return Ok(RefreshStatus::AlreadyActive);
        }

        let monitor = Arc::clone(self);
        tokio::spawn(async move { monitor.refresh_loop(period).await });
        log::info!("Refreshing peers every {:?}", period);

        Ok(RefreshStatus::Started)
    }

    async fn refresh_loop(&self, period: Duration) {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match AssertUnwindSafe(self.tick()).catch_unwind().await {
                Ok(Ok(count)) => log::trace!("Peer refresh done, {} peers", count),
                Ok(Err(err)) => log::error!("Peer refresh failed: {}", err),
                Err(payload) => {
                    log::error!("Peer refresh panicked: {}", panic_message(&*payload))
                }
            }
        }
    }
}
