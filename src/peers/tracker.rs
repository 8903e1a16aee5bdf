use std::sync::Arc;

use futures::TryStreamExt;
use tokio::sync::watch;

use crate::compute::{GroupLister, group_members};
use crate::resource::{GroupRef, InstanceRef};

use super::Result;

/// The members of a group, in listing order.
pub type PeerSet = Arc<[InstanceRef]>;

/// Holds the current peer set and publishes every replacement.
#[derive(Debug)]
pub struct PeerTracker {
    peers: watch::Sender<Option<PeerSet>>,
}

impl Default for PeerTracker {
    fn default() -> Self {
        Self {
            peers: watch::Sender::new(None),
        }
    }
}

impl PeerTracker {
    pub fn peers(&self) -> Option<PeerSet> {
        self.peers.borrow().clone()
    }

    /// Number of peers, counting this instance. Never 0.
    pub fn peer_count(&self) -> usize {
        self.peers
            .borrow()
            .as_ref()
            .map_or(1, |peers| peers.len().max(1))
    }

    /// Returns a receiver observing every replacement of the peer set.
    pub fn watch(&self) -> watch::Receiver<Option<PeerSet>> {
        self.peers.subscribe()
    }

    pub fn replace(&self, peers: PeerSet) {
        self.peers.send_replace(Some(peers));
    }

    /// Re-derives the peer set.
    ///
    /// With a group, its members are listed and replace the current set. Without
    /// one the set becomes `own` alone, or stays unset if `own` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`super::Error::Refresh`] if listing the members fails. The
    /// current set is left untouched in that case.
    pub async fn refresh<L: GroupLister>(
        &self,
        lister: &L,
        group: Option<&GroupRef>,
        own: Option<&InstanceRef>,
    ) -> Result<()> {
        match (group, own) {
            (Some(group), _) => {
                let members: Vec<InstanceRef> = group_members(lister, group).try_collect().await?;
                log::debug!("Group {} has {} members", group, members.len());
                self.replace(members.into());
            }
            (None, Some(own)) => self.replace(vec![own.clone()].into()),
            (None, None) => {}
        }
        Ok(())
    }
}
