use crate::dom::NodeKey;
use anyhow::{Error, anyhow};
use log::warn;
use tokio::sync::broadcast;

/// A batchable change to the document, mirrored to subscribers on commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DOMUpdate {
    InsertElement {
        parent: NodeKey,
        node: NodeKey,
        tag: String,
        pos: usize,
    },
    InsertText {
        parent: NodeKey,
        node: NodeKey,
        text: String,
        pos: usize,
    },
    SetAttr {
        node: NodeKey,
        name: String,
        value: String,
    },
    RemoveAttr {
        node: NodeKey,
        name: String,
    },
    SetText {
        node: NodeKey,
        text: String,
    },
    /// `subtree` lists the removed descendants in pre-order.
    RemoveNode {
        node: NodeKey,
        parent: NodeKey,
        subtree: Vec<NodeKey>,
    },
    EndOfDocument,
}

pub trait DOMSubscriber {
    /// Apply a single update to the subscriber state.
    ///
    /// # Errors
    /// Returns an error when the update cannot be mirrored.
    fn apply_update(&mut self, update: DOMUpdate) -> Result<(), Error>;
}

/// Outcome of draining a mirror's channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorStatus {
    /// Every committed batch was applied.
    InSync,
    /// Batches were dropped because the receiver fell behind; the owner must resynchronise.
    Lagged(u64),
}

/// Generic mirror that applies committed document batches to a subscriber.
pub struct DOMMirror<T: DOMSubscriber> {
    in_updater: broadcast::Receiver<Vec<DOMUpdate>>,
    mirror: T,
}

impl<T: DOMSubscriber> DOMMirror<T> {
    pub const fn new(in_updater: broadcast::Receiver<Vec<DOMUpdate>>, mirror: T) -> Self {
        Self { in_updater, mirror }
    }

    /// Drain and apply every pending batch without blocking.
    ///
    /// A failing update is logged and skipped; the rest of its batch still applies.
    ///
    /// # Errors
    /// Returns an error if the document was dropped.
    pub fn try_update_sync(&mut self) -> Result<MirrorStatus, Error> {
        use broadcast::error::TryRecvError;
        let mut status = MirrorStatus::InSync;
        loop {
            match self.in_updater.try_recv() {
                Ok(batch) => {
                    for update in batch {
                        if let Err(err) = self.mirror.apply_update(update) {
                            warn!("Failed to mirror DOM update: {err:#}");
                        }
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!("DOM mirror lagged behind by {skipped} batches");
                    status = MirrorStatus::Lagged(skipped);
                }
                Err(TryRecvError::Closed) => {
                    return Err(anyhow!("Recv channel was closed before document ended!"));
                }
            }
        }
        Ok(status)
    }

    /// Access the inner mirror mutably.
    pub fn mirror_mut(&mut self) -> &mut T {
        &mut self.mirror
    }

    /// Access the inner mirror immutably.
    pub const fn mirror(&self) -> &T {
        &self.mirror
    }
}
