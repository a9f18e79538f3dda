//! Dirty-set mirror of committed document batches.
//!
//! The log only records what changed. Hosts drain it once per frame and read
//! the latest document state while processing, so several edits to one
//! element between frames cost one repaint.

use anyhow::Error;
use core::mem;
use html::{DOMSubscriber, DOMUpdate, NodeKey};

/// One observed change, in commit order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// An element was connected under `parent`.
    Inserted { parent: NodeKey, node: NodeKey },
    /// `node` and its pre-order `subtree` were disconnected from `parent`.
    Removed {
        node: NodeKey,
        parent: NodeKey,
        subtree: Vec<NodeKey>,
    },
    /// An attribute was set or removed.
    Attribute { node: NodeKey, name: String },
    /// Text changed at `node`; `parent` is known for inserted text only.
    Text {
        node: NodeKey,
        parent: Option<NodeKey>,
    },
}

#[derive(Debug, Default)]
pub struct MutationLog {
    pending: Vec<Mutation>,
    applied: u64,
}

impl MutationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take every recorded mutation; new updates land in a fresh log.
    pub fn drain(&mut self) -> Vec<Mutation> {
        mem::take(&mut self.pending)
    }

    /// Updates recorded since construction.
    pub const fn applied(&self) -> u64 {
        self.applied
    }
}

impl DOMSubscriber for MutationLog {
    fn apply_update(&mut self, update: DOMUpdate) -> Result<(), Error> {
        let mutation = match update {
            DOMUpdate::InsertElement { parent, node, .. } => Mutation::Inserted { parent, node },
            DOMUpdate::InsertText { parent, node, .. } => Mutation::Text {
                node,
                parent: Some(parent),
            },
            DOMUpdate::SetAttr { node, name, .. } | DOMUpdate::RemoveAttr { node, name } => {
                Mutation::Attribute { node, name }
            }
            DOMUpdate::SetText { node, .. } => Mutation::Text { node, parent: None },
            DOMUpdate::RemoveNode {
                node,
                parent,
                subtree,
            } => Mutation::Removed {
                node,
                parent,
                subtree,
            },
            DOMUpdate::EndOfDocument => return Ok(()),
        };
        self.applied = self.applied.saturating_add(1);
        self.pending.push(mutation);
        Ok(())
    }
}
