use core::mem;
use html::NodeKey;

/// Flush passes run within one frame before leftover dirt waits for the next.
pub const MAX_FLUSH_PASSES: usize = 4;

/// What one flush pass repaints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepaintBatch {
    /// Every node of the host.
    Full,
    /// These nodes, in the order they were first marked.
    Nodes(Vec<NodeKey>),
}

/// Dirty set that coalesces repaint requests into one flush per frame.
#[derive(Debug, Default)]
pub struct RepaintQueue {
    nodes: Vec<NodeKey>,
    full: bool,
    /// Number of times leftover dirt was pushed to the next frame (spillover).
    deferred_count: u64,
}

impl RepaintQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark one node for repaint. Marking twice keeps the first position.
    pub fn mark(&mut self, node: NodeKey) {
        if !self.full && !self.nodes.contains(&node) {
            self.nodes.push(node);
        }
    }

    /// Mark the whole host; pending single-node marks are absorbed.
    pub fn mark_all(&mut self) {
        self.full = true;
        self.nodes.clear();
    }

    pub fn is_dirty(&self) -> bool {
        self.full || !self.nodes.is_empty()
    }

    /// Take a stable snapshot of the dirt. Marks made while the snapshot is
    /// processed land in a fresh set.
    pub fn take(&mut self) -> Option<RepaintBatch> {
        if self.full {
            self.full = false;
            return Some(RepaintBatch::Full);
        }
        if self.nodes.is_empty() {
            return None;
        }
        Some(RepaintBatch::Nodes(mem::take(&mut self.nodes)))
    }

    /// Increment the number of flushes that spilled into the next frame.
    pub fn incr_deferred(&mut self) {
        self.deferred_count = self.deferred_count.saturating_add(1);
    }

    /// Return the number of spillovers during this session.
    pub fn deferred(&self) -> u64 {
        self.deferred_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_coalesce_in_first_seen_order() {
        let mut queue = RepaintQueue::new();
        queue.mark(NodeKey(3));
        queue.mark(NodeKey(1));
        queue.mark(NodeKey(3));
        assert_eq!(
            queue.take(),
            Some(RepaintBatch::Nodes(vec![NodeKey(3), NodeKey(1)]))
        );
        assert!(!queue.is_dirty());
        assert_eq!(queue.take(), None);
    }

    #[test]
    fn full_repaint_absorbs_node_marks() {
        let mut queue = RepaintQueue::new();
        queue.mark(NodeKey(1));
        queue.mark_all();
        queue.mark(NodeKey(2));
        assert_eq!(queue.take(), Some(RepaintBatch::Full));
        assert_eq!(queue.take(), None);
    }
}
