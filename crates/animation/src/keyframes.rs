//! Keyframe run descriptions and their cancellation handle.
use crate::easing::Easing;
use core::cell::Cell;
use core::task::Poll;
use std::rc::Rc;

/// Supplies one keyframe value. `Poll::Pending` while the value is still loading,
/// `Poll::Ready(None)` when it can never resolve.
pub type ValueSource<C, V> = Rc<dyn Fn(&mut C) -> Poll<Option<V>>>;

/// Writes an interpolated value for a property path.
pub type PropertyWriter<C, V> = Rc<dyn Fn(&mut C, &str, &V)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationCount {
    Count(u32),
    Infinite,
}

/// A keyframe placed on the timeline, with one source per property.
pub struct KeyframePoint<C, V> {
    pub offset_ms: f64,
    pub values: Vec<(String, ValueSource<C, V>)>,
}

impl<C, V> Clone for KeyframePoint<C, V> {
    fn clone(&self) -> Self {
        Self {
            offset_ms: self.offset_ms,
            values: self
                .values
                .iter()
                .map(|(name, source)| (name.clone(), Rc::clone(source)))
                .collect(),
        }
    }
}

impl<C, V> KeyframePoint<C, V> {
    pub(crate) fn source(&self, property: &str) -> Option<&ValueSource<C, V>> {
        self.values
            .iter()
            .rev()
            .find(|(name, _)| name == property)
            .map(|(_, source)| source)
    }
}

/// Everything needed to start a keyframe run.
pub struct KeyframeRunSpec<C, V> {
    /// Points sorted by offset; resorted on start.
    pub frames: Vec<KeyframePoint<C, V>>,
    pub iterations: IterationCount,
    pub easing: Easing,
    pub writer: PropertyWriter<C, V>,
    /// Prefix for tween supersede keys, `"{prefix}{property}"`.
    pub key_prefix: String,
    /// Called once when a finite run finishes. Never called for infinite or cancelled runs.
    pub on_complete: Option<Box<dyn FnOnce(&mut C)>>,
}

/// Handle to a repeating keyframe run.
#[derive(Debug, Clone)]
pub struct RunHandle {
    active: Rc<Cell<bool>>,
}

impl RunHandle {
    pub(crate) fn new() -> Self {
        Self {
            active: Rc::new(Cell::new(true)),
        }
    }

    /// Stop the run; its tweens are dropped on the next tick without completing.
    pub fn cancel(&self) {
        self.active.set(false);
    }

    /// True until the run finishes or is cancelled.
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub(crate) fn finish(&self) {
        self.active.set(false);
    }
}
