//! Pointer input to synthetic per-node events.
//!
//! One dispatcher serves every host. Move events re-cast against the pick
//! layer; click, down, up and context-menu act on the last hit only.

use crate::events::{PickEvent, PickKind, PointerAction, PointerInput};
use crate::host::{HostId, Rect};
use crate::state::HostScene;
use css::PseudoState;
use glam::{Vec2, Vec3};
use html::NodeKey;
use log::trace;
use renderer::Raycaster;
use std::collections::HashMap;

/// Per-host hover, press and focus tracking.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct HitState {
    pub last_hit: Option<NodeKey>,
    pub last_point: Vec3,
    pub pressed: Option<NodeKey>,
    pub focused: Option<NodeKey>,
}

/// Events to deliver, and the nodes whose pseudo-state flags changed.
#[derive(Debug, Default)]
pub struct PickOutcome {
    pub events: Vec<PickEvent>,
    pub repaint: Vec<NodeKey>,
}

impl PickOutcome {
    fn touch(&mut self, node: NodeKey) {
        if !self.repaint.contains(&node) {
            self.repaint.push(node);
        }
    }
}

/// Map viewport coordinates into normalized device coordinates of `bounds`.
/// Y points up in device space.
pub fn to_ndc(bounds: Rect, x: f64, y: f64) -> Vec2 {
    let width = if bounds.width > 0.0 { bounds.width } else { 1.0 };
    let height = if bounds.height > 0.0 { bounds.height } else { 1.0 };
    let nx = (x - bounds.x) / width * 2.0 - 1.0;
    let ny = -((y - bounds.y) / height * 2.0 - 1.0);
    Vec2::new(nx as f32, ny as f32)
}

#[derive(Debug, Default)]
pub struct PickingDispatcher {
    raycaster: Raycaster,
    pointer: Vec2,
    hosts: HashMap<HostId, HitState>,
}

impl PickingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, host: HostId) -> Option<&HitState> {
        self.hosts.get(&host)
    }

    /// Drop tracking for a disposed host.
    pub fn forget(&mut self, host: HostId) {
        self.hosts.remove(&host);
    }

    /// Last pointer position, in device coordinates.
    pub const fn pointer(&self) -> Vec2 {
        self.pointer
    }

    /// Topmost pickable node under the pointer, with its world hit point.
    fn cast(&mut self, scene: &HostScene) -> Option<(NodeKey, Vec3)> {
        let camera = scene.camera()?;
        if !self.raycaster.set_from_camera(scene.graph(), camera, self.pointer) {
            return None;
        }
        self.raycaster
            .intersect(scene.graph())
            .into_iter()
            .find_map(|hit| Some((scene.node_for_object(hit.object)?, hit.point)))
    }

    /// Handle one pointer input for `host`.
    pub fn dispatch(
        &mut self,
        host: HostId,
        bounds: Rect,
        scene: &mut HostScene,
        input: PointerInput,
    ) -> PickOutcome {
        let mut state = self.hosts.remove(&host).unwrap_or_default();
        if state.last_hit.is_some_and(|node| scene.node(node).is_none()) {
            state.last_hit = None;
        }
        let hit = if input.action == PointerAction::Move {
            self.pointer = to_ndc(bounds, input.x, input.y);
            self.cast(scene)
        } else {
            None
        };
        let mut emit = Emitter {
            host,
            input,
            scene,
            outcome: PickOutcome::default(),
        };
        match input.action {
            PointerAction::Move => emit.moved(&mut state, hit),
            PointerAction::Click => emit.clicked(&mut state, PickKind::Click),
            PointerAction::DoubleClick => emit.clicked(&mut state, PickKind::DoubleClick),
            PointerAction::Down => {
                if let Some(node) = state.last_hit {
                    emit.flag(node, PseudoState::Active, true);
                    state.pressed = Some(node);
                    emit.event(PickKind::MouseDown, node, state.last_point, false);
                }
            }
            PointerAction::Up => {
                if let Some(pressed) = state.pressed.take() {
                    emit.flag(pressed, PseudoState::Active, false);
                }
                if let Some(node) = state.last_hit {
                    emit.flag(node, PseudoState::Active, false);
                    emit.event(PickKind::MouseUp, node, state.last_point, false);
                }
            }
            PointerAction::ContextMenu => {
                if let Some(node) = state.last_hit {
                    emit.event(PickKind::ContextMenu, node, state.last_point, true);
                }
            }
        }
        self.hosts.insert(host, state);
        emit.outcome
    }
}

struct Emitter<'run> {
    host: HostId,
    input: PointerInput,
    scene: &'run mut HostScene,
    outcome: PickOutcome,
}

impl Emitter<'_> {
    /// Leave the old hit before entering the new one; hover follows enter.
    fn moved(&mut self, state: &mut HitState, hit: Option<(NodeKey, Vec3)>) {
        match (state.last_hit, hit) {
            (Some(previous), Some((node, point))) if previous == node => {
                state.last_point = point;
                self.event(PickKind::PointerHover, node, point, false);
            }
            (previous, Some((node, point))) => {
                if let Some(previous) = previous {
                    self.flag(previous, PseudoState::Hover, false);
                    self.event(PickKind::PointerLeave, previous, state.last_point, false);
                }
                self.flag(node, PseudoState::Hover, true);
                self.event(PickKind::PointerEnter, node, point, false);
                self.event(PickKind::PointerHover, node, point, false);
                state.last_hit = Some(node);
                state.last_point = point;
            }
            (Some(previous), None) => {
                self.flag(previous, PseudoState::Hover, false);
                self.event(PickKind::PointerLeave, previous, state.last_point, false);
                state.last_hit = None;
            }
            (None, None) => {}
        }
    }

    /// Focus the last hit and blur whatever this host focused before.
    fn clicked(&mut self, state: &mut HitState, kind: PickKind) {
        let Some(node) = state.last_hit else {
            return;
        };
        if let Some(blurred) = state.focused.filter(|focused| *focused != node) {
            self.flag(blurred, PseudoState::Focus, false);
        }
        self.flag(node, PseudoState::Focus, true);
        state.focused = Some(node);
        self.event(kind, node, state.last_point, false);
    }

    fn flag(&mut self, node: NodeKey, flag: PseudoState, raise: bool) {
        let Some(entry) = self.scene.nodes.get_mut(&node) else {
            return;
        };
        let changed = if raise {
            entry.set_flag(flag)
        } else {
            entry.clear_flag(flag)
        };
        if changed {
            self.outcome.touch(node);
        }
    }

    fn event(&mut self, kind: PickKind, node: NodeKey, point: Vec3, suppress_default: bool) {
        let Some(entry) = self.scene.node(node) else {
            return;
        };
        trace!("{} on {node:?} in host {:?}", kind.name(), self.host);
        self.outcome.events.push(PickEvent {
            kind,
            original: self.input,
            hit_node: entry.object,
            host: self.host,
            source_element: node,
            point,
            suppress_default,
        });
    }
}
