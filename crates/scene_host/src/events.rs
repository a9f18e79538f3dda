use crate::host::HostId;
use glam::Vec3;
use html::NodeKey;
use renderer::ObjectId;
use serde::Serialize;
use serde_json::{Value as JsonValue, json};
use std::collections::HashMap;

/// Synthetic event kinds delivered to source elements.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PickKind {
    Click,
    PointerHover,
    PointerEnter,
    PointerLeave,
    MouseDown,
    MouseUp,
    DoubleClick,
    ContextMenu,
}

impl PickKind {
    pub const ALL: [Self; 8] = [
        Self::Click,
        Self::PointerHover,
        Self::PointerEnter,
        Self::PointerLeave,
        Self::MouseDown,
        Self::MouseUp,
        Self::DoubleClick,
        Self::ContextMenu,
    ];

    /// Handler attribute naming a registered callback, e.g. `onclick="spin"`.
    pub const fn attribute(self) -> &'static str {
        match self {
            Self::Click => "onclick",
            Self::PointerHover => "onpointerhover",
            Self::PointerEnter => "onpointerenter",
            Self::PointerLeave => "onpointerleave",
            Self::MouseDown => "onmousedown",
            Self::MouseUp => "onmouseup",
            Self::DoubleClick => "ondblclick",
            Self::ContextMenu => "oncontextmenu",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::PointerHover => "pointer-hover",
            Self::PointerEnter => "pointer-enter",
            Self::PointerLeave => "pointer-leave",
            Self::MouseDown => "mouse-down",
            Self::MouseUp => "mouse-up",
            Self::DoubleClick => "double-click",
            Self::ContextMenu => "context-menu",
        }
    }
}

/// Raw pointer input kinds a host listens for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PointerAction {
    Move,
    Click,
    Down,
    Up,
    DoubleClick,
    ContextMenu,
}

/// A pointer event in viewport coordinates, as received from the embedder.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct PointerInput {
    pub action: PointerAction,
    pub x: f64,
    pub y: f64,
    pub button: u8,
}

impl PointerInput {
    pub const fn new(action: PointerAction, x: f64, y: f64) -> Self {
        Self {
            action,
            x,
            y,
            button: 0,
        }
    }
}

/// Payload handed to every handler.
#[derive(Clone, Debug, PartialEq)]
pub struct PickEvent {
    pub kind: PickKind,
    pub original: PointerInput,
    /// The scene object that was hit.
    pub hit_node: ObjectId,
    pub host: HostId,
    pub source_element: NodeKey,
    /// World-space hit point; the last known point for leave events.
    pub point: Vec3,
    /// Set for context-menu events: the embedder should not open its own menu.
    pub suppress_default: bool,
}

impl PickEvent {
    pub fn to_json(&self) -> JsonValue {
        json!({
            "kind": self.kind,
            "original": self.original,
            "host": self.host.0,
            "sourceElement": self.source_element.0,
            "point": [self.point.x, self.point.y, self.point.z],
            "suppressDefault": self.suppress_default,
        })
    }
}

pub type Handler = Box<dyn FnMut(&PickEvent)>;

/// Handlers registered directly on source elements, one per kind.
#[derive(Default)]
pub struct HandlerTable {
    handlers: HashMap<NodeKey, Vec<(PickKind, Handler)>>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler`, replacing any previous one for the same element and kind.
    pub fn set(&mut self, element: NodeKey, kind: PickKind, handler: Handler) {
        let list = self.handlers.entry(element).or_default();
        list.retain(|(existing, _)| *existing != kind);
        list.push((kind, handler));
    }

    pub fn remove(&mut self, element: NodeKey, kind: PickKind) -> bool {
        let Some(list) = self.handlers.get_mut(&element) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| *existing != kind);
        let removed = list.len() != before;
        if list.is_empty() {
            self.handlers.remove(&element);
        }
        removed
    }

    pub fn has_any(&self, element: NodeKey) -> bool {
        self.handlers.contains_key(&element)
    }

    /// Run the handler for the event's element and kind. Returns false when none is set.
    pub fn call(&mut self, event: &PickEvent) -> bool {
        let Some(list) = self.handlers.get_mut(&event.source_element) else {
            return false;
        };
        let Some((_, handler)) = list.iter_mut().find(|(kind, _)| *kind == event.kind) else {
            return false;
        };
        handler(event);
        true
    }
}

/// Callbacks that `on*` attributes refer to by name.
#[derive(Default)]
pub struct EventCallbacks {
    named: HashMap<String, Handler>,
}

impl EventCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any earlier one.
    /// Returns true if `name` was not registered before.
    pub fn register(&mut self, name: &str, handler: Handler) -> bool {
        self.named.insert(name.to_owned(), handler).is_none()
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.named.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    pub fn call(&mut self, name: &str, event: &PickEvent) -> bool {
        self.named.get_mut(name).is_some_and(|handler| {
            handler(event);
            true
        })
    }
}
