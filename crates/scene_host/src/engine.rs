//! Process-wide registries and the hosts that share them.
//!
//! The engine is built once, in this order: configuration, type registry,
//! asset registry, picking dispatcher. Every host operation borrows these
//! through a [`HostEnv`] instead of reaching for globals.

use crate::config::HostConfig;
use crate::events::{EventCallbacks, Handler, HandlerTable, PickEvent, PickKind, PointerInput};
use crate::host::{FrameCallback, HostEnv, HostId, Rect, SceneHost};
use crate::picking::PickingDispatcher;
use crate::state::HostNotice;
use crate::style;
use anyhow::{Result as AnyResult, bail};
use assets::{AssetLoader, AssetRegistry};
use core::cell::RefCell;
use html::{Document, NodeKey};
use log::{info, warn};
use renderer::{BackendFactory, TypeRegistry, Value};
use std::collections::BTreeMap;
use std::rc::Rc;

pub struct Engine {
    config: HostConfig,
    types: TypeRegistry,
    assets: Rc<RefCell<AssetRegistry>>,
    factory: Box<dyn BackendFactory>,
    picking: PickingDispatcher,
    handlers: HandlerTable,
    callbacks: EventCallbacks,
    hosts: BTreeMap<HostId, SceneHost>,
    next_host: u32,
}

impl Engine {
    pub fn new(
        config: HostConfig,
        factory: Box<dyn BackendFactory>,
        loader: Box<dyn AssetLoader>,
    ) -> Self {
        let types = TypeRegistry::new();
        let assets = Rc::new(RefCell::new(AssetRegistry::new(loader)));
        info!("Scene engine ready with {} object kinds", types.len());
        Self {
            config,
            types,
            assets,
            factory,
            picking: PickingDispatcher::new(),
            handlers: HandlerTable::new(),
            callbacks: EventCallbacks::new(),
            hosts: BTreeMap::new(),
            next_host: 1,
        }
    }

    pub const fn config(&self) -> &HostConfig {
        &self.config
    }

    pub const fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub const fn assets(&self) -> &Rc<RefCell<AssetRegistry>> {
        &self.assets
    }

    pub const fn picking(&self) -> &PickingDispatcher {
        &self.picking
    }

    /// Attach a host to `root`.
    ///
    /// # Errors
    /// Fails when `root` already hosts a scene, has no `<canvas>` surface, or no
    /// rendering backend can be created. Other hosts are unaffected.
    pub fn attach(&mut self, doc: &Document, root: NodeKey) -> AnyResult<HostId> {
        if self.hosts.values().any(|host| host.root() == root) {
            bail!("{root:?} already hosts a scene");
        }
        let id = HostId(self.next_host);
        let env = HostEnv {
            doc,
            types: &self.types,
            assets: &self.assets,
            handlers: &self.handlers,
            config: &self.config,
        };
        let host = SceneHost::attach(id, &env, self.factory.as_ref(), root)?;
        self.next_host = self.next_host.saturating_add(1);
        self.hosts.insert(id, host);
        Ok(id)
    }

    /// Run one frame of every live host. Hosts that disposed themselves are dropped.
    pub fn frame(&mut self, doc: &Document, now_ms: f64) {
        let env = HostEnv {
            doc,
            types: &self.types,
            assets: &self.assets,
            handlers: &self.handlers,
            config: &self.config,
        };
        for host in self.hosts.values_mut() {
            host.tick(&env, now_ms);
        }
        let gone: Vec<HostId> = self
            .hosts
            .iter()
            .filter(|(_, host)| host.is_disposed())
            .map(|(id, _)| *id)
            .collect();
        for id in gone {
            self.hosts.remove(&id);
            self.picking.forget(id);
        }
    }

    /// Route pointer input for `host` through the picking dispatcher and deliver
    /// the resulting events. Returns them in delivery order.
    pub fn dispatch_pointer(
        &mut self,
        doc: &Document,
        host: HostId,
        input: PointerInput,
    ) -> Vec<PickEvent> {
        let Some(target) = self.hosts.get_mut(&host) else {
            warn!("Pointer input for unknown host {}", host.0);
            return Vec::new();
        };
        if target.is_disposed() {
            return Vec::new();
        }
        let bounds = target.bounds();
        let outcome = self
            .picking
            .dispatch(host, bounds, target.scene_mut(), input);
        for event in &outcome.events {
            self.handlers.call(event);
            let attribute = event.kind.attribute();
            if let Some(name) = doc.attr(event.source_element, attribute)
                && !self.callbacks.call(name.trim(), event)
            {
                warn!("No callback named `{name}` for {attribute} on {:?}", event.source_element);
            }
        }
        let env = HostEnv {
            doc,
            types: &self.types,
            assets: &self.assets,
            handlers: &self.handlers,
            config: &self.config,
        };
        target.repaint_now(&env, &outcome.repaint);
        outcome.events
    }

    /// Install a direct handler on `element`. The element becomes pickable on
    /// its next repaint.
    pub fn set_handler(&mut self, element: NodeKey, kind: PickKind, handler: Handler) {
        self.handlers.set(element, kind, handler);
        self.mark_everywhere(element);
    }

    pub fn remove_handler(&mut self, element: NodeKey, kind: PickKind) -> bool {
        let removed = self.handlers.remove(element, kind);
        if removed {
            self.mark_everywhere(element);
        }
        removed
    }

    /// Register a callback that `on*` attributes can name. Returns true if
    /// the name is new.
    pub fn register_callback(&mut self, name: &str, handler: Handler) -> bool {
        self.callbacks.register(name, handler)
    }

    pub fn unregister_callback(&mut self, name: &str) -> bool {
        self.callbacks.unregister(name)
    }

    fn mark_everywhere(&mut self, element: NodeKey) {
        for host in self.hosts.values_mut() {
            host.mark(element);
        }
    }

    pub fn host(&self, id: HostId) -> Option<&SceneHost> {
        self.hosts.get(&id)
    }

    pub fn host_mut(&mut self, id: HostId) -> Option<&mut SceneHost> {
        self.hosts.get_mut(&id)
    }

    pub fn hosts(&self) -> impl Iterator<Item = &SceneHost> {
        self.hosts.values()
    }

    /// Stop `id` and drop it. Returns false for unknown hosts.
    pub fn dispose(&mut self, id: HostId) -> bool {
        let Some(mut host) = self.hosts.remove(&id) else {
            return false;
        };
        host.dispose();
        self.picking.forget(id);
        true
    }

    pub fn resize(&mut self, id: HostId, width: f64, height: f64, pixel_ratio: f64) -> bool {
        let Some(host) = self.hosts.get_mut(&id) else {
            return false;
        };
        host.resize(&self.config, width, height, pixel_ratio);
        true
    }

    pub fn set_bounds(&mut self, id: HostId, bounds: Rect) -> bool {
        self.hosts.get_mut(&id).is_some_and(|host| {
            host.set_bounds(bounds);
            true
        })
    }

    pub fn add_frame_callback(&mut self, id: HostId, callback: FrameCallback) -> bool {
        self.hosts.get_mut(&id).is_some_and(|host| {
            host.add_frame_callback(callback);
            true
        })
    }

    pub fn drain_notices(&mut self, id: HostId) -> Vec<HostNotice> {
        self.hosts
            .get_mut(&id)
            .map(SceneHost::drain_notices)
            .unwrap_or_default()
    }

    /// Current value of `path` on the node mapped from `element` in `id`.
    pub fn read(&self, id: HostId, element: NodeKey, path: &str) -> Option<Value> {
        let host = self.hosts.get(&id)?;
        host.scene().read(element, path)
    }

    /// Resolve a `#id[-path]` reference inside host `id`.
    pub fn resolve_reference(&self, id: HostId, reference: &str, path: &str) -> Option<Value> {
        let host = self.hosts.get(&id)?;
        style::resolve_reference(host.scene(), reference.trim_start_matches('#'), path)
    }
}
