//! One rendering surface and the scene mirrored from its document subtree.
//!
//! ```text
//! tick(now)
//!   ├── apply mutations   (drain the document mirror, scan / destroy / re-index)
//!   ├── flush repaints    (stable snapshots of the dirty set, bounded passes)
//!   ├── deferred assets   (assign loads that settled since the last frame)
//!   ├── animator          (tweens and keyframe runs)
//!   ├── always pass       (`:always` rules of flagged nodes)
//!   ├── frame callbacks
//!   └── render            (through the active camera)
//! ```

use crate::config::HostConfig;
use crate::events::HandlerTable;
use crate::mutations::{Mutation, MutationLog};
use crate::scheduler::{MAX_FLUSH_PASSES, RepaintBatch, RepaintQueue};
use crate::state::{HostNotice, HostScene, SceneNode};
use crate::style::{HostAnimator, StyleResolver};
use crate::telemetry::{FrameCounters, frame_counters_json, maybe_emit};
use anyhow::{Context as _, Result as AnyResult, bail};
use assets::AssetRegistry;
use core::cell::RefCell;
use css::{RuleDB, StyleSheetSet};
use html::{DOMMirror, Document, MirrorStatus, NodeKey};
use log::{debug, error, info, warn};
use renderer::{
    BackendFactory, Object3D, ObjectId, ObjectKind, RenderBackend, SURFACE_TAG, SceneGraph,
    SurfaceDescriptor, TypeRegistry, Value,
};
use serde::Serialize;
use std::rc::Rc;

const STYLE_TAG: &str = "style";
const DEFAULT_SURFACE_WIDTH: f64 = 300.0;
const DEFAULT_SURFACE_HEIGHT: f64 = 150.0;
/// Distance a synthesized camera sits back from the origin.
const SYNTHESIZED_CAMERA_Z: f64 = 5.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct HostId(pub u32);

/// Host box in viewport CSS pixels.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Width over height; 1 for degenerate boxes.
    pub fn aspect(&self) -> f64 {
        if self.width > 0.0 && self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}

/// Runs once per frame after the always pass, before rendering.
pub type FrameCallback = Box<dyn FnMut(&mut SceneGraph, f64)>;

/// Process-wide state every host operation borrows.
pub struct HostEnv<'env> {
    pub doc: &'env Document,
    pub types: &'env TypeRegistry,
    pub assets: &'env Rc<RefCell<AssetRegistry>>,
    pub handlers: &'env HandlerTable,
    pub config: &'env HostConfig,
}

/// How the active camera was chosen.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CameraSource {
    /// A camera element carrying the `active` attribute.
    Marked,
    /// The first camera element found.
    First,
    /// No camera element; a default perspective camera was added.
    Synthesized,
}

fn is_marked_camera(doc: &Document, element: NodeKey) -> bool {
    doc.attr(element, "active")
        .is_some_and(|value| !value.trim().eq_ignore_ascii_case("false"))
}

fn is_style(doc: &Document, element: NodeKey) -> bool {
    doc.tag(element).as_deref() == Some(STYLE_TAG)
}

fn has_surface(doc: &Document, element: NodeKey) -> bool {
    doc.element_children(element)
        .into_iter()
        .any(|child| doc.tag(child).as_deref() == Some(SURFACE_TAG))
}

/// True when some ancestor of `node` owns a rendering surface.
fn inside_any_host(doc: &Document, node: NodeKey) -> bool {
    let mut cursor = doc.parent(node);
    while let Some(up) = cursor {
        if has_surface(doc, up) {
            return true;
        }
        cursor = doc.parent(up);
    }
    false
}

fn surface_bounds(doc: &Document, surface: NodeKey) -> Rect {
    let dimension = |name: &str, fallback: f64| {
        doc.attr(surface, name)
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite() && *value > 0.0)
            .unwrap_or(fallback)
    };
    Rect::new(
        0.0,
        0.0,
        dimension("width", DEFAULT_SURFACE_WIDTH),
        dimension("height", DEFAULT_SURFACE_HEIGHT),
    )
}

fn configure_perspective(camera: &mut Object3D, config: &HostConfig, aspect: f64) {
    for (path, value) in [("fov", config.fov), ("near", config.near), ("far", config.far)] {
        if let Err(err) = camera.assign(path, &Value::Number(value)) {
            warn!("Cannot configure camera `{path}`: {err:#}");
        }
    }
    camera.set_aspect(aspect);
}

pub struct SceneHost {
    id: HostId,
    root: NodeKey,
    surface: NodeKey,
    scene: HostScene,
    animator: HostAnimator,
    backend: Option<Box<dyn RenderBackend>>,
    mirror: DOMMirror<MutationLog>,
    sheets: StyleSheetSet,
    rules: RuleDB,
    queue: RepaintQueue,
    callbacks: Vec<FrameCallback>,
    bounds: Rect,
    pixel_ratio: f64,
    camera_source: Option<CameraSource>,
    synthesized: Option<ObjectId>,
    counters: FrameCounters,
    disposed: bool,
}

impl SceneHost {
    /// Attach to `root`, which must be a connected element with a `<canvas>` child.
    ///
    /// Scans the subtree, picks or synthesizes the active camera, indexes every
    /// stylesheet that applies and paints every node once.
    ///
    /// # Errors
    /// Fails when `root` has no surface or no backend can be created for it.
    pub fn attach(
        id: HostId,
        env: &HostEnv<'_>,
        factory: &dyn BackendFactory,
        root: NodeKey,
    ) -> AnyResult<Self> {
        let doc = env.doc;
        if !doc.is_element(root) || !doc.is_connected(root) {
            bail!("{root:?} is not a connected element");
        }
        let Some(surface) = doc
            .element_children(root)
            .into_iter()
            .find(|child| doc.tag(*child).as_deref() == Some(SURFACE_TAG))
        else {
            bail!("{root:?} has no <{SURFACE_TAG}> surface");
        };
        let bounds = surface_bounds(doc, surface);
        let pixel_ratio = env.config.clamp_pixel_ratio(1.0);
        let backend = factory
            .create(&SurfaceDescriptor {
                label: format!("host-{}", id.0),
                width: bounds.width as u32,
                height: bounds.height as u32,
                pixel_ratio,
            })
            .with_context(|| format!("creating a rendering backend for {root:?}"))?;

        let mut host = Self {
            id,
            root,
            surface,
            scene: HostScene::new(),
            animator: HostAnimator::new(),
            backend: Some(backend),
            mirror: DOMMirror::new(doc.subscribe(), MutationLog::new()),
            sheets: StyleSheetSet::new(),
            rules: RuleDB::default(),
            queue: RepaintQueue::new(),
            callbacks: Vec::new(),
            bounds,
            pixel_ratio,
            camera_source: None,
            synthesized: None,
            counters: FrameCounters::default(),
            disposed: false,
        };
        host.reload_sheets(env);
        let graph_root = host.scene.graph.root();
        let mut created = Vec::new();
        host.scan(env, root, graph_root, &mut created);
        host.ensure_camera(env);
        host.apply_size();
        host.queue.mark_all();
        host.flush_repaints(env);
        info!(
            "Attached host {} to {root:?}: {} nodes, camera {:?}",
            id.0,
            host.scene.len(),
            host.camera_source
        );
        Ok(host)
    }

    pub const fn id(&self) -> HostId {
        self.id
    }

    pub const fn root(&self) -> NodeKey {
        self.root
    }

    pub const fn surface(&self) -> NodeKey {
        self.surface
    }

    pub const fn scene(&self) -> &HostScene {
        &self.scene
    }

    pub const fn scene_mut(&mut self) -> &mut HostScene {
        &mut self.scene
    }

    pub const fn animator(&self) -> &HostAnimator {
        &self.animator
    }

    pub const fn rules(&self) -> &RuleDB {
        &self.rules
    }

    pub const fn bounds(&self) -> Rect {
        self.bounds
    }

    pub const fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    pub const fn camera_source(&self) -> Option<CameraSource> {
        self.camera_source
    }

    pub fn counters(&self) -> FrameCounters {
        FrameCounters {
            flush_spillover: self.queue.deferred(),
            ..self.counters
        }
    }

    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn backend(&self) -> Option<&dyn RenderBackend> {
        self.backend.as_deref()
    }

    pub fn node_for_element(&self, element: NodeKey) -> Option<&SceneNode> {
        self.scene.node(element)
    }

    /// First node of this host carrying `id`.
    pub fn node_by_id(&self, id: &str) -> Option<&SceneNode> {
        self.scene
            .ids(id)
            .first()
            .and_then(|element| self.scene.node(*element))
    }

    pub fn nodes_by_class(&self, class: &str) -> Vec<&SceneNode> {
        self.scene
            .classes(class)
            .iter()
            .filter_map(|element| self.scene.node(*element))
            .collect()
    }

    pub fn add_frame_callback(&mut self, callback: FrameCallback) {
        if !self.disposed {
            self.callbacks.push(callback);
        }
    }

    pub fn drain_notices(&mut self) -> Vec<HostNotice> {
        self.scene.drain_notices()
    }

    /// Schedule `element` for a full repaint on the next frame.
    pub fn mark(&mut self, element: NodeKey) {
        if self.scene.node(element).is_some() {
            self.queue.mark(element);
        }
    }

    /// Repaint `elements` immediately, e.g. after their pseudo-state flags changed.
    pub fn repaint_now(&mut self, env: &HostEnv<'_>, elements: &[NodeKey]) {
        if self.disposed {
            return;
        }
        let resolver = StyleResolver {
            doc: env.doc,
            rules: &self.rules,
            assets: env.assets,
            handlers: env.handlers,
        };
        for element in elements {
            resolver.paint_node(&mut self.scene, &mut self.animator, *element);
        }
    }

    /// Run one frame at `now_ms`. Does nothing once disposed.
    pub fn tick(&mut self, env: &HostEnv<'_>, now_ms: f64) {
        if self.disposed {
            return;
        }
        self.apply_mutations(env);
        if self.disposed {
            return;
        }
        self.flush_repaints(env);
        let resolver = StyleResolver {
            doc: env.doc,
            rules: &self.rules,
            assets: env.assets,
            handlers: env.handlers,
        };
        let pending = resolver.resolve_deferred(&mut self.scene, &mut self.animator);
        self.animator.tick(&mut self.scene, now_ms);
        resolver.paint_always(&mut self.scene, &mut self.animator);
        for callback in &mut self.callbacks {
            callback(&mut self.scene.graph, now_ms);
        }
        self.render();
        self.counters.deferred_pending = pending as u64;
        self.counters.active_tweens = self.animator.active_tweens() as u64;
        maybe_emit(
            env.config.telemetry_enabled,
            &format!("host-{}", self.id.0),
            &frame_counters_json(&self.counters()),
        );
    }

    /// Resize the surface to `width` x `height` CSS pixels.
    pub fn resize(&mut self, config: &HostConfig, width: f64, height: f64, pixel_ratio: f64) {
        self.bounds.width = width;
        self.bounds.height = height;
        self.pixel_ratio = config.clamp_pixel_ratio(pixel_ratio);
        self.apply_size();
    }

    /// Move or resize the host box; the pixel ratio is kept.
    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
        self.apply_size();
    }

    /// Stop for good: no frame, callback or notice fires afterwards.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.animator.clear();
        self.callbacks.clear();
        self.scene.deferred.clear();
        self.backend = None;
        info!("Disposed host {}", self.id.0);
    }

    fn render(&mut self) {
        let (Some(backend), Some(camera)) = (self.backend.as_mut(), self.scene.camera) else {
            return;
        };
        match backend.render(&self.scene.graph, camera) {
            Ok(()) => self.counters.frames_rendered = self.counters.frames_rendered.saturating_add(1),
            Err(err) => error!("Host {} failed to render: {err:#}", self.id.0),
        }
    }

    fn apply_size(&mut self) {
        let width = self.bounds.width.max(1.0);
        let height = self.bounds.height.max(1.0);
        if let Some(backend) = self.backend.as_mut() {
            backend.resize(width as u32, height as u32, self.pixel_ratio);
        }
        if let Some(camera) = self.scene.camera
            && let Some(object) = self.scene.graph.get_mut(camera)
        {
            object.set_aspect(width / height);
        }
    }

    /// Nearest mapped ancestor's object, or the graph root.
    fn parent_object(&self, doc: &Document, element: NodeKey) -> ObjectId {
        let mut cursor = doc.parent(element);
        while let Some(up) = cursor {
            if let Some(node) = self.scene.node(up) {
                return node.object;
            }
            if up == self.root {
                break;
            }
            cursor = doc.parent(up);
        }
        self.scene.graph.root()
    }

    /// Map `element` and its descendants. Mapped elements are kept as they are;
    /// only their unmapped descendants are added.
    fn scan(
        &mut self,
        env: &HostEnv<'_>,
        element: NodeKey,
        parent: ObjectId,
        created: &mut Vec<NodeKey>,
    ) {
        let Some(tag) = env.doc.tag(element) else {
            return;
        };
        if tag == SURFACE_TAG || tag == STYLE_TAG {
            return;
        }
        let mapped = self.scene.node(element).map(|node| node.object);
        let next_parent = if let Some(object) = mapped {
            object
        } else if let Some(kind) = env.types.lookup(&tag) {
            match self.create_node(env, element, kind, &tag, parent) {
                Some(object) => {
                    created.push(element);
                    object
                }
                None => parent,
            }
        } else {
            if element != self.root {
                warn!("Unknown scene tag <{tag}> on {element:?}; scanning its children");
            }
            parent
        };
        for child in env.doc.element_children(element) {
            self.scan(env, child, next_parent, created);
        }
    }

    fn create_node(
        &mut self,
        env: &HostEnv<'_>,
        element: NodeKey,
        kind: ObjectKind,
        tag: &str,
        parent: ObjectId,
    ) -> Option<ObjectId> {
        let classes = env.doc.classes(element);
        let object = if element == self.root && kind == ObjectKind::Scene {
            self.scene.graph.root()
        } else {
            let Some(mut object) = env.types.construct(kind) else {
                warn!("No constructor for {} on {element:?}", kind.name());
                return None;
            };
            object.name = classes.first().cloned().unwrap_or_default();
            if kind == ObjectKind::PerspectiveCamera {
                configure_perspective(&mut object, env.config, self.bounds.aspect());
            }
            match self.scene.graph.add(parent, object) {
                Ok(id) => id,
                Err(err) => {
                    warn!("Cannot add <{tag}> {element:?} to the scene: {err:#}");
                    return None;
                }
            }
        };
        let mut node = SceneNode::new(element, object, kind, tag.to_owned());
        node.classes = classes;
        node.dom_id = env.doc.id(element).map(str::to_owned);
        self.scene.insert(node);
        if kind.is_camera() {
            self.consider_camera(env.doc, element, object);
        }
        debug!("Mapped <{tag}> {element:?} to {object:?}");
        Some(object)
    }

    fn consider_camera(&mut self, doc: &Document, element: NodeKey, object: ObjectId) {
        let marked = is_marked_camera(doc, element);
        let adopt = match self.camera_source {
            None | Some(CameraSource::Synthesized) => true,
            Some(CameraSource::First) => marked,
            Some(CameraSource::Marked) => false,
        };
        if adopt {
            let source = if marked {
                CameraSource::Marked
            } else {
                CameraSource::First
            };
            self.adopt_camera(object, source);
        }
    }

    fn adopt_camera(&mut self, object: ObjectId, source: CameraSource) {
        if let Some(previous) = self.synthesized.take()
            && previous != object
        {
            self.scene.graph.remove_subtree(previous);
        }
        self.scene.camera = Some(object);
        self.camera_source = Some(source);
        self.apply_size();
        debug!("Host {} renders through {object:?} ({source:?})", self.id.0);
    }

    /// Promote a remaining camera node, or synthesize one, when the active camera is gone.
    fn ensure_camera(&mut self, env: &HostEnv<'_>) {
        if self.scene.camera.is_some() {
            return;
        }
        let mut cameras: Vec<(NodeKey, ObjectId)> = self
            .scene
            .nodes()
            .filter(|node| node.kind.is_camera())
            .map(|node| (node.element, node.object))
            .collect();
        cameras.sort_by_key(|(element, _)| *element);
        let marked = cameras
            .iter()
            .find(|(element, _)| is_marked_camera(env.doc, *element))
            .copied();
        if let Some((_, object)) = marked {
            self.adopt_camera(object, CameraSource::Marked);
            return;
        }
        if let Some((_, object)) = cameras.first().copied() {
            self.adopt_camera(object, CameraSource::First);
            return;
        }
        let Some(mut camera) = env.types.construct(ObjectKind::PerspectiveCamera) else {
            return;
        };
        configure_perspective(&mut camera, env.config, self.bounds.aspect());
        if let Err(err) = camera.assign("position-z", &Value::Number(SYNTHESIZED_CAMERA_Z)) {
            warn!("Cannot place the default camera: {err:#}");
        }
        let graph_root = self.scene.graph.root();
        match self.scene.graph.add(graph_root, camera) {
            Ok(object) => {
                warn!(
                    "Host {} has no camera element; using a default perspective camera",
                    self.id.0
                );
                self.scene.camera = Some(object);
                self.synthesized = Some(object);
                self.camera_source = Some(CameraSource::Synthesized);
            }
            Err(err) => error!("Cannot add the default camera: {err:#}"),
        }
    }

    /// `<style>` elements that apply to this host, in document order: those
    /// inside the root, and those outside every host.
    fn collect_sheets(&self, doc: &Document) -> Vec<(NodeKey, String)> {
        doc.descendants(doc.root())
            .into_iter()
            .filter(|node| is_style(doc, *node))
            .filter(|node| doc.is_ancestor(self.root, *node) || !inside_any_host(doc, *node))
            .map(|node| (node, doc.text_content(node)))
            .collect()
    }

    /// Re-read stylesheets and rebuild the rule index when they changed.
    fn reload_sheets(&mut self, env: &HostEnv<'_>) -> bool {
        let current = self.collect_sheets(env.doc);
        if !self.sheets.sync(current) {
            return false;
        }
        self.sheets.rebuild_into(&mut self.rules);
        {
            let mut assets = env.assets.borrow_mut();
            for declaration in self.rules.assets() {
                assets.declare(&declaration.name, &declaration.url);
            }
        }
        self.counters.stylesheet_rebuilds = self.counters.stylesheet_rebuilds.saturating_add(1);
        info!(
            "Host {} indexed {} stylesheets (epoch {})",
            self.id.0,
            self.sheets.sheets().len(),
            self.rules.epoch()
        );
        true
    }

    /// Paint a stable snapshot of the dirty set, repeating while new dirt
    /// appears, up to [`MAX_FLUSH_PASSES`] per frame.
    fn flush_repaints(&mut self, env: &HostEnv<'_>) {
        let resolver = StyleResolver {
            doc: env.doc,
            rules: &self.rules,
            assets: env.assets,
            handlers: env.handlers,
        };
        let mut painted: u64 = 0;
        let mut passes = 0;
        while let Some(batch) = self.queue.take() {
            let targets = match batch {
                RepaintBatch::Full => {
                    let mut order = vec![self.root];
                    order.extend(env.doc.descendants(self.root));
                    order.retain(|element| self.scene.node(*element).is_some());
                    order
                }
                RepaintBatch::Nodes(nodes) => nodes,
            };
            for element in targets {
                resolver.paint_node(&mut self.scene, &mut self.animator, element);
                painted += 1;
            }
            passes += 1;
            if passes >= MAX_FLUSH_PASSES {
                if self.queue.is_dirty() {
                    debug!("Host {} repaint spills into the next frame", self.id.0);
                    self.queue.incr_deferred();
                }
                break;
            }
        }
        if painted > 0 {
            self.counters.nodes_painted_last = painted;
            self.counters.nodes_painted_total = self.counters.nodes_painted_total.saturating_add(painted);
        }
    }

    fn apply_mutations(&mut self, env: &HostEnv<'_>) {
        let status = match self.mirror.try_update_sync() {
            Ok(status) => status,
            Err(err) => {
                error!("Host {} lost its document: {err:#}", self.id.0);
                return;
            }
        };
        let batch = self.mirror.mirror_mut().drain();
        if let MirrorStatus::Lagged(skipped) = status {
            warn!("Host {} missed {skipped} mutation batches; rescanning", self.id.0);
            self.resync(env);
            return;
        }
        self.counters.mutations_applied = self
            .counters
            .mutations_applied
            .saturating_add(batch.len() as u64);
        let mut sheets_dirty = false;
        for mutation in batch {
            match mutation {
                Mutation::Inserted { node, .. } => {
                    if is_style(env.doc, node) {
                        sheets_dirty = true;
                        continue;
                    }
                    if self.scene.node(node).is_some()
                        || !env.doc.is_connected(node)
                        || !env.doc.is_ancestor(self.root, node)
                    {
                        continue;
                    }
                    let parent = self.parent_object(env.doc, node);
                    let mut created = Vec::new();
                    self.scan(env, node, parent, &mut created);
                    for element in created {
                        self.queue.mark(element);
                    }
                }
                Mutation::Removed {
                    node,
                    parent,
                    subtree,
                } => {
                    if node == self.root || subtree.contains(&self.root) {
                        self.dispose();
                        return;
                    }
                    if node == self.surface || subtree.contains(&self.surface) {
                        warn!("Host {} lost its surface", self.id.0);
                        self.dispose();
                        return;
                    }
                    // Covers dropping a sheet's own text as well as the sheet itself.
                    if is_style(env.doc, parent)
                        || is_style(env.doc, node)
                        || subtree.iter().any(|key| is_style(env.doc, *key))
                    {
                        sheets_dirty = true;
                    }
                    self.destroy(node, &subtree);
                }
                Mutation::Attribute { node, name } => {
                    self.attribute_changed(env, node, &name);
                }
                Mutation::Text { node, parent } => {
                    let owner = parent.or_else(|| env.doc.parent(node));
                    if owner.is_some_and(|owner| is_style(env.doc, owner)) {
                        sheets_dirty = true;
                    }
                }
            }
        }
        if sheets_dirty && self.reload_sheets(env) {
            self.queue.mark_all();
        }
        self.ensure_camera(env);
    }

    fn attribute_changed(&mut self, env: &HostEnv<'_>, node: NodeKey, name: &str) {
        if self.scene.node(node).is_none() {
            return;
        }
        match name {
            "id" => {
                self.scene.set_dom_id(node, env.doc.id(node).map(str::to_owned));
                self.queue.mark(node);
            }
            "class" => {
                self.scene.set_classes(node, env.doc.classes(node));
                self.queue.mark(node);
            }
            "style" => {
                let resolver = StyleResolver {
                    doc: env.doc,
                    rules: &self.rules,
                    assets: env.assets,
                    handlers: env.handlers,
                };
                resolver.paint_inline(&mut self.scene, &mut self.animator, node);
            }
            "active" => {
                let kind = self.scene.node(node).map(|entry| (entry.kind, entry.object));
                if let Some((kind, object)) = kind
                    && kind.is_camera()
                    && is_marked_camera(env.doc, node)
                {
                    self.adopt_camera(object, CameraSource::Marked);
                }
            }
            handler if handler.starts_with("on") => {
                let resolver = StyleResolver {
                    doc: env.doc,
                    rules: &self.rules,
                    assets: env.assets,
                    handlers: env.handlers,
                };
                resolver.refresh_membership(&mut self.scene, node);
            }
            _ => {}
        }
    }

    /// Destroy the nodes of a removed subtree, children first.
    fn destroy(&mut self, node: NodeKey, subtree: &[NodeKey]) {
        let mut removed: usize = 0;
        for element in subtree.iter().rev().chain([node].iter()) {
            let Some(gone) = self.scene.forget(*element) else {
                continue;
            };
            if let Some(run) = &gone.run {
                run.cancel();
            }
            if gone.object != self.scene.graph.root() {
                self.scene.graph.remove_subtree(gone.object);
            }
            removed += 1;
        }
        if removed > 0 {
            debug!("Host {} destroyed {removed} nodes under {node:?}", self.id.0);
        }
    }

    /// Rebuild the mapping from the current document after missed batches.
    fn resync(&mut self, env: &HostEnv<'_>) {
        let stale: Vec<NodeKey> = self
            .scene
            .nodes()
            .map(|node| node.element)
            .filter(|element| !env.doc.is_connected(*element) || !env.doc.contains(self.root, *element))
            .collect();
        for element in stale {
            self.destroy(element, &[]);
        }
        let graph_root = self.scene.graph.root();
        let mut created = Vec::new();
        self.scan(env, self.root, graph_root, &mut created);
        for element in self.scene.nodes().map(|node| node.element).collect::<Vec<_>>() {
            let id = env.doc.id(element).map(str::to_owned);
            self.scene.set_dom_id(element, id);
            self.scene.set_classes(element, env.doc.classes(element));
        }
        self.reload_sheets(env);
        self.ensure_camera(env);
        self.queue.mark_all();
    }
}
