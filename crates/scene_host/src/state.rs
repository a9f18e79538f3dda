//! Per-host scene state: the object graph, its nodes, and their indices.
//!
//! [`HostScene`] is also the context every tween and keyframe run writes
//! through, so animations never hold references into the graph.

use animation::RunHandle;
use assets::AssetFuture;
use css::{AnimationSpec, PseudoState, SelectorKey, TransitionSpec, selector_keys};
use html::NodeKey;
use log::warn;
use renderer::{ObjectId, ObjectKind, PICK_LAYER, SceneGraph, Value};
use core::mem;
use std::collections::{BTreeSet, HashMap};

/// A scene object mapped from one source element, plus its style and interaction state.
#[derive(Debug)]
pub struct SceneNode {
    pub element: NodeKey,
    pub object: ObjectId,
    pub kind: ObjectKind,
    pub tag: String,
    /// Class tokens in authored order; the first also names the object.
    pub classes: Vec<String>,
    pub dom_id: Option<String>,
    /// Pseudo-state flags in the order they were raised.
    pub flags: Vec<PseudoState>,
    pub transition: Option<TransitionSpec>,
    pub animation: Option<AnimationSpec>,
    pub pickable: bool,
    pub(crate) run: Option<RunHandle>,
    /// Last transition target per property.
    pub(crate) targets: HashMap<String, Value>,
}

impl SceneNode {
    pub(crate) fn new(element: NodeKey, object: ObjectId, kind: ObjectKind, tag: String) -> Self {
        Self {
            element,
            object,
            kind,
            tag,
            classes: Vec::new(),
            dom_id: None,
            flags: Vec::new(),
            transition: None,
            animation: None,
            pickable: false,
            run: None,
            targets: HashMap::new(),
        }
    }

    /// Selector keys, lowest precedence first.
    pub fn selector_keys(&self) -> Vec<SelectorKey> {
        selector_keys(&self.tag, &self.classes, self.dom_id.as_deref())
    }

    pub fn has_flag(&self, flag: PseudoState) -> bool {
        self.flags.contains(&flag)
    }

    /// Raise `flag`. Returns false if it was already set.
    pub fn set_flag(&mut self, flag: PseudoState) -> bool {
        if self.has_flag(flag) {
            return false;
        }
        self.flags.push(flag);
        true
    }

    /// Clear `flag`. Returns false if it was not set.
    pub fn clear_flag(&mut self, flag: PseudoState) -> bool {
        let before = self.flags.len();
        self.flags.retain(|set| *set != flag);
        self.flags.len() != before
    }

    /// True while a keyframe run started for this node is still going.
    pub fn is_running(&self) -> bool {
        self.run.as_ref().is_some_and(RunHandle::is_active)
    }
}

/// An asset-valued assignment waiting for its load.
pub(crate) struct DeferredAssignment {
    pub node: NodeKey,
    pub property: String,
    pub name: String,
    pub pending: AssetFuture,
}

/// Something the embedder may want to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostNotice {
    TransitionFinished { node: NodeKey, property: String },
    KeyframesFinished { node: NodeKey, name: String },
}

/// The scene graph and every index over its nodes.
#[derive(Default)]
pub struct HostScene {
    pub(crate) graph: SceneGraph,
    pub(crate) nodes: HashMap<NodeKey, SceneNode>,
    pub(crate) by_object: HashMap<ObjectId, NodeKey>,
    pub(crate) by_id: HashMap<String, Vec<NodeKey>>,
    pub(crate) by_class: HashMap<String, Vec<NodeKey>>,
    pub(crate) always: BTreeSet<NodeKey>,
    pub(crate) deferred: Vec<DeferredAssignment>,
    pub(crate) notices: Vec<HostNotice>,
    pub(crate) camera: Option<ObjectId>,
}

fn push_unique(list: &mut Vec<NodeKey>, node: NodeKey) {
    if !list.contains(&node) {
        list.push(node);
    }
}

fn remove_from(index: &mut HashMap<String, Vec<NodeKey>>, key: &str, node: NodeKey) {
    if let Some(list) = index.get_mut(key) {
        list.retain(|entry| *entry != node);
        if list.is_empty() {
            index.remove(key);
        }
    }
}

impl HostScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    pub fn node(&self, element: NodeKey) -> Option<&SceneNode> {
        self.nodes.get(&element)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_for_object(&self, object: ObjectId) -> Option<NodeKey> {
        self.by_object.get(&object).copied()
    }

    /// Nodes carrying `id`, in the order they were indexed.
    pub fn ids(&self, id: &str) -> &[NodeKey] {
        self.by_id.get(id).map_or(&[], Vec::as_slice)
    }

    pub fn classes(&self, class: &str) -> &[NodeKey] {
        self.by_class.get(class).map_or(&[], Vec::as_slice)
    }

    pub fn always(&self) -> &BTreeSet<NodeKey> {
        &self.always
    }

    pub const fn camera(&self) -> Option<ObjectId> {
        self.camera
    }

    /// Register a freshly built node and index it.
    pub(crate) fn insert(&mut self, node: SceneNode) {
        let element = node.element;
        self.by_object.insert(node.object, element);
        if let Some(id) = &node.dom_id {
            push_unique(self.by_id.entry(id.clone()).or_default(), element);
        }
        for class in &node.classes {
            push_unique(self.by_class.entry(class.clone()).or_default(), element);
        }
        self.nodes.insert(element, node);
    }

    /// Drop `element` from every index and return its node.
    pub(crate) fn forget(&mut self, element: NodeKey) -> Option<SceneNode> {
        let node = self.nodes.remove(&element)?;
        self.by_object.remove(&node.object);
        if let Some(id) = &node.dom_id {
            remove_from(&mut self.by_id, id, element);
        }
        for class in &node.classes {
            remove_from(&mut self.by_class, class, element);
        }
        self.always.remove(&element);
        self.deferred.retain(|assignment| assignment.node != element);
        if self.camera == Some(node.object) {
            self.camera = None;
        }
        Some(node)
    }

    /// Replace a node's id and re-index it.
    pub(crate) fn set_dom_id(&mut self, element: NodeKey, id: Option<String>) {
        let Some(node) = self.nodes.get_mut(&element) else {
            return;
        };
        if node.dom_id == id {
            return;
        }
        let previous = mem::replace(&mut node.dom_id, id.clone());
        if let Some(old) = previous {
            remove_from(&mut self.by_id, &old, element);
        }
        if let Some(new) = id {
            push_unique(self.by_id.entry(new).or_default(), element);
        }
    }

    /// Replace a node's class list and re-index it. The first class names the object.
    pub(crate) fn set_classes(&mut self, element: NodeKey, classes: Vec<String>) {
        let Some(node) = self.nodes.get_mut(&element) else {
            return;
        };
        if node.classes == classes {
            return;
        }
        let previous = mem::replace(&mut node.classes, classes.clone());
        let object = node.object;
        for old in previous.iter().filter(|old| !classes.contains(old)) {
            remove_from(&mut self.by_class, old, element);
        }
        for class in &classes {
            push_unique(self.by_class.entry(class.clone()).or_default(), element);
        }
        if let Some(target) = self.graph.get_mut(object) {
            target.name = classes.first().cloned().unwrap_or_default();
        }
    }

    pub(crate) fn set_always(&mut self, element: NodeKey, always: bool) {
        if always {
            self.always.insert(element);
        } else {
            self.always.remove(&element);
        }
    }

    /// Flip a node's pick layer membership.
    pub(crate) fn set_pickable(&mut self, element: NodeKey, pickable: bool) {
        let Some(node) = self.nodes.get_mut(&element) else {
            return;
        };
        node.pickable = pickable;
        let object = node.object;
        if let Some(target) = self.graph.get_mut(object) {
            if pickable {
                target.layers.enable(PICK_LAYER);
            } else {
                target.layers.disable(PICK_LAYER);
            }
        }
    }

    /// Current value of `path` on a node's object.
    pub fn read(&self, element: NodeKey, path: &str) -> Option<Value> {
        let object = self.nodes.get(&element)?.object;
        self.graph.get(object)?.read(path)
    }

    /// Assign through the object's slot table. Writes to destroyed nodes are dropped.
    pub fn write(&mut self, element: NodeKey, path: &str, value: &Value) {
        let Some(object) = self.nodes.get(&element).map(|node| node.object) else {
            return;
        };
        let Some(target) = self.graph.get_mut(object) else {
            return;
        };
        if let Err(err) = target.assign(path, value) {
            warn!("Cannot assign `--{path}` on {element:?}: {err:#}");
        }
    }

    /// Take the notices raised since the last drain.
    pub fn drain_notices(&mut self) -> Vec<HostNotice> {
        mem::take(&mut self.notices)
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderer::TypeRegistry;

    fn node(scene: &mut HostScene, key: u64, classes: &[&str], id: Option<&str>) -> NodeKey {
        let registry = TypeRegistry::new();
        let Some(object) = registry.construct(ObjectKind::Mesh) else {
            panic!("mesh kind is registered");
        };
        let root = scene.graph.root();
        let Ok(object) = scene.graph.add(root, object) else {
            panic!("root accepts children");
        };
        let element = NodeKey(key);
        let mut built = SceneNode::new(element, object, ObjectKind::Mesh, "mesh".into());
        built.classes = classes.iter().map(|class| (*class).to_owned()).collect();
        built.dom_id = id.map(str::to_owned);
        scene.insert(built);
        element
    }

    #[test]
    fn indices_follow_class_and_id_edits() {
        let mut scene = HostScene::new();
        let wheel = node(&mut scene, 1, &["wheel", "front"], Some("left"));
        assert_eq!(scene.classes("wheel"), &[wheel]);
        assert_eq!(scene.ids("left"), &[wheel]);

        scene.set_classes(wheel, vec!["rear".into()]);
        assert!(scene.classes("wheel").is_empty());
        assert!(scene.classes("front").is_empty());
        assert_eq!(scene.classes("rear"), &[wheel]);

        scene.set_dom_id(wheel, Some("right".into()));
        assert!(scene.ids("left").is_empty());
        assert_eq!(scene.ids("right"), &[wheel]);
    }

    #[test]
    fn forget_clears_every_index() {
        let mut scene = HostScene::new();
        let hub = node(&mut scene, 7, &["hub"], Some("hub"));
        scene.set_always(hub, true);
        assert!(scene.forget(hub).is_some());
        assert!(scene.ids("hub").is_empty());
        assert!(scene.classes("hub").is_empty());
        assert!(scene.always().is_empty());
        assert!(scene.by_object.is_empty());
        assert!(scene.forget(hub).is_none());
    }

    #[test]
    fn flags_keep_raise_order() {
        let mut scene = HostScene::new();
        let key = node(&mut scene, 2, &[], None);
        let Some(entry) = scene.nodes.get_mut(&key) else {
            panic!("node was inserted");
        };
        assert!(entry.set_flag(PseudoState::Focus));
        assert!(entry.set_flag(PseudoState::Hover));
        assert!(!entry.set_flag(PseudoState::Focus));
        assert_eq!(entry.flags, vec![PseudoState::Focus, PseudoState::Hover]);
        assert!(entry.clear_flag(PseudoState::Focus));
        assert!(!entry.clear_flag(PseudoState::Focus));
    }
}
