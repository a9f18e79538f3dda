use crate::kinds::ObjectKind;
use crate::object::Object3D;
use crate::slots::SlotTable;
use anyhow::{Result as AnyResult, anyhow, bail};
use glam::Mat4;
use indextree::{Arena, Node, NodeId};
use std::rc::Rc;

pub type ObjectId = NodeId;

/// Retained object tree rooted at a `Scene` object.
#[derive(Debug)]
pub struct SceneGraph {
    arena: Arena<Object3D>,
    root: ObjectId,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let scene = Object3D::new(ObjectKind::Scene, Rc::new(SlotTable::for_kind(ObjectKind::Scene)));
        let root = arena.new_node(scene);
        Self { arena, root }
    }

    pub const fn root(&self) -> ObjectId {
        self.root
    }

    fn live(&self, id: ObjectId) -> Option<&Node<Object3D>> {
        self.arena.get(id).filter(|node| !node.is_removed())
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.live(id).is_some()
    }

    pub fn get(&self, id: ObjectId) -> Option<&Object3D> {
        self.live(id).map(Node::get)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object3D> {
        self.arena
            .get_mut(id)
            .filter(|node| !node.is_removed())
            .map(|node| node.get_mut())
    }

    /// Objects currently in the graph, the scene root included.
    pub fn len(&self) -> usize {
        self.root.descendants(&self.arena).count()
    }

    pub fn is_empty(&self) -> bool {
        self.root.children(&self.arena).next().is_none()
    }

    /// Append `object` under `parent` and return its id.
    ///
    /// # Errors
    /// Fails when `parent` is not in the graph.
    pub fn add(&mut self, parent: ObjectId, object: Object3D) -> AnyResult<ObjectId> {
        if !self.contains(parent) {
            bail!("parent {parent:?} is not in the scene graph");
        }
        let id = self.arena.new_node(object);
        parent
            .checked_append(id, &mut self.arena)
            .map_err(|err| anyhow!("attaching {id:?}: {err}"))?;
        Ok(id)
    }

    /// Move an existing object under `parent`.
    ///
    /// # Errors
    /// Fails when either id is missing or the move would create a cycle.
    pub fn reparent(&mut self, id: ObjectId, parent: ObjectId) -> AnyResult<()> {
        if !self.contains(id) || !self.contains(parent) {
            bail!("reparent of unknown object");
        }
        id.detach(&mut self.arena);
        parent
            .checked_append(id, &mut self.arena)
            .map_err(|err| anyhow!("reparenting {id:?}: {err}"))
    }

    /// Detach `id` from its parent, keeping it and its subtree alive.
    pub fn detach(&mut self, id: ObjectId) {
        if id != self.root && self.contains(id) {
            id.detach(&mut self.arena);
        }
    }

    /// Remove `id` and every descendant. The root cannot be removed.
    /// Returns the number of objects removed.
    pub fn remove_subtree(&mut self, id: ObjectId) -> usize {
        if id == self.root || !self.contains(id) {
            return 0;
        }
        let count = id.descendants(&self.arena).count();
        id.remove_subtree(&mut self.arena);
        count
    }

    pub fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.live(id).and_then(Node::parent)
    }

    pub fn children(&self, id: ObjectId) -> Vec<ObjectId> {
        if !self.contains(id) {
            return Vec::new();
        }
        id.children(&self.arena).collect()
    }

    /// Pre-order walk of every object attached under the root, root first.
    pub fn traverse(&self) -> impl Iterator<Item = (ObjectId, &Object3D)> + '_ {
        self.root
            .descendants(&self.arena)
            .filter_map(|id| self.get(id).map(|object| (id, object)))
    }

    /// True when `id` is reachable from the root.
    pub fn is_attached(&self, id: ObjectId) -> bool {
        self.contains(id) && id.ancestors(&self.arena).any(|ancestor| ancestor == self.root)
    }

    /// Product of local matrices from the root down to `id`.
    pub fn world_matrix(&self, id: ObjectId) -> Mat4 {
        if !self.contains(id) {
            return Mat4::IDENTITY;
        }
        let chain: Vec<ObjectId> = id.ancestors(&self.arena).collect();
        chain
            .iter()
            .rev()
            .filter_map(|ancestor| self.get(*ancestor))
            .fold(Mat4::IDENTITY, |world, object| world * object.local_matrix())
    }

    /// Objects whose `visible` field is set and whose ancestors are all visible.
    pub fn is_visible(&self, id: ObjectId) -> bool {
        self.contains(id)
            && id
                .ancestors(&self.arena)
                .all(|ancestor| self.get(ancestor).is_some_and(Object3D::visible))
    }
}
