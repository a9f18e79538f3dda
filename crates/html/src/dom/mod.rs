//! Arena-backed source document.
//!
//! Every structural or attribute mutation made through [`Document`] is queued as a
//! [`DOMUpdate`]; [`Document::commit`] hands the queued batch to all subscribers.
//! Only nodes connected to the document root produce updates and appear in the
//! id/class/tag lookups. Detached subtrees are announced in full when attached.

mod printing;
mod updating;

use anyhow::{Result, anyhow, bail};
use indextree::{Arena, Node, NodeId};
use log::debug;
use smallvec::SmallVec;
use core::mem;
use std::collections::HashMap;
use tokio::sync::broadcast;

pub use updating::{DOMMirror, DOMSubscriber, DOMUpdate, MirrorStatus};

/// Default number of committed batches a lagging subscriber may fall behind.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// A 64-bit stable key for document nodes, used to correlate updates across subscribers.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct NodeKey(pub u64);

impl NodeKey {
    /// The document node key (always present).
    pub const ROOT: Self = Self(0);
}

#[derive(Debug, Clone, Default)]
pub enum NodeKind {
    #[default]
    Document,
    Element {
        tag: String,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DOMNode {
    pub key: NodeKey,
    pub kind: NodeKind,
    pub attrs: SmallVec<(String, String), 4>,
}

impl Default for NodeKey {
    fn default() -> Self {
        Self::ROOT
    }
}

/// The source document: a tree of tagged elements and text.
pub struct Document {
    dom: Arena<DOMNode>,
    root: NodeId,
    ids: HashMap<NodeKey, NodeId>,
    next_key: u64,
    /// id attribute -> connected elements carrying it, in insertion order.
    id_index: HashMap<String, SmallVec<NodeKey, 1>>,
    class_index: HashMap<String, Vec<NodeKey>>,
    /// lowercased tag -> connected elements.
    tag_index: HashMap<String, Vec<NodeKey>>,
    pending: Vec<DOMUpdate>,
    update_sender: broadcast::Sender<Vec<DOMUpdate>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document with the default broadcast capacity.
    pub fn new() -> Self {
        Self::with_channel_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create an empty document whose update channel holds `capacity` batches.
    pub fn with_channel_capacity(capacity: usize) -> Self {
        let (update_sender, _) = broadcast::channel(capacity.max(1));
        let mut dom = Arena::new();
        let root = dom.new_node(DOMNode::default());
        let mut ids = HashMap::new();
        ids.insert(NodeKey::ROOT, root);
        Self {
            dom,
            root,
            ids,
            next_key: 1,
            id_index: HashMap::new(),
            class_index: HashMap::new(),
            tag_index: HashMap::new(),
            pending: Vec::new(),
            update_sender,
        }
    }

    /// Subscribe to committed update batches.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<DOMUpdate>> {
        self.update_sender.subscribe()
    }

    /// Broadcast all queued updates as one batch. Returns the number of updates sent.
    pub fn commit(&mut self) -> usize {
        if self.pending.is_empty() {
            return 0;
        }
        let batch = mem::take(&mut self.pending);
        let count = batch.len();
        if self.update_sender.send(batch).is_err() {
            debug!("Committed {count} DOM updates with no subscribers");
        }
        count
    }

    /// Updates queued since the last commit.
    pub fn pending_updates(&self) -> &[DOMUpdate] {
        &self.pending
    }

    /// Signal that initial document construction finished.
    pub fn end_of_document(&mut self) {
        self.pending.push(DOMUpdate::EndOfDocument);
    }

    // ---------------------------------------------------------------------
    // Construction and mutation
    // ---------------------------------------------------------------------

    fn mint(&mut self, kind: NodeKind) -> NodeKey {
        let key = NodeKey(self.next_key);
        self.next_key += 1;
        let id = self.dom.new_node(DOMNode {
            key,
            kind,
            attrs: SmallVec::new(),
        });
        self.ids.insert(key, id);
        key
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeKey {
        self.mint(NodeKind::Element {
            tag: tag.to_owned(),
        })
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeKey {
        self.mint(NodeKind::Text {
            text: text.to_owned(),
        })
    }

    fn node_id(&self, key: NodeKey) -> Result<NodeId> {
        self.ids
            .get(&key)
            .copied()
            .ok_or_else(|| anyhow!("Unknown node {key:?}"))
    }

    fn node(&self, key: NodeKey) -> Option<&DOMNode> {
        let id = self.ids.get(&key)?;
        self.dom.get(*id).map(Node::get)
    }

    fn key_of(&self, id: NodeId) -> Option<NodeKey> {
        self.dom.get(id).map(|node| node.get().key)
    }

    /// Append `child` as the last child of `parent`.
    ///
    /// # Errors
    /// Returns an error for unknown keys, text parents, or when the move would create a cycle.
    pub fn append_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<()> {
        let parent_id = self.node_id(parent)?;
        let pos = parent_id.children(&self.dom).count();
        self.insert_child(parent, pos, child)
    }

    /// Insert `child` at child position `pos` of `parent` (clamped to the child count).
    ///
    /// # Errors
    /// Returns an error for unknown keys, text parents, or when the move would create a cycle.
    pub fn insert_child(&mut self, parent: NodeKey, pos: usize, child: NodeKey) -> Result<()> {
        let parent_id = self.node_id(parent)?;
        let child_id = self.node_id(child)?;
        if child == NodeKey::ROOT {
            bail!("The document node cannot be inserted");
        }
        if matches!(self.node(parent).map(|node| &node.kind), Some(NodeKind::Text { .. })) {
            bail!("Text node {parent:?} cannot have children");
        }
        if parent_id.ancestors(&self.dom).any(|ancestor| ancestor == child_id) {
            bail!("Inserting {child:?} under {parent:?} would create a cycle");
        }
        if self.dom.get(child_id).and_then(Node::parent).is_some() {
            self.remove(child)?;
        }
        let siblings: Vec<NodeId> = parent_id.children(&self.dom).collect();
        let pos = pos.min(siblings.len());
        match siblings.get(pos) {
            Some(next) => next
                .checked_insert_before(child_id, &mut self.dom)
                .map_err(|err| anyhow!("Cannot insert {child:?}: {err:?}"))?,
            None => parent_id
                .checked_append(child_id, &mut self.dom)
                .map_err(|err| anyhow!("Cannot append {child:?}: {err:?}"))?,
        }
        if self.is_connected(parent) {
            self.announce_subtree(parent, child, pos);
        }
        Ok(())
    }

    /// Queue insert updates for a freshly connected subtree and index its elements.
    fn announce_subtree(&mut self, parent: NodeKey, child: NodeKey, pos: usize) {
        let Ok(child_id) = self.node_id(child) else {
            return;
        };
        let order: Vec<NodeId> = child_id.descendants(&self.dom).collect();
        for id in order {
            let Some(node) = self.dom.get(id) else {
                continue;
            };
            let (node_parent, node_pos) = if id == child_id {
                (parent, pos)
            } else {
                let node_parent = node.parent().and_then(|pid| self.key_of(pid));
                let node_pos = id.preceding_siblings(&self.dom).count() - 1;
                (node_parent.unwrap_or(NodeKey::ROOT), node_pos)
            };
            let data = node.get().clone();
            match data.kind {
                NodeKind::Element { tag } => {
                    self.index_element(data.key, &tag, &data.attrs);
                    self.pending.push(DOMUpdate::InsertElement {
                        parent: node_parent,
                        node: data.key,
                        tag,
                        pos: node_pos,
                    });
                    for (name, value) in data.attrs {
                        self.pending.push(DOMUpdate::SetAttr {
                            node: data.key,
                            name,
                            value,
                        });
                    }
                }
                NodeKind::Text { text } => self.pending.push(DOMUpdate::InsertText {
                    parent: node_parent,
                    node: data.key,
                    text,
                    pos: node_pos,
                }),
                NodeKind::Document => {}
            }
        }
    }

    /// Detach `node` (and its subtree) from its parent. The keys stay valid.
    ///
    /// # Errors
    /// Returns an error for unknown keys or the document node.
    pub fn remove(&mut self, node: NodeKey) -> Result<()> {
        if node == NodeKey::ROOT {
            bail!("The document node cannot be removed");
        }
        let id = self.node_id(node)?;
        let Some(parent) = self
            .dom
            .get(id)
            .and_then(Node::parent)
            .and_then(|pid| self.key_of(pid))
        else {
            return Ok(());
        };
        let connected = self.is_connected(node);
        let subtree: Vec<NodeKey> = id
            .descendants(&self.dom)
            .skip(1)
            .filter_map(|desc| self.key_of(desc))
            .collect();
        if connected {
            self.unindex_element(node);
            for desc in &subtree {
                self.unindex_element(*desc);
            }
        }
        id.detach(&mut self.dom);
        if connected {
            self.pending.push(DOMUpdate::RemoveNode {
                node,
                parent,
                subtree,
            });
        }
        Ok(())
    }

    /// Set an attribute on an element, replacing an existing value.
    ///
    /// # Errors
    /// Returns an error for unknown keys or non-element nodes.
    pub fn set_attribute(&mut self, node: NodeKey, name: &str, value: &str) -> Result<()> {
        let id = self.node_id(node)?;
        let connected = self.is_connected(node);
        if connected {
            self.unindex_element(node);
        }
        let entry = self
            .dom
            .get_mut(id)
            .map(Node::get_mut)
            .ok_or_else(|| anyhow!("Unknown node {node:?}"))?;
        if !matches!(entry.kind, NodeKind::Element { .. }) {
            bail!("Attributes can only be set on elements, not {node:?}");
        }
        let name = name.to_ascii_lowercase();
        match entry.attrs.iter_mut().find(|(attr, _)| *attr == name) {
            Some(slot) => value.clone_into(&mut slot.1),
            None => entry.attrs.push((name.clone(), value.to_owned())),
        }
        if connected {
            self.reindex_element(node);
            self.pending.push(DOMUpdate::SetAttr {
                node,
                name,
                value: value.to_owned(),
            });
        }
        Ok(())
    }

    /// Remove an attribute from an element. Missing attributes are ignored.
    ///
    /// # Errors
    /// Returns an error for unknown keys.
    pub fn remove_attribute(&mut self, node: NodeKey, name: &str) -> Result<()> {
        let id = self.node_id(node)?;
        let name = name.to_ascii_lowercase();
        let had = self
            .node(node)
            .is_some_and(|data| data.attrs.iter().any(|(attr, _)| *attr == name));
        if !had {
            return Ok(());
        }
        let connected = self.is_connected(node);
        if connected {
            self.unindex_element(node);
        }
        if let Some(entry) = self.dom.get_mut(id) {
            entry.get_mut().attrs.retain(|(attr, _)| *attr != name);
        }
        if connected {
            self.reindex_element(node);
            self.pending.push(DOMUpdate::RemoveAttr { node, name });
        }
        Ok(())
    }

    /// Replace the text of a text node, or all children of an element with one text node.
    ///
    /// # Errors
    /// Returns an error for unknown keys or the document node.
    pub fn set_text(&mut self, node: NodeKey, text: &str) -> Result<()> {
        let id = self.node_id(node)?;
        let kind = self
            .node(node)
            .map(|data| data.kind.clone())
            .ok_or_else(|| anyhow!("Unknown node {node:?}"))?;
        match kind {
            NodeKind::Text { .. } => {
                if let Some(entry) = self.dom.get_mut(id) {
                    entry.get_mut().kind = NodeKind::Text {
                        text: text.to_owned(),
                    };
                }
                if self.is_connected(node) {
                    self.pending.push(DOMUpdate::SetText {
                        node,
                        text: text.to_owned(),
                    });
                }
                Ok(())
            }
            NodeKind::Element { .. } => {
                let children: Vec<NodeKey> = self.children(node);
                for child in children {
                    self.remove(child)?;
                }
                if !text.is_empty() {
                    let text_node = self.create_text(text);
                    self.append_child(node, text_node)?;
                }
                Ok(())
            }
            NodeKind::Document => bail!("The document node has no text"),
        }
    }

    fn index_element(&mut self, key: NodeKey, tag: &str, attrs: &[(String, String)]) {
        self.tag_index
            .entry(tag.to_ascii_lowercase())
            .or_default()
            .push(key);
        for (name, value) in attrs {
            match name.as_str() {
                "id" if !value.is_empty() => {
                    self.id_index.entry(value.clone()).or_default().push(key);
                }
                "class" => {
                    for class in split_classes(value) {
                        let list = self.class_index.entry(class.to_owned()).or_default();
                        if !list.contains(&key) {
                            list.push(key);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn unindex_element(&mut self, key: NodeKey) {
        let Some(DOMNode {
            kind: NodeKind::Element { tag },
            attrs,
            ..
        }) = self.node(key).cloned()
        else {
            return;
        };
        if let Some(list) = self.tag_index.get_mut(&tag.to_ascii_lowercase()) {
            list.retain(|other| *other != key);
        }
        for (name, value) in &attrs {
            match name.as_str() {
                "id" => {
                    if let Some(list) = self.id_index.get_mut(value) {
                        list.retain(|other| *other != key);
                        if list.is_empty() {
                            self.id_index.remove(value);
                        }
                    }
                }
                "class" => {
                    for class in split_classes(value) {
                        if let Some(list) = self.class_index.get_mut(class) {
                            list.retain(|other| *other != key);
                            if list.is_empty() {
                                self.class_index.remove(class);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn reindex_element(&mut self, key: NodeKey) {
        if let Some(DOMNode {
            kind: NodeKind::Element { tag },
            attrs,
            ..
        }) = self.node(key).cloned()
        {
            self.index_element(key, &tag, &attrs);
        }
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// The document node key.
    pub const fn root(&self) -> NodeKey {
        NodeKey::ROOT
    }

    pub fn contains_key(&self, key: NodeKey) -> bool {
        self.ids.contains_key(&key)
    }

    pub fn kind(&self, key: NodeKey) -> Option<&NodeKind> {
        self.node(key).map(|node| &node.kind)
    }

    pub fn is_element(&self, key: NodeKey) -> bool {
        matches!(self.kind(key), Some(NodeKind::Element { .. }))
    }

    /// Lowercased tag name of an element.
    pub fn tag(&self, key: NodeKey) -> Option<String> {
        match self.kind(key)? {
            NodeKind::Element { tag } => Some(tag.to_ascii_lowercase()),
            _ => None,
        }
    }

    pub fn attr(&self, key: NodeKey, name: &str) -> Option<&str> {
        self.node(key)?
            .attrs
            .iter()
            .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn attrs(&self, key: NodeKey) -> &[(String, String)] {
        self.node(key).map_or(&[], |node| node.attrs.as_slice())
    }

    pub fn id(&self, key: NodeKey) -> Option<&str> {
        self.attr(key, "id").filter(|value| !value.is_empty())
    }

    /// Class tokens in authored order, without duplicates.
    pub fn classes(&self, key: NodeKey) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for class in split_classes(self.attr(key, "class").unwrap_or_default()) {
            if !out.iter().any(|seen| seen == class) {
                out.push(class.to_owned());
            }
        }
        out
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        let id = self.ids.get(&key)?;
        let parent = self.dom.get(*id)?.parent()?;
        self.key_of(parent)
    }

    pub fn children(&self, key: NodeKey) -> Vec<NodeKey> {
        self.ids.get(&key).map_or_else(Vec::new, |id| {
            id.children(&self.dom)
                .filter_map(|child| self.key_of(child))
                .collect()
        })
    }

    pub fn element_children(&self, key: NodeKey) -> Vec<NodeKey> {
        self.children(key)
            .into_iter()
            .filter(|child| self.is_element(*child))
            .collect()
    }

    /// Descendants of `key` in pre-order, excluding `key` itself.
    pub fn descendants(&self, key: NodeKey) -> Vec<NodeKey> {
        self.ids.get(&key).map_or_else(Vec::new, |id| {
            id.descendants(&self.dom)
                .skip(1)
                .filter_map(|desc| self.key_of(desc))
                .collect()
        })
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, key: NodeKey) -> String {
        let Some(id) = self.ids.get(&key) else {
            return String::new();
        };
        let mut out = String::new();
        for desc in id.descendants(&self.dom) {
            if let Some(NodeKind::Text { text }) = self.dom.get(desc).map(|node| &node.get().kind) {
                out.push_str(text);
            }
        }
        out
    }

    /// True when `node` is `ancestor` or lies inside it.
    pub fn contains(&self, ancestor: NodeKey, node: NodeKey) -> bool {
        ancestor == node || self.is_ancestor(ancestor, node)
    }

    /// True when `ancestor` strictly encloses `node`.
    pub fn is_ancestor(&self, ancestor: NodeKey, node: NodeKey) -> bool {
        let (Some(anc), Some(id)) = (self.ids.get(&ancestor), self.ids.get(&node)) else {
            return false;
        };
        id.ancestors(&self.dom).skip(1).any(|up| up == *anc)
    }

    /// True when the node is reachable from the document node.
    pub fn is_connected(&self, key: NodeKey) -> bool {
        self.ids
            .get(&key)
            .is_some_and(|id| id.ancestors(&self.dom).any(|up| up == self.root))
    }

    /// First connected element with the given id.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeKey> {
        self.id_index.get(id).and_then(|list| list.first().copied())
    }

    pub fn get_elements_by_class_name(&self, class: &str) -> &[NodeKey] {
        self.class_index.get(class).map_or(&[], Vec::as_slice)
    }

    pub fn get_elements_by_tag_name(&self, tag: &str) -> &[NodeKey] {
        self.tag_index
            .get(&tag.to_ascii_lowercase())
            .map_or(&[], Vec::as_slice)
    }
}

/// Whitespace-separated class tokens.
pub fn split_classes(value: &str) -> impl Iterator<Item = &str> {
    value.split_whitespace()
}
