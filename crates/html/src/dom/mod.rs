//! Arena-backed document tree.
//!
//! Nodes live in an [`indextree::Arena`] and are addressed from the outside by
//! [`NodeKey`], a stable 64-bit key that is never reused. Removing a node drops
//! its key (and the keys of its subtree), so a stale key simply stops resolving.

use core::fmt::{self, Formatter};
use std::collections::HashMap;
use std::error::Error;

use indextree::{Arena, Node as ArenaNode, NodeId};
use smallvec::SmallVec;

pub mod geometry;
mod printing;
pub mod updating;

pub use geometry::{LayoutRect, Viewport};
pub use printing::SerializeOptions;
pub use updating::{DOMUpdate, MutationObserver, ObserverPause};

/// A stable key for DOM nodes, valid until the node is removed.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Ord, PartialOrd)]
pub struct NodeKey(pub u64);

impl NodeKey {
    /// The document node key (always present).
    pub const ROOT: Self = Self(0);
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
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
    Comment {
        text: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DOMNode {
    pub key: NodeKey,
    pub kind: NodeKind,
    pub attrs: SmallVec<[(String, String); 4]>,
    /// Border box assigned by layout, in document coordinates (viewport
    /// coordinates for fixed-position subtrees).
    pub layout: Option<LayoutRect>,
}

/// Failures of structural DOM operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The key does not name a live node.
    UnknownNode(NodeKey),
    /// The operation needs an element and got another node kind.
    NotAnElement(NodeKey),
    /// The insertion would produce an invalid tree (cycle, text parent, ...).
    HierarchyRequest { parent: NodeKey, child: NodeKey },
}

impl fmt::Display for DomError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNode(key) => write!(f, "unknown node {key}"),
            Self::NotAnElement(key) => write!(f, "node {key} is not an element"),
            Self::HierarchyRequest { parent, child } => {
                write!(f, "cannot insert {child} under {parent}")
            }
        }
    }
}

impl Error for DomError {}

pub struct DOM {
    dom: Arena<DOMNode>,
    root: NodeId,
    ids: HashMap<NodeKey, NodeId>,
    next_key: u64,
    observer: MutationObserver,
}

impl Default for DOM {
    fn default() -> Self {
        Self::new()
    }
}

impl DOM {
    /// Create an empty document containing only the document node.
    pub fn new() -> Self {
        let mut dom = Arena::new();
        let root = dom.new_node(DOMNode {
            key: NodeKey::ROOT,
            ..DOMNode::default()
        });
        let mut ids = HashMap::new();
        ids.insert(NodeKey::ROOT, root);
        Self {
            dom,
            root,
            ids,
            next_key: 1,
            observer: MutationObserver::default(),
        }
    }

    /// The document node.
    #[inline]
    pub const fn root(&self) -> NodeKey {
        NodeKey::ROOT
    }

    fn node_id(&self, key: NodeKey) -> Result<NodeId, DomError> {
        self.ids
            .get(&key)
            .copied()
            .ok_or(DomError::UnknownNode(key))
    }

    fn key_of(&self, id: NodeId) -> Option<NodeKey> {
        self.dom.get(id).map(|node| node.get().key)
    }

    /// True while the key names a node that has not been removed.
    pub fn contains(&self, key: NodeKey) -> bool {
        self.ids.contains_key(&key)
    }

    /// True if the node is attached to the document tree.
    pub fn is_connected(&self, key: NodeKey) -> bool {
        let Ok(id) = self.node_id(key) else {
            return false;
        };
        id.ancestors(&self.dom).any(|ancestor| ancestor == self.root)
    }

    pub fn node(&self, key: NodeKey) -> Option<&DOMNode> {
        let id = self.ids.get(&key)?;
        self.dom.get(*id).map(ArenaNode::get)
    }

    pub(crate) fn node_mut(&mut self, key: NodeKey) -> Result<&mut DOMNode, DomError> {
        let id = self.node_id(key)?;
        self.dom
            .get_mut(id)
            .map(ArenaNode::get_mut)
            .ok_or(DomError::UnknownNode(key))
    }

    fn mint(&mut self, kind: NodeKind) -> NodeKey {
        let key = NodeKey(self.next_key);
        self.next_key = self.next_key.wrapping_add(1);
        let id = self.dom.new_node(DOMNode {
            key,
            kind,
            ..DOMNode::default()
        });
        self.ids.insert(key, id);
        key
    }

    /// Create a detached element. Tag names are stored lowercase.
    pub fn create_element(&mut self, tag: &str) -> NodeKey {
        self.mint(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
        })
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeKey {
        self.mint(NodeKind::Text {
            text: text.to_owned(),
        })
    }

    /// Create a detached comment node.
    pub fn create_comment(&mut self, text: &str) -> NodeKey {
        self.mint(NodeKind::Comment {
            text: text.to_owned(),
        })
    }

    fn check_insertion(
        &self,
        parent: NodeKey,
        child: NodeKey,
    ) -> Result<(NodeId, NodeId), DomError> {
        let parent_id = self.node_id(parent)?;
        let child_id = self.node_id(child)?;
        let parent_ok = matches!(
            self.dom[parent_id].get().kind,
            NodeKind::Document | NodeKind::Element { .. }
        );
        let cycle = parent_id
            .ancestors(&self.dom)
            .any(|ancestor| ancestor == child_id);
        if !parent_ok || cycle || child == NodeKey::ROOT {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        Ok((parent_id, child_id))
    }

    /// Append `child` as the last child of `parent`, moving it if attached elsewhere.
    ///
    /// # Errors
    /// Returns an error if either key is unknown or the insertion would create an invalid tree.
    pub fn append_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), DomError> {
        let (parent_id, child_id) = self.check_insertion(parent, child)?;
        child_id.detach(&mut self.dom);
        parent_id
            .checked_append(child_id, &mut self.dom)
            .map_err(|_| DomError::HierarchyRequest { parent, child })?;
        self.record_insert(parent_id, child_id);
        Ok(())
    }

    /// Insert `child` under `parent` immediately before `reference`.
    ///
    /// # Errors
    /// Returns an error if any key is unknown, `reference` is not a child of
    /// `parent`, or the insertion would create an invalid tree.
    pub fn insert_before(
        &mut self,
        parent: NodeKey,
        child: NodeKey,
        reference: NodeKey,
    ) -> Result<(), DomError> {
        let (parent_id, child_id) = self.check_insertion(parent, child)?;
        let reference_id = self.node_id(reference)?;
        if self.dom[reference_id].parent() != Some(parent_id) || reference_id == child_id {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        child_id.detach(&mut self.dom);
        reference_id
            .checked_insert_before(child_id, &mut self.dom)
            .map_err(|_| DomError::HierarchyRequest { parent, child })?;
        self.record_insert(parent_id, child_id);
        Ok(())
    }

    fn record_insert(&mut self, parent_id: NodeId, child_id: NodeId) {
        if !self.observer.wants_records() {
            self.observer.suppress();
            return;
        }
        let pos = child_id.preceding_siblings(&self.dom).count().saturating_sub(1);
        let parent = self.dom[parent_id].get().key;
        let update = match &self.dom[child_id].get().kind {
            NodeKind::Element { tag } => DOMUpdate::InsertElement {
                parent,
                node: self.dom[child_id].get().key,
                tag: tag.clone(),
                pos,
            },
            NodeKind::Text { text } | NodeKind::Comment { text } => DOMUpdate::InsertText {
                parent,
                node: self.dom[child_id].get().key,
                text: text.clone(),
                pos,
            },
            NodeKind::Document => return,
        };
        self.observer.record(update);
    }

    /// Remove a node and its whole subtree. Keys inside the subtree become stale.
    ///
    /// # Errors
    /// Returns an error if the key is unknown or names the document node.
    pub fn remove_node(&mut self, key: NodeKey) -> Result<(), DomError> {
        if key == NodeKey::ROOT {
            return Err(DomError::HierarchyRequest {
                parent: NodeKey::ROOT,
                child: key,
            });
        }
        let id = self.node_id(key)?;
        let doomed: Vec<NodeKey> = id
            .descendants(&self.dom)
            .filter_map(|descendant| self.key_of(descendant))
            .collect();
        for stale in &doomed {
            self.ids.remove(stale);
        }
        id.remove_subtree(&mut self.dom);
        self.observer.record_or_suppress(DOMUpdate::RemoveNode { node: key });
        Ok(())
    }

    /// Set an attribute on an element. Attribute names are stored lowercase.
    ///
    /// # Errors
    /// Returns an error if the key is unknown or not an element.
    pub fn set_attribute(&mut self, key: NodeKey, name: &str, value: &str) -> Result<(), DomError> {
        let name_lc = name.to_ascii_lowercase();
        let node = self.node_mut(key)?;
        if !matches!(node.kind, NodeKind::Element { .. }) {
            return Err(DomError::NotAnElement(key));
        }
        if let Some(slot) = node.attrs.iter_mut().find(|(attr, _)| *attr == name_lc) {
            value.clone_into(&mut slot.1);
        } else {
            node.attrs.push((name_lc.clone(), value.to_owned()));
        }
        self.observer.record_or_suppress(DOMUpdate::SetAttr {
            node: key,
            name: name_lc,
            value: value.to_owned(),
        });
        Ok(())
    }

    /// Remove an attribute; returns whether it was present.
    ///
    /// # Errors
    /// Returns an error if the key is unknown or not an element.
    pub fn remove_attribute(&mut self, key: NodeKey, name: &str) -> Result<bool, DomError> {
        let name_lc = name.to_ascii_lowercase();
        let node = self.node_mut(key)?;
        if !matches!(node.kind, NodeKind::Element { .. }) {
            return Err(DomError::NotAnElement(key));
        }
        let before = node.attrs.len();
        node.attrs.retain(|(attr, _)| *attr != name_lc);
        let removed = node.attrs.len() != before;
        if removed {
            self.observer.record_or_suppress(DOMUpdate::RemoveAttr {
                node: key,
                name: name_lc,
            });
        }
        Ok(removed)
    }

    pub fn get_attribute(&self, key: NodeKey, name: &str) -> Option<&str> {
        let node = self.node(key)?;
        node.attrs
            .iter()
            .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Lowercase tag name, `None` for non-elements.
    pub fn tag_name(&self, key: NodeKey) -> Option<&str> {
        match &self.node(key)?.kind {
            NodeKind::Element { tag } => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn is_element(&self, key: NodeKey) -> bool {
        self.tag_name(key).is_some()
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        let id = self.ids.get(&key)?;
        let parent = self.dom.get(*id)?.parent()?;
        self.key_of(parent)
    }

    /// Parent if it is an element (the document node is not an element).
    pub fn parent_element(&self, key: NodeKey) -> Option<NodeKey> {
        self.parent(key).filter(|parent| self.is_element(*parent))
    }

    pub fn children(&self, key: NodeKey) -> Vec<NodeKey> {
        let Some(id) = self.ids.get(&key) else {
            return Vec::new();
        };
        id.children(&self.dom)
            .filter_map(|child| self.key_of(child))
            .collect()
    }

    pub fn element_children(&self, key: NodeKey) -> Vec<NodeKey> {
        self.children(key)
            .into_iter()
            .filter(|child| self.is_element(*child))
            .collect()
    }

    /// Ancestors from the parent upwards, ending at the document node.
    pub fn ancestors(&self, key: NodeKey) -> Vec<NodeKey> {
        let Some(id) = self.ids.get(&key) else {
            return Vec::new();
        };
        id.ancestors(&self.dom)
            .skip(1)
            .filter_map(|ancestor| self.key_of(ancestor))
            .collect()
    }

    /// The node itself followed by its descendants in tree order.
    pub fn descendants(&self, key: NodeKey) -> Vec<NodeKey> {
        let Some(id) = self.ids.get(&key) else {
            return Vec::new();
        };
        id.descendants(&self.dom)
            .filter_map(|descendant| self.key_of(descendant))
            .collect()
    }

    /// The `<html>` element.
    pub fn document_element(&self) -> Option<NodeKey> {
        self.element_children(NodeKey::ROOT).into_iter().next()
    }

    fn child_of_root_element(&self, tag: &str) -> Option<NodeKey> {
        let html = self.document_element()?;
        self.element_children(html)
            .into_iter()
            .find(|child| self.tag_name(*child) == Some(tag))
    }

    pub fn head(&self) -> Option<NodeKey> {
        self.child_of_root_element("head")
    }

    pub fn body(&self) -> Option<NodeKey> {
        self.child_of_root_element("body")
    }

    /// First connected element in tree order whose `id` attribute equals `id`.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeKey> {
        self.elements_with_id(id).into_iter().next()
    }

    /// All connected elements carrying the given `id`, in tree order.
    pub fn elements_with_id(&self, id: &str) -> Vec<NodeKey> {
        if id.is_empty() {
            return Vec::new();
        }
        self.descendants(NodeKey::ROOT)
            .into_iter()
            .filter(|key| self.get_attribute(*key, "id") == Some(id))
            .collect()
    }

    /// Start recording mutation records.
    pub fn observe(&mut self) {
        self.observer.connect();
    }

    /// Stop recording and discard pending records.
    pub fn disconnect(&mut self) {
        self.observer.disconnect();
    }

    pub fn is_observed(&self) -> bool {
        self.observer.wants_records()
    }

    /// Drain pending mutation records.
    pub fn take_records(&mut self) -> Vec<DOMUpdate> {
        self.observer.take_records()
    }

    /// Number of mutations that happened while recording was paused.
    pub fn suppressed_mutations(&self) -> u64 {
        self.observer.suppressed()
    }

    /// Suspend mutation recording until the returned guard is dropped.
    ///
    /// Pending records are discarded; a nested pause leaves recording off when
    /// the inner guard drops.
    pub fn pause_observer(&mut self) -> ObserverPause<'_> {
        let resume = self.observer.wants_records();
        self.observer.disconnect();
        ObserverPause::new(self, resume)
    }

    pub(crate) fn observer_mut(&mut self) -> &mut MutationObserver {
        &mut self.observer
    }
}
