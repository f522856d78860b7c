#![forbid(unsafe_code)]

//! Arena-backed element tree.
//!
//! # Invariants
//!
//! 1. The root node exists for the document's whole lifetime and has no parent.
//! 2. `parent` and `children` links are always mutually consistent.
//! 3. No node is its own ancestor (enforced on insertion).
//! 4. Tags are stored ASCII-lowercased.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Foreign handle | `NodeId` from another document | Getters return `None`, mutators `UnknownNode` |
//! | Cycle | Inserting an ancestor under its descendant | `HierarchyCycle`, tree unchanged |
//! | Moving root | `append_child(_, root)` / `detach(root)` | `RootImmovable` |

use indexmap::IndexMap;

use crate::error::DomError;

/// Tag of the implicit document root.
pub const ROOT_TAG: &str = "#document";

/// Attribute consulted by [`Document::element_by_id`].
pub const ID_ATTRIBUTE: &str = "id";

/// Handle to a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Raw arena index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    attributes: IndexMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: IndexMap::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// An element tree rooted at a fixed document node.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document containing only its root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::new(ROOT_TAG)],
        }
    }

    /// The document root. Nodes reachable from it are *connected*.
    #[inline]
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes ever created, including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the document holds nothing but its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData::new(tag));
        id
    }

    /// Create a detached element with initial attributes.
    ///
    /// Later duplicates of an attribute name overwrite earlier ones.
    pub fn create_element_with<I, K, V>(&mut self, tag: &str, attributes: I) -> NodeId
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let id = self.create_element(tag);
        let node = &mut self.nodes[id.index()];
        for (name, value) in attributes {
            node.attributes.insert(name.into(), value.into());
        }
        id
    }

    fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.index())
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData, DomError> {
        self.nodes.get_mut(id.index()).ok_or(DomError::UnknownNode(id))
    }

    fn check(&self, id: NodeId) -> Result<(), DomError> {
        if id.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(DomError::UnknownNode(id))
        }
    }

    /// Whether `id` belongs to this document.
    #[must_use]
    pub fn exists(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Lowercased tag name.
    #[must_use]
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|n| n.tag.as_str())
    }

    /// Parent element, if attached.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Children in document order. Empty for unknown handles.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.node(id) {
            Some(n) => n.children.as_slice(),
            None => &[],
        }
    }

    // -----------------------------------------------------------------------
    // Attributes
    // -----------------------------------------------------------------------

    /// Value of attribute `name`.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id)
            .and_then(|n| n.attributes.get(name))
            .map(String::as_str)
    }

    /// Whether attribute `name` is present (possibly with an empty value).
    #[must_use]
    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.node(id)
            .is_some_and(|n| n.attributes.contains_key(name))
    }

    /// Attributes in insertion order.
    pub fn attributes(&self, id: NodeId) -> impl Iterator<Item = (&str, &str)> {
        self.node(id)
            .into_iter()
            .flat_map(|n| n.attributes.iter())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Set attribute `name`, returning the previous value.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: &str,
    ) -> Result<Option<String>, DomError> {
        let node = self.node_mut(id)?;
        Ok(node.attributes.insert(name.to_owned(), value.to_owned()))
    }

    /// Remove attribute `name`, returning the previous value.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<Option<String>, DomError> {
        let node = self.node_mut(id)?;
        Ok(node.attributes.shift_remove(name))
    }

    /// Non-empty `id` attribute of the node.
    #[must_use]
    pub fn element_id(&self, id: NodeId) -> Option<&str> {
        self.attribute(id, ID_ATTRIBUTE).filter(|s| !s.is_empty())
    }

    // -----------------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------------

    /// Append `child` as the last child of `parent`, moving it if attached.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` under `parent` before `reference` (or last when `None`).
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.check(parent)?;
        self.check(child)?;
        if child == self.root() {
            return Err(DomError::RootImmovable);
        }
        if self.contains(child, parent) {
            return Err(DomError::HierarchyCycle { parent, child });
        }
        if let Some(reference) = reference {
            self.check(reference)?;
            if reference == child {
                // Inserting a node before itself is a no-op in place.
                return Ok(());
            }
            if self.parent(reference) != Some(parent) {
                return Err(DomError::NotAChild { parent, reference });
            }
        }

        self.unlink(child);
        let siblings = &mut self.nodes[parent.index()].children;
        let at = reference
            .and_then(|r| siblings.iter().position(|c| *c == r))
            .unwrap_or(siblings.len());
        siblings.insert(at, child);
        self.nodes[child.index()].parent = Some(parent);
        Ok(())
    }

    /// Detach `id` from its parent. Detaching a parentless node is a no-op.
    pub fn detach(&mut self, id: NodeId) -> Result<(), DomError> {
        self.check(id)?;
        if id == self.root() {
            return Err(DomError::RootImmovable);
        }
        self.unlink(id);
        Ok(())
    }

    fn unlink(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|c| *c != id);
        }
    }

    /// Ancestors of `id`, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |n| self.parent(*n))
    }

    /// Whether `node` is `ancestor` or lies inside its subtree.
    #[must_use]
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        if !self.exists(ancestor) || !self.exists(node) {
            return false;
        }
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Whether `id` is reachable from the document root.
    #[must_use]
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(self.root(), id)
    }

    /// Nearest ancestor-or-self carrying attribute `name`.
    #[must_use]
    pub fn closest_with_attribute(&self, id: NodeId, name: &str) -> Option<NodeId> {
        if !self.exists(id) {
            return None;
        }
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|n| self.has_attribute(*n, name))
    }

    /// `id` and all its descendants in tree (pre-)order.
    #[must_use]
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.exists(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// First connected element, in tree order, whose `id` attribute equals `element_id`.
    #[must_use]
    pub fn element_by_id(&self, element_id: &str) -> Option<NodeId> {
        if element_id.is_empty() {
            return None;
        }
        self.subtree(self.root())
            .into_iter()
            .find(|n| self.attribute(*n, ID_ATTRIBUTE) == Some(element_id))
    }
}
