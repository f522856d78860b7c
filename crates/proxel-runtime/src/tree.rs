//! Adapters exposing a [`Document`] to the property and scope layers.

use ahash::AHashMap;
use proxel_dom::{Document, NodeId};
use proxel_props::AttributeHost;
use proxel_scope::ScopeTree;

use crate::controller::{ControllerInstance, ControllerRole};

/// Attribute storage of one node.
pub(crate) struct NodeAttributes<'a> {
    pub(crate) doc: &'a mut Document,
    pub(crate) node: NodeId,
}

impl AttributeHost for NodeAttributes<'_> {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.doc.attribute(self.node, name)
    }

    fn set_attribute(&mut self, name: &str, value: &str) {
        if let Err(err) = self.doc.set_attribute(self.node, name, value) {
            tracing::warn!(node = ?self.node, name, %err, "attribute write failed");
        }
    }

    fn remove_attribute(&mut self, name: &str) {
        if let Err(err) = self.doc.remove_attribute(self.node, name) {
            tracing::warn!(node = ?self.node, name, %err, "attribute removal failed");
        }
    }
}

/// Node a controller in `role` at `node` targets.
pub(crate) fn target_of(doc: &Document, node: NodeId, role: ControllerRole) -> Option<NodeId> {
    match role {
        ControllerRole::Proxy => doc.parent(node),
        ControllerRole::Host => Some(node),
    }
}

/// Scope queries over a document and its controllers.
pub(crate) struct SessionTree<'a> {
    pub(crate) doc: &'a Document,
    pub(crate) controllers: &'a AHashMap<NodeId, ControllerInstance>,
    pub(crate) scope_attribute: &'a str,
}

impl SessionTree<'_> {
    fn controller_of(&self, node: NodeId, token: &str) -> Option<&ControllerInstance> {
        self.controllers
            .get(&node)
            .filter(|c| c.def().token() == token)
    }
}

impl ScopeTree for SessionTree<'_> {
    type Node = NodeId;

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.doc.element_by_id(id)
    }

    fn nearest_scope(&self, from: NodeId) -> Option<NodeId> {
        self.doc.closest_with_attribute(from, self.scope_attribute)
    }

    fn self_hosting_controller(&self, node: NodeId, token: &str) -> bool {
        self.controller_of(node, token)
            .is_some_and(|c| c.role() == ControllerRole::Host)
    }

    fn child_controller(&self, host: NodeId, token: &str) -> Option<NodeId> {
        self.doc.children(host).iter().copied().find(|child| {
            self.controller_of(*child, token)
                .is_some_and(|c| c.role() == ControllerRole::Proxy)
        })
    }

    fn controller_target(&self, controller: NodeId) -> Option<NodeId> {
        let instance = self.controllers.get(&controller)?;
        target_of(self.doc, controller, instance.role())
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.doc.contains(ancestor, node)
    }
}
