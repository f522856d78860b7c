//! Errors reported by tree mutations.

use crate::document::NodeId;

/// Errors from [`Document`](crate::Document) mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// The handle does not belong to this document.
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    /// Inserting `child` under `parent` would make a node its own ancestor.
    #[error("cannot insert {child:?} under {parent:?}: hierarchy cycle")]
    HierarchyCycle { parent: NodeId, child: NodeId },
    /// The document root is fixed in place.
    #[error("the document root cannot be moved or detached")]
    RootImmovable,
    /// `reference` was expected to be a child of `parent`.
    #[error("{reference:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, reference: NodeId },
}
