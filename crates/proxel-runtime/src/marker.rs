//! Reference marker bookkeeping.

use proxel_dom::NodeId;

/// Marker attribute naming the reference kind.
pub const KIND_ATTRIBUTE: &str = "as";
/// Marker attribute naming the controller token (generic markers only).
pub const TOKEN_ATTRIBUTE: &str = "proxy";
/// Marker attribute naming an explicit host id.
pub const HOST_ATTRIBUTE: &str = "for";

/// Attributes whose mutation forces an unbind and rebind.
pub const MARKER_ATTRIBUTES: [&str; 3] = [KIND_ATTRIBUTE, TOKEN_ATTRIBUTE, HOST_ATTRIBUTE];

/// A live binding of a marker to a controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub controller: NodeId,
    /// Node registered in the controller's collection (the marker's parent).
    pub target: NodeId,
    /// Member name of the collection.
    pub kind: String,
}

/// State of one reference marker element.
#[derive(Debug, Clone, Default)]
pub struct RefMarker {
    /// Token fixed by a `{token}-ref` tag; `None` for the generic tag.
    pub(crate) fixed_token: Option<String>,
    pub(crate) binding: Option<Binding>,
}

impl RefMarker {
    pub(crate) fn new(fixed_token: Option<String>) -> Self {
        Self {
            fixed_token,
            binding: None,
        }
    }

    #[must_use]
    pub fn fixed_token(&self) -> Option<&str> {
        self.fixed_token.as_deref()
    }

    #[must_use]
    pub fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }
}
