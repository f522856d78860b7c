#![forbid(unsafe_code)]

//! proxel public facade.
//!
//! Re-exports the building blocks and, with the default `runtime` feature,
//! the [`Session`] that ties them to an element tree.
//!
//! ```
//! use proxel::prelude::*;
//!
//! let mut session = Session::new();
//! session
//!     .register(ControllerDef::builder("tabs").prop("index", 0).refs("tab").build()?)?;
//!
//! let host = session.create_element("tabs-element", [("id", "nav")]);
//! let tab = session.create_element("button", [("role", "tab")]);
//! let marker = session.create_element("tabs-ref", [("as", "tab")]);
//! let root = session.root();
//! session.append_child(root, host)?;
//! session.append_child(host, tab)?;
//! session.append_child(tab, marker)?;
//! session.settle()?;
//!
//! assert_eq!(session.first_ref(host, "tab")?, Some(tab));
//! session.set_property(host, "index", 1)?;
//! assert_eq!(session.document().attribute(host, "index"), Some("1"));
//! # Ok::<(), SessionError>(())
//! ```

pub use proxel_dom as dom;
pub use proxel_props as props;
pub use proxel_scope as scope;

pub use proxel_dom::{Document, DomError, NodeId};
pub use proxel_props::{
    AttributeHost, ChangeObserver, Overrides, PropKind, PropSpec, PropSync, PropValue,
    PropertyState, SetOutcome,
};
pub use proxel_scope::{PendingBindings, ScopeMarker, ScopeResolver, ScopeTree};

#[cfg(feature = "runtime")]
pub use proxel_runtime as runtime;

#[cfg(feature = "runtime")]
pub use proxel_runtime::{
    ConfigError, ControllerDef, PropertyChange, RefEvent, Session, SessionConfig, SessionError,
};

/// Common imports for controller code.
pub mod prelude {
    pub use crate::{NodeId, Overrides, PropValue, SetOutcome};

    #[cfg(feature = "runtime")]
    pub use crate::{ControllerDef, PropertyChange, RefEvent, Session, SessionConfig, SessionError};
}
