#![forbid(unsafe_code)]

//! Attribute/property bridge.
//!
//! A controller declares a [`PropSpec`]: an ordered list of property keys with
//! default values. The runtime type of each default selects how the property
//! is written to and read from its textual attribute:
//!
//! - [`PropValue::Text`] defaults pass through unchanged.
//! - [`PropValue::Flag`] defaults use presence encoding: `true` is an empty
//!   attribute, `false` is the literal `"false"`.
//! - [`PropValue::Data`] defaults go through JSON, degrading to the raw string
//!   when the text does not parse.
//!
//! [`PropSync`] drives a per-instance [`PropertyState`] against any
//! [`AttributeHost`], reporting effective changes to a [`ChangeObserver`].
//!
//! # Invariants
//!
//! 1. Writing a value equal to the stored one is a no-op: no notification, no
//!    attribute write.
//! 2. The observer sees each effective change exactly once, before the
//!    attribute is touched.
//! 3. An attribute is only present while its value diverges from the default.
//! 4. Attribute-originated changes never write the attribute back.

pub mod case;
pub mod codec;
pub mod spec;
pub mod state;
pub mod sync;
pub mod value;

pub use codec::{decode, encode};
pub use spec::{PropEntry, PropSpec, PropSpecBuilder, PropSpecError};
pub use state::{PropSlot, PropertyState};
pub use sync::{
    AttributeHost, ChangeObserver, DEFAULT_BOOTSTRAP_ATTRIBUTE, FnObserver, Overrides, PropSync,
    SetOutcome,
};
pub use value::{PropKind, PropValue, canonical_json};
