#![forbid(unsafe_code)]

//! In-memory element tree for proxel.
//!
//! [`Document`] is an arena of element nodes addressed by [`NodeId`]. It offers
//! the small slice of DOM behaviour that controllers and reference markers
//! depend on: attributes, parent/child structure, connectedness, id lookup and
//! ancestor queries. It performs no lifecycle dispatch of its own; the runtime
//! session wraps it and decides what to notify.

pub mod document;
pub mod error;

pub use document::{Document, NodeId};
pub use error::DomError;
