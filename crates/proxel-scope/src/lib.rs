#![forbid(unsafe_code)]

//! Deferred scope resolution.
//!
//! Reference markers name a controller token and, optionally, the id of the
//! node that controller targets. Either side may attach first. A marker that
//! cannot be resolved yet is *parked* in [`PendingBindings`], keyed by its
//! explicit host id or by the unscoped bucket. When a controller attaches,
//! [`ScopeResolver::flush`] hands back every parked marker that the new
//! controller could satisfy so the host can retry them.
//!
//! The resolver knows nothing about concrete trees; it queries them through
//! [`ScopeTree`].
//!
//! # Invariants
//!
//! 1. A marker is parked in at most one bucket at a time.
//! 2. Buckets never stay empty: the last removal drops the bucket.
//! 3. `flush` removes every marker it returns from the pending table.
//! 4. A candidate controller is only accepted when its own target is the host.

pub mod marker;
pub mod pending;
pub mod resolver;

pub use marker::{DEFAULT_SCOPE_ATTRIBUTE, ScopeMarker};
pub use pending::{PendingBindings, UNSCOPED};
pub use resolver::{Located, MarkerRequest, Resolution, ScopeResolver, ScopeTree};
