#![forbid(unsafe_code)]

//! Marker resolution and controller flush.
//!
//! # Resolution
//!
//! 1. Host: the element with the marker's explicit id, otherwise the nearest
//!    ancestor-or-self of the marker carrying a scope marker.
//! 2. Candidate: the host itself when it is a self-hosting controller of the
//!    requested token, otherwise a direct child controller of that token.
//! 3. The candidate is accepted only if its target is the host.
//!
//! A failed resolution parks the marker under its explicit id, or in the
//! unscoped bucket.
//!
//! # Flush
//!
//! When a controller attaches to `target`, markers parked under the target's
//! id are all released; unscoped markers are released only if they sit inside
//! the target's subtree. Released markers are returned to the caller, which
//! decides when to retry them.

use std::fmt;
use std::hash::Hash;

use crate::pending::{PendingBindings, UNSCOPED};

/// Read-only view of a tree, as needed to resolve markers.
pub trait ScopeTree {
    type Node: Copy + Eq + Hash + fmt::Debug;

    /// Connected element whose id is `id`.
    fn element_by_id(&self, id: &str) -> Option<Self::Node>;

    /// Nearest ancestor-or-self of `from` carrying a scope marker.
    fn nearest_scope(&self, from: Self::Node) -> Option<Self::Node>;

    /// Whether `node` is a controller of `token` that targets itself.
    fn self_hosting_controller(&self, node: Self::Node, token: &str) -> bool;

    /// A direct child of `host` that is a controller of `token`.
    fn child_controller(&self, host: Self::Node, token: &str) -> Option<Self::Node>;

    /// The node `controller` currently targets.
    fn controller_target(&self, controller: Self::Node) -> Option<Self::Node>;

    /// Whether `node` is `ancestor` or one of its descendants.
    fn contains(&self, ancestor: Self::Node, node: Self::Node) -> bool;
}

/// What a marker declares about the controller it wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerRequest<'a, N> {
    pub marker: N,
    /// Controller token; a marker without one can never resolve.
    pub token: Option<&'a str>,
    /// Explicit host id. Empty is treated as absent.
    pub host_id: Option<&'a str>,
}

impl<'a, N> MarkerRequest<'a, N> {
    #[must_use]
    pub fn new(marker: N, token: Option<&'a str>, host_id: Option<&'a str>) -> Self {
        Self {
            marker,
            token,
            host_id,
        }
    }

    /// Explicit, non-empty host id.
    #[must_use]
    pub fn explicit_host(&self) -> Option<&'a str> {
        self.host_id.filter(|id| !id.is_empty())
    }

    /// Pending bucket this marker parks in.
    #[must_use]
    pub fn park_key(&self) -> &'a str {
        self.explicit_host().unwrap_or(UNSCOPED)
    }
}

/// A controller found for a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located<N> {
    pub controller: N,
    /// The node the marker's scope resolved to; equals the controller's target.
    pub host: N,
}

/// Result of [`ScopeResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<N> {
    Bound(Located<N>),
    Parked { key: String },
}

/// Owner of the pending-bindings table.
#[derive(Debug, Clone)]
pub struct ScopeResolver<N> {
    pending: PendingBindings<N>,
}

impl<N> Default for ScopeResolver<N> {
    fn default() -> Self {
        Self {
            pending: PendingBindings::default(),
        }
    }
}

impl<N: Copy + Eq + Hash + fmt::Debug> ScopeResolver<N> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the controller `request` should bind to, without parking.
    #[must_use]
    pub fn locate<T>(tree: &T, request: &MarkerRequest<'_, N>) -> Option<Located<N>>
    where
        T: ScopeTree<Node = N> + ?Sized,
    {
        let token = request.token.filter(|t| !t.is_empty())?;
        let host = match request.explicit_host() {
            Some(id) => tree.element_by_id(id)?,
            None => tree.nearest_scope(request.marker)?,
        };
        let controller = if tree.self_hosting_controller(host, token) {
            host
        } else {
            tree.child_controller(host, token)?
        };
        if tree.controller_target(controller) != Some(host) {
            tracing::trace!(?controller, ?host, token, "candidate targets another node");
            return None;
        }
        Some(Located { controller, host })
    }

    /// Locate a controller for `request`, parking the marker on failure.
    pub fn resolve<T>(&mut self, tree: &T, request: &MarkerRequest<'_, N>) -> Resolution<N>
    where
        T: ScopeTree<Node = N> + ?Sized,
    {
        match Self::locate(tree, request) {
            Some(located) => {
                self.pending.forget(request.marker);
                Resolution::Bound(located)
            }
            None => {
                let key = self.park(request);
                Resolution::Parked { key }
            }
        }
    }

    /// Park the marker of `request` in its bucket. Returns the bucket key.
    pub fn park(&mut self, request: &MarkerRequest<'_, N>) -> String {
        let key = request.park_key();
        self.pending.park(key, request.marker);
        tracing::debug!(marker = ?request.marker, bucket = key, "marker parked");
        key.to_owned()
    }

    /// Release the markers a controller attaching to `target` may satisfy.
    pub fn flush<T>(&mut self, tree: &T, target: N, target_id: Option<&str>) -> Vec<N>
    where
        T: ScopeTree<Node = N> + ?Sized,
    {
        let mut released = Vec::new();
        if let Some(id) = target_id.filter(|id| !id.is_empty()) {
            released.extend(self.pending.take(id));
        }
        released.extend(
            self.pending
                .take_matching(UNSCOPED, |marker| tree.contains(target, marker)),
        );
        if !released.is_empty() {
            tracing::debug!(?target, count = released.len(), "parked markers released");
        }
        released
    }

    /// Drop `marker` from the pending table.
    pub fn forget(&mut self, marker: N) -> bool {
        self.pending.forget(marker)
    }

    #[must_use]
    pub fn pending(&self) -> &PendingBindings<N> {
        &self.pending
    }

    /// Drop every parked marker.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
