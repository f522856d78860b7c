#![forbid(unsafe_code)]

//! Session: the host lifecycle around controllers and reference markers.
//!
//! A [`Session`] owns a [`Document`] and routes every tree and attribute
//! mutation to the controllers and markers it affects:
//!
//! - Creating an element with a controller tag constructs the controller:
//!   properties are seeded, then the `initialized` hook runs.
//! - Connecting a controller marks its target's scope and releases parked
//!   markers it may satisfy. Disconnecting it clears its token.
//! - Connecting a marker schedules its resolution for the next tick.
//!   Disconnecting it unbinds it immediately.
//! - Changing `as`, `proxy` or `for` on a connected marker unbinds it and
//!   schedules a fresh resolution.
//!
//! # Invariants
//!
//! 1. A marker holds at most one binding, and its target appears in exactly
//!    one controller collection while bound.
//! 2. A marker is never both bound and parked.
//! 3. Marker resolution never runs in the turn that scheduled it.
//! 4. A connected controller's token appears in its target's scope marker.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Unresolvable marker | Controller missing or not yet attached | Parked until a matching controller connects |
//! | Marker without `as` | Incomplete markup | Parked, logged |
//! | Undeclared kind | `as` names no collection of the controller | Parked, logged |
//! | Tree misuse | Cycle, unknown node, moving root | [`SessionError::Dom`], tree unchanged |
//! | Runaway work | Deferred tasks keep rescheduling | [`SessionError::Unsettled`] from [`Session::settle`] |

use std::rc::Rc;

use ahash::AHashMap;
use indexmap::IndexSet;
use proxel_dom::{Document, NodeId};
use proxel_props::case::member_name;
use proxel_props::{Overrides, PropValue, SetOutcome};
use proxel_scope::{
    MarkerRequest, PendingBindings, Resolution, ScopeMarker, ScopeResolver,
};

use crate::config::SessionConfig;
use crate::controller::{ControllerDef, ControllerInstance, ControllerRole, HookObserver, RefEvent};
use crate::error::{ConfigError, SessionError};
use crate::marker::{
    Binding, HOST_ATTRIBUTE, KIND_ATTRIBUTE, MARKER_ATTRIBUTES, RefMarker, TOKEN_ATTRIBUTE,
};
use crate::tick::TaskQueue;
use crate::tree::{NodeAttributes, SessionTree, target_of};

/// What a registered tag turns an element into.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TagRole {
    Controller { token: String, role: ControllerRole },
    Marker { fixed_token: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    ConnectMarker(NodeId),
}

/// Document plus controller registry, marker registry and deferred work.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    document: Document,
    defs: AHashMap<String, Rc<ControllerDef>>,
    tags: AHashMap<String, TagRole>,
    controllers: AHashMap<NodeId, ControllerInstance>,
    markers: AHashMap<NodeId, RefMarker>,
    resolver: ScopeResolver<NodeId>,
    queue: TaskQueue<Task>,
}

impl Default for Session {
    fn default() -> Self {
        Self::build(SessionConfig::default())
    }
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Session using `config`, validated first.
    pub fn with_config(config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SessionConfig) -> Self {
        let mut tags = AHashMap::new();
        tags.insert(
            config.generic_ref_tag.to_ascii_lowercase(),
            TagRole::Marker { fixed_token: None },
        );
        Self {
            config,
            document: Document::new(),
            defs: AHashMap::new(),
            tags,
            controllers: AHashMap::new(),
            markers: AHashMap::new(),
            resolver: ScopeResolver::new(),
            queue: TaskQueue::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.document.root()
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register a controller type under its token.
    ///
    /// Wires `{token}-proxy`, `{token}-element` and `{token}-ref`. Connected
    /// elements already using those tags are upgraded in tree order.
    pub fn register(&mut self, def: ControllerDef) -> Result<(), SessionError> {
        let token = def.token().to_owned();
        if self.defs.contains_key(&token) {
            return Err(SessionError::DuplicateToken(token));
        }
        let wired = [
            (
                self.config.proxy_tag(&token),
                TagRole::Controller {
                    token: token.clone(),
                    role: ControllerRole::Proxy,
                },
            ),
            (
                self.config.host_tag(&token),
                TagRole::Controller {
                    token: token.clone(),
                    role: ControllerRole::Host,
                },
            ),
            (
                self.config.ref_tag(&token),
                TagRole::Marker {
                    fixed_token: Some(token.clone()),
                },
            ),
        ]
        .map(|(tag, role)| (tag.to_ascii_lowercase(), role));
        if let Some((tag, _)) = wired.iter().find(|(tag, _)| self.tags.contains_key(tag)) {
            return Err(SessionError::TagTaken(tag.clone()));
        }

        let def = def.with_bootstrap_attribute(&self.config.bootstrap_attribute);
        tracing::debug!(
            token = %token,
            props = def.spec().len(),
            refs = def.ref_kinds().count(),
            "controller registered"
        );
        self.defs.insert(token, Rc::new(def));
        self.tags.extend(wired);

        let connected = self.document.subtree(self.document.root());
        let upgraded: Vec<NodeId> = connected
            .into_iter()
            .filter(|node| self.upgrade(*node))
            .collect();
        self.connect_nodes(&upgraded);
        Ok(())
    }

    #[must_use]
    pub fn is_registered(&self, token: &str) -> bool {
        self.defs.contains_key(token)
    }

    /// Construct the controller or marker state for `node` if its tag is
    /// registered and it has none yet. Returns whether anything was created.
    fn upgrade(&mut self, node: NodeId) -> bool {
        self.upgrade_with(node, &Overrides::default())
    }

    fn upgrade_with(&mut self, node: NodeId, overrides: &Overrides) -> bool {
        if self.controllers.contains_key(&node) || self.markers.contains_key(&node) {
            return false;
        }
        let Some(role) = self
            .document
            .tag(node)
            .and_then(|tag| self.tags.get(tag))
            .cloned()
        else {
            return false;
        };
        match role {
            TagRole::Controller { token, role } => self.construct(node, &token, role, overrides),
            TagRole::Marker { fixed_token } => {
                self.markers.insert(node, RefMarker::new(fixed_token));
                true
            }
        }
    }

    fn construct(
        &mut self,
        node: NodeId,
        token: &str,
        role: ControllerRole,
        overrides: &Overrides,
    ) -> bool {
        let Some(def) = self.defs.get(token).cloned() else {
            return false;
        };
        let _span = tracing::debug_span!("controller.construct", token, ?node).entered();
        let mut instance = ControllerInstance::new(Rc::clone(&def), role);
        let mut host = NodeAttributes {
            doc: &mut self.document,
            node,
        };
        let mut observer = HookObserver {
            controller: node,
            hooks: def.hooks(),
        };
        def.sync()
            .init(&mut instance.state, &mut host, &mut observer, overrides);
        def.hooks().initialized(&instance.view(node));
        self.controllers.insert(node, instance);
        true
    }

    // -----------------------------------------------------------------------
    // Element creation
    // -----------------------------------------------------------------------

    /// Create a detached element. Registered tags are upgraded immediately.
    pub fn create_element<I, K, V>(&mut self, tag: &str, attributes: I) -> NodeId
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let node = self.document.create_element_with(tag, attributes);
        self.upgrade(node);
        node
    }

    /// Create a detached controller element with construction-time overrides.
    pub fn create_controller<I, K, V>(
        &mut self,
        tag: &str,
        attributes: I,
        overrides: &Overrides,
    ) -> Result<NodeId, SessionError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let is_controller = matches!(
            self.tags.get(&tag.to_ascii_lowercase()),
            Some(TagRole::Controller { .. })
        );
        if !is_controller {
            return Err(SessionError::UnknownTag(tag.to_owned()));
        }
        let node = self.document.create_element_with(tag, attributes);
        self.upgrade_with(node, overrides);
        Ok(node)
    }

    // -----------------------------------------------------------------------
    // Tree mutation
    // -----------------------------------------------------------------------

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SessionError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` under `parent` before `reference`, dispatching
    /// disconnect for a connected `child` and connect once it is connected.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), SessionError> {
        let was_connected = self.document.is_connected(child);
        self.document.insert_before(parent, child, reference)?;
        let nodes = self.document.subtree(child);
        if was_connected {
            self.disconnect_nodes(&nodes);
        }
        if self.document.is_connected(child) {
            self.connect_nodes(&nodes);
        }
        Ok(())
    }

    /// Detach `node` from its parent, disconnecting its subtree.
    pub fn remove(&mut self, node: NodeId) -> Result<(), SessionError> {
        let was_connected = self.document.is_connected(node);
        self.document.detach(node)?;
        if was_connected {
            let nodes = self.document.subtree(node);
            self.disconnect_nodes(&nodes);
        }
        Ok(())
    }

    fn connect_nodes(&mut self, nodes: &[NodeId]) {
        for &node in nodes {
            self.upgrade(node);
            if self.controllers.contains_key(&node) {
                self.connect_controller(node);
            } else if self.markers.contains_key(&node) {
                tracing::trace!(?node, turn = self.queue.turn(), "marker connect deferred");
                self.queue.schedule(Task::ConnectMarker(node));
            }
        }
    }

    fn disconnect_nodes(&mut self, nodes: &[NodeId]) {
        for &node in nodes {
            if self.controllers.contains_key(&node) {
                self.disconnect_controller(node);
            } else if self.markers.contains_key(&node) {
                self.queue.cancel(|task| *task == Task::ConnectMarker(node));
                self.unbind_marker(node);
            }
        }
    }

    fn connect_controller(&mut self, node: NodeId) {
        let Some(instance) = self.controllers.get(&node) else {
            return;
        };
        let Some(target) = target_of(&self.document, node, instance.role()) else {
            tracing::warn!(?node, "connected controller has no target");
            return;
        };
        let token = instance.def().token().to_owned();
        let _span = tracing::debug_span!("controller.connect", token = %token, ?node).entered();

        let mut scope =
            ScopeMarker::parse(self.document.attribute(target, &self.config.scope_attribute));
        scope.mark(&token);
        if let Err(err) =
            self.document
                .set_attribute(target, &self.config.scope_attribute, scope.as_str())
        {
            tracing::warn!(?target, %err, "scope marker write failed");
            return;
        }
        if let Some(instance) = self.controllers.get_mut(&node) {
            instance.scoped_target = Some(target);
        }

        let target_id = self.document.element_id(target).map(str::to_owned);
        let tree = SessionTree {
            doc: &self.document,
            controllers: &self.controllers,
            scope_attribute: &self.config.scope_attribute,
        };
        let released = self.resolver.flush(&tree, target, target_id.as_deref());
        for marker in released {
            self.queue.schedule(Task::ConnectMarker(marker));
        }
    }

    fn disconnect_controller(&mut self, node: NodeId) {
        let Some(instance) = self.controllers.get_mut(&node) else {
            return;
        };
        let Some(target) = instance.scoped_target.take() else {
            return;
        };
        let token = instance.def().token().to_owned();
        tracing::debug!(token = %token, ?node, ?target, "controller disconnected");

        let attribute = &self.config.scope_attribute;
        let mut scope = ScopeMarker::parse(self.document.attribute(target, attribute));
        if !scope.unmark(&token) {
            return;
        }
        let written = if scope.is_blank() {
            self.document.remove_attribute(target, attribute).map(drop)
        } else {
            self.document
                .set_attribute(target, attribute, scope.as_str())
                .map(drop)
        };
        if let Err(err) = written {
            tracing::warn!(?target, %err, "scope marker write failed");
        }
    }

    // -----------------------------------------------------------------------
    // Marker binding
    // -----------------------------------------------------------------------

    fn connect_marker(&mut self, marker: NodeId) {
        if !self.document.is_connected(marker) {
            tracing::trace!(?marker, "marker left the tree before resolution");
            return;
        }
        let Some(state) = self.markers.get(&marker) else {
            return;
        };
        if state.is_bound() {
            return;
        }
        let token = state
            .fixed_token()
            .or_else(|| self.document.attribute(marker, TOKEN_ATTRIBUTE))
            .map(str::to_owned);
        let host_id = self
            .document
            .attribute(marker, HOST_ATTRIBUTE)
            .map(str::to_owned);
        let kind = self
            .document
            .attribute(marker, KIND_ATTRIBUTE)
            .map(member_name);
        let request = MarkerRequest::new(marker, token.as_deref(), host_id.as_deref());

        let tree = SessionTree {
            doc: &self.document,
            controllers: &self.controllers,
            scope_attribute: &self.config.scope_attribute,
        };
        let located = match self.resolver.resolve(&tree, &request) {
            Resolution::Bound(located) => located,
            Resolution::Parked { key } => {
                tracing::debug!(?marker, token = ?token, bucket = %key, "marker unresolved");
                return;
            }
        };

        let declared = kind.as_deref().filter(|kind| {
            self.controllers
                .get(&located.controller)
                .is_some_and(|c| c.def().declares_ref_kind(kind))
        });
        let (Some(kind), Some(target)) = (declared, self.document.parent(marker)) else {
            tracing::warn!(
                ?marker,
                kind = ?kind,
                controller = ?located.controller,
                "marker kind missing or not declared by its controller"
            );
            self.resolver.park(&request);
            return;
        };
        let kind = kind.to_owned();
        self.bind(marker, located.controller, target, kind);
    }

    fn bind(&mut self, marker: NodeId, controller: NodeId, target: NodeId, kind: String) {
        let Some(instance) = self.controllers.get_mut(&controller) else {
            return;
        };
        let def = Rc::clone(&instance.def);
        def.hooks().ref_connected(&RefEvent {
            controller,
            kind: &kind,
            target,
        });
        instance
            .refs
            .entry(kind.clone())
            .or_default()
            .insert(target);
        tracing::debug!(?marker, ?controller, ?target, kind = %kind, "marker bound");
        if let Some(state) = self.markers.get_mut(&marker) {
            state.binding = Some(Binding {
                controller,
                target,
                kind,
            });
        }
    }

    /// Forget `marker`'s pending entry and drop its binding, if any.
    fn unbind_marker(&mut self, marker: NodeId) {
        self.resolver.forget(marker);
        let Some(binding) = self
            .markers
            .get_mut(&marker)
            .and_then(|state| state.binding.take())
        else {
            return;
        };
        let Some(instance) = self.controllers.get_mut(&binding.controller) else {
            return;
        };
        let def = Rc::clone(&instance.def);
        def.hooks().ref_disconnected(&RefEvent {
            controller: binding.controller,
            kind: &binding.kind,
            target: binding.target,
        });
        if let Some(bound) = instance.refs.get_mut(&binding.kind) {
            bound.shift_remove(&binding.target);
        }
        tracing::debug!(
            ?marker,
            controller = ?binding.controller,
            kind = %binding.kind,
            "marker unbound"
        );
    }

    // -----------------------------------------------------------------------
    // Attributes
    // -----------------------------------------------------------------------

    /// Set an attribute and dispatch the change to the node's controller or marker.
    pub fn set_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        value: &str,
    ) -> Result<(), SessionError> {
        let old = self.document.set_attribute(node, name, value)?;
        if old.as_deref() != Some(value) {
            self.attribute_changed(node, name, Some(value));
        }
        Ok(())
    }

    /// Remove an attribute and dispatch the change.
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), SessionError> {
        if self.document.remove_attribute(node, name)?.is_some() {
            self.attribute_changed(node, name, None);
        }
        Ok(())
    }

    fn attribute_changed(&mut self, node: NodeId, name: &str, new: Option<&str>) {
        if let Some(instance) = self.controllers.get_mut(&node) {
            let def = Rc::clone(&instance.def);
            if !def.sync().observes(name) {
                return;
            }
            let mut host = NodeAttributes {
                doc: &mut self.document,
                node,
            };
            let mut observer = HookObserver {
                controller: node,
                hooks: def.hooks(),
            };
            def.sync()
                .attribute_changed(&mut instance.state, &mut host, &mut observer, name, new);
        } else if self.markers.contains_key(&node) && MARKER_ATTRIBUTES.contains(&name) {
            tracing::debug!(marker = ?node, name, "marker declaration changed");
            self.unbind_marker(node);
            if self.document.is_connected(node) {
                self.queue.cancel(|task| *task == Task::ConnectMarker(node));
                self.queue.schedule(Task::ConnectMarker(node));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Controller access
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn controller(&self, node: NodeId) -> Option<&ControllerInstance> {
        self.controllers.get(&node)
    }

    fn instance(&self, node: NodeId) -> Result<&ControllerInstance, SessionError> {
        self.controllers
            .get(&node)
            .ok_or(SessionError::NotAController(node))
    }

    /// Write a property through its setter: change hook, then attribute sync.
    pub fn set_property(
        &mut self,
        node: NodeId,
        key: &str,
        value: impl Into<PropValue>,
    ) -> Result<SetOutcome, SessionError> {
        let instance = self
            .controllers
            .get_mut(&node)
            .ok_or(SessionError::NotAController(node))?;
        let def = Rc::clone(&instance.def);
        if def.spec().index_of_key(key).is_none() {
            return Err(SessionError::UnknownProperty {
                token: def.token().to_owned(),
                key: key.to_owned(),
            });
        }
        let mut host = NodeAttributes {
            doc: &mut self.document,
            node,
        };
        let mut observer = HookObserver {
            controller: node,
            hooks: def.hooks(),
        };
        Ok(def
            .sync()
            .set(&mut instance.state, &mut host, &mut observer, key, value, true))
    }

    /// Current value of property `key`.
    #[must_use]
    pub fn property(&self, node: NodeId, key: &str) -> Option<&PropValue> {
        let instance = self.controllers.get(&node)?;
        instance.state().value(instance.def().spec(), key)
    }

    /// Targets bound to the controller's `kind` collection, in binding order.
    pub fn refs(&self, node: NodeId, kind: &str) -> Result<&IndexSet<NodeId>, SessionError> {
        let instance = self.instance(node)?;
        instance
            .refs(kind)
            .ok_or_else(|| SessionError::UnknownRefKind {
                token: instance.def().token().to_owned(),
                kind: kind.to_owned(),
            })
    }

    /// First target in the `kind` collection.
    pub fn first_ref(&self, node: NodeId, kind: &str) -> Result<Option<NodeId>, SessionError> {
        Ok(self.refs(node, kind)?.first().copied())
    }

    // -----------------------------------------------------------------------
    // Marker access
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn marker(&self, node: NodeId) -> Option<&RefMarker> {
        self.markers.get(&node)
    }

    #[must_use]
    pub fn is_bound(&self, marker: NodeId) -> bool {
        self.markers.get(&marker).is_some_and(RefMarker::is_bound)
    }

    #[must_use]
    pub fn binding(&self, marker: NodeId) -> Option<&Binding> {
        self.markers.get(&marker).and_then(RefMarker::binding)
    }

    /// Markers waiting for a controller.
    #[must_use]
    pub fn pending_markers(&self) -> &PendingBindings<NodeId> {
        self.resolver.pending()
    }

    // -----------------------------------------------------------------------
    // Ticks
    // -----------------------------------------------------------------------

    /// Number of ticks run so far.
    #[must_use]
    pub fn turn(&self) -> u64 {
        self.queue.turn()
    }

    /// Whether deferred work is waiting.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        !self.queue.is_idle()
    }

    /// Run the work deferred by the previous turn. Returns the number of tasks run.
    pub fn run_tick(&mut self) -> usize {
        let tasks = self.queue.take_turn();
        let _span = tracing::trace_span!("session.tick", turn = self.queue.turn()).entered();
        let count = tasks.len();
        for task in tasks {
            match task {
                Task::ConnectMarker(marker) => self.connect_marker(marker),
            }
        }
        count
    }

    /// Run ticks until no deferred work remains. Returns the ticks run.
    pub fn settle(&mut self) -> Result<u32, SessionError> {
        let bound = self.config.max_settle_ticks;
        for ticks in 0..bound {
            if self.queue.is_idle() {
                return Ok(ticks);
            }
            self.run_tick();
        }
        if self.queue.is_idle() {
            Ok(bound)
        } else {
            tracing::warn!(bound, pending = self.queue.len(), "session did not settle");
            Err(SessionError::Unsettled(bound))
        }
    }
}
