#![forbid(unsafe_code)]

//! Controller definitions and live instances.
//!
//! A [`ControllerDef`] is registered once per token. Every element created
//! with one of the token's controller tags gets a [`ControllerInstance`]
//! holding its property state and its bound reference collections.
//!
//! Hooks are plain optional callbacks keyed by property key or reference kind.
//! Reference kinds are stored under their camelCase member name, so `as="list-item"`
//! and `.refs("listItem")` name the same collection.

use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use indexmap::{IndexMap, IndexSet};
use proxel_dom::NodeId;
use proxel_props::case::member_name;
use proxel_props::{ChangeObserver, PropSpec, PropSpecBuilder, PropSync, PropValue, PropertyState};

use crate::error::SessionError;

/// A property of a controller changed.
#[derive(Debug, Clone, Copy)]
pub struct PropertyChange<'a> {
    pub controller: NodeId,
    pub key: &'a str,
    /// `None` for the first value the property receives.
    pub old: Option<&'a PropValue>,
    pub new: &'a PropValue,
}

/// A reference target joined or left a controller's collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefEvent<'a> {
    pub controller: NodeId,
    pub kind: &'a str,
    /// Node added to or removed from the collection.
    pub target: NodeId,
}

pub type ChangeHook = Rc<dyn Fn(&PropertyChange<'_>)>;
pub type RefHook = Rc<dyn Fn(&RefEvent<'_>)>;
pub type InitHook = Rc<dyn Fn(&ControllerView<'_>)>;

/// Optional callbacks of a controller type.
#[derive(Clone, Default)]
pub struct ControllerHooks {
    initialized: Option<InitHook>,
    changed: AHashMap<String, ChangeHook>,
    ref_connected: AHashMap<String, RefHook>,
    ref_disconnected: AHashMap<String, RefHook>,
}

impl fmt::Debug for ControllerHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerHooks")
            .field("initialized", &self.initialized.is_some())
            .field("changed", &self.changed.keys().collect::<Vec<_>>())
            .field("ref_connected", &self.ref_connected.keys().collect::<Vec<_>>())
            .field(
                "ref_disconnected",
                &self.ref_disconnected.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ControllerHooks {
    pub(crate) fn initialized(&self, view: &ControllerView<'_>) {
        if let Some(hook) = &self.initialized {
            hook(view);
        }
    }

    pub(crate) fn changed(&self, change: &PropertyChange<'_>) {
        if let Some(hook) = self.changed.get(change.key) {
            hook(change);
        }
    }

    pub(crate) fn ref_connected(&self, event: &RefEvent<'_>) {
        if let Some(hook) = self.ref_connected.get(event.kind) {
            hook(event);
        }
    }

    pub(crate) fn ref_disconnected(&self, event: &RefEvent<'_>) {
        if let Some(hook) = self.ref_disconnected.get(event.kind) {
            hook(event);
        }
    }
}

/// Everything registered for one controller token.
#[derive(Debug, Clone)]
pub struct ControllerDef {
    token: String,
    sync: PropSync,
    ref_kinds: IndexSet<String>,
    hooks: ControllerHooks,
}

impl ControllerDef {
    #[must_use]
    pub fn builder(token: impl Into<String>) -> ControllerDefBuilder {
        ControllerDefBuilder {
            token: token.into(),
            props: PropSpec::builder(),
            ref_kinds: IndexSet::new(),
            hooks: ControllerHooks::default(),
        }
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn spec(&self) -> &PropSpec {
        self.sync.spec()
    }

    #[must_use]
    pub fn sync(&self) -> &PropSync {
        &self.sync
    }

    /// Declared reference kinds, as member names.
    pub fn ref_kinds(&self) -> impl Iterator<Item = &str> {
        self.ref_kinds.iter().map(String::as_str)
    }

    #[must_use]
    pub fn declares_ref_kind(&self, kind: &str) -> bool {
        self.ref_kinds.contains(kind)
    }

    #[must_use]
    pub fn hooks(&self) -> &ControllerHooks {
        &self.hooks
    }

    pub(crate) fn with_bootstrap_attribute(mut self, name: &str) -> Self {
        self.sync = self.sync.with_bootstrap_attribute(name);
        self
    }
}

/// Builder for [`ControllerDef`].
pub struct ControllerDefBuilder {
    token: String,
    props: PropSpecBuilder,
    ref_kinds: IndexSet<String>,
    hooks: ControllerHooks,
}

impl ControllerDefBuilder {
    /// Declare property `key` with its default value.
    #[must_use]
    pub fn prop(mut self, key: impl Into<String>, default: impl Into<PropValue>) -> Self {
        self.props = self.props.prop(key, default);
        self
    }

    /// Declare a reference kind; bound targets are collected under its member name.
    #[must_use]
    pub fn refs(mut self, kind: &str) -> Self {
        self.ref_kinds.insert(member_name(kind));
        self
    }

    #[must_use]
    pub fn on_initialized(mut self, hook: impl Fn(&ControllerView<'_>) + 'static) -> Self {
        self.hooks.initialized = Some(Rc::new(hook));
        self
    }

    /// Called after `key` changes, before its attribute is written.
    #[must_use]
    pub fn on_change(
        mut self,
        key: impl Into<String>,
        hook: impl Fn(&PropertyChange<'_>) + 'static,
    ) -> Self {
        self.hooks.changed.insert(key.into(), Rc::new(hook));
        self
    }

    /// Called before a target joins the `kind` collection.
    #[must_use]
    pub fn on_ref_connected(mut self, kind: &str, hook: impl Fn(&RefEvent<'_>) + 'static) -> Self {
        self.hooks
            .ref_connected
            .insert(member_name(kind), Rc::new(hook));
        self
    }

    /// Called before a target leaves the `kind` collection.
    #[must_use]
    pub fn on_ref_disconnected(
        mut self,
        kind: &str,
        hook: impl Fn(&RefEvent<'_>) + 'static,
    ) -> Self {
        self.hooks
            .ref_disconnected
            .insert(member_name(kind), Rc::new(hook));
        self
    }

    pub fn build(self) -> Result<ControllerDef, SessionError> {
        if self.token.is_empty() || self.token.chars().any(char::is_whitespace) {
            return Err(SessionError::InvalidToken(self.token));
        }
        let spec = self.props.build()?;
        if let Some(key) = self
            .hooks
            .changed
            .keys()
            .find(|k| spec.index_of_key(k).is_none())
        {
            return Err(SessionError::UnknownProperty {
                token: self.token.clone(),
                key: key.clone(),
            });
        }
        if let Some(kind) = self
            .hooks
            .ref_connected
            .keys()
            .chain(self.hooks.ref_disconnected.keys())
            .find(|k| !self.ref_kinds.contains(*k))
        {
            return Err(SessionError::UnknownRefKind {
                token: self.token.clone(),
                kind: kind.clone(),
            });
        }
        Ok(ControllerDef {
            token: self.token,
            sync: PropSync::new(spec),
            ref_kinds: self.ref_kinds,
            hooks: self.hooks,
        })
    }
}

/// Which node a controller instance targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerRole {
    /// `{token}-proxy`: targets its parent.
    Proxy,
    /// `{token}-element`: targets itself.
    Host,
}

/// Per-element controller state.
#[derive(Debug)]
pub struct ControllerInstance {
    pub(crate) def: Rc<ControllerDef>,
    pub(crate) role: ControllerRole,
    pub(crate) state: PropertyState,
    pub(crate) refs: IndexMap<String, IndexSet<NodeId>>,
    /// Node whose scope marker carries this controller's token while connected.
    pub(crate) scoped_target: Option<NodeId>,
}

impl ControllerInstance {
    pub(crate) fn new(def: Rc<ControllerDef>, role: ControllerRole) -> Self {
        let state = def.sync.new_state();
        let refs = def
            .ref_kinds
            .iter()
            .map(|kind| (kind.clone(), IndexSet::new()))
            .collect();
        Self {
            def,
            role,
            state,
            refs,
            scoped_target: None,
        }
    }

    #[must_use]
    pub fn def(&self) -> &ControllerDef {
        &self.def
    }

    #[must_use]
    pub fn role(&self) -> ControllerRole {
        self.role
    }

    #[must_use]
    pub fn state(&self) -> &PropertyState {
        &self.state
    }

    /// Bound targets of reference kind `kind`, in binding order.
    #[must_use]
    pub fn refs(&self, kind: &str) -> Option<&IndexSet<NodeId>> {
        self.refs.get(&member_name(kind))
    }

    pub(crate) fn view(&self, node: NodeId) -> ControllerView<'_> {
        ControllerView {
            node,
            role: self.role,
            def: &self.def,
            state: &self.state,
        }
    }
}

/// Read-only view of a controller handed to the `initialized` hook.
#[derive(Debug, Clone, Copy)]
pub struct ControllerView<'a> {
    node: NodeId,
    role: ControllerRole,
    def: &'a ControllerDef,
    state: &'a PropertyState,
}

impl<'a> ControllerView<'a> {
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[must_use]
    pub fn role(&self) -> ControllerRole {
        self.role
    }

    #[must_use]
    pub fn token(&self) -> &'a str {
        &self.def.token
    }

    #[must_use]
    pub fn value(&self, key: &str) -> Option<&'a PropValue> {
        let (def, state) = (self.def, self.state);
        state.value(def.spec(), key)
    }

    /// Current values in declaration order.
    pub fn values(&self) -> impl Iterator<Item = (&'a str, &'a PropValue)> + 'a {
        let (def, state) = (self.def, self.state);
        def.spec()
            .entries()
            .enumerate()
            .filter_map(move |(i, entry)| state.get(i).map(|v| (entry.key(), v)))
    }
}

/// Routes [`ChangeObserver`] notifications to a controller's change hooks.
pub(crate) struct HookObserver<'a> {
    pub(crate) controller: NodeId,
    pub(crate) hooks: &'a ControllerHooks,
}

impl ChangeObserver for HookObserver<'_> {
    fn property_changed(&mut self, key: &str, old: Option<&PropValue>, new: &PropValue) {
        self.hooks.changed(&PropertyChange {
            controller: self.controller,
            key,
            old,
            new,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    #[test]
    fn builder_normalises_ref_kinds() {
        let def = ControllerDef::builder("tabs")
            .refs("list-item")
            .refs("panel")
            .build()
            .unwrap();
        assert_eq!(def.ref_kinds().collect::<Vec<_>>(), vec!["listItem", "panel"]);
        assert!(def.declares_ref_kind("listItem"));
    }

    #[test]
    fn invalid_tokens_are_rejected() {
        for token in ["", "my tabs"] {
            assert_eq!(
                ControllerDef::builder(token).build().unwrap_err(),
                SessionError::InvalidToken(token.to_owned())
            );
        }
    }

    #[test]
    fn hooks_must_name_declared_members() {
        let err = ControllerDef::builder("tabs")
            .on_change("missing", |_| {})
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::UnknownProperty {
                token: "tabs".into(),
                key: "missing".into()
            }
        );

        let err = ControllerDef::builder("tabs")
            .on_ref_connected("tab", |_| {})
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::UnknownRefKind {
                token: "tabs".into(),
                kind: "tab".into()
            }
        );
    }

    #[test]
    fn instance_starts_with_empty_collections() {
        let def = Rc::new(ControllerDef::builder("tabs").refs("tab").build().unwrap());
        let instance = ControllerInstance::new(def, ControllerRole::Proxy);
        assert_eq!(instance.refs("tab").map(IndexSet::len), Some(0));
        assert!(instance.refs("panel").is_none());
        assert_eq!(instance.scoped_target, None);
    }

    #[test]
    fn hook_observer_forwards_changes() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let def = ControllerDef::builder("tabs")
            .prop("index", 0)
            .on_change("index", move |c| {
                sink.borrow_mut().push((c.key.to_owned(), c.new.clone()));
            })
            .build()
            .unwrap();
        let mut observer = HookObserver {
            controller: proxel_dom::Document::new().root(),
            hooks: def.hooks(),
        };
        observer.property_changed("index", None, &PropValue::from(3));
        observer.property_changed("other", None, &PropValue::from(1));
        assert_eq!(*seen.borrow(), vec![("index".to_owned(), PropValue::from(3))]);
    }
}
