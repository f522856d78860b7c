#![forbid(unsafe_code)]

//! Property ↔ attribute synchroniser.
//!
//! [`PropSync`] owns a [`PropSpec`] and applies it to a per-instance
//! [`PropertyState`] and an [`AttributeHost`]:
//!
//! - [`PropSync::init`] seeds every property, highest priority first: literal
//!   attribute, bootstrap payload entry, caller override, default.
//! - [`PropSync::set`] stores a value, notifies the [`ChangeObserver`] and,
//!   when syncing, writes or elides the attribute.
//! - [`PropSync::attribute_changed`] decodes an externally mutated attribute
//!   into the property without writing the attribute back.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Malformed JSON attribute | Hand-edited markup | Decoded as the raw string |
//! | Malformed bootstrap payload | Bad JSON or not an object | Treated as empty, logged |
//! | Unknown key | Key not declared | [`SetOutcome::UnknownKey`], nothing stored |

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::codec::{decode, encode};
use crate::spec::PropSpec;
use crate::state::PropertyState;
use crate::value::PropValue;

/// One-shot attribute carrying a JSON object of initial property values.
pub const DEFAULT_BOOTSTRAP_ATTRIBUTE: &str = "data-props";

/// Attribute storage of the node a controller is bound to.
pub trait AttributeHost {
    fn attribute(&self, name: &str) -> Option<&str>;

    fn set_attribute(&mut self, name: &str, value: &str);

    fn remove_attribute(&mut self, name: &str);

    fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }
}

impl AttributeHost for BTreeMap<String, String> {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }

    fn set_attribute(&mut self, name: &str, value: &str) {
        self.insert(name.to_owned(), value.to_owned());
    }

    fn remove_attribute(&mut self, name: &str) {
        self.remove(name);
    }
}

/// Receives effective property changes.
pub trait ChangeObserver {
    /// `old` is `None` for the first value a property receives.
    fn property_changed(&mut self, key: &str, old: Option<&PropValue>, new: &PropValue);
}

impl ChangeObserver for () {
    fn property_changed(&mut self, _key: &str, _old: Option<&PropValue>, _new: &PropValue) {}
}

/// Adapts a closure into a [`ChangeObserver`].
pub struct FnObserver<F>(pub F);

impl<F> ChangeObserver for FnObserver<F>
where
    F: FnMut(&str, Option<&PropValue>, &PropValue),
{
    fn property_changed(&mut self, key: &str, old: Option<&PropValue>, new: &PropValue) {
        (self.0)(key, old, new);
    }
}

/// Construction-time property values supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    values: Vec<(String, PropValue)>,
}

impl Overrides {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Record an override; a later value for the same key wins.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PropValue>) {
        let key = key.into();
        let value = value.into();
        match self.values.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((key, value)),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.values.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<PropValue>> FromIterator<(K, V)> for Overrides {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut overrides = Self::new();
        for (k, v) in iter {
            overrides.insert(k, v);
        }
        overrides
    }
}

/// What a write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// The key is not declared.
    UnknownKey,
    /// The value equals the stored one; nothing happened.
    Unchanged,
    /// Stored and notified; the attribute was left alone.
    Stored,
    /// Stored, notified and written to the attribute.
    Written,
    /// Stored and notified; the attribute was removed because the value is the default.
    Elided,
}

impl SetOutcome {
    /// Whether the stored value changed.
    #[must_use]
    pub const fn is_change(self) -> bool {
        matches!(self, Self::Stored | Self::Written | Self::Elided)
    }
}

/// Synchroniser for one controller type.
#[derive(Debug, Clone)]
pub struct PropSync {
    spec: PropSpec,
    bootstrap_attribute: String,
}

impl PropSync {
    #[must_use]
    pub fn new(spec: PropSpec) -> Self {
        Self {
            spec,
            bootstrap_attribute: DEFAULT_BOOTSTRAP_ATTRIBUTE.to_owned(),
        }
    }

    /// Use `name` instead of [`DEFAULT_BOOTSTRAP_ATTRIBUTE`].
    #[must_use]
    pub fn with_bootstrap_attribute(mut self, name: impl Into<String>) -> Self {
        self.bootstrap_attribute = name.into();
        self
    }

    #[must_use]
    pub fn spec(&self) -> &PropSpec {
        &self.spec
    }

    #[must_use]
    pub fn bootstrap_attribute(&self) -> &str {
        &self.bootstrap_attribute
    }

    /// Unseeded state for an instance of this controller type.
    #[must_use]
    pub fn new_state(&self) -> PropertyState {
        PropertyState::new(&self.spec)
    }

    /// Whether mutations of attribute `name` must be reported to
    /// [`attribute_changed`](Self::attribute_changed).
    #[must_use]
    pub fn observes(&self, name: &str) -> bool {
        name == self.bootstrap_attribute || self.spec.index_of_attribute(name).is_some()
    }

    /// Seed every property of `state` and consume the bootstrap attribute.
    pub fn init<H, O>(
        &self,
        state: &mut PropertyState,
        host: &mut H,
        observer: &mut O,
        overrides: &Overrides,
    ) where
        H: AttributeHost + ?Sized,
        O: ChangeObserver + ?Sized,
    {
        let payload = self.bootstrap_payload(host);
        for (index, entry) in self.spec.entries().enumerate() {
            if let Some(raw) = host.attribute(entry.attribute()).map(str::to_owned) {
                let value = decode(entry.kind(), &raw);
                self.set_index(state, host, observer, index, value, false);
            } else if let Some(json) = payload.get(entry.key()) {
                let value = PropValue::from_json(entry.kind(), json.clone());
                self.set_index(state, host, observer, index, value, true);
            } else if let Some(value) = overrides.get(entry.key()) {
                self.set_index(state, host, observer, index, value.clone(), true);
            } else {
                let value = entry.default_value().clone();
                self.set_index(state, host, observer, index, value, false);
            }
        }
        host.remove_attribute(&self.bootstrap_attribute);
    }

    fn bootstrap_payload<H: AttributeHost + ?Sized>(&self, host: &H) -> Map<String, Value> {
        let Some(raw) = host.attribute(&self.bootstrap_attribute) else {
            return Map::new();
        };
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                tracing::warn!(
                    attribute = %self.bootstrap_attribute,
                    payload = %other,
                    "bootstrap payload is not an object, ignoring"
                );
                Map::new()
            }
            Err(err) => {
                tracing::warn!(
                    attribute = %self.bootstrap_attribute,
                    %err,
                    "malformed bootstrap payload, ignoring"
                );
                Map::new()
            }
        }
    }

    /// Write property `key`. With `sync`, the attribute follows the value.
    pub fn set<H, O>(
        &self,
        state: &mut PropertyState,
        host: &mut H,
        observer: &mut O,
        key: &str,
        value: impl Into<PropValue>,
        sync: bool,
    ) -> SetOutcome
    where
        H: AttributeHost + ?Sized,
        O: ChangeObserver + ?Sized,
    {
        let Some(index) = self.spec.index_of_key(key) else {
            tracing::warn!(key, "write to undeclared property ignored");
            return SetOutcome::UnknownKey;
        };
        self.set_index(state, host, observer, index, value.into(), sync)
    }

    /// [`set`](Self::set) by declaration index.
    pub fn set_index<H, O>(
        &self,
        state: &mut PropertyState,
        host: &mut H,
        observer: &mut O,
        index: usize,
        value: PropValue,
        sync: bool,
    ) -> SetOutcome
    where
        H: AttributeHost + ?Sized,
        O: ChangeObserver + ?Sized,
    {
        let (Some(entry), Some(slot)) = (self.spec.entry(index), state.slot_mut(index)) else {
            return SetOutcome::UnknownKey;
        };
        let kind = entry.kind();
        let value = value.conform(kind);
        let Some(old) = slot.replace(value.clone()) else {
            return SetOutcome::Unchanged;
        };

        tracing::trace!(key = entry.key(), %value, sync, "property changed");
        observer.property_changed(entry.key(), old.as_ref(), &value);

        if !sync {
            return SetOutcome::Stored;
        }
        let encoded = encode(kind, &value);
        let default = entry.default_value();
        if encoded == encode(kind, default) || value == *default {
            host.remove_attribute(entry.attribute());
            SetOutcome::Elided
        } else {
            host.set_attribute(entry.attribute(), &encoded);
            SetOutcome::Written
        }
    }

    /// React to an external mutation of attribute `name` (`None` = removed).
    ///
    /// Returns whether the attribute is one this synchroniser observes.
    pub fn attribute_changed<H, O>(
        &self,
        state: &mut PropertyState,
        host: &mut H,
        observer: &mut O,
        name: &str,
        new: Option<&str>,
    ) -> bool
    where
        H: AttributeHost + ?Sized,
        O: ChangeObserver + ?Sized,
    {
        if name == self.bootstrap_attribute {
            if new.is_some() {
                self.init(state, host, observer, &Overrides::default());
            }
            return true;
        }
        let Some(index) = self.spec.index_of_attribute(name) else {
            return false;
        };
        let Some(entry) = self.spec.entry(index) else {
            return false;
        };
        let value = match new {
            Some(raw) => decode(entry.kind(), raw),
            None => entry.default_value().clone(),
        };
        self.set_index(state, host, observer, index, value, false);
        true
    }
}
