//! Per-instance property storage.

use crate::spec::PropSpec;
use crate::value::PropValue;

/// Storage for one property: the current value and the one it replaced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropSlot {
    current: Option<PropValue>,
    previous: Option<PropValue>,
}

impl PropSlot {
    /// Current value; `None` until the property is seeded.
    #[must_use]
    pub fn current(&self) -> Option<&PropValue> {
        self.current.as_ref()
    }

    /// Value replaced by the last effective write.
    #[must_use]
    pub fn previous(&self) -> Option<&PropValue> {
        self.previous.as_ref()
    }

    /// Store `value` unless it equals the current one. Returns the replaced
    /// value on an effective change.
    pub(crate) fn replace(&mut self, value: PropValue) -> Option<Option<PropValue>> {
        if self.current.as_ref() == Some(&value) {
            return None;
        }
        let old = self.current.replace(value);
        self.previous.clone_from(&old);
        Some(old)
    }
}

/// Property values of one controller instance, indexed like its [`PropSpec`].
///
/// Only [`PropSync`](crate::PropSync) mutates the slots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyState {
    slots: Vec<PropSlot>,
}

impl PropertyState {
    /// Unseeded state sized for `spec`.
    #[must_use]
    pub fn new(spec: &PropSpec) -> Self {
        Self {
            slots: vec![PropSlot::default(); spec.len()],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&PropSlot> {
        self.slots.get(index)
    }

    /// Current value at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&PropValue> {
        self.slot(index).and_then(PropSlot::current)
    }

    /// Current value of `key`.
    #[must_use]
    pub fn value<'a>(&'a self, spec: &PropSpec, key: &str) -> Option<&'a PropValue> {
        spec.index_of_key(key).and_then(|i| self.get(i))
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut PropSlot> {
        self.slots.get_mut(index)
    }
}
