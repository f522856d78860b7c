//! Key/attribute name transforms.
//!
//! Property keys are written in camel or snake case; attributes use kebab
//! case. The transform is applied once per controller type when the
//! [`PropSpec`](crate::PropSpec) lookup table is built.

use heck::{ToKebabCase, ToLowerCamelCase};

/// Attribute name for a property key: `maxCount` → `max-count`.
#[must_use]
pub fn attribute_name(key: &str) -> String {
    key.to_kebab_case()
}

/// Member name for a kebab-case identifier: `list-item` → `listItem`.
///
/// Used to normalise reference kinds so `as="list-item"` and a declared
/// `listItem` kind match.
#[must_use]
pub fn member_name(name: &str) -> String {
    name.to_lower_camel_case()
}
